// src/store.rs
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

use crate::config::GraphSettings;
use crate::error::{io_context, AppError};
use crate::graph_client::GraphClient;
use crate::timesheet::is_timesheet_candidate;

const TIMESHEET_EXTENSION: &str = ".csv";

/// A fetched input file.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Where the inputs come from and where the summary goes.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn fetch_schedule(&self) -> Result<SourceDocument, AppError>;

    /// The most recently modified timesheet export.
    async fn fetch_latest_timesheet(&self) -> Result<SourceDocument, AppError>;

    /// Stores the rendered report and returns where it ended up.
    async fn publish_report(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, AppError>;
}

// --- Graph drive ---

pub struct GraphStore {
    client: GraphClient,
    schedule_file: String,
    timesheet_folder_id: Option<String>,
    output_folder_id: Option<String>,
}

impl GraphStore {
    pub fn new(client: GraphClient) -> Self {
        let GraphSettings {
            schedule_file,
            timesheet_folder_id,
            output_folder_id,
            ..
        } = client.settings().clone();
        Self {
            client,
            schedule_file,
            timesheet_folder_id,
            output_folder_id,
        }
    }
}

#[async_trait]
impl DocumentStore for GraphStore {
    async fn fetch_schedule(&self) -> Result<SourceDocument, AppError> {
        info!("Downloading reference schedule {}...", self.schedule_file);
        let bytes = self.client.download_by_name(&self.schedule_file).await?;
        Ok(SourceDocument {
            name: self.schedule_file.clone(),
            bytes,
        })
    }

    async fn fetch_latest_timesheet(&self) -> Result<SourceDocument, AppError> {
        info!("Looking for the latest timesheet...");
        let schedule_file = self.schedule_file.as_str();
        let item = self
            .client
            .latest_file(
                self.timesheet_folder_id.as_deref(),
                TIMESHEET_EXTENSION,
                |name| is_timesheet_candidate(name, schedule_file),
            )
            .await?;
        let bytes = self.client.download_item(&item).await?;
        Ok(SourceDocument {
            name: item.name,
            bytes,
        })
    }

    async fn publish_report(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, AppError> {
        let item = self
            .client
            .upload(self.output_folder_id.as_deref(), file_name, &bytes)
            .await?;
        Ok(item.web_url.unwrap_or(item.name))
    }
}

// --- Local filesystem ---

/// Reads inputs from disk and writes the summary into `output_dir`.
/// `timesheet_path` may name a directory, in which case its newest `.csv` is used.
pub struct LocalStore {
    schedule_path: PathBuf,
    timesheet_path: PathBuf,
    output_dir: PathBuf,
}

impl LocalStore {
    pub fn new(schedule_path: PathBuf, timesheet_path: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            schedule_path,
            timesheet_path,
            output_dir,
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

async fn read_document(path: &Path) -> Result<SourceDocument, AppError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| io_context(e, format!("Failed to read {:?}", path)))?;
    debug!("Read {} bytes from {:?}", bytes.len(), path);
    Ok(SourceDocument {
        name: file_label(path),
        bytes,
    })
}

/// Newest `.csv` file in `dir` by modification time, skipping published
/// summaries and `schedule_file`.
pub async fn latest_csv_in_dir(dir: &Path, schedule_file: &str) -> Result<PathBuf, AppError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| io_context(e, format!("Failed to list {:?}", dir)))?;

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| io_context(e, format!("Failed to list {:?}", dir)))?
    {
        let path = entry.path();
        let is_csv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if !is_csv || !is_timesheet_candidate(&file_label(&path), schedule_file) {
            continue;
        }
        let metadata = entry
            .metadata()
            .await
            .map_err(|e| io_context(e, format!("Failed to stat {:?}", path)))?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata
            .modified()
            .map_err(|e| io_context(e, format!("No modification time for {:?}", path)))?;
        if newest.as_ref().map_or(true, |(seen, _)| modified > *seen) {
            newest = Some((modified, path));
        }
    }

    newest
        .map(|(_, path)| path)
        .ok_or_else(|| AppError::NoTimesheet(format!("no timesheet .csv files in {:?}", dir)))
}

#[async_trait]
impl DocumentStore for LocalStore {
    async fn fetch_schedule(&self) -> Result<SourceDocument, AppError> {
        read_document(&self.schedule_path).await
    }

    async fn fetch_latest_timesheet(&self) -> Result<SourceDocument, AppError> {
        let is_dir = tokio::fs::metadata(&self.timesheet_path)
            .await
            .map(|m| m.is_dir())
            .map_err(|e| io_context(e, format!("Failed to stat {:?}", self.timesheet_path)))?;
        let path = if is_dir {
            latest_csv_in_dir(&self.timesheet_path, &file_label(&self.schedule_path)).await?
        } else {
            self.timesheet_path.clone()
        };
        info!("Using timesheet {:?}", path);
        read_document(&path).await
    }

    async fn publish_report(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, AppError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| io_context(e, format!("Failed to create {:?}", self.output_dir)))?;
        let path = self.output_dir.join(file_name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| io_context(e, format!("Failed to write {:?}", path)))?;
        info!("Wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(path.display().to_string())
    }
}
