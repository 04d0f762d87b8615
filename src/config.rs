// src/config.rs
use serde::Deserialize;
use std::fmt;

use crate::timesheet::DEFAULT_TIMESTAMP_FORMAT;

pub const DEFAULT_SCHEDULE_FILE: &str = "cleaned_dataset.csv";

fn default_schedule_file() -> String {
    DEFAULT_SCHEDULE_FILE.to_string()
}

fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_string()
}

/// Settings for the remote drive workflow, read from the environment
/// (`AZURE_TENANT_ID`, `AZURE_CLIENT_ID`, `AZURE_CLIENT_SECRET`, `DRIVE_ID`, ...).
#[derive(Clone, Deserialize)]
pub struct GraphSettings {
    pub azure_tenant_id: String,
    pub azure_client_id: String,
    pub azure_client_secret: String,
    pub drive_id: String,
    /// Folder holding the punch exports; drive root when unset.
    #[serde(default)]
    pub timesheet_folder_id: Option<String>,
    /// Folder receiving the summary; drive root when unset.
    #[serde(default)]
    pub output_folder_id: Option<String>,
    /// Schedule file name at the drive root.
    #[serde(default = "default_schedule_file")]
    pub schedule_file: String,
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

impl GraphSettings {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env::<GraphSettings>()
    }
}

// Keeps the client secret out of logs.
impl fmt::Debug for GraphSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphSettings")
            .field("azure_tenant_id", &self.azure_tenant_id)
            .field("azure_client_id", &self.azure_client_id)
            .field("azure_client_secret", &"<redacted>")
            .field("drive_id", &self.drive_id)
            .field("timesheet_folder_id", &self.timesheet_folder_id)
            .field("output_folder_id", &self.output_folder_id)
            .field("schedule_file", &self.schedule_file)
            .field("timestamp_format", &self.timestamp_format)
            .finish()
    }
}
