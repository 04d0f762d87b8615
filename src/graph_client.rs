// src/graph_client.rs

use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::GraphSettings;

pub const GRAPH_API_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const GRAPH_LOGIN_BASE_URL: &str = "https://login.microsoftonline.com";
pub const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

const TOKEN_EXPIRY_BUFFER_SECS: u64 = 60;
const MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_AFTER_SECS: u64 = 2;

// --- Graph API Data Structures ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    pub id: String,
    pub name: String,
    pub last_modified_date_time: Option<DateTime<Utc>>,
    pub web_url: Option<String>,
    pub size: Option<u64>,
    // Present on files, absent on folders
    pub file: Option<serde_json::Value>,
}

impl DriveItem {
    pub fn is_file(&self) -> bool {
        self.file.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriveItemPage {
    pub value: Vec<DriveItem>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone)]
pub struct StoredToken {
    pub access_token: String,
    pub expires_at_unix_secs: u64,
}

impl StoredToken {
    pub fn from_response(response: &TokenResponse) -> Result<Self, GraphError> {
        Ok(Self {
            access_token: response.access_token.clone(),
            expires_at_unix_secs: now_unix_secs()? + response.expires_in,
        })
    }

    pub fn is_expired(&self, buffer_secs: u64) -> Result<bool, GraphError> {
        Ok(now_unix_secs()? >= self.expires_at_unix_secs.saturating_sub(buffer_secs))
    }
}

fn now_unix_secs() -> Result<u64, GraphError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| GraphError::TimeError(format!("Failed to get system time duration: {}", e)))?
        .as_secs())
}

// --- Error payloads (Graph API and token endpoint use different shapes) ---

#[derive(Debug, Clone, Deserialize)]
pub struct GraphErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphErrorPayload {
    pub error: GraphErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenErrorPayload {
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Best human-readable message from a Graph error body, falling back to the raw text.
pub fn graph_error_message(body: &str) -> String {
    match serde_json::from_str::<GraphErrorPayload>(body) {
        Ok(parsed) => match (parsed.error.code, parsed.error.message) {
            (Some(code), Some(message)) => format!("{}: {}", code, message),
            (None, Some(message)) => message,
            (Some(code), None) => code,
            (None, None) => body.to_string(),
        },
        Err(_) => body.to_string(),
    }
}

fn token_error_message(body: &str) -> String {
    match serde_json::from_str::<TokenErrorPayload>(body) {
        Ok(TokenErrorPayload {
            error_description: Some(description),
            ..
        }) => description,
        Ok(TokenErrorPayload {
            error: Some(error), ..
        }) => error,
        _ => body.to_string(),
    }
}

// --- Graph Error Type ---

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("HTTP request failed")]
    Request(#[from] reqwest::Error),

    #[error("JSON processing error")]
    Json(#[from] serde_json::Error),

    #[error("URL parsing error")]
    UrlParse(#[from] url::ParseError),

    #[error("Token request failed: Status={status:?}, Message='{message}'")]
    TokenRequestFailed {
        status: Option<StatusCode>,
        message: String,
    },

    #[error("Rate limit exceeded (Status 429)")]
    RateLimitExceeded,

    #[error("Graph API error: Status={status}, Message='{message}'")]
    ApiError { status: StatusCode, message: String },

    #[error("No matching file: {0}")]
    NoMatchingFile(String),

    #[error("System time error: {0}")]
    TimeError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Picks the most recently modified file whose name ends with `extension`
/// (case-insensitive) and passes `accept`. Items without a modification time
/// sort oldest.
pub fn latest_file_with_extension<'a, F>(
    items: &'a [DriveItem],
    extension: &str,
    accept: F,
) -> Option<&'a DriveItem>
where
    F: Fn(&str) -> bool,
{
    let extension = extension.to_lowercase();
    items
        .iter()
        .filter(|item| item.is_file() && item.name.to_lowercase().ends_with(&extension))
        .filter(|item| accept(&item.name))
        .max_by_key(|item| item.last_modified_date_time)
}

fn retry_delay(response: &reqwest::Response) -> Duration {
    let secs = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
    Duration::from_secs(secs)
}

// --- Graph Drive Client ---

/// Client-credentials client for one Graph drive.
#[derive(Clone)]
pub struct GraphClient {
    settings: Arc<GraphSettings>,
    http_client: Client,
    token: Arc<Mutex<Option<StoredToken>>>,
}

impl GraphClient {
    pub fn new(settings: GraphSettings) -> Result<Self, GraphError> {
        if settings.drive_id.trim().is_empty() {
            return Err(GraphError::ConfigError("DRIVE_ID is empty".to_string()));
        }
        let http_client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            settings: Arc::new(settings),
            http_client,
            token: Arc::new(Mutex::new(None)),
        })
    }

    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            GRAPH_LOGIN_BASE_URL, self.settings.azure_tenant_id
        )
    }

    // --- Token handling ---

    pub async fn acquire_token(&self) -> Result<StoredToken, GraphError> {
        info!("Requesting Graph access token (client credentials)...");
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.settings.azure_client_id.as_str()),
            ("client_secret", self.settings.azure_client_secret.as_str()),
            ("scope", GRAPH_DEFAULT_SCOPE),
        ];

        let response = self
            .http_client
            .post(self.token_url())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let token_response = response.json::<TokenResponse>().await?;
            debug!(
                "Obtained {} token valid for {} seconds",
                token_response.token_type, token_response.expires_in
            );
            StoredToken::from_response(&token_response)
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!("Token request failed. Status: {}, Body: {}", status, body);
            Err(GraphError::TokenRequestFailed {
                status: Some(status),
                message: token_error_message(&body),
            })
        }
    }

    /// Returns a cached token, fetching a new one when missing or about to expire.
    pub async fn get_valid_access_token(&self) -> Result<String, GraphError> {
        let mut token_guard = self.token.lock().await;
        if let Some(token) = token_guard.as_ref() {
            if !token.is_expired(TOKEN_EXPIRY_BUFFER_SECS)? {
                return Ok(token.access_token.clone());
            }
            info!("Graph token is expired or nearing expiry. Requesting a new one.");
        }
        let fresh = self.acquire_token().await?;
        let access_token = fresh.access_token.clone();
        *token_guard = Some(fresh);
        Ok(access_token)
    }

    // --- Request plumbing ---

    /// Builds `<api base>/<segments...>` with each segment percent-encoded.
    pub fn api_url(&self, segments: &[&str]) -> Result<Url, GraphError> {
        let mut url = Url::parse(GRAPH_API_BASE_URL)?;
        url.path_segments_mut()
            .map_err(|_| GraphError::ConfigError("Graph base URL cannot take path segments".to_string()))?
            .extend(segments);
        Ok(url)
    }

    fn drive_url(&self, segments: &[&str]) -> Result<Url, GraphError> {
        let mut all = vec!["drives", self.settings.drive_id.as_str()];
        all.extend_from_slice(segments);
        self.api_url(&all)
    }

    async fn build_request(&self, method: Method, url: &Url) -> Result<RequestBuilder, GraphError> {
        let access_token = self.get_valid_access_token().await?;
        Ok(self
            .http_client
            .request(method, url.clone())
            .header(AUTHORIZATION, format!("Bearer {}", access_token)))
    }

    /// Sends a request, retrying on 429. Non-success statuses become `ApiError`.
    async fn send(
        &self,
        method: Method,
        url: &Url,
        body: Option<&[u8]>,
        context_msg: &str,
    ) -> Result<reqwest::Response, GraphError> {
        let mut attempt = 1;
        loop {
            let mut request = self.build_request(method.clone(), url).await?;
            request = match body {
                Some(bytes) => request
                    .header(CONTENT_TYPE, "application/octet-stream")
                    .body(bytes.to_vec()),
                None => request.header(ACCEPT, "application/json"),
            };
            debug!("Sending request for '{}' to URL: {}", context_msg, url);

            let response = request.send().await?;
            let status = response.status();
            info!(
                "Received response for '{}' (attempt {}): Status={}",
                context_msg, attempt, status
            );

            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt >= MAX_ATTEMPTS {
                    warn!("Rate limit exceeded for '{}' after {} attempts", context_msg, attempt);
                    return Err(GraphError::RateLimitExceeded);
                }
                let delay = retry_delay(&response);
                warn!(
                    "Rate limited on '{}'. Retrying in {} seconds.",
                    context_msg,
                    delay.as_secs()
                );
                sleep(delay).await;
                attempt += 1;
                continue;
            }

            let error_body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error body: {}", e));
            error!(
                "API Error Response: Status={}, Body='{}' for URL: {}",
                status, error_body, url
            );
            return Err(GraphError::ApiError {
                status,
                message: graph_error_message(&error_body),
            });
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url, context_msg: &str) -> Result<T, GraphError> {
        let response = self.send(Method::GET, url, None, context_msg).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice::<T>(&bytes)?)
    }

    async fn get_bytes(&self, url: &Url, context_msg: &str) -> Result<Vec<u8>, GraphError> {
        let response = self.send(Method::GET, url, None, context_msg).await?;
        Ok(response.bytes().await?.to_vec())
    }

    // --- Drive operations ---

    /// Lists a folder (or the drive root), following `@odata.nextLink` pages.
    pub async fn list_children(&self, folder_id: Option<&str>) -> Result<Vec<DriveItem>, GraphError> {
        let mut url = match folder_id {
            Some(id) => self.drive_url(&["items", id, "children"])?,
            None => self.drive_url(&["root", "children"])?,
        };

        let mut items = Vec::new();
        loop {
            let page: DriveItemPage = self.get_json(&url, "list children").await?;
            items.extend(page.value);
            match page.next_link {
                Some(next) => url = Url::parse(&next)?,
                None => break,
            }
        }
        info!(
            "Listed {} items in {}",
            items.len(),
            folder_id.unwrap_or("drive root")
        );
        Ok(items)
    }

    /// The most recently modified file with `extension` in a folder whose
    /// name passes `accept`.
    pub async fn latest_file<F>(
        &self,
        folder_id: Option<&str>,
        extension: &str,
        accept: F,
    ) -> Result<DriveItem, GraphError>
    where
        F: Fn(&str) -> bool + Send,
    {
        let items = self.list_children(folder_id).await?;
        latest_file_with_extension(&items, extension, accept)
            .cloned()
            .ok_or_else(|| {
                GraphError::NoMatchingFile(format!(
                    "no {} files in {}",
                    extension,
                    folder_id.unwrap_or("drive root")
                ))
            })
    }

    /// Downloads a file addressed by its path relative to the drive root.
    pub async fn download_by_name(&self, file_name: &str) -> Result<Vec<u8>, GraphError> {
        let path_segment = format!("{}:", file_name);
        let url = self.drive_url(&["root:", &path_segment, "content"])?;
        let bytes = self.get_bytes(&url, "download by name").await?;
        info!("Downloaded {} ({} bytes)", file_name, bytes.len());
        Ok(bytes)
    }

    pub async fn download_item(&self, item: &DriveItem) -> Result<Vec<u8>, GraphError> {
        let url = self.drive_url(&["items", &item.id, "content"])?;
        let bytes = self.get_bytes(&url, "download item").await?;
        info!("Downloaded {} ({} bytes)", item.name, bytes.len());
        Ok(bytes)
    }

    /// Uploads (or replaces) `file_name` in a folder or the drive root.
    pub async fn upload(
        &self,
        folder_id: Option<&str>,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<DriveItem, GraphError> {
        let url = self.upload_url(folder_id, file_name)?;
        let response = self.send(Method::PUT, &url, Some(bytes), "upload").await?;
        let item = response.json::<DriveItem>().await?;
        info!(
            "Uploaded {} ({} bytes): {}",
            file_name,
            bytes.len(),
            item.web_url.as_deref().unwrap_or("<no web url>")
        );
        Ok(item)
    }

    pub fn upload_url(&self, folder_id: Option<&str>, file_name: &str) -> Result<Url, GraphError> {
        let name_segment = format!("{}:", file_name);
        match folder_id {
            Some(id) => {
                let folder_segment = format!("{}:", id);
                self.drive_url(&["items", &folder_segment, &name_segment, "content"])
            }
            None => self.drive_url(&["root:", &name_segment, "content"]),
        }
    }
}
