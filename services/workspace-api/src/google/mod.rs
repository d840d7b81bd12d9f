//! Thin typed clients for the Google Workspace REST APIs.
//!
//! Every call takes the caller's [`AccessToken`] explicitly; nothing here holds
//! per-user state. Upstream failures are reported as [`GoogleApiError`] and are
//! never retried.

pub mod calendar;
pub mod docs;
pub mod drive;
pub mod forms;
pub mod gmail;
pub mod sheets;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::auth::AccessToken;

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";
pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
pub const DOCS_API_BASE: &str = "https://docs.googleapis.com/v1";
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";
pub const FORMS_API_BASE: &str = "https://forms.googleapis.com/v1";

#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub gmail: String,
    pub calendar: String,
    pub drive: String,
    pub drive_upload: String,
    pub docs: String,
    pub sheets: String,
    pub forms: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            gmail: GMAIL_API_BASE.to_string(),
            calendar: CALENDAR_API_BASE.to_string(),
            drive: DRIVE_API_BASE.to_string(),
            drive_upload: DRIVE_UPLOAD_BASE.to_string(),
            docs: DOCS_API_BASE.to_string(),
            sheets: SHEETS_API_BASE.to_string(),
            forms: FORMS_API_BASE.to_string(),
        }
    }
}

impl GoogleEndpoints {
    /// Points every API at one host, keeping Google's per-API path prefixes.
    pub fn with_host(host: &str) -> Self {
        let host = host.trim_end_matches('/');
        Self {
            gmail: format!("{}/gmail/v1", host),
            calendar: format!("{}/calendar/v3", host),
            drive: format!("{}/drive/v3", host),
            drive_upload: format!("{}/upload/drive/v3", host),
            docs: format!("{}/docs/v1", host),
            sheets: format!("{}/sheets/v4", host),
            forms: format!("{}/forms/v1", host),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GoogleApiError {
    #[error("Google rejected the access token: HTTP {0}")]
    Unauthorized(StatusCode),

    #[error("Google API returned HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Request to Google API failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to parse Google API response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid Google API URL: {0}")]
    Url(String),
}

pub type Result<T> = std::result::Result<T, GoogleApiError>;

#[derive(Clone)]
pub struct GoogleClient {
    client: Client,
    endpoints: Arc<GoogleEndpoints>,
}

impl GoogleClient {
    pub fn new(endpoints: GoogleEndpoints, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client,
            endpoints: Arc::new(endpoints),
        })
    }

    pub fn endpoints(&self) -> &GoogleEndpoints {
        &self.endpoints
    }

    pub fn gmail(&self) -> gmail::GmailApi<'_> {
        gmail::GmailApi::new(self)
    }

    pub fn calendar(&self) -> calendar::CalendarApi<'_> {
        calendar::CalendarApi::new(self)
    }

    pub fn drive(&self) -> drive::DriveApi<'_> {
        drive::DriveApi::new(self)
    }

    pub fn docs(&self) -> docs::DocsApi<'_> {
        docs::DocsApi::new(self)
    }

    pub fn sheets(&self) -> sheets::SheetsApi<'_> {
        sheets::SheetsApi::new(self)
    }

    pub fn forms(&self) -> forms::FormsApi<'_> {
        forms::FormsApi::new(self)
    }

    /// Joins percent-encoded path segments onto an API base URL.
    pub(crate) fn url(&self, base: &str, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(base).map_err(|e| GoogleApiError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| GoogleApiError::Url(format!("{} cannot be a base URL", base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client.request(method, url)
    }

    async fn execute(&self, token: &AccessToken, request: RequestBuilder) -> Result<Response> {
        let response = request.bearer_auth(token.as_str()).send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(GoogleApiError::Unauthorized(status));
        } else if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GoogleApiError::Status { status, body });
        }

        Ok(response)
    }

    pub(crate) async fn fetch_json<T: DeserializeOwned>(
        &self,
        token: &AccessToken,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = self.execute(token, request).await?;
        let url = response.url().path().to_string();
        let response_text = response.text().await?;
        debug!(path = %url, bytes = response_text.len(), "Google API response received");

        Ok(serde_json::from_str(&response_text)?)
    }

    pub(crate) async fn fetch_empty(&self, token: &AccessToken, request: RequestBuilder) -> Result<()> {
        self.execute(token, request).await?;
        Ok(())
    }

    pub(crate) async fn fetch_bytes(
        &self,
        token: &AccessToken,
        request: RequestBuilder,
    ) -> Result<Vec<u8>> {
        let response = self.execute(token, request).await?;
        Ok(response.bytes().await?.to_vec())
    }
}
