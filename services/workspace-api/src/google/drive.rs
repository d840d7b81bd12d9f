use reqwest::{header::CONTENT_TYPE, Method};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{GoogleClient, Result};
use crate::auth::AccessToken;

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
pub const DOCUMENT_MIME_TYPE: &str = "application/vnd.google-apps.document";
pub const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";
pub const FORM_MIME_TYPE: &str = "application/vnd.google-apps.form";

const FILE_FIELDS: &str = "id, name, mimeType, size, createdTime, modifiedTime, parents, \
     webViewLink, webContentLink, iconLink, thumbnailLink, starred, trashed, shared, \
     owners(displayName, emailAddress, photoLink)";
const DEFAULT_PAGE_SIZE: u32 = 50;
const DEFAULT_ORDER_BY: &str = "modifiedTime desc";
const UPLOAD_BOUNDARY: &str = "workspace_api_upload_boundary";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOwner {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_link: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_content_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starred: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trashed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owners: Option<Vec<FileOwner>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePage {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveFolder {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<String>>,
}

/// Minimal listing entry used for the Docs, Sheets and Forms pickers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummaryPage {
    #[serde(default)]
    pub files: Vec<FileSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageQuota {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_in_drive: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_in_drive_trash: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AboutResponse {
    #[serde(default)]
    storage_quota: StorageQuota,
}

#[derive(Debug, Clone, Default)]
pub struct ListFilesOptions {
    pub folder_id: Option<String>,
    pub query: Option<String>,
    pub mime_type: Option<String>,
    pub page_token: Option<String>,
    pub page_size: Option<u32>,
    pub order_by: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starred: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trashed: Option<bool>,
    #[serde(skip_serializing)]
    pub add_parents: Option<String>,
    #[serde(skip_serializing)]
    pub remove_parents: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
    pub parent_id: Option<String>,
}

/// Escapes a value for use inside a single-quoted Drive query literal.
pub fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Builds the `q` expression for a file listing. Trashed files are always
/// excluded.
pub fn build_file_query(options: &ListFilesOptions) -> String {
    let mut parts = Vec::new();
    if let Some(folder_id) = options.folder_id.as_deref().filter(|f| !f.is_empty()) {
        parts.push(format!("'{}' in parents", escape_query_literal(folder_id)));
    }
    if let Some(query) = options.query.as_deref().filter(|q| !q.is_empty()) {
        parts.push(format!("fullText contains '{}'", escape_query_literal(query)));
    }
    if let Some(mime_type) = options.mime_type.as_deref().filter(|m| !m.is_empty()) {
        parts.push(format!("mimeType = '{}'", escape_query_literal(mime_type)));
    }
    parts.push("trashed = false".to_string());
    parts.join(" and ")
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Assembles a `multipart/related` upload body and returns it with its boundary.
fn build_upload_body(upload: &Upload) -> (String, Vec<u8>) {
    let mut boundary = UPLOAD_BOUNDARY.to_string();
    while contains_bytes(&upload.content, boundary.as_bytes()) {
        boundary.push('_');
    }

    let mut metadata = json!({ "name": upload.name, "mimeType": upload.mime_type });
    if let Some(parent_id) = upload.parent_id.as_ref().filter(|p| !p.is_empty()) {
        metadata["parents"] = json!([parent_id]);
    }

    let mut body = Vec::with_capacity(upload.content.len() + 512);
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{m}\r\n--{b}\r\nContent-Type: {t}\r\n\r\n",
            b = boundary,
            m = metadata,
            t = upload.mime_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(&upload.content);
    body.extend_from_slice(format!("\r\n--{}--", boundary).as_bytes());

    (boundary, body)
}

pub struct DriveApi<'a> {
    google: &'a GoogleClient,
}

impl<'a> DriveApi<'a> {
    pub(super) fn new(google: &'a GoogleClient) -> Self {
        Self { google }
    }

    fn url(&self, segments: &[&str]) -> Result<url::Url> {
        self.google.url(&self.google.endpoints().drive, segments)
    }

    async fn query_files(
        &self,
        token: &AccessToken,
        q: &str,
        page_token: Option<&str>,
        page_size: u32,
        order_by: &str,
    ) -> Result<FilePage> {
        let mut params = vec![
            ("q", q.to_string()),
            ("fields", format!("nextPageToken, files({})", FILE_FIELDS)),
            ("pageSize", page_size.to_string()),
            ("orderBy", order_by.to_string()),
        ];
        if let Some(page_token) = page_token {
            params.push(("pageToken", page_token.to_string()));
        }

        let request = self
            .google
            .request(Method::GET, self.url(&["files"])?)
            .query(&params);
        self.google.fetch_json(token, request).await
    }

    pub async fn list_files(&self, token: &AccessToken, options: &ListFilesOptions) -> Result<FilePage> {
        self.query_files(
            token,
            &build_file_query(options),
            options.page_token.as_deref(),
            options.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            options.order_by.as_deref().unwrap_or(DEFAULT_ORDER_BY),
        )
        .await
    }

    pub async fn search_files(
        &self,
        token: &AccessToken,
        query: &str,
        page_token: Option<String>,
        page_size: Option<u32>,
    ) -> Result<FilePage> {
        self.list_files(
            token,
            &ListFilesOptions {
                query: Some(query.to_string()),
                page_token,
                page_size,
                ..Default::default()
            },
        )
        .await
    }

    pub async fn list_shared_with_me(
        &self,
        token: &AccessToken,
        page_token: Option<&str>,
        page_size: Option<u32>,
    ) -> Result<FilePage> {
        self.query_files(
            token,
            "sharedWithMe = true and trashed = false",
            page_token,
            page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            DEFAULT_ORDER_BY,
        )
        .await
    }

    pub async fn list_starred(
        &self,
        token: &AccessToken,
        page_token: Option<&str>,
        page_size: Option<u32>,
    ) -> Result<FilePage> {
        self.query_files(
            token,
            "starred = true and trashed = false",
            page_token,
            page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            DEFAULT_ORDER_BY,
        )
        .await
    }

    /// Lists non-trashed files of one Google editor type, newest first.
    pub async fn list_by_mime_type(
        &self,
        token: &AccessToken,
        mime_type: &str,
        page_token: Option<&str>,
        page_size: Option<u32>,
    ) -> Result<FileSummaryPage> {
        let mut params = vec![
            (
                "q",
                format!("mimeType = '{}' and trashed = false", escape_query_literal(mime_type)),
            ),
            ("fields", "nextPageToken, files(id, name, modifiedTime)".to_string()),
            ("pageSize", page_size.unwrap_or(DEFAULT_PAGE_SIZE).to_string()),
            ("orderBy", DEFAULT_ORDER_BY.to_string()),
        ];
        if let Some(page_token) = page_token {
            params.push(("pageToken", page_token.to_string()));
        }

        let request = self
            .google
            .request(Method::GET, self.url(&["files"])?)
            .query(&params);
        self.google.fetch_json(token, request).await
    }

    pub async fn get_file(&self, token: &AccessToken, file_id: &str) -> Result<DriveFile> {
        let request = self
            .google
            .request(Method::GET, self.url(&["files", file_id])?)
            .query(&[("fields", FILE_FIELDS)]);
        self.google.fetch_json(token, request).await
    }

    pub async fn create_folder(
        &self,
        token: &AccessToken,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<DriveFolder> {
        let mut metadata = json!({ "name": name, "mimeType": FOLDER_MIME_TYPE });
        if let Some(parent_id) = parent_id.filter(|p| !p.is_empty()) {
            metadata["parents"] = json!([parent_id]);
        }

        let request = self
            .google
            .request(Method::POST, self.url(&["files"])?)
            .query(&[("fields", "id, name, parents")])
            .json(&metadata);
        self.google.fetch_json(token, request).await
    }

    pub async fn upload_file(&self, token: &AccessToken, upload: &Upload) -> Result<DriveFile> {
        let (boundary, body) = build_upload_body(upload);
        let url = self
            .google
            .url(&self.google.endpoints().drive_upload, &["files"])?;

        let request = self
            .google
            .request(Method::POST, url)
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body);
        self.google.fetch_json(token, request).await
    }

    pub async fn update_file(
        &self,
        token: &AccessToken,
        file_id: &str,
        update: &FileUpdate,
    ) -> Result<DriveFile> {
        let mut params = vec![("fields", FILE_FIELDS.to_string())];
        if let Some(add) = update.add_parents.as_ref().filter(|p| !p.is_empty()) {
            params.push(("addParents", add.clone()));
        }
        if let Some(remove) = update.remove_parents.as_ref().filter(|p| !p.is_empty()) {
            params.push(("removeParents", remove.clone()));
        }

        let request = self
            .google
            .request(Method::PATCH, self.url(&["files", file_id])?)
            .query(&params)
            .json(update);
        self.google.fetch_json(token, request).await
    }

    pub async fn trash_file(&self, token: &AccessToken, file_id: &str) -> Result<()> {
        let update = FileUpdate {
            trashed: Some(true),
            ..Default::default()
        };
        self.update_file(token, file_id, &update).await.map(|_| ())
    }

    pub async fn delete_file(&self, token: &AccessToken, file_id: &str) -> Result<()> {
        let request = self
            .google
            .request(Method::DELETE, self.url(&["files", file_id])?);
        self.google.fetch_empty(token, request).await
    }

    pub async fn download_file(&self, token: &AccessToken, file_id: &str) -> Result<Vec<u8>> {
        let request = self
            .google
            .request(Method::GET, self.url(&["files", file_id])?)
            .query(&[("alt", "media")]);
        self.google.fetch_bytes(token, request).await
    }

    pub async fn storage_quota(&self, token: &AccessToken) -> Result<StorageQuota> {
        let request = self
            .google
            .request(Method::GET, self.url(&["about"])?)
            .query(&[("fields", "storageQuota")]);
        let about: AboutResponse = self.google.fetch_json(token, request).await?;
        Ok(about.storage_quota)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults_to_untrashed() {
        assert_eq!(build_file_query(&ListFilesOptions::default()), "trashed = false");
    }

    #[test]
    fn test_query_combines_filters() {
        let options = ListFilesOptions {
            folder_id: Some("folder123".to_string()),
            query: Some("budget".to_string()),
            mime_type: Some(SPREADSHEET_MIME_TYPE.to_string()),
            ..Default::default()
        };
        assert_eq!(
            build_file_query(&options),
            "'folder123' in parents and fullText contains 'budget' and \
             mimeType = 'application/vnd.google-apps.spreadsheet' and trashed = false"
        );
    }

    #[test]
    fn test_query_literals_are_escaped() {
        assert_eq!(escape_query_literal(r"it's a\b"), r"it\'s a\\b");

        let options = ListFilesOptions {
            query: Some("' or name contains '".to_string()),
            ..Default::default()
        };
        assert_eq!(
            build_file_query(&options),
            r"fullText contains '\' or name contains \'' and trashed = false"
        );
    }

    #[test]
    fn test_upload_body_layout() {
        let upload = Upload {
            name: "notes.txt".to_string(),
            mime_type: "text/plain".to_string(),
            content: b"hello".to_vec(),
            parent_id: Some("p1".to_string()),
        };

        let (boundary, body) = build_upload_body(&upload);
        let body = String::from_utf8(body).unwrap();

        assert_eq!(boundary, UPLOAD_BOUNDARY);
        assert!(body.starts_with(&format!("--{}\r\nContent-Type: application/json", boundary)));
        assert!(body.contains(r#""parents":["p1"]"#));
        assert!(body.contains("Content-Type: text/plain\r\n\r\nhello\r\n"));
        assert!(body.ends_with(&format!("--{}--", boundary)));
    }

    #[test]
    fn test_upload_boundary_avoids_content() {
        let upload = Upload {
            name: "tricky.txt".to_string(),
            mime_type: "text/plain".to_string(),
            content: format!("before {} after", UPLOAD_BOUNDARY).into_bytes(),
            parent_id: None,
        };

        let (boundary, _) = build_upload_body(&upload);
        assert_ne!(boundary, UPLOAD_BOUNDARY);
        assert!(!contains_bytes(&upload.content, boundary.as_bytes()));
    }

    #[test]
    fn test_update_body_excludes_parent_moves() {
        let update = FileUpdate {
            name: Some("renamed".to_string()),
            add_parents: Some("new".to_string()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"name": "renamed"}));
    }
}
