use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{flag, success, PageParams};
use crate::auth::AccessToken;
use crate::error::{ApiError, UpstreamContext};
use crate::extract::{non_empty, JsonBody, QueryParams};
use crate::google::drive::{DriveFile, FilePage, FileUpdate, ListFilesOptions, StorageQuota, Upload};
use crate::AppState;

const FALLBACK_UPLOAD_MIME: &str = "application/octet-stream";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesParams {
    folder_id: Option<String>,
    q: Option<String>,
    page_token: Option<String>,
    page_size: Option<u32>,
    mime_type: Option<String>,
}

pub async fn list_files(
    State(state): State<AppState>,
    token: AccessToken,
    QueryParams(params): QueryParams<ListFilesParams>,
) -> Result<Json<FilePage>, ApiError> {
    let drive = state.google.drive();
    let page_token = non_empty(params.page_token);

    let page = match non_empty(params.q) {
        Some(query) => drive
            .search_files(&token, &query, page_token, params.page_size)
            .await,
        None => {
            let options = ListFilesOptions {
                folder_id: non_empty(params.folder_id),
                mime_type: non_empty(params.mime_type),
                page_token,
                page_size: params.page_size,
                ..Default::default()
            };
            drive.list_files(&token, &options).await
        }
    };

    Ok(Json(page.or_upstream("Failed to fetch files")?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    name: Option<String>,
    parent_id: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Multipart bodies upload a file; JSON bodies create a folder.
pub async fn create_file(
    State(state): State<AppState>,
    token: AccessToken,
    request: Request,
) -> Result<Response, ApiError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"));

    if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|rejection| {
                ApiError::bad_request(format!("Invalid upload: {}", rejection.body_text()))
            })?;
        let upload = read_upload(multipart).await?;

        let file = state
            .google
            .drive()
            .upload_file(&token, &upload)
            .await
            .or_upstream("Failed to create file/folder")?;

        info!(file_id = %file.id, size = upload.content.len(), "File uploaded");
        return Ok(Json(file).into_response());
    }

    let JsonBody(body) = JsonBody::<CreateFolderRequest>::from_request(request, &state).await?;
    let Some(name) = non_empty(body.name) else {
        return Err(ApiError::bad_request("Name is required"));
    };
    if body.kind.as_deref() != Some("folder") {
        return Err(ApiError::bad_request("Invalid request type"));
    }

    let folder = state
        .google
        .drive()
        .create_folder(&token, &name, body.parent_id.as_deref())
        .await
        .or_upstream("Failed to create file/folder")?;
    Ok(Json(folder).into_response())
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut parent_id = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request(format!("Invalid upload: {}", err.body_text())))?
    {
        match field.name() {
            Some("file") => {
                let name = field.file_name().unwrap_or("untitled").to_string();
                let mime_type = field
                    .content_type()
                    .filter(|ct| !ct.is_empty())
                    .unwrap_or(FALLBACK_UPLOAD_MIME)
                    .to_string();
                let bytes = field.bytes().await.map_err(|err| {
                    ApiError::bad_request(format!("Invalid upload: {}", err.body_text()))
                })?;
                file = Some((name, mime_type, bytes.to_vec()));
            }
            Some("parentId") => {
                let text = field.text().await.map_err(|err| {
                    ApiError::bad_request(format!("Invalid upload: {}", err.body_text()))
                })?;
                parent_id = non_empty(Some(text));
            }
            _ => {}
        }
    }

    let Some((name, mime_type, content)) = file else {
        return Err(ApiError::bad_request("No file provided"));
    };

    Ok(Upload {
        name,
        mime_type,
        content,
        parent_id,
    })
}

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    download: Option<String>,
}

pub async fn get_file(
    State(state): State<AppState>,
    token: AccessToken,
    Path(file_id): Path<String>,
    QueryParams(params): QueryParams<DownloadParams>,
) -> Result<Response, ApiError> {
    let drive = state.google.drive();

    if !flag(&params.download) {
        let file = drive
            .get_file(&token, &file_id)
            .await
            .or_upstream("Failed to fetch file")?;
        return Ok(Json(file).into_response());
    }

    let (file, content) = tokio::try_join!(
        drive.get_file(&token, &file_id),
        drive.download_file(&token, &file_id),
    )
    .or_upstream("Failed to fetch file")?;

    Ok(download_response(&file, content))
}

fn download_response(file: &DriveFile, content: Vec<u8>) -> Response {
    let mime_type = if file.mime_type.is_empty() {
        FALLBACK_UPLOAD_MIME.to_string()
    } else {
        file.mime_type.clone()
    };
    let disposition = format!(
        "attachment; filename=\"{}\"",
        header_safe_filename(&file.name)
    );

    (
        [(CONTENT_TYPE, mime_type), (CONTENT_DISPOSITION, disposition)],
        content,
    )
        .into_response()
}

/// Keeps the filename inside a quoted header parameter.
fn header_safe_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}

pub async fn update_file(
    State(state): State<AppState>,
    token: AccessToken,
    Path(file_id): Path<String>,
    JsonBody(update): JsonBody<FileUpdate>,
) -> Result<Json<DriveFile>, ApiError> {
    let file = state
        .google
        .drive()
        .update_file(&token, &file_id, &update)
        .await
        .or_upstream("Failed to update file")?;
    Ok(Json(file))
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    permanent: Option<String>,
}

pub async fn delete_file(
    State(state): State<AppState>,
    token: AccessToken,
    Path(file_id): Path<String>,
    QueryParams(params): QueryParams<DeleteParams>,
) -> Result<Json<Value>, ApiError> {
    let drive = state.google.drive();
    let permanent = flag(&params.permanent);

    let result = if permanent {
        drive.delete_file(&token, &file_id).await
    } else {
        drive.trash_file(&token, &file_id).await
    };
    result.or_upstream("Failed to delete file")?;

    info!(file_id = %file_id, permanent, "File removed");
    Ok(success())
}

pub async fn list_shared(
    State(state): State<AppState>,
    token: AccessToken,
    QueryParams(params): QueryParams<PageParams>,
) -> Result<Json<FilePage>, ApiError> {
    let page_token = non_empty(params.page_token);
    let page = state
        .google
        .drive()
        .list_shared_with_me(&token, page_token.as_deref(), params.page_size)
        .await
        .or_upstream("Failed to fetch shared files")?;
    Ok(Json(page))
}

pub async fn list_starred(
    State(state): State<AppState>,
    token: AccessToken,
    QueryParams(params): QueryParams<PageParams>,
) -> Result<Json<FilePage>, ApiError> {
    let page_token = non_empty(params.page_token);
    let page = state
        .google
        .drive()
        .list_starred(&token, page_token.as_deref(), params.page_size)
        .await
        .or_upstream("Failed to fetch starred files")?;
    Ok(Json(page))
}

pub async fn storage_quota(
    State(state): State<AppState>,
    token: AccessToken,
) -> Result<Json<StorageQuota>, ApiError> {
    let quota = state
        .google
        .drive()
        .storage_quota(&token)
        .await
        .or_upstream("Failed to fetch storage quota")?;
    Ok(Json(quota))
}
