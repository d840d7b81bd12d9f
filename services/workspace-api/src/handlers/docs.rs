use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use super::{flag, success, PageParams};
use crate::auth::AccessToken;
use crate::error::{ApiError, UpstreamContext};
use crate::extract::{non_empty, parse_action, JsonBody, QueryParams};
use crate::google::docs::Document;
use crate::google::drive::FileSummaryPage;
use crate::AppState;

pub async fn list_documents(
    State(state): State<AppState>,
    token: AccessToken,
    QueryParams(params): QueryParams<PageParams>,
) -> Result<Json<FileSummaryPage>, ApiError> {
    let page_token = non_empty(params.page_token);
    let page = state
        .google
        .docs()
        .list_documents(&token, page_token.as_deref(), params.page_size)
        .await
        .or_upstream("Failed to fetch documents")?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    title: Option<String>,
    content: Option<String>,
}

pub async fn create_document(
    State(state): State<AppState>,
    token: AccessToken,
    JsonBody(request): JsonBody<CreateDocumentRequest>,
) -> Result<Json<Document>, ApiError> {
    let Some(title) = non_empty(request.title) else {
        return Err(ApiError::bad_request("Title is required"));
    };

    let document = state
        .google
        .docs()
        .create_document(&token, &title, request.content.as_deref())
        .await
        .or_upstream("Failed to create document")?;
    Ok(Json(document))
}

#[derive(Debug, Deserialize)]
pub struct DocumentParams {
    content: Option<String>,
}

/// `?content=true` returns the structured paragraph view instead of the
/// plain document.
pub async fn get_document(
    State(state): State<AppState>,
    token: AccessToken,
    Path(document_id): Path<String>,
    QueryParams(params): QueryParams<DocumentParams>,
) -> Result<Response, ApiError> {
    let docs = state.google.docs();

    if flag(&params.content) {
        let content = docs
            .get_content(&token, &document_id)
            .await
            .or_upstream("Failed to fetch document")?;
        return Ok(Json(content).into_response());
    }

    let document = docs
        .get_document(&token, &document_id)
        .await
        .or_upstream("Failed to fetch document")?;
    Ok(Json(document).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
enum DocumentAction {
    Append {
        text: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Replace {
        search_text: Option<String>,
        replace_text: Option<String>,
        match_case: Option<bool>,
    },
}

pub async fn document_action(
    State(state): State<AppState>,
    token: AccessToken,
    Path(document_id): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, ApiError> {
    let docs = state.google.docs();

    match parse_action::<DocumentAction>(body)? {
        DocumentAction::Append { text } => {
            let Some(text) = non_empty(text) else {
                return Err(ApiError::bad_request("Text is required for append"));
            };
            docs.append_text(&token, &document_id, &text)
                .await
                .or_upstream("Failed to perform document action")?;
        }
        DocumentAction::Replace {
            search_text,
            replace_text,
            match_case,
        } => {
            let (Some(search_text), Some(replace_text)) = (non_empty(search_text), replace_text)
            else {
                return Err(ApiError::bad_request(
                    "searchText and replaceText are required for replace",
                ));
            };
            docs.replace_text(
                &token,
                &document_id,
                &search_text,
                &replace_text,
                match_case.unwrap_or(false),
            )
            .await
            .or_upstream("Failed to perform document action")?;
        }
    }

    Ok(success())
}
