use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::success;
use crate::auth::AccessToken;
use crate::error::{ApiError, UpstreamContext};
use crate::extract::{non_empty, JsonBody, QueryParams};
use crate::google::gmail::{
    AttachmentData, EmailMessage, EmailPage, Label, ListMessagesOptions, OutgoingEmail, SentMessage,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMessagesParams {
    max_results: Option<u32>,
    page_token: Option<String>,
    label_ids: Option<String>,
    q: Option<String>,
}

pub async fn list_messages(
    State(state): State<AppState>,
    token: AccessToken,
    QueryParams(params): QueryParams<ListMessagesParams>,
) -> Result<Json<EmailPage>, ApiError> {
    let options = ListMessagesOptions {
        max_results: params.max_results,
        page_token: non_empty(params.page_token),
        label_ids: params
            .label_ids
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect(),
        query: non_empty(params.q),
    };

    let page = state
        .google
        .gmail()
        .list_messages(&token, &options)
        .await
        .or_upstream("Failed to fetch messages")?;
    Ok(Json(page))
}

pub async fn get_message(
    State(state): State<AppState>,
    token: AccessToken,
    Path(message_id): Path<String>,
) -> Result<Json<EmailMessage>, ApiError> {
    let message = state
        .google
        .gmail()
        .get_message(&token, &message_id)
        .await
        .or_upstream("Failed to fetch message")?;
    Ok(Json(message))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModifyMessageRequest {
    add_label_ids: Vec<String>,
    remove_label_ids: Vec<String>,
    read: Option<bool>,
}

pub async fn modify_message(
    State(state): State<AppState>,
    token: AccessToken,
    Path(message_id): Path<String>,
    JsonBody(request): JsonBody<ModifyMessageRequest>,
) -> Result<Json<Value>, ApiError> {
    let gmail = state.google.gmail();
    let has_label_changes = !request.add_label_ids.is_empty() || !request.remove_label_ids.is_empty();

    if !has_label_changes && request.read.is_none() {
        return Err(ApiError::bad_request("No label changes requested"));
    }

    let read_update = match request.read {
        Some(true) => gmail.mark_as_read(&token, &message_id).await,
        Some(false) => gmail.mark_as_unread(&token, &message_id).await,
        None => Ok(()),
    };
    read_update.or_upstream("Failed to update message")?;

    if has_label_changes {
        gmail
            .modify_labels(
                &token,
                &message_id,
                &request.add_label_ids,
                &request.remove_label_ids,
            )
            .await
            .or_upstream("Failed to update message")?;
    }

    Ok(success())
}

pub async fn trash_message(
    State(state): State<AppState>,
    token: AccessToken,
    Path(message_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .google
        .gmail()
        .trash_message(&token, &message_id)
        .await
        .or_upstream("Failed to delete message")?;
    Ok(success())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    to: Option<String>,
    cc: Option<String>,
    bcc: Option<String>,
    subject: Option<String>,
    body: Option<String>,
    thread_id: Option<String>,
    in_reply_to: Option<String>,
    references: Option<String>,
}

pub async fn send_message(
    State(state): State<AppState>,
    token: AccessToken,
    JsonBody(request): JsonBody<SendMessageRequest>,
) -> Result<Json<SentMessage>, ApiError> {
    let (Some(to), Some(subject), Some(body)) = (
        non_empty(request.to),
        non_empty(request.subject),
        non_empty(request.body),
    ) else {
        return Err(ApiError::bad_request(
            "Missing required fields: to, subject, body",
        ));
    };

    let email = OutgoingEmail {
        to,
        cc: request.cc,
        bcc: request.bcc,
        subject,
        body,
        in_reply_to: request.in_reply_to,
        references: request.references,
        thread_id: request.thread_id,
    };

    let sent = state
        .google
        .gmail()
        .send_message(&token, &email)
        .await
        .or_upstream("Failed to send message")?;

    info!(message_id = %sent.id, "Message sent");
    Ok(Json(sent))
}

pub async fn list_labels(
    State(state): State<AppState>,
    token: AccessToken,
) -> Result<Json<Vec<Label>>, ApiError> {
    let labels = state
        .google
        .gmail()
        .list_labels(&token)
        .await
        .or_upstream("Failed to fetch labels")?;
    Ok(Json(labels))
}

pub async fn get_attachment(
    State(state): State<AppState>,
    token: AccessToken,
    Path((message_id, attachment_id)): Path<(String, String)>,
) -> Result<Json<AttachmentData>, ApiError> {
    let attachment = state
        .google
        .gmail()
        .get_attachment(&token, &message_id, &attachment_id)
        .await
        .or_upstream("Failed to fetch attachment")?;
    Ok(Json(attachment))
}
