use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{flag, success, PageParams};
use crate::auth::AccessToken;
use crate::error::{ApiError, UpstreamContext};
use crate::extract::{non_empty, parse_action, JsonBody, QueryParams};
use crate::google::drive::FileSummaryPage;
use crate::google::forms::{Form, FormInfoUpdate, FormResponse, NewQuestion, QuestionKind, ScaleConfig};
use crate::AppState;

pub async fn list_forms(
    State(state): State<AppState>,
    token: AccessToken,
    QueryParams(params): QueryParams<PageParams>,
) -> Result<Json<FileSummaryPage>, ApiError> {
    let page_token = non_empty(params.page_token);
    let page = state
        .google
        .forms()
        .list_forms(&token, page_token.as_deref(), params.page_size)
        .await
        .or_upstream("Failed to fetch forms")?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFormRequest {
    title: Option<String>,
    document_title: Option<String>,
}

pub async fn create_form(
    State(state): State<AppState>,
    token: AccessToken,
    JsonBody(request): JsonBody<CreateFormRequest>,
) -> Result<Json<Form>, ApiError> {
    let Some(title) = non_empty(request.title) else {
        return Err(ApiError::bad_request("Title is required"));
    };
    let document_title = non_empty(request.document_title);

    let form = state
        .google
        .forms()
        .create_form(&token, &title, document_title.as_deref())
        .await
        .or_upstream("Failed to create form")?;
    Ok(Json(form))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormParams {
    responses: Option<String>,
    page_token: Option<String>,
    page_size: Option<u32>,
}

/// `?responses=true` lists submissions instead of returning the form.
pub async fn get_form(
    State(state): State<AppState>,
    token: AccessToken,
    Path(form_id): Path<String>,
    QueryParams(params): QueryParams<FormParams>,
) -> Result<Response, ApiError> {
    let forms = state.google.forms();

    if flag(&params.responses) {
        let page_token = non_empty(params.page_token);
        let page = forms
            .list_responses(&token, &form_id, page_token.as_deref(), params.page_size)
            .await
            .or_upstream("Failed to fetch form")?;
        return Ok(Json(page).into_response());
    }

    let form = forms
        .get_form(&token, &form_id)
        .await
        .or_upstream("Failed to fetch form")?;
    Ok(Json(form).into_response())
}

#[derive(Debug, Deserialize)]
pub struct UpdateFormRequest {
    title: Option<String>,
    description: Option<String>,
}

pub async fn update_form(
    State(state): State<AppState>,
    token: AccessToken,
    Path(form_id): Path<String>,
    JsonBody(request): JsonBody<UpdateFormRequest>,
) -> Result<Json<Value>, ApiError> {
    let update = FormInfoUpdate {
        title: request.title,
        description: request.description,
    };

    let changed = state
        .google
        .forms()
        .update_info(&token, &form_id, &update)
        .await
        .or_upstream("Failed to update form")?;
    if !changed {
        debug!(form_id = %form_id, "Form update named no fields");
    }

    Ok(success())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionInput {
    title: Option<String>,
    description: Option<String>,
    #[serde(default)]
    required: bool,
    #[serde(rename = "type")]
    kind: Option<QuestionKind>,
    #[serde(default)]
    options: Vec<String>,
    scale_config: Option<ScaleConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
enum FormAction {
    AddQuestion {
        question: Option<QuestionInput>,
        index: Option<u32>,
    },
}

pub async fn form_action(
    State(state): State<AppState>,
    token: AccessToken,
    Path(form_id): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, ApiError> {
    let FormAction::AddQuestion { question, index } = parse_action::<FormAction>(body)?;

    let question = question.unwrap_or_default();
    let (Some(title), Some(kind)) = (non_empty(question.title), question.kind) else {
        return Err(ApiError::bad_request("Question title and type are required"));
    };

    let new_question = NewQuestion {
        title,
        kind,
        description: question.description,
        required: question.required,
        options: question.options,
        scale: question.scale_config,
    };

    state
        .google
        .forms()
        .add_question(&token, &form_id, &new_question, index.unwrap_or(0))
        .await
        .or_upstream("Failed to perform form action")?;

    Ok(success())
}

pub async fn get_response(
    State(state): State<AppState>,
    token: AccessToken,
    Path((form_id, response_id)): Path<(String, String)>,
) -> Result<Json<FormResponse>, ApiError> {
    let response = state
        .google
        .forms()
        .get_response(&token, &form_id, &response_id)
        .await
        .or_upstream("Failed to fetch form response")?;
    Ok(Json(response))
}
