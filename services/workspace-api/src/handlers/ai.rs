use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::assistant::{
    Categorization, EmailAnalysis, EmailContext, OrganizationPlan, ReplyTone, SecurityScan, SlotRange,
};
use crate::auth::AccessToken;
use crate::error::{ApiError, UpstreamContext};
use crate::extract::{non_empty, parse_action, JsonBody};
use crate::AppState;

/// Email fields posted by the email-level AI routes.
#[derive(Debug, Deserialize)]
pub struct EmailInput {
    subject: Option<String>,
    from: Option<String>,
    to: Option<String>,
    body: Option<String>,
    date: Option<String>,
}

impl EmailInput {
    fn into_context(self) -> Result<EmailContext, ApiError> {
        let (Some(subject), Some(from), Some(body)) = (
            non_empty(self.subject),
            non_empty(self.from),
            non_empty(self.body),
        ) else {
            return Err(ApiError::bad_request("Missing required fields"));
        };

        Ok(EmailContext {
            subject,
            from,
            body,
            to: self.to.unwrap_or_default(),
            date: non_empty(self.date)
                .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        })
    }
}

pub async fn summarize(
    State(state): State<AppState>,
    _token: AccessToken,
    JsonBody(input): JsonBody<EmailInput>,
) -> Result<Json<Value>, ApiError> {
    let email = input.into_context()?;
    let summary = state
        .assistant
        .summarize_email(&email)
        .await
        .or_upstream("Failed to summarize email")?;
    Ok(Json(json!({ "summary": summary })))
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    #[serde(flatten)]
    email: EmailInput,
    tone: Option<ReplyTone>,
    instructions: Option<String>,
}

pub async fn reply(
    State(state): State<AppState>,
    _token: AccessToken,
    JsonBody(request): JsonBody<ReplyRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = request.email.into_context()?;
    let instructions = non_empty(request.instructions);
    let reply = state
        .assistant
        .draft_reply(&email, request.tone.unwrap_or_default(), instructions.as_deref())
        .await
        .or_upstream("Failed to generate reply")?;
    Ok(Json(json!({ "reply": reply })))
}

pub async fn categorize(
    State(state): State<AppState>,
    _token: AccessToken,
    JsonBody(input): JsonBody<EmailInput>,
) -> Result<Json<Categorization>, ApiError> {
    let email = input.into_context()?;
    let categorization = state
        .assistant
        .categorize_email(&email)
        .await
        .or_upstream("Failed to categorize email")?;
    Ok(Json(categorization))
}

pub async fn actions(
    State(state): State<AppState>,
    _token: AccessToken,
    JsonBody(input): JsonBody<EmailInput>,
) -> Result<Json<Value>, ApiError> {
    let email = input.into_context()?;
    let actions = state
        .assistant
        .extract_action_items(&email)
        .await
        .or_upstream("Failed to extract action items")?;
    Ok(Json(json!({ "actions": actions })))
}

pub async fn analyze(
    State(state): State<AppState>,
    _token: AccessToken,
    JsonBody(input): JsonBody<EmailInput>,
) -> Result<Json<EmailAnalysis>, ApiError> {
    let email = input.into_context()?;
    let analysis = state
        .assistant
        .analyze_email(&email)
        .await
        .or_upstream("Failed to analyze email")?;
    Ok(Json(analysis))
}

pub async fn security(
    State(state): State<AppState>,
    _token: AccessToken,
    JsonBody(input): JsonBody<EmailInput>,
) -> Result<Json<SecurityScan>, ApiError> {
    let email = input.into_context()?;
    let scan = state
        .assistant
        .scan_security(&email)
        .await
        .or_upstream("Failed to scan email")?;
    Ok(Json(scan))
}

#[derive(Debug, Deserialize)]
pub struct ImproveRequest {
    draft: Option<String>,
    instructions: Option<String>,
}

pub async fn improve(
    State(state): State<AppState>,
    _token: AccessToken,
    JsonBody(request): JsonBody<ImproveRequest>,
) -> Result<Json<Value>, ApiError> {
    let Some(draft) = non_empty(request.draft) else {
        return Err(ApiError::bad_request("Missing draft content"));
    };
    let instructions = non_empty(request.instructions);

    let improved = state
        .assistant
        .improve_draft(&draft, instructions.as_deref())
        .await
        .or_upstream("Failed to improve draft")?;
    Ok(Json(json!({ "improved": improved })))
}

/// JSON `null` counts as absent for free-form context fields.
fn present(value: Option<Value>) -> Option<Value> {
    value.filter(|v| !v.is_null())
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
enum CalendarAction {
    #[serde(rename_all = "camelCase")]
    SuggestTime {
        description: Option<String>,
        free_slots: Option<Vec<SlotRange>>,
        preferences: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    GenerateAgenda { meeting_context: Option<Value> },
}

pub async fn calendar(
    State(state): State<AppState>,
    _token: AccessToken,
    JsonBody(body): JsonBody<Value>,
) -> Result<Response, ApiError> {
    const FAILED: &str = "Failed to process calendar AI request";

    match parse_action::<CalendarAction>(body)? {
        CalendarAction::SuggestTime {
            description,
            free_slots,
            preferences,
        } => {
            let (Some(description), Some(free_slots)) = (non_empty(description), free_slots) else {
                return Err(ApiError::bad_request("Description and freeSlots are required"));
            };
            let preferences = non_empty(preferences);
            let suggestion = state
                .assistant
                .suggest_meeting_time(&description, &free_slots, preferences.as_deref())
                .await
                .or_upstream(FAILED)?;
            Ok(Json(suggestion).into_response())
        }
        CalendarAction::GenerateAgenda { meeting_context } => {
            let Some(meeting_context) = present(meeting_context) else {
                return Err(ApiError::bad_request("Meeting context is required"));
            };
            let agenda = state
                .assistant
                .meeting_agenda(&meeting_context)
                .await
                .or_upstream(FAILED)?;
            Ok(Json(json!({ "agenda": agenda })).into_response())
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
enum DocsAction {
    Summarize { content: Option<String> },
}

pub async fn docs(
    State(state): State<AppState>,
    _token: AccessToken,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, ApiError> {
    let DocsAction::Summarize { content } = parse_action::<DocsAction>(body)?;
    let Some(content) = non_empty(content) else {
        return Err(ApiError::bad_request("Content is required"));
    };

    let summary = state
        .assistant
        .summarize_document(&content)
        .await
        .or_upstream("Failed to process document AI request")?;
    Ok(Json(json!({ "summary": summary })))
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
enum SheetsAction {
    Analyze {
        headers: Option<Vec<Value>>,
        data: Option<Vec<Vec<Value>>>,
        question: Option<String>,
    },
}

pub async fn sheets(
    State(state): State<AppState>,
    _token: AccessToken,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, ApiError> {
    let SheetsAction::Analyze {
        headers,
        data,
        question,
    } = parse_action::<SheetsAction>(body)?;
    let (Some(headers), Some(data), Some(question)) = (headers, data, non_empty(question)) else {
        return Err(ApiError::bad_request(
            "Headers, data, and question are required",
        ));
    };

    let analysis = state
        .assistant
        .analyze_spreadsheet(&headers, &data, &question)
        .await
        .or_upstream("Failed to process spreadsheet AI request")?;
    Ok(Json(json!({ "analysis": analysis })))
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
enum FormsAction {
    #[serde(rename_all = "camelCase")]
    GenerateQuestions {
        topic: Option<String>,
        purpose: Option<String>,
        question_count: Option<u32>,
    },
    AnalyzeResponses {
        questions: Option<Value>,
        responses: Option<Value>,
    },
}

pub async fn forms(
    State(state): State<AppState>,
    _token: AccessToken,
    JsonBody(body): JsonBody<Value>,
) -> Result<Response, ApiError> {
    const FAILED: &str = "Failed to process forms AI request";

    match parse_action::<FormsAction>(body)? {
        FormsAction::GenerateQuestions {
            topic,
            purpose,
            question_count,
        } => {
            let (Some(topic), Some(purpose)) = (non_empty(topic), non_empty(purpose)) else {
                return Err(ApiError::bad_request("Topic and purpose are required"));
            };
            let form = state
                .assistant
                .generate_form_questions(&topic, &purpose, question_count)
                .await
                .or_upstream(FAILED)?;
            Ok(Json(form).into_response())
        }
        FormsAction::AnalyzeResponses {
            questions,
            responses,
        } => {
            let (Some(questions), Some(responses)) = (present(questions), present(responses)) else {
                return Err(ApiError::bad_request("Questions and responses are required"));
            };
            let analysis = state
                .assistant
                .analyze_form_responses(&questions, &responses)
                .await
                .or_upstream(FAILED)?;
            Ok(Json(analysis).into_response())
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
enum DriveAction {
    Organize { files: Option<Value> },
}

pub async fn drive(
    State(state): State<AppState>,
    _token: AccessToken,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<OrganizationPlan>, ApiError> {
    let DriveAction::Organize { files } = parse_action::<DriveAction>(body)?;
    let Some(files) = files.as_ref().and_then(Value::as_array) else {
        return Err(ApiError::bad_request("Files array is required"));
    };

    let plan = state
        .assistant
        .suggest_file_organization(files)
        .await
        .or_upstream("Failed to process drive AI request")?;
    Ok(Json(plan))
}
