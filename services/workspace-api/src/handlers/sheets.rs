use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use super::{success, PageParams};
use crate::auth::AccessToken;
use crate::error::{ApiError, UpstreamContext};
use crate::extract::{non_empty, parse_action, JsonBody, QueryParams};
use crate::google::drive::FileSummaryPage;
use crate::google::sheets::{CellValues, Spreadsheet, UpdateResult, ValueInputOption};
use crate::AppState;

const ACTION_FAILED: &str = "Failed to perform spreadsheet action";

pub async fn list_spreadsheets(
    State(state): State<AppState>,
    token: AccessToken,
    QueryParams(params): QueryParams<PageParams>,
) -> Result<Json<FileSummaryPage>, ApiError> {
    let page_token = non_empty(params.page_token);
    let page = state
        .google
        .sheets()
        .list_spreadsheets(&token, page_token.as_deref(), params.page_size)
        .await
        .or_upstream("Failed to fetch spreadsheets")?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSpreadsheetRequest {
    title: Option<String>,
    #[serde(default)]
    sheet_titles: Vec<String>,
}

pub async fn create_spreadsheet(
    State(state): State<AppState>,
    token: AccessToken,
    JsonBody(request): JsonBody<CreateSpreadsheetRequest>,
) -> Result<Json<Spreadsheet>, ApiError> {
    let Some(title) = non_empty(request.title) else {
        return Err(ApiError::bad_request("Title is required"));
    };

    let spreadsheet = state
        .google
        .sheets()
        .create_spreadsheet(&token, &title, &request.sheet_titles)
        .await
        .or_upstream("Failed to create spreadsheet")?;
    Ok(Json(spreadsheet))
}

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    range: Option<String>,
}

/// With `?range=` returns cell values, otherwise spreadsheet metadata.
pub async fn get_spreadsheet(
    State(state): State<AppState>,
    token: AccessToken,
    Path(spreadsheet_id): Path<String>,
    QueryParams(params): QueryParams<RangeParams>,
) -> Result<Response, ApiError> {
    let sheets = state.google.sheets();

    match non_empty(params.range) {
        Some(range) => {
            let data = sheets
                .get_values(&token, &spreadsheet_id, &range)
                .await
                .or_upstream("Failed to fetch spreadsheet")?;
            Ok(Json(data).into_response())
        }
        None => {
            let spreadsheet = sheets
                .get_spreadsheet(&token, &spreadsheet_id)
                .await
                .or_upstream("Failed to fetch spreadsheet")?;
            Ok(Json(spreadsheet).into_response())
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateValuesRequest {
    range: Option<String>,
    values: Option<CellValues>,
    input_option: Option<ValueInputOption>,
}

pub async fn update_values(
    State(state): State<AppState>,
    token: AccessToken,
    Path(spreadsheet_id): Path<String>,
    JsonBody(request): JsonBody<UpdateValuesRequest>,
) -> Result<Json<UpdateResult>, ApiError> {
    let (Some(range), Some(values)) = (non_empty(request.range), request.values) else {
        return Err(ApiError::bad_request("Range and values are required"));
    };

    let result = state
        .google
        .sheets()
        .update_values(
            &token,
            &spreadsheet_id,
            &range,
            &values,
            request.input_option.unwrap_or_default(),
        )
        .await
        .or_upstream("Failed to update spreadsheet")?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
enum SpreadsheetAction {
    #[serde(rename_all = "camelCase")]
    Append {
        range: Option<String>,
        values: Option<CellValues>,
        input_option: Option<ValueInputOption>,
    },
    Clear {
        range: Option<String>,
    },
    AddSheet {
        title: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    DeleteSheet {
        sheet_id: Option<i64>,
    },
    #[serde(rename_all = "camelCase")]
    RenameSheet {
        sheet_id: Option<i64>,
        title: Option<String>,
    },
}

pub async fn spreadsheet_action(
    State(state): State<AppState>,
    token: AccessToken,
    Path(spreadsheet_id): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Response, ApiError> {
    let sheets = state.google.sheets();

    let response = match parse_action::<SpreadsheetAction>(body)? {
        SpreadsheetAction::Append {
            range,
            values,
            input_option,
        } => {
            let (Some(range), Some(values)) = (non_empty(range), values) else {
                return Err(ApiError::bad_request(
                    "Range and values are required for append",
                ));
            };
            let result = sheets
                .append_values(
                    &token,
                    &spreadsheet_id,
                    &range,
                    &values,
                    input_option.unwrap_or_default(),
                )
                .await
                .or_upstream(ACTION_FAILED)?;
            Json(result).into_response()
        }
        SpreadsheetAction::Clear { range } => {
            let Some(range) = non_empty(range) else {
                return Err(ApiError::bad_request("Range is required for clear"));
            };
            let result = sheets
                .clear_values(&token, &spreadsheet_id, &range)
                .await
                .or_upstream(ACTION_FAILED)?;
            Json(result).into_response()
        }
        SpreadsheetAction::AddSheet { title } => {
            let Some(title) = non_empty(title) else {
                return Err(ApiError::bad_request("Title is required for addSheet"));
            };
            let sheet = sheets
                .add_sheet(&token, &spreadsheet_id, &title)
                .await
                .or_upstream(ACTION_FAILED)?;
            Json(sheet).into_response()
        }
        SpreadsheetAction::DeleteSheet { sheet_id } => {
            let Some(sheet_id) = sheet_id else {
                return Err(ApiError::bad_request("SheetId is required for deleteSheet"));
            };
            sheets
                .delete_sheet(&token, &spreadsheet_id, sheet_id)
                .await
                .or_upstream(ACTION_FAILED)?;
            success().into_response()
        }
        SpreadsheetAction::RenameSheet { sheet_id, title } => {
            let (Some(sheet_id), Some(title)) = (sheet_id, non_empty(title)) else {
                return Err(ApiError::bad_request(
                    "SheetId and title are required for renameSheet",
                ));
            };
            sheets
                .rename_sheet(&token, &spreadsheet_id, sheet_id, &title)
                .await
                .or_upstream(ACTION_FAILED)?;
            success().into_response()
        }
    };

    Ok(response)
}
