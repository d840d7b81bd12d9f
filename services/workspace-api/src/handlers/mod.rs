pub mod ai;
pub mod calendar;
pub mod docs;
pub mod drive;
pub mod forms;
pub mod gmail;
pub mod sheets;

use axum::{response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::{json, Value};

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "workspace-api"
    }))
}

pub(crate) fn success() -> Json<Value> {
    Json(json!({ "success": true }))
}

/// `pageToken` / `pageSize` query pair shared by the picker listings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub page_token: Option<String>,
    pub page_size: Option<u32>,
}

/// Accepts `true` for flags like `?download=true`; anything else is off.
pub(crate) fn flag(value: &Option<String>) -> bool {
    value.as_deref() == Some("true")
}
