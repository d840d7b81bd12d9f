use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use super::drive::{FileSummaryPage, FORM_MIME_TYPE};
use super::{GoogleClient, Result};
use crate::auth::AccessToken;

const DEFAULT_RESPONSE_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionKind {
    ShortText,
    Paragraph,
    MultipleChoice,
    Checkboxes,
    Dropdown,
    Scale,
    Date,
    Time,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleConfig {
    pub low: Option<i64>,
    pub high: Option<i64>,
    pub low_label: Option<String>,
    pub high_label: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub title: String,
    pub kind: QuestionKind,
    pub description: Option<String>,
    pub required: bool,
    pub options: Vec<String>,
    pub scale: Option<ScaleConfig>,
}

/// Builds the Forms API `question` object for a new item.
pub fn question_body(question: &NewQuestion) -> Value {
    let choice = |kind: &str| {
        json!({
            "type": kind,
            "options": question.options.iter().map(|o| json!({ "value": o })).collect::<Vec<_>>(),
        })
    };

    let (key, config) = match question.kind {
        QuestionKind::ShortText => ("textQuestion", json!({ "paragraph": false })),
        QuestionKind::Paragraph => ("textQuestion", json!({ "paragraph": true })),
        QuestionKind::MultipleChoice => ("choiceQuestion", choice("RADIO")),
        QuestionKind::Checkboxes => ("choiceQuestion", choice("CHECKBOX")),
        QuestionKind::Dropdown => ("choiceQuestion", choice("DROP_DOWN")),
        QuestionKind::Scale => {
            let scale = question.scale.clone().unwrap_or_default();
            let mut config = json!({
                "low": scale.low.unwrap_or(1),
                "high": scale.high.unwrap_or(5),
            });
            if let Some(label) = scale.low_label {
                config["lowLabel"] = json!(label);
            }
            if let Some(label) = scale.high_label {
                config["highLabel"] = json!(label);
            }
            ("scaleQuestion", config)
        }
        QuestionKind::Date => ("dateQuestion", json!({ "includeTime": false })),
        QuestionKind::Time => ("timeQuestion", json!({})),
    };

    let mut body = Map::new();
    body.insert("required".to_string(), json!(question.required));
    body.insert(key.to_string(), config);
    Value::Object(body)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormInfo {
    #[serde(default)]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_title: Option<String>,
}

/// Form items are passed through as Google returns them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub kind: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleForm {
    form_id: String,
    #[serde(default)]
    info: FormInfo,
    responder_uri: Option<String>,
    linked_sheet_id: Option<String>,
    items: Option<Vec<FormItem>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responder_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_sheet_id: Option<String>,
    pub items: Vec<FormItem>,
}

impl From<GoogleForm> for Form {
    fn from(form: GoogleForm) -> Self {
        Self {
            id: form.form_id,
            title: form.info.title,
            description: form.info.description,
            document_title: form.info.document_title,
            responder_uri: form.responder_uri,
            linked_sheet_id: form.linked_sheet_id,
            items: form.items.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextAnswer {
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextAnswers {
    #[serde(default)]
    pub answers: Vec<TextAnswer>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    #[serde(default)]
    pub question_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_answers: Option<TextAnswers>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormResponse {
    pub response_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_submitted_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respondent_email: Option<String>,
    #[serde(default)]
    pub answers: BTreeMap<String, Answer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormResponsePage {
    #[serde(default)]
    pub responses: Vec<FormResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FormInfoUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl FormInfoUpdate {
    /// Returns the info payload and its field mask, or `None` when nothing changes.
    fn request(&self) -> Option<Value> {
        let mut info = Map::new();
        let mut mask = Vec::new();
        if let Some(title) = &self.title {
            info.insert("title".to_string(), json!(title));
            mask.push("title");
        }
        if let Some(description) = &self.description {
            info.insert("description".to_string(), json!(description));
            mask.push("description");
        }
        if mask.is_empty() {
            return None;
        }
        Some(json!({
            "updateFormInfo": { "info": info, "updateMask": mask.join(",") }
        }))
    }
}

pub struct FormsApi<'a> {
    google: &'a GoogleClient,
}

impl<'a> FormsApi<'a> {
    pub(super) fn new(google: &'a GoogleClient) -> Self {
        Self { google }
    }

    fn url(&self, segments: &[&str]) -> Result<url::Url> {
        self.google.url(&self.google.endpoints().forms, segments)
    }

    pub async fn list_forms(
        &self,
        token: &AccessToken,
        page_token: Option<&str>,
        page_size: Option<u32>,
    ) -> Result<FileSummaryPage> {
        self.google
            .drive()
            .list_by_mime_type(token, FORM_MIME_TYPE, page_token, page_size)
            .await
    }

    pub async fn get_form(&self, token: &AccessToken, form_id: &str) -> Result<Form> {
        let request = self.google.request(Method::GET, self.url(&["forms", form_id])?);
        let form: GoogleForm = self.google.fetch_json(token, request).await?;
        Ok(form.into())
    }

    pub async fn create_form(
        &self,
        token: &AccessToken,
        title: &str,
        document_title: Option<&str>,
    ) -> Result<Form> {
        let request = self
            .google
            .request(Method::POST, self.url(&["forms"])?)
            .json(&json!({
                "info": {
                    "title": title,
                    "documentTitle": document_title.unwrap_or(title),
                }
            }));
        let form: GoogleForm = self.google.fetch_json(token, request).await?;
        Ok(form.into())
    }

    async fn batch_update(&self, token: &AccessToken, form_id: &str, requests: Vec<Value>) -> Result<Value> {
        let url = self.url(&["forms", &format!("{}:batchUpdate", form_id)])?;
        let request = self
            .google
            .request(Method::POST, url)
            .json(&json!({ "requests": requests }));
        self.google.fetch_json(token, request).await
    }

    /// Updates the title and/or description. Returns `false` without calling
    /// Google when the update names no fields.
    pub async fn update_info(
        &self,
        token: &AccessToken,
        form_id: &str,
        update: &FormInfoUpdate,
    ) -> Result<bool> {
        let Some(request) = update.request() else {
            return Ok(false);
        };
        self.batch_update(token, form_id, vec![request]).await?;
        Ok(true)
    }

    pub async fn add_question(
        &self,
        token: &AccessToken,
        form_id: &str,
        question: &NewQuestion,
        index: u32,
    ) -> Result<Value> {
        let mut item = json!({
            "title": question.title,
            "questionItem": { "question": question_body(question) },
        });
        if let Some(description) = question.description.as_ref().filter(|d| !d.is_empty()) {
            item["description"] = json!(description);
        }

        let request = json!({
            "createItem": { "item": item, "location": { "index": index } }
        });
        self.batch_update(token, form_id, vec![request]).await
    }

    pub async fn list_responses(
        &self,
        token: &AccessToken,
        form_id: &str,
        page_token: Option<&str>,
        page_size: Option<u32>,
    ) -> Result<FormResponsePage> {
        let mut params = vec![(
            "pageSize",
            page_size.unwrap_or(DEFAULT_RESPONSE_PAGE_SIZE).to_string(),
        )];
        if let Some(page_token) = page_token {
            params.push(("pageToken", page_token.to_string()));
        }

        let request = self
            .google
            .request(Method::GET, self.url(&["forms", form_id, "responses"])?)
            .query(&params);
        self.google.fetch_json(token, request).await
    }

    pub async fn get_response(
        &self,
        token: &AccessToken,
        form_id: &str,
        response_id: &str,
    ) -> Result<FormResponse> {
        let request = self.google.request(
            Method::GET,
            self.url(&["forms", form_id, "responses", response_id])?,
        );
        self.google.fetch_json(token, request).await
    }
}
