//! AI assistant capabilities layered on a [`LanguageModel`].
//!
//! Transport failures of the model endpoint are errors. Output that cannot be
//! used (empty text, missing or malformed JSON) degrades to a fixed default,
//! and structured answers keep every field that decodes on its own.

pub mod extract;
pub mod prompts;

use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use shared::LanguageModel;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::google::forms::QuestionKind;
use extract::{overlay, parse_json_block, percentage, variant_ignoring_case, JsonShape};

pub const SUMMARY_FALLBACK: &str = "Unable to generate summary.";
pub const REPLY_FALLBACK: &str = "Unable to generate reply.";
pub const AGENDA_FALLBACK: &str = "Unable to generate agenda.";
pub const SPREADSHEET_FALLBACK: &str = "Unable to analyze spreadsheet data.";
const DEFAULT_QUESTION_COUNT: u32 = 5;
const MAX_QUESTION_COUNT: u32 = 25;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailContext {
    pub subject: String,
    pub from: String,
    pub to: String,
    pub body: String,
    pub date: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyTone {
    #[default]
    Professional,
    Friendly,
    Brief,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        variant_ignoring_case(
            deserializer,
            &[
                ("high", Priority::High),
                ("medium", Priority::Medium),
                ("low", Priority::Low),
            ],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Categorization {
    pub category: String,
    pub priority: Priority,
    pub suggested_labels: Vec<String>,
    pub action_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_summary: Option<String>,
}

impl Default for Categorization {
    fn default() -> Self {
        Self {
            category: "other".to_string(),
            priority: Priority::Medium,
            suggested_labels: Vec::new(),
            action_required: false,
            action_summary: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    #[default]
    Suspicious,
    Dangerous,
}

impl<'de> Deserialize<'de> for RiskLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        variant_ignoring_case(
            deserializer,
            &[
                ("safe", RiskLevel::Safe),
                ("suspicious", RiskLevel::Suspicious),
                ("dangerous", RiskLevel::Dangerous),
            ],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityScan {
    pub risk_level: RiskLevel,
    #[serde(deserialize_with = "percentage")]
    pub risk_score: u32,
    pub threats: Vec<String>,
    pub recommendations: Vec<String>,
    pub summary: String,
    pub should_open: bool,
}

impl Default for SecurityScan {
    fn default() -> Self {
        Self {
            risk_level: RiskLevel::Suspicious,
            risk_score: 50,
            threats: Vec::new(),
            recommendations: vec![
                "Review this email manually before opening links or attachments.".to_string(),
            ],
            summary: "The automated security scan could not produce a verdict for this email."
                .to_string(),
            should_open: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeetingSuggestion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_slot: Option<SlotRange>,
    pub reasoning: String,
    pub alternative_slots: Vec<SlotRange>,
}

impl Default for MeetingSuggestion {
    fn default() -> Self {
        Self {
            suggested_slot: None,
            reasoning: "Unable to suggest a meeting time from the available slots.".to_string(),
            alternative_slots: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratedQuestion {
    pub title: String,
    #[serde(rename = "type", deserialize_with = "question_kind_or_short_text")]
    pub kind: QuestionKind,
    pub options: Vec<String>,
    pub required: bool,
}

impl Default for GeneratedQuestion {
    fn default() -> Self {
        Self {
            title: String::new(),
            kind: QuestionKind::ShortText,
            options: Vec::new(),
            required: false,
        }
    }
}

/// Question types the form builder does not support become short text.
fn question_kind_or_short_text<'de, D>(deserializer: D) -> Result<QuestionKind, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let kind = raw
        .as_str()
        .map(|name| name.trim().to_ascii_uppercase().replace([' ', '-'], "_"))
        .and_then(|name| serde_json::from_value(Value::String(name)).ok());
    Ok(kind.unwrap_or(QuestionKind::ShortText))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratedForm {
    pub title: String,
    pub description: String,
    pub questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseAnalysis {
    pub summary: String,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

impl Default for ResponseAnalysis {
    fn default() -> Self {
        Self {
            summary: "Unable to analyze form responses.".to_string(),
            insights: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderSuggestion {
    pub name: String,
    pub description: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationPlan {
    pub folders: Vec<FolderSuggestion>,
    pub suggestions: Vec<String>,
}

/// Categorization and action items for one email, produced together.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailAnalysis {
    #[serde(flatten)]
    pub categorization: Categorization,
    pub actions: Vec<String>,
}

fn text_or(text: String, fallback: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

#[derive(Clone)]
pub struct Assistant {
    model: Arc<dyn LanguageModel>,
}

impl Assistant {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    async fn complete(&self, capability: &'static str, system: &str, prompt: &str) -> Result<String> {
        debug!(capability, prompt_chars = prompt.len(), "Requesting AI completion");
        self.model.generate_text(system, prompt).await
    }

    async fn complete_json<T>(
        &self,
        capability: &'static str,
        system: &str,
        prompt: &str,
        shape: JsonShape,
        fallback: impl FnOnce() -> T,
    ) -> Result<T>
    where
        T: Serialize + serde::de::DeserializeOwned,
    {
        let text = self.complete(capability, system, prompt).await?;
        match parse_json_block(&text, shape) {
            Some(answer) => Ok(overlay(fallback(), answer)),
            None => {
                warn!(capability, "AI output was not usable JSON, returning default");
                Ok(fallback())
            }
        }
    }

    pub async fn summarize_email(&self, email: &EmailContext) -> Result<String> {
        let text = self
            .complete("summarize_email", prompts::SUMMARIZE_EMAIL, &prompts::summarize_email(email))
            .await?;
        Ok(text_or(text, SUMMARY_FALLBACK))
    }

    pub async fn draft_reply(
        &self,
        email: &EmailContext,
        tone: ReplyTone,
        instructions: Option<&str>,
    ) -> Result<String> {
        let system = prompts::reply_system(tone, instructions);
        let text = self.complete("draft_reply", &system, &prompts::reply(email)).await?;
        Ok(text_or(text, REPLY_FALLBACK))
    }

    pub async fn categorize_email(&self, email: &EmailContext) -> Result<Categorization> {
        self.complete_json(
            "categorize_email",
            prompts::CATEGORIZE_EMAIL,
            &prompts::categorize(email),
            JsonShape::Object,
            Categorization::default,
        )
        .await
    }

    pub async fn extract_action_items(&self, email: &EmailContext) -> Result<Vec<String>> {
        self.complete_json(
            "extract_action_items",
            prompts::EXTRACT_ACTIONS,
            &prompts::extract_actions(email),
            JsonShape::Array,
            Vec::new,
        )
        .await
    }

    /// Runs categorization and action-item extraction concurrently.
    pub async fn analyze_email(&self, email: &EmailContext) -> Result<EmailAnalysis> {
        let (categorization, actions) =
            tokio::try_join!(self.categorize_email(email), self.extract_action_items(email))?;
        Ok(EmailAnalysis {
            categorization,
            actions,
        })
    }

    pub async fn improve_draft(&self, draft: &str, instructions: Option<&str>) -> Result<String> {
        let system = prompts::improve_system(instructions);
        let text = self.complete("improve_draft", &system, &prompts::improve(draft)).await?;
        Ok(text_or(text, draft))
    }

    pub async fn scan_security(&self, email: &EmailContext) -> Result<SecurityScan> {
        self.complete_json(
            "scan_security",
            prompts::SECURITY_SCAN,
            &prompts::security_scan(email),
            JsonShape::Object,
            SecurityScan::default,
        )
        .await
    }

    pub async fn suggest_meeting_time(
        &self,
        description: &str,
        free_slots: &[SlotRange],
        preferences: Option<&str>,
    ) -> Result<MeetingSuggestion> {
        self.complete_json(
            "suggest_meeting_time",
            prompts::SUGGEST_MEETING_TIME,
            &prompts::suggest_meeting_time(description, free_slots, preferences),
            JsonShape::Object,
            MeetingSuggestion::default,
        )
        .await
    }

    pub async fn meeting_agenda(&self, meeting_context: &Value) -> Result<String> {
        let text = self
            .complete("meeting_agenda", prompts::MEETING_AGENDA, &prompts::meeting_agenda(meeting_context))
            .await?;
        Ok(text_or(text, AGENDA_FALLBACK))
    }

    pub async fn summarize_document(&self, content: &str) -> Result<String> {
        let text = self
            .complete(
                "summarize_document",
                prompts::SUMMARIZE_DOCUMENT,
                &prompts::summarize_document(content),
            )
            .await?;
        Ok(text_or(text, SUMMARY_FALLBACK))
    }

    pub async fn analyze_spreadsheet(
        &self,
        headers: &[Value],
        rows: &[Vec<Value>],
        question: &str,
    ) -> Result<String> {
        let text = self
            .complete(
                "analyze_spreadsheet",
                prompts::ANALYZE_SPREADSHEET,
                &prompts::analyze_spreadsheet(headers, rows, question),
            )
            .await?;
        Ok(text_or(text, SPREADSHEET_FALLBACK))
    }

    pub async fn generate_form_questions(
        &self,
        topic: &str,
        purpose: &str,
        question_count: Option<u32>,
    ) -> Result<GeneratedForm> {
        let count = question_count
            .unwrap_or(DEFAULT_QUESTION_COUNT)
            .clamp(1, MAX_QUESTION_COUNT);
        let mut form = self
            .complete_json(
                "generate_form_questions",
                prompts::GENERATE_FORM,
                &prompts::generate_form(topic, purpose, count),
                JsonShape::Object,
                GeneratedForm::default,
            )
            .await?;
        if form.title.trim().is_empty() {
            form.title = topic.to_string();
        }
        Ok(form)
    }

    pub async fn analyze_form_responses(
        &self,
        questions: &Value,
        responses: &Value,
    ) -> Result<ResponseAnalysis> {
        self.complete_json(
            "analyze_form_responses",
            prompts::ANALYZE_FORM_RESPONSES,
            &prompts::analyze_form_responses(questions, responses),
            JsonShape::Object,
            ResponseAnalysis::default,
        )
        .await
    }

    pub async fn suggest_file_organization(&self, files: &[Value]) -> Result<OrganizationPlan> {
        self.complete_json(
            "suggest_file_organization",
            prompts::ORGANIZE_FILES,
            &prompts::organize_files(files),
            JsonShape::Object,
            OrganizationPlan::default,
        )
        .await
    }
}
