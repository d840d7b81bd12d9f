use serde_json::Value;
use shared::utils::truncate;

use super::{EmailContext, ReplyTone, SlotRange};

/// Upper bound on free-form context (document bodies, sheet rows) per prompt.
pub const MAX_CONTEXT_CHARS: usize = 12_000;
const MAX_SHEET_ROWS: usize = 200;

pub const SUMMARIZE_EMAIL: &str = "You are an AI email assistant. Summarize emails concisely in 2-3 \
sentences, highlighting the key points and any action items. Be direct and professional.";

pub const CATEGORIZE_EMAIL: &str = r#"You are an AI email assistant that categorizes emails. Analyze the email and return a JSON object with:
- category: one of "work", "personal", "newsletter", "promotional", "social", "finance", "travel", "shopping", "updates", "other"
- priority: "high", "medium", or "low" based on urgency and importance
- suggestedLabels: array of 1-3 relevant labels
- actionRequired: boolean indicating if the email requires a response or action
- actionSummary: if actionRequired is true, a brief description of what action is needed

Return ONLY valid JSON, no other text."#;

pub const EXTRACT_ACTIONS: &str = "You are an AI email assistant that extracts action items from emails. \
List any tasks, requests, deadlines, or follow-ups mentioned in the email.

Return a JSON array of strings, each being a specific action item. If no action items, return an empty array [].
Return ONLY the JSON array, no other text.";

pub const SECURITY_SCAN: &str = r#"You are an email security analyst. Inspect the email for phishing, impersonation, malicious links or attachments, credential harvesting, payment fraud and social engineering pressure.

Return a JSON object with:
- riskLevel: "safe", "suspicious", or "dangerous"
- riskScore: integer from 0 (harmless) to 100 (certainly malicious)
- threats: array of short descriptions of each threat indicator found
- recommendations: array of concrete steps the recipient should take
- summary: one or two sentences explaining the verdict
- shouldOpen: boolean, whether it is safe to open links and attachments

Return ONLY valid JSON, no other text."#;

pub const SUGGEST_MEETING_TIME: &str = r#"You are a scheduling assistant. Choose the best meeting time from the free slots provided, considering the meeting description and any preferences.

Return a JSON object with:
- suggestedSlot: {"start": ISO timestamp, "end": ISO timestamp} taken from the free slots
- reasoning: one or two sentences explaining the choice
- alternativeSlots: array of up to 3 other {"start", "end"} options from the free slots

Return ONLY valid JSON, no other text."#;

pub const MEETING_AGENDA: &str = "You are a meeting assistant. Write a clear, time-boxed agenda for the \
meeting described. Include a short objective, numbered discussion items with suggested durations, and \
a closing section for decisions and next steps. Use plain text with simple bullet formatting.";

pub const SUMMARIZE_DOCUMENT: &str = "You are a document assistant. Summarize the document in a short \
paragraph followed by the key points as bullets. Preserve names, figures and dates exactly.";

pub const ANALYZE_SPREADSHEET: &str = "You are a data analyst. Answer the user's question using only the \
spreadsheet data provided. Show the figures you relied on, state any assumptions, and say so plainly \
when the data cannot answer the question.";

pub const GENERATE_FORM: &str = r#"You are a survey designer. Draft a form for the topic and purpose given.

Return a JSON object with:
- title: form title
- description: one or two sentences shown to respondents
- questions: array of objects with
  - title: the question text
  - type: one of "SHORT_TEXT", "PARAGRAPH", "MULTIPLE_CHOICE", "CHECKBOXES", "DROPDOWN", "SCALE", "DATE", "TIME"
  - options: array of answer choices (only for MULTIPLE_CHOICE, CHECKBOXES, DROPDOWN)
  - required: boolean

Return ONLY valid JSON, no other text."#;

pub const ANALYZE_FORM_RESPONSES: &str = r#"You are a survey analyst. Review the form questions and the collected responses.

Return a JSON object with:
- summary: a short overview of what respondents said
- insights: array of notable patterns, trends or outliers
- recommendations: array of concrete follow-up actions

Return ONLY valid JSON, no other text."#;

pub const ORGANIZE_FILES: &str = r#"You are a file organization assistant. Propose a folder structure for the files listed.

Return a JSON object with:
- folders: array of {"name": folder name, "description": what belongs there, "files": array of file names from the list}
- suggestions: array of other tips, such as renames or duplicates to remove

Return ONLY valid JSON, no other text."#;

fn tone_description(tone: ReplyTone) -> &'static str {
    match tone {
        ReplyTone::Professional => "formal and professional",
        ReplyTone::Friendly => "warm and friendly while remaining professional",
        ReplyTone::Brief => "concise and to the point",
    }
}

pub fn reply_system(tone: ReplyTone, instructions: Option<&str>) -> String {
    let mut system = format!(
        "You are an AI email assistant helping to draft email replies. Write replies that are {}.

Rules:
- Do NOT include subject line
- Do NOT include \"Dear\" or formal salutations unless appropriate
- Start directly with the response content
- End with an appropriate sign-off
- Keep the response relevant and helpful",
        tone_description(tone)
    );
    if let Some(instructions) = instructions.filter(|i| !i.trim().is_empty()) {
        system.push_str(&format!("\n\nAdditional instructions: {}", instructions));
    }
    system
}

pub fn improve_system(instructions: Option<&str>) -> String {
    let mut system = String::from(
        "You are an AI email assistant that improves email drafts. Make the email clearer, more \
professional, and more effective while preserving the original intent and meaning.",
    );
    if let Some(instructions) = instructions.filter(|i| !i.trim().is_empty()) {
        system.push_str(&format!("\n\nSpecific instructions: {}", instructions));
    }
    system.push_str("\n\nReturn only the improved email text, no explanations.");
    system
}

pub fn summarize_email(email: &EmailContext) -> String {
    format!(
        "Please summarize this email:\n\nFrom: {}\nTo: {}\nSubject: {}\nDate: {}\n\n{}",
        email.from,
        email.to,
        email.subject,
        email.date,
        truncate(&email.body, MAX_CONTEXT_CHARS)
    )
}

fn email_without_recipient(intro: &str, email: &EmailContext) -> String {
    format!(
        "{}:\n\nFrom: {}\nSubject: {}\nDate: {}\n\n{}",
        intro,
        email.from,
        email.subject,
        email.date,
        truncate(&email.body, MAX_CONTEXT_CHARS)
    )
}

pub fn reply(email: &EmailContext) -> String {
    email_without_recipient("Please draft a reply to this email", email)
}

pub fn categorize(email: &EmailContext) -> String {
    email_without_recipient("Categorize this email", email)
}

pub fn security_scan(email: &EmailContext) -> String {
    format!(
        "Scan this email for security threats:\n\nFrom: {}\nTo: {}\nSubject: {}\nDate: {}\n\n{}",
        email.from,
        email.to,
        email.subject,
        email.date,
        truncate(&email.body, MAX_CONTEXT_CHARS)
    )
}

pub fn extract_actions(email: &EmailContext) -> String {
    format!(
        "Extract action items from this email:\n\nFrom: {}\nSubject: {}\n\n{}",
        email.from,
        email.subject,
        truncate(&email.body, MAX_CONTEXT_CHARS)
    )
}

pub fn improve(draft: &str) -> String {
    format!("Please improve this email draft:\n\n{}", draft)
}

pub fn suggest_meeting_time(description: &str, free_slots: &[SlotRange], preferences: Option<&str>) -> String {
    let slots = if free_slots.is_empty() {
        "(none)".to_string()
    } else {
        free_slots
            .iter()
            .map(|slot| format!("- {} to {}", slot.start, slot.end))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let mut prompt = format!("Meeting: {}\n\nFree slots:\n{}", description, slots);
    if let Some(preferences) = preferences.filter(|p| !p.trim().is_empty()) {
        prompt.push_str(&format!("\n\nPreferences: {}", preferences));
    }
    prompt
}

/// Free text is used verbatim; structured context is rendered as JSON.
fn render_context(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

pub fn meeting_agenda(meeting_context: &Value) -> String {
    format!(
        "Create an agenda for this meeting:\n\n{}",
        truncate(&render_context(meeting_context), MAX_CONTEXT_CHARS)
    )
}

pub fn summarize_document(content: &str) -> String {
    format!(
        "Summarize this document:\n\n{}",
        truncate(content, MAX_CONTEXT_CHARS)
    )
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn analyze_spreadsheet(headers: &[Value], rows: &[Vec<Value>], question: &str) -> String {
    let header_line = headers.iter().map(cell_text).collect::<Vec<_>>().join(" | ");
    let mut table = rows
        .iter()
        .take(MAX_SHEET_ROWS)
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>().join(" | "))
        .collect::<Vec<_>>()
        .join("\n");
    if rows.len() > MAX_SHEET_ROWS {
        table.push_str(&format!("\n({} more rows omitted)", rows.len() - MAX_SHEET_ROWS));
    }

    format!(
        "Columns: {}\n\nRows:\n{}\n\nQuestion: {}",
        header_line,
        truncate(&table, MAX_CONTEXT_CHARS),
        question
    )
}

pub fn generate_form(topic: &str, purpose: &str, question_count: u32) -> String {
    format!(
        "Topic: {}\nPurpose: {}\nNumber of questions: {}",
        topic, purpose, question_count
    )
}

pub fn analyze_form_responses(questions: &Value, responses: &Value) -> String {
    format!(
        "Questions:\n{}\n\nResponses:\n{}",
        truncate(&render_context(questions), MAX_CONTEXT_CHARS / 3),
        truncate(&render_context(responses), MAX_CONTEXT_CHARS)
    )
}

pub fn organize_files(files: &[Value]) -> String {
    let listing = files
        .iter()
        .map(|file| match file.get("name").and_then(Value::as_str) {
            Some(name) => match file.get("mimeType").and_then(Value::as_str) {
                Some(mime_type) => format!("- {} ({})", name, mime_type),
                None => format!("- {}", name),
            },
            None => format!("- {}", render_context(file)),
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Organize these files:\n\n{}",
        truncate(&listing, MAX_CONTEXT_CHARS)
    )
}
