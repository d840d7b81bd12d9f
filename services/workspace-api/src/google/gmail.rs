use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use chrono::Local;
use futures::future::try_join_all;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::utils::{format_date, parse_email_address, parse_email_date, EmailAddress};
use tracing::debug;

use super::{GoogleClient, Result};
use crate::auth::AccessToken;
use crate::mime::{self, Attachment};

const DEFAULT_MAX_RESULTS: u32 = 20;
const NO_SUBJECT: &str = "(No Subject)";
const UNREAD_LABEL: &str = "UNREAD";

#[derive(Debug, Deserialize)]
pub struct MessagesListResponse {
    pub messages: Option<Vec<MessageInfo>>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
    #[serde(rename = "resultSizeEstimate")]
    pub result_size_estimate: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct MessageInfo {
    pub id: String,
    #[serde(rename = "threadId")]
    pub thread_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GmailMessage {
    pub id: String,
    #[serde(rename = "threadId", default)]
    pub thread_id: String,
    #[serde(rename = "labelIds")]
    pub label_ids: Option<Vec<String>>,
    pub snippet: Option<String>,
    pub payload: Option<MessagePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagePart {
    #[serde(rename = "mimeType")]
    pub mime_type: Option<String>,
    pub filename: Option<String>,
    pub headers: Option<Vec<Header>>,
    pub body: Option<MessagePartBody>,
    pub parts: Option<Vec<MessagePart>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagePartBody {
    #[serde(rename = "attachmentId")]
    pub attachment_id: Option<String>,
    pub size: Option<u64>,
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GmailProfile {
    #[serde(rename = "emailAddress")]
    pub email_address: String,
}

impl GmailMessage {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .as_ref()?
            .headers
            .as_ref()?
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    fn header_or_empty(&self, name: &str) -> String {
        self.header(name).unwrap_or_default().to_string()
    }

    fn subject(&self) -> String {
        self.header("Subject")
            .filter(|s| !s.is_empty())
            .unwrap_or(NO_SUBJECT)
            .to_string()
    }

    fn labels(&self) -> Vec<String> {
        self.label_ids.clone().unwrap_or_default()
    }

    fn is_unread(&self) -> bool {
        self.label_ids
            .as_ref()
            .map(|labels| labels.iter().any(|l| l == UNREAD_LABEL))
            .unwrap_or(false)
    }

    /// Only top-level parts are inspected, which is enough for list badges.
    fn has_top_level_attachment(&self) -> bool {
        self.payload
            .as_ref()
            .and_then(|p| p.parts.as_ref())
            .map(|parts| {
                parts.iter().any(|p| {
                    let named = p.filename.as_deref().is_some_and(|f| !f.is_empty());
                    let stored = p
                        .body
                        .as_ref()
                        .and_then(|b| b.attachment_id.as_deref())
                        .is_some_and(|id| !id.is_empty());
                    named && stored
                })
            })
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailListItem {
    pub id: String,
    pub thread_id: String,
    pub subject: String,
    pub from: String,
    pub sender: EmailAddress,
    pub snippet: String,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_date: Option<String>,
    pub is_unread: bool,
    pub has_attachments: bool,
    pub label_ids: Vec<String>,
}

impl From<GmailMessage> for EmailListItem {
    fn from(message: GmailMessage) -> Self {
        let from = message.header_or_empty("From");
        let date = message.header_or_empty("Date");
        let display_date = parse_email_date(&date)
            .map(|d| format_date(&d.with_timezone(&Local), &Local::now()));

        Self {
            sender: parse_email_address(&from),
            subject: message.subject(),
            is_unread: message.is_unread(),
            has_attachments: message.has_top_level_attachment(),
            label_ids: message.labels(),
            snippet: message.snippet.clone().unwrap_or_default(),
            id: message.id,
            thread_id: message.thread_id,
            from,
            date,
            display_date,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailPage {
    pub messages: Vec<EmailListItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    pub result_size_estimate: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub id: String,
    pub thread_id: String,
    pub label_ids: Vec<String>,
    pub snippet: String,
    pub subject: String,
    pub from: String,
    pub to: String,
    pub date: String,
    pub body: String,
    pub body_html: String,
    pub is_unread: bool,
    pub has_attachments: bool,
    pub attachments: Vec<Attachment>,
}

impl From<GmailMessage> for EmailMessage {
    fn from(message: GmailMessage) -> Self {
        let (body, attachments) = match message.payload.as_ref() {
            Some(payload) => (mime::extract_body(payload), mime::extract_attachments(payload)),
            None => Default::default(),
        };
        let text = if body.text.is_empty() {
            body.html.clone()
        } else {
            body.text
        };

        Self {
            subject: message.subject(),
            from: message.header_or_empty("From"),
            to: message.header_or_empty("To"),
            date: message.header_or_empty("Date"),
            is_unread: message.is_unread(),
            label_ids: message.labels(),
            snippet: message.snippet.clone().unwrap_or_default(),
            has_attachments: !attachments.is_empty(),
            body: text,
            body_html: body.html,
            attachments,
            id: message.id,
            thread_id: message.thread_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub label_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_list_visibility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_list_visibility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages_total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages_unread: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct LabelsResponse {
    #[serde(default)]
    labels: Vec<Label>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentData {
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct ListMessagesOptions {
    pub max_results: Option<u32>,
    pub page_token: Option<String>,
    pub label_ids: Vec<String>,
    pub query: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct OutgoingEmail {
    pub to: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub subject: String,
    pub body: String,
    pub in_reply_to: Option<String>,
    pub references: Option<String>,
    pub thread_id: Option<String>,
}

/// Header values cannot be allowed to smuggle extra headers into the message.
fn header_value(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// RFC 2047 encodes a header value when it is not plain ASCII.
fn encode_header_word(value: &str) -> String {
    let value = header_value(value);
    if value.is_ascii() {
        value
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value.as_bytes()))
    }
}

/// Renders the RFC 2822 message Gmail expects in the `raw` field.
pub fn build_raw_message(from: &str, email: &OutgoingEmail) -> String {
    let mut lines = vec![
        format!("From: {}", header_value(from)),
        format!("To: {}", header_value(&email.to)),
    ];

    let optional = [
        ("Cc", email.cc.as_deref()),
        ("Bcc", email.bcc.as_deref()),
    ];
    for (name, value) in optional {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            lines.push(format!("{}: {}", name, header_value(value)));
        }
    }

    lines.push(format!("Subject: {}", encode_header_word(&email.subject)));

    let threading = [
        ("In-Reply-To", email.in_reply_to.as_deref()),
        ("References", email.references.as_deref()),
    ];
    for (name, value) in threading {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            lines.push(format!("{}: {}", name, header_value(value)));
        }
    }

    lines.push("Content-Type: text/html; charset=utf-8".to_string());
    lines.push(String::new());
    lines.push(email.body.clone());

    lines.join("\r\n")
}

pub struct GmailApi<'a> {
    google: &'a GoogleClient,
}

impl<'a> GmailApi<'a> {
    pub(super) fn new(google: &'a GoogleClient) -> Self {
        Self { google }
    }

    fn url(&self, segments: &[&str]) -> Result<url::Url> {
        let mut path = vec!["users", "me"];
        path.extend_from_slice(segments);
        self.google.url(&self.google.endpoints().gmail, &path)
    }

    pub async fn list_messages(
        &self,
        token: &AccessToken,
        options: &ListMessagesOptions,
    ) -> Result<EmailPage> {
        let mut params = vec![(
            "maxResults",
            options.max_results.unwrap_or(DEFAULT_MAX_RESULTS).to_string(),
        )];
        if let Some(page_token) = &options.page_token {
            params.push(("pageToken", page_token.clone()));
        }
        for label in &options.label_ids {
            params.push(("labelIds", label.clone()));
        }
        if let Some(query) = options.query.as_ref().filter(|q| !q.is_empty()) {
            params.push(("q", query.clone()));
        }

        let request = self
            .google
            .request(Method::GET, self.url(&["messages"])?)
            .query(&params);
        let listing: MessagesListResponse = self.google.fetch_json(token, request).await?;

        let refs = listing.messages.unwrap_or_default();
        debug!("Fetching metadata for {} messages", refs.len());

        let messages =
            try_join_all(refs.iter().map(|m| self.get_message_metadata(token, &m.id))).await?;

        Ok(EmailPage {
            messages: messages.into_iter().map(EmailListItem::from).collect(),
            next_page_token: listing.next_page_token,
            result_size_estimate: listing.result_size_estimate.unwrap_or(0),
        })
    }

    async fn get_message_metadata(&self, token: &AccessToken, id: &str) -> Result<GmailMessage> {
        let request = self
            .google
            .request(Method::GET, self.url(&["messages", id])?)
            .query(&[
                ("format", "metadata"),
                ("metadataHeaders", "From"),
                ("metadataHeaders", "Subject"),
                ("metadataHeaders", "Date"),
            ]);
        self.google.fetch_json(token, request).await
    }

    pub async fn get_message(&self, token: &AccessToken, id: &str) -> Result<EmailMessage> {
        let request = self
            .google
            .request(Method::GET, self.url(&["messages", id])?)
            .query(&[("format", "full")]);
        let message: GmailMessage = self.google.fetch_json(token, request).await?;
        Ok(message.into())
    }

    pub async fn get_profile(&self, token: &AccessToken) -> Result<GmailProfile> {
        let request = self.google.request(Method::GET, self.url(&["profile"])?);
        self.google.fetch_json(token, request).await
    }

    pub async fn send_message(
        &self,
        token: &AccessToken,
        email: &OutgoingEmail,
    ) -> Result<SentMessage> {
        let profile = self.get_profile(token).await?;
        let raw = URL_SAFE_NO_PAD.encode(build_raw_message(&profile.email_address, email));

        let mut payload = json!({ "raw": raw });
        if let Some(thread_id) = email.thread_id.as_ref().filter(|t| !t.is_empty()) {
            payload["threadId"] = json!(thread_id);
        }

        let request = self
            .google
            .request(Method::POST, self.url(&["messages", "send"])?)
            .json(&payload);
        self.google.fetch_json(token, request).await
    }

    pub async fn trash_message(&self, token: &AccessToken, id: &str) -> Result<()> {
        let request = self
            .google
            .request(Method::POST, self.url(&["messages", id, "trash"])?);
        self.google.fetch_empty(token, request).await
    }

    pub async fn modify_labels(
        &self,
        token: &AccessToken,
        id: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<()> {
        let request = self
            .google
            .request(Method::POST, self.url(&["messages", id, "modify"])?)
            .json(&json!({ "addLabelIds": add, "removeLabelIds": remove }));
        self.google.fetch_empty(token, request).await
    }

    pub async fn mark_as_read(&self, token: &AccessToken, id: &str) -> Result<()> {
        self.modify_labels(token, id, &[], &[UNREAD_LABEL.to_string()])
            .await
    }

    pub async fn mark_as_unread(&self, token: &AccessToken, id: &str) -> Result<()> {
        self.modify_labels(token, id, &[UNREAD_LABEL.to_string()], &[])
            .await
    }

    pub async fn list_labels(&self, token: &AccessToken) -> Result<Vec<Label>> {
        let request = self.google.request(Method::GET, self.url(&["labels"])?);
        let response: LabelsResponse = self.google.fetch_json(token, request).await?;
        Ok(response.labels)
    }

    pub async fn get_attachment(
        &self,
        token: &AccessToken,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<AttachmentData> {
        let request = self.google.request(
            Method::GET,
            self.url(&["messages", message_id, "attachments", attachment_id])?,
        );
        self.google.fetch_json(token, request).await
    }
}
