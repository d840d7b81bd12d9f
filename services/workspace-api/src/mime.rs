use base64::{
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
    Engine as _,
};
use serde::Serialize;
use tracing::debug;

use crate::google::gmail::MessagePart;

const DEFAULT_ATTACHMENT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBody {
    pub text: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
}

/// Decodes Gmail's base64url payloads, padded or not, lossily as UTF-8.
pub fn decode_base64url(data: &str) -> Option<String> {
    let trimmed = data.trim();
    let bytes = URL_SAFE_NO_PAD
        .decode(trimmed.trim_end_matches('='))
        .or_else(|_| URL_SAFE.decode(trimmed))
        .map_err(|e| debug!("Skipping undecodable message part: {}", e))
        .ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

fn inline_data(part: &MessagePart) -> Option<String> {
    part.body
        .as_ref()
        .and_then(|body| body.data.as_deref())
        .filter(|data| !data.is_empty())
        .and_then(decode_base64url)
}

fn mime_type(part: &MessagePart) -> &str {
    part.mime_type.as_deref().unwrap_or_default()
}

/// Resolves the plain-text and HTML bodies of a message part tree.
///
/// Later parts overwrite earlier ones, so the last matching leaf in traversal
/// order wins for each representation.
pub fn extract_body(part: &MessagePart) -> MessageBody {
    let mut body = MessageBody::default();

    if let Some(data) = inline_data(part) {
        if mime_type(part) == "text/html" {
            body.html = data;
        } else {
            body.text = data;
        }
    }

    for child in part.parts.iter().flatten() {
        let child_type = mime_type(child);
        match child_type {
            "text/plain" => {
                if let Some(data) = inline_data(child) {
                    body.text = data;
                }
            }
            "text/html" => {
                if let Some(data) = inline_data(child) {
                    body.html = data;
                }
            }
            _ if child_type.starts_with("multipart/") => {
                let nested = extract_body(child);
                if !nested.text.is_empty() {
                    body.text = nested.text;
                }
                if !nested.html.is_empty() {
                    body.html = nested.html;
                }
            }
            _ => {}
        }
    }

    body
}

/// Collects every part that names a file and references an attachment id.
pub fn extract_attachments(part: &MessagePart) -> Vec<Attachment> {
    let mut attachments = Vec::new();
    collect_attachments(part, &mut attachments);
    attachments
}

fn collect_attachments(part: &MessagePart, attachments: &mut Vec<Attachment>) {
    let filename = part.filename.as_deref().unwrap_or_default();
    let attachment_id = part
        .body
        .as_ref()
        .and_then(|body| body.attachment_id.as_deref())
        .filter(|id| !id.is_empty());

    if let (false, Some(id)) = (filename.is_empty(), attachment_id) {
        attachments.push(Attachment {
            id: id.to_string(),
            filename: filename.to_string(),
            mime_type: part
                .mime_type
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_ATTACHMENT_MIME_TYPE.to_string()),
            size: part.body.as_ref().and_then(|body| body.size).unwrap_or(0),
        });
    }

    for child in part.parts.iter().flatten() {
        collect_attachments(child, attachments);
    }
}
