use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::drive::{FileSummaryPage, DOCUMENT_MIME_TYPE};
use super::{GoogleClient, Result};
use crate::auth::AccessToken;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleDocument {
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub title: String,
    pub revision_id: Option<String>,
    #[serde(default)]
    pub body: DocumentBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentBody {
    #[serde(default)]
    pub content: Vec<StructuralElement>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralElement {
    pub start_index: Option<i64>,
    pub end_index: Option<i64>,
    pub paragraph: Option<Paragraph>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Paragraph {
    #[serde(default)]
    pub elements: Vec<ParagraphElement>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphElement {
    pub start_index: Option<i64>,
    pub end_index: Option<i64>,
    pub text_run: Option<TextRun>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRun {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub text_style: TextStyle,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextStyle {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
}

impl GoogleDocument {
    fn text_runs(&self) -> impl Iterator<Item = &TextRun> {
        self.body
            .content
            .iter()
            .filter_map(|element| element.paragraph.as_ref())
            .flat_map(|paragraph| paragraph.elements.iter())
            .filter_map(|element| element.text_run.as_ref())
    }

    pub fn plain_text(&self) -> String {
        self.text_runs().map(|run| run.content.as_str()).collect()
    }

    /// Index just past the last structural element; Docs bodies start at 1.
    pub fn end_index(&self) -> i64 {
        self.body
            .content
            .iter()
            .filter_map(|element| element.end_index)
            .max()
            .unwrap_or(1)
    }
}

pub fn web_view_link(document_id: &str) -> String {
    format!("https://docs.google.com/document/d/{}/edit", document_id)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<String>,
    pub web_view_link: String,
}

impl From<GoogleDocument> for Document {
    fn from(doc: GoogleDocument) -> Self {
        Self {
            body: doc.plain_text(),
            web_view_link: web_view_link(&doc.document_id),
            id: doc.document_id,
            title: doc.title,
            revision_id: doc.revision_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentElement {
    #[serde(rename = "type")]
    pub element_type: &'static str,
    pub text: String,
    pub start_index: i64,
    pub end_index: i64,
    pub style: TextStyle,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentContent {
    pub text: String,
    pub structural_elements: Vec<ContentElement>,
}

impl From<&GoogleDocument> for DocumentContent {
    fn from(doc: &GoogleDocument) -> Self {
        let mut structural_elements = Vec::new();
        for element in &doc.body.content {
            let Some(paragraph) = &element.paragraph else {
                continue;
            };
            for part in &paragraph.elements {
                if let Some(run) = &part.text_run {
                    structural_elements.push(ContentElement {
                        element_type: "paragraph",
                        text: run.content.clone(),
                        start_index: part.start_index.unwrap_or(0),
                        end_index: part.end_index.unwrap_or(0),
                        style: run.text_style.clone(),
                    });
                }
            }
        }

        Self {
            text: doc.plain_text(),
            structural_elements,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub index: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubstringMatch {
    pub text: String,
    #[serde(rename = "matchCase")]
    pub match_case: bool,
}

/// One entry of a `documents.batchUpdate` request list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentEdit {
    InsertText {
        location: Location,
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    ReplaceAllText {
        contains_text: SubstringMatch,
        replace_text: String,
    },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateResult {
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub replies: Vec<Value>,
}

pub struct DocsApi<'a> {
    google: &'a GoogleClient,
}

impl<'a> DocsApi<'a> {
    pub(super) fn new(google: &'a GoogleClient) -> Self {
        Self { google }
    }

    fn url(&self, segments: &[&str]) -> Result<url::Url> {
        self.google.url(&self.google.endpoints().docs, segments)
    }

    pub async fn list_documents(
        &self,
        token: &AccessToken,
        page_token: Option<&str>,
        page_size: Option<u32>,
    ) -> Result<FileSummaryPage> {
        self.google
            .drive()
            .list_by_mime_type(token, DOCUMENT_MIME_TYPE, page_token, page_size)
            .await
    }

    async fn fetch_document(&self, token: &AccessToken, document_id: &str) -> Result<GoogleDocument> {
        let request = self
            .google
            .request(Method::GET, self.url(&["documents", document_id])?);
        self.google.fetch_json(token, request).await
    }

    pub async fn get_document(&self, token: &AccessToken, document_id: &str) -> Result<Document> {
        Ok(self.fetch_document(token, document_id).await?.into())
    }

    pub async fn get_content(&self, token: &AccessToken, document_id: &str) -> Result<DocumentContent> {
        let doc = self.fetch_document(token, document_id).await?;
        Ok(DocumentContent::from(&doc))
    }

    pub async fn create_document(
        &self,
        token: &AccessToken,
        title: &str,
        content: Option<&str>,
    ) -> Result<Document> {
        let request = self
            .google
            .request(Method::POST, self.url(&["documents"])?)
            .json(&json!({ "title": title }));
        let created: GoogleDocument = self.google.fetch_json(token, request).await?;

        if let Some(content) = content.filter(|c| !c.is_empty()) {
            self.batch_update(
                token,
                &created.document_id,
                &[DocumentEdit::InsertText {
                    location: Location { index: 1 },
                    text: content.to_string(),
                }],
            )
            .await?;
        }

        Ok(Document {
            body: content.unwrap_or_default().to_string(),
            web_view_link: web_view_link(&created.document_id),
            id: created.document_id,
            title: created.title,
            revision_id: created.revision_id,
        })
    }

    pub async fn batch_update(
        &self,
        token: &AccessToken,
        document_id: &str,
        edits: &[DocumentEdit],
    ) -> Result<BatchUpdateResult> {
        let url = self.url(&["documents", &format!("{}:batchUpdate", document_id)])?;
        let request = self
            .google
            .request(Method::POST, url)
            .json(&json!({ "requests": edits }));
        self.google.fetch_json(token, request).await
    }

    /// Inserts `text` just before the document's final newline.
    pub async fn append_text(
        &self,
        token: &AccessToken,
        document_id: &str,
        text: &str,
    ) -> Result<BatchUpdateResult> {
        let doc = self.fetch_document(token, document_id).await?;
        let index = (doc.end_index() - 1).max(1);
        self.batch_update(
            token,
            document_id,
            &[DocumentEdit::InsertText {
                location: Location { index },
                text: text.to_string(),
            }],
        )
        .await
    }

    pub async fn replace_text(
        &self,
        token: &AccessToken,
        document_id: &str,
        search: &str,
        replacement: &str,
        match_case: bool,
    ) -> Result<BatchUpdateResult> {
        self.batch_update(
            token,
            document_id,
            &[DocumentEdit::ReplaceAllText {
                contains_text: SubstringMatch {
                    text: search.to_string(),
                    match_case,
                },
                replace_text: replacement.to_string(),
            }],
        )
        .await
    }
}
