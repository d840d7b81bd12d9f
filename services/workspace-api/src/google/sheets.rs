use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::drive::{FileSummaryPage, SPREADSHEET_MIME_TYPE};
use super::{GoogleClient, Result};
use crate::auth::AccessToken;

pub type CellValues = Vec<Vec<Value>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueInputOption {
    Raw,
    #[default]
    UserEntered,
}

impl ValueInputOption {
    fn as_str(self) -> &'static str {
        match self {
            ValueInputOption::Raw => "RAW",
            ValueInputOption::UserEntered => "USER_ENTERED",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridProperties {
    #[serde(default)]
    pub row_count: i64,
    #[serde(default)]
    pub column_count: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
    pub index: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_properties: Option<GridProperties>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    #[serde(default)]
    properties: SheetProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpreadsheetProperties {
    #[serde(default)]
    title: String,
    locale: Option<String>,
    time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleSpreadsheet {
    spreadsheet_id: String,
    #[serde(default)]
    properties: SpreadsheetProperties,
    #[serde(default)]
    sheets: Vec<SheetEntry>,
    spreadsheet_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Spreadsheet {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    pub sheets: Vec<SheetProperties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
}

impl From<GoogleSpreadsheet> for Spreadsheet {
    fn from(sheet: GoogleSpreadsheet) -> Self {
        Self {
            id: sheet.spreadsheet_id,
            title: sheet.properties.title,
            locale: sheet.properties.locale,
            time_zone: sheet.properties.time_zone,
            sheets: sheet.sheets.into_iter().map(|s| s.properties).collect(),
            web_view_link: sheet.spreadsheet_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetData {
    #[serde(default)]
    pub range: String,
    #[serde(default)]
    pub values: CellValues,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateResult {
    pub updated_range: String,
    pub updated_rows: i64,
    pub updated_columns: i64,
    pub updated_cells: i64,
}

#[derive(Debug, Deserialize)]
struct AppendResponse {
    #[serde(default)]
    updates: UpdateResult,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClearResult {
    pub cleared_range: String,
}

#[derive(Debug, Deserialize)]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<Value>,
}

pub struct SheetsApi<'a> {
    google: &'a GoogleClient,
}

impl<'a> SheetsApi<'a> {
    pub(super) fn new(google: &'a GoogleClient) -> Self {
        Self { google }
    }

    fn url(&self, segments: &[&str]) -> Result<url::Url> {
        self.google.url(&self.google.endpoints().sheets, segments)
    }

    pub async fn list_spreadsheets(
        &self,
        token: &AccessToken,
        page_token: Option<&str>,
        page_size: Option<u32>,
    ) -> Result<FileSummaryPage> {
        self.google
            .drive()
            .list_by_mime_type(token, SPREADSHEET_MIME_TYPE, page_token, page_size)
            .await
    }

    pub async fn get_spreadsheet(&self, token: &AccessToken, spreadsheet_id: &str) -> Result<Spreadsheet> {
        let request = self
            .google
            .request(Method::GET, self.url(&["spreadsheets", spreadsheet_id])?);
        let sheet: GoogleSpreadsheet = self.google.fetch_json(token, request).await?;
        Ok(sheet.into())
    }

    pub async fn create_spreadsheet(
        &self,
        token: &AccessToken,
        title: &str,
        sheet_titles: &[String],
    ) -> Result<Spreadsheet> {
        let mut body = json!({ "properties": { "title": title } });
        if !sheet_titles.is_empty() {
            body["sheets"] = sheet_titles
                .iter()
                .map(|t| json!({ "properties": { "title": t } }))
                .collect();
        }

        let request = self
            .google
            .request(Method::POST, self.url(&["spreadsheets"])?)
            .json(&body);
        let sheet: GoogleSpreadsheet = self.google.fetch_json(token, request).await?;
        Ok(sheet.into())
    }

    pub async fn get_values(
        &self,
        token: &AccessToken,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<SheetData> {
        let request = self.google.request(
            Method::GET,
            self.url(&["spreadsheets", spreadsheet_id, "values", range])?,
        );
        let mut data: SheetData = self.google.fetch_json(token, request).await?;
        if data.range.is_empty() {
            data.range = range.to_string();
        }
        Ok(data)
    }

    pub async fn update_values(
        &self,
        token: &AccessToken,
        spreadsheet_id: &str,
        range: &str,
        values: &CellValues,
        input: ValueInputOption,
    ) -> Result<UpdateResult> {
        let request = self
            .google
            .request(
                Method::PUT,
                self.url(&["spreadsheets", spreadsheet_id, "values", range])?,
            )
            .query(&[("valueInputOption", input.as_str())])
            .json(&json!({ "range": range, "values": values }));
        self.google.fetch_json(token, request).await
    }

    pub async fn append_values(
        &self,
        token: &AccessToken,
        spreadsheet_id: &str,
        range: &str,
        values: &CellValues,
        input: ValueInputOption,
    ) -> Result<UpdateResult> {
        let append = format!("{}:append", range);
        let request = self
            .google
            .request(
                Method::POST,
                self.url(&["spreadsheets", spreadsheet_id, "values", &append])?,
            )
            .query(&[
                ("valueInputOption", input.as_str()),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "values": values }));
        let response: AppendResponse = self.google.fetch_json(token, request).await?;
        Ok(response.updates)
    }

    pub async fn clear_values(
        &self,
        token: &AccessToken,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<ClearResult> {
        let clear = format!("{}:clear", range);
        let request = self
            .google
            .request(
                Method::POST,
                self.url(&["spreadsheets", spreadsheet_id, "values", &clear])?,
            )
            .json(&json!({}));
        self.google.fetch_json(token, request).await
    }

    async fn batch_update(
        &self,
        token: &AccessToken,
        spreadsheet_id: &str,
        requests: Value,
    ) -> Result<Vec<Value>> {
        let url = self.url(&["spreadsheets", &format!("{}:batchUpdate", spreadsheet_id)])?;
        let request = self
            .google
            .request(Method::POST, url)
            .json(&json!({ "requests": requests }));
        let response: BatchUpdateResponse = self.google.fetch_json(token, request).await?;
        Ok(response.replies)
    }

    pub async fn add_sheet(
        &self,
        token: &AccessToken,
        spreadsheet_id: &str,
        title: &str,
    ) -> Result<SheetProperties> {
        let replies = self
            .batch_update(
                token,
                spreadsheet_id,
                json!([{ "addSheet": { "properties": { "title": title } } }]),
            )
            .await?;

        let properties = replies
            .into_iter()
            .next()
            .and_then(|mut reply| reply.pointer_mut("/addSheet/properties").map(Value::take))
            .unwrap_or(Value::Null);
        if properties.is_null() {
            return Ok(SheetProperties {
                title: title.to_string(),
                ..Default::default()
            });
        }
        Ok(serde_json::from_value(properties)?)
    }

    pub async fn delete_sheet(&self, token: &AccessToken, spreadsheet_id: &str, sheet_id: i64) -> Result<()> {
        self.batch_update(
            token,
            spreadsheet_id,
            json!([{ "deleteSheet": { "sheetId": sheet_id } }]),
        )
        .await?;
        Ok(())
    }

    pub async fn rename_sheet(
        &self,
        token: &AccessToken,
        spreadsheet_id: &str,
        sheet_id: i64,
        title: &str,
    ) -> Result<()> {
        self.batch_update(
            token,
            spreadsheet_id,
            json!([{
                "updateSheetProperties": {
                    "properties": { "sheetId": sheet_id, "title": title },
                    "fields": "title"
                }
            }]),
        )
        .await?;
        Ok(())
    }
}
