mod common;

use axum::http::{Method, StatusCode};
use common::{error_message, TestContext};
use serde_json::{json, Value};

#[tokio::test]
async fn test_create_spreadsheet_with_named_sheets() {
    let ctx = TestContext::new().await;
    ctx.google.ok(
        Method::POST,
        "/sheets/v4/spreadsheets",
        json!({
            "spreadsheetId": "s1",
            "properties": {"title": "Budget"},
            "sheets": [
                {"properties": {"sheetId": 0, "title": "Income", "index": 0}},
                {"properties": {"sheetId": 7, "title": "Costs", "index": 1}}
            ],
            "spreadsheetUrl": "https://docs.google.com/spreadsheets/d/s1/edit"
        }),
    );

    let response = ctx
        .post("/api/sheets")
        .json(&json!({"title": "Budget", "sheetTitles": ["Income", "Costs"]}))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["id"], "s1");
    assert_eq!(body["sheets"][1]["sheetId"], 7);
    assert_eq!(body["webViewLink"], "https://docs.google.com/spreadsheets/d/s1/edit");

    let request = ctx.google.single_request(Method::POST, "/sheets/v4/spreadsheets");
    assert_eq!(
        request.json(),
        json!({
            "properties": {"title": "Budget"},
            "sheets": [
                {"properties": {"title": "Income"}},
                {"properties": {"title": "Costs"}}
            ]
        })
    );
}

#[tokio::test]
async fn test_create_spreadsheet_requires_title() {
    let ctx = TestContext::new().await;

    let response = ctx.post("/api/sheets").json(&json!({})).await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&response), "Title is required");
}

#[tokio::test]
async fn test_get_spreadsheet_values_for_range() {
    let ctx = TestContext::new().await;
    ctx.google.ok(
        Method::GET,
        "/sheets/v4/spreadsheets/s1/values/Sheet1!A1:B2",
        json!({"range": "Sheet1!A1:B2", "values": [["Name", "Total"], ["Ada", "12"]]}),
    );

    let response = ctx
        .get("/api/sheets/s1")
        .add_query_param("range", "Sheet1!A1:B2")
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>(),
        json!({"range": "Sheet1!A1:B2", "values": [["Name", "Total"], ["Ada", "12"]]})
    );
}

#[tokio::test]
async fn test_get_spreadsheet_metadata_without_range() {
    let ctx = TestContext::new().await;
    ctx.google.ok(
        Method::GET,
        "/sheets/v4/spreadsheets/s1",
        json!({
            "spreadsheetId": "s1",
            "properties": {"title": "Budget", "timeZone": "Europe/London"},
            "sheets": [{"properties": {"sheetId": 0, "title": "Sheet1", "index": 0}}]
        }),
    );

    let response = ctx.get("/api/sheets/s1").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["title"], "Budget");
    assert_eq!(body["timeZone"], "Europe/London");
    assert_eq!(body["sheets"][0]["title"], "Sheet1");
}

#[tokio::test]
async fn test_update_values_defaults_to_user_entered() {
    let ctx = TestContext::new().await;
    ctx.google.ok(
        Method::PUT,
        "/sheets/v4/spreadsheets/s1/values/Sheet1!A1",
        json!({"updatedRange": "Sheet1!A1:B1", "updatedRows": 1, "updatedColumns": 2, "updatedCells": 2}),
    );

    let response = ctx
        .put("/api/sheets/s1")
        .json(&json!({"range": "Sheet1!A1", "values": [["=SUM(1,2)", 3]]}))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["updatedCells"], 2);

    let request = ctx
        .google
        .single_request(Method::PUT, "/sheets/v4/spreadsheets/s1/values/Sheet1!A1");
    assert_eq!(
        request.query_param("valueInputOption").as_deref(),
        Some("USER_ENTERED")
    );
    assert_eq!(request.json()["values"], json!([["=SUM(1,2)", 3]]));
}

#[tokio::test]
async fn test_update_values_validation() {
    let ctx = TestContext::new().await;

    let response = ctx
        .put("/api/sheets/s1")
        .json(&json!({"range": "Sheet1!A1"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&response), "Range and values are required");

    let response = ctx
        .put("/api/sheets/s1")
        .json(&json!({"range": "A1", "values": [[1]], "inputOption": "FORMULA"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_append_rows_returns_update_summary() {
    let ctx = TestContext::new().await;
    ctx.google.ok(
        Method::POST,
        "/sheets/v4/spreadsheets/s1/values/Log:append",
        json!({"updates": {"updatedRange": "Log!A5:B5", "updatedRows": 1, "updatedColumns": 2, "updatedCells": 2}}),
    );

    let response = ctx
        .post("/api/sheets/s1")
        .json(&json!({"action": "append", "range": "Log", "values": [["a", "b"]], "inputOption": "RAW"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["updatedRange"], "Log!A5:B5");

    let request = ctx
        .google
        .single_request(Method::POST, "/sheets/v4/spreadsheets/s1/values/Log:append");
    assert_eq!(request.query_param("valueInputOption").as_deref(), Some("RAW"));
    assert_eq!(
        request.query_param("insertDataOption").as_deref(),
        Some("INSERT_ROWS")
    );
}

#[tokio::test]
async fn test_clear_range() {
    let ctx = TestContext::new().await;
    ctx.google.ok(
        Method::POST,
        "/sheets/v4/spreadsheets/s1/values/Sheet1!A1:C9:clear",
        json!({"spreadsheetId": "s1", "clearedRange": "Sheet1!A1:C9"}),
    );

    let response = ctx
        .post("/api/sheets/s1")
        .json(&json!({"action": "clear", "range": "Sheet1!A1:C9"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>(),
        json!({"clearedRange": "Sheet1!A1:C9"})
    );
}

#[tokio::test]
async fn test_sheet_management_actions() {
    let ctx = TestContext::new().await;
    ctx.google.ok(
        Method::POST,
        "/sheets/v4/spreadsheets/s1:batchUpdate",
        json!({"replies": [{"addSheet": {"properties": {"sheetId": 99, "title": "Q3", "index": 2}}}]}),
    );

    let response = ctx
        .post("/api/sheets/s1")
        .json(&json!({"action": "addSheet", "title": "Q3"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["sheetId"], 99);
    assert_eq!(body["title"], "Q3");

    let response = ctx
        .post("/api/sheets/s1")
        .json(&json!({"action": "renameSheet", "sheetId": 99, "title": "Quarter 3"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), json!({"success": true}));

    let response = ctx
        .post("/api/sheets/s1")
        .json(&json!({"action": "deleteSheet", "sheetId": 99}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let calls = ctx
        .google
        .requests_to(Method::POST, "/sheets/v4/spreadsheets/s1:batchUpdate");
    assert_eq!(calls.len(), 3);
    assert_eq!(
        calls[1].json()["requests"][0]["updateSheetProperties"],
        json!({"properties": {"sheetId": 99, "title": "Quarter 3"}, "fields": "title"})
    );
    assert_eq!(
        calls[2].json(),
        json!({"requests": [{"deleteSheet": {"sheetId": 99}}]})
    );
}

#[tokio::test]
async fn test_spreadsheet_action_validation() {
    let ctx = TestContext::new().await;

    let cases = [
        (json!({"action": "append", "range": "A1"}), "Range and values are required for append"),
        (json!({"action": "clear"}), "Range is required for clear"),
        (json!({"action": "addSheet"}), "Title is required for addSheet"),
        (json!({"action": "deleteSheet"}), "SheetId is required for deleteSheet"),
        (
            json!({"action": "renameSheet", "sheetId": 3}),
            "SheetId and title are required for renameSheet",
        ),
        (json!({"action": "sort"}), "Invalid action"),
    ];

    for (body, expected) in cases {
        let response = ctx.post("/api/sheets/s1").json(&body).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{}", body);
        assert_eq!(error_message(&response), expected);
    }

    assert!(ctx.google.requests().is_empty());
}
