mod common;

use axum::http::{Method, StatusCode};
use common::{error_message, TestContext};
use serde_json::{json, Value};

#[tokio::test]
async fn test_create_form_defaults_document_title() {
    let ctx = TestContext::new().await;
    ctx.google.ok(
        Method::POST,
        "/forms/v1/forms",
        json!({
            "formId": "form-1",
            "info": {"title": "Feedback", "documentTitle": "Feedback"},
            "responderUri": "https://docs.google.com/forms/d/e/form-1/viewform"
        }),
    );

    let response = ctx
        .post("/api/forms")
        .json(&json!({"title": "Feedback"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["id"], "form-1");
    assert_eq!(body["items"], json!([]));
    assert_eq!(
        body["responderUri"],
        "https://docs.google.com/forms/d/e/form-1/viewform"
    );

    let request = ctx.google.single_request(Method::POST, "/forms/v1/forms");
    assert_eq!(
        request.json(),
        json!({"info": {"title": "Feedback", "documentTitle": "Feedback"}})
    );
}

#[tokio::test]
async fn test_create_form_requires_title() {
    let ctx = TestContext::new().await;

    let response = ctx
        .post("/api/forms")
        .json(&json!({"documentTitle": "Only a file name"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&response), "Title is required");
}

#[tokio::test]
async fn test_get_form_passes_items_through() {
    let ctx = TestContext::new().await;
    ctx.google.ok(
        Method::GET,
        "/forms/v1/forms/form-1",
        json!({
            "formId": "form-1",
            "info": {"title": "Feedback", "description": "Tell us"},
            "items": [{
                "itemId": "i1",
                "title": "Rating",
                "questionItem": {"question": {"questionId": "q1", "scaleQuestion": {"low": 1, "high": 5}}}
            }]
        }),
    );

    let response = ctx.get("/api/forms/form-1").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["description"], "Tell us");
    assert_eq!(body["items"][0]["itemId"], "i1");
    assert_eq!(
        body["items"][0]["questionItem"]["question"]["scaleQuestion"]["high"],
        5
    );
}

#[tokio::test]
async fn test_get_form_responses() {
    let ctx = TestContext::new().await;
    ctx.google.ok(
        Method::GET,
        "/forms/v1/forms/form-1/responses",
        json!({
            "responses": [{
                "responseId": "r1",
                "lastSubmittedTime": "2024-01-01T10:00:00Z",
                "answers": {"q1": {"questionId": "q1", "textAnswers": {"answers": [{"value": "4"}]}}}
            }],
            "nextPageToken": "more"
        }),
    );

    let response = ctx
        .get("/api/forms/form-1")
        .add_query_param("responses", "true")
        .add_query_param("pageSize", "10")
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["nextPageToken"], "more");
    assert_eq!(
        body["responses"][0]["answers"]["q1"]["textAnswers"]["answers"][0]["value"],
        "4"
    );

    let request = ctx
        .google
        .single_request(Method::GET, "/forms/v1/forms/form-1/responses");
    assert_eq!(request.query_param("pageSize").as_deref(), Some("10"));
}

#[tokio::test]
async fn test_get_single_response() {
    let ctx = TestContext::new().await;
    ctx.google.ok(
        Method::GET,
        "/forms/v1/forms/form-1/responses/r1",
        json!({"responseId": "r1", "respondentEmail": "ada@example.com"}),
    );

    let response = ctx.get("/api/forms/form-1/responses/r1").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["responseId"], "r1");
    assert_eq!(body["respondentEmail"], "ada@example.com");
}

#[tokio::test]
async fn test_update_form_info_with_field_mask() {
    let ctx = TestContext::new().await;
    ctx.google
        .ok(Method::POST, "/forms/v1/forms/form-1:batchUpdate", json!({}));

    let response = ctx
        .patch("/api/forms/form-1")
        .json(&json!({"description": "Updated intro"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), json!({"success": true}));

    let request = ctx
        .google
        .single_request(Method::POST, "/forms/v1/forms/form-1:batchUpdate");
    assert_eq!(
        request.json(),
        json!({"requests": [{"updateFormInfo": {
            "info": {"description": "Updated intro"},
            "updateMask": "description"
        }}]})
    );
}

#[tokio::test]
async fn test_empty_form_update_skips_google() {
    let ctx = TestContext::new().await;

    let response = ctx.patch("/api/forms/form-1").json(&json!({})).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(ctx.google.requests().is_empty());
}

#[tokio::test]
async fn test_add_choice_question() {
    let ctx = TestContext::new().await;
    ctx.google.ok(
        Method::POST,
        "/forms/v1/forms/form-1:batchUpdate",
        json!({"replies": [{"createItem": {"itemId": "new"}}]}),
    );

    let response = ctx
        .post("/api/forms/form-1")
        .json(&json!({
            "action": "addQuestion",
            "index": 2,
            "question": {
                "title": "Favourite colour",
                "type": "MULTIPLE_CHOICE",
                "required": true,
                "options": ["Red", "Blue"]
            }
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);

    let request = ctx
        .google
        .single_request(Method::POST, "/forms/v1/forms/form-1:batchUpdate");
    assert_eq!(
        request.json()["requests"][0]["createItem"],
        json!({
            "item": {
                "title": "Favourite colour",
                "questionItem": {"question": {
                    "required": true,
                    "choiceQuestion": {
                        "type": "RADIO",
                        "options": [{"value": "Red"}, {"value": "Blue"}]
                    }
                }}
            },
            "location": {"index": 2}
        })
    );
}

#[tokio::test]
async fn test_add_question_validation() {
    let ctx = TestContext::new().await;

    let response = ctx
        .post("/api/forms/form-1")
        .json(&json!({"action": "addQuestion", "question": {"title": "No type"}}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&response), "Question title and type are required");

    let response = ctx
        .post("/api/forms/form-1")
        .json(&json!({"action": "publish"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&response), "Invalid action");
}
