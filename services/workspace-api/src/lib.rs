pub mod assistant;
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod freebusy;
pub mod google;
pub mod handlers;
pub mod mime;

pub use assistant::Assistant;
pub use axum::Router;
pub use config::WorkspaceApiConfig;
pub use error::ApiError;
pub use google::{GoogleClient, GoogleEndpoints};

use axum::{
    middleware,
    routing::{get, post},
};
use shared::{
    telemetry::{self, TelemetryConfig},
    AIClient,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;

use handlers::{ai, calendar, docs, drive, forms, gmail, sheets};

#[derive(Clone)]
pub struct AppState {
    pub google: GoogleClient,
    pub assistant: Assistant,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Gmail
        .route("/api/gmail/messages", get(gmail::list_messages))
        .route(
            "/api/gmail/messages/:id",
            get(gmail::get_message)
                .patch(gmail::modify_message)
                .delete(gmail::trash_message),
        )
        .route("/api/gmail/send", post(gmail::send_message))
        .route("/api/gmail/labels", get(gmail::list_labels))
        .route(
            "/api/gmail/attachments/:message_id/:attachment_id",
            get(gmail::get_attachment),
        )
        // Calendar
        .route("/api/calendar/list", get(calendar::list_calendars))
        .route(
            "/api/calendar/events",
            get(calendar::list_events).post(calendar::create_event),
        )
        .route(
            "/api/calendar/events/:event_id",
            get(calendar::get_event)
                .patch(calendar::update_event)
                .delete(calendar::delete_event),
        )
        .route("/api/calendar/freebusy", post(calendar::free_busy))
        // Drive
        .route(
            "/api/drive/files",
            get(drive::list_files).post(drive::create_file),
        )
        .route(
            "/api/drive/files/:file_id",
            get(drive::get_file)
                .patch(drive::update_file)
                .delete(drive::delete_file),
        )
        .route("/api/drive/shared", get(drive::list_shared))
        .route("/api/drive/starred", get(drive::list_starred))
        .route("/api/drive/quota", get(drive::storage_quota))
        // Docs
        .route(
            "/api/docs",
            get(docs::list_documents).post(docs::create_document),
        )
        .route(
            "/api/docs/:document_id",
            get(docs::get_document).post(docs::document_action),
        )
        // Sheets
        .route(
            "/api/sheets",
            get(sheets::list_spreadsheets).post(sheets::create_spreadsheet),
        )
        .route(
            "/api/sheets/:spreadsheet_id",
            get(sheets::get_spreadsheet)
                .put(sheets::update_values)
                .post(sheets::spreadsheet_action),
        )
        // Forms
        .route("/api/forms", get(forms::list_forms).post(forms::create_form))
        .route(
            "/api/forms/:form_id",
            get(forms::get_form)
                .patch(forms::update_form)
                .post(forms::form_action),
        )
        .route(
            "/api/forms/:form_id/responses/:response_id",
            get(forms::get_response),
        )
        // AI
        .route("/api/ai/summarize", post(ai::summarize))
        .route("/api/ai/reply", post(ai::reply))
        .route("/api/ai/categorize", post(ai::categorize))
        .route("/api/ai/actions", post(ai::actions))
        .route("/api/ai/analyze", post(ai::analyze))
        .route("/api/ai/security", post(ai::security))
        .route("/api/ai/improve", post(ai::improve))
        .route("/api/ai/calendar", post(ai::calendar))
        .route("/api/ai/docs", post(ai::docs))
        .route("/api/ai/sheets", post(ai::sheets))
        .route("/api/ai/forms", post(ai::forms))
        .route("/api/ai/drive", post(ai::drive))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(telemetry::middleware::trace_layer))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let telemetry_config = TelemetryConfig::from_env("workspace-api");
    telemetry::init_telemetry(telemetry_config)?;

    info!("Workspace API starting...");

    let config = WorkspaceApiConfig::from_env();

    let ai_client = AIClient::new(&config.ai)?;
    info!("AI client initialized (model {})", ai_client.model());

    let google = GoogleClient::new(
        config.google.clone(),
        Duration::from_secs(config.google_timeout_seconds),
    )?;
    info!("Google API client initialized");

    let app_state = AppState {
        google,
        assistant: Assistant::new(Arc::new(ai_client)),
    };

    let app = create_app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Workspace API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    telemetry::shutdown_telemetry().await;
    Ok(())
}
