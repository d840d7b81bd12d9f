use shared::config::{get_optional_env, get_required_env, parse_port, parse_seconds, validate_url};
use shared::AiConfig;

use crate::google::{
    GoogleEndpoints, CALENDAR_API_BASE, DOCS_API_BASE, DRIVE_API_BASE, DRIVE_UPLOAD_BASE,
    FORMS_API_BASE, GMAIL_API_BASE, SHEETS_API_BASE,
};

#[derive(Debug, Clone)]
pub struct WorkspaceApiConfig {
    pub port: u16,
    pub google_timeout_seconds: u64,
    pub google: GoogleEndpoints,
    pub ai: AiConfig,
}

fn endpoint_from_env(var_name: &str, default: &str) -> String {
    validate_url(&get_optional_env(var_name, default), var_name)
}

impl WorkspaceApiConfig {
    pub fn from_env() -> Self {
        let port_str = get_required_env("PORT");
        let port = parse_port(&port_str, "PORT");

        let timeout_str = get_optional_env("GOOGLE_HTTP_TIMEOUT_SECONDS", "60");
        let google_timeout_seconds = parse_seconds(&timeout_str, "GOOGLE_HTTP_TIMEOUT_SECONDS");

        let google = GoogleEndpoints {
            gmail: endpoint_from_env("GOOGLE_GMAIL_API_BASE", GMAIL_API_BASE),
            calendar: endpoint_from_env("GOOGLE_CALENDAR_API_BASE", CALENDAR_API_BASE),
            drive: endpoint_from_env("GOOGLE_DRIVE_API_BASE", DRIVE_API_BASE),
            drive_upload: endpoint_from_env("GOOGLE_DRIVE_UPLOAD_BASE", DRIVE_UPLOAD_BASE),
            docs: endpoint_from_env("GOOGLE_DOCS_API_BASE", DOCS_API_BASE),
            sheets: endpoint_from_env("GOOGLE_SHEETS_API_BASE", SHEETS_API_BASE),
            forms: endpoint_from_env("GOOGLE_FORMS_API_BASE", FORMS_API_BASE),
        };

        Self {
            port,
            google_timeout_seconds,
            google,
            ai: AiConfig::from_env(),
        }
    }
}
