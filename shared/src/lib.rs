pub mod clients;
pub mod config;
pub mod telemetry;
pub mod utils;

pub use clients::ai::{AIClient, LanguageModel};
pub use config::AiConfig;
