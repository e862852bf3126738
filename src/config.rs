// src/config.rs

use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub session_file: PathBuf,
    pub expiry_check_interval_secs: u64,
    pub token_ttl_secs: i64,
    pub submit_quiz_requires_auth: bool,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let api_base_url = env::var("LINGUATECH_API_URL").expect("LINGUATECH_API_URL must be set");

        let session_file = env::var("LINGUATECH_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_session_file());

        let expiry_check_interval_secs = env::var("LINGUATECH_EXPIRY_CHECK_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        let token_ttl_secs = env::var("LINGUATECH_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        // Whether /questions/submit-quiz wants a bearer header differs
        // between deployments; default to sending it.
        let submit_quiz_requires_auth = env::var("LINGUATECH_SUBMIT_QUIZ_AUTH")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            api_base_url,
            session_file,
            expiry_check_interval_secs,
            token_ttl_secs,
            submit_quiz_requires_auth,
            rust_log,
        }
    }
}

fn default_session_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("linguatech")
        .join("session.json")
}
