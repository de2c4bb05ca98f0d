// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Smallest quiz a user may request.
pub const MIN_QUESTION_COUNT: u32 = 1;
/// Largest quiz a user may request.
pub const MAX_QUESTION_COUNT: u32 = 20;
/// Quiz length used when the request does not specify one.
pub const DEFAULT_QUESTION_COUNT: u32 = 10;
/// Every generated multiple-choice question carries exactly this many options.
pub const QUESTION_OPTION_COUNT: usize = 4;
/// Number of flashcards generated per request.
pub const FLASHCARD_COUNT: u32 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub generator_timeout_secs: u64,
    /// Live quiz sessions older than this are dropped without being persisted.
    pub session_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = parse_or("JWT_EXPIRATION", 24 * 60 * 60);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let port = parse_or("PORT", 3000);

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173,http://127.0.0.1:5173".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let gemini_api_key = env::var("GEMINI_API_KEY").unwrap_or_else(|_| {
            tracing::warn!("GEMINI_API_KEY is not set; quiz generation will fail");
            String::new()
        });

        let gemini_model = env::var("GEMINI_MODEL")
            .unwrap_or_else(|_| "gemini-1.5-flash".to_string());

        let gemini_base_url = env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta/".to_string());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            port,
            cors_origins,
            gemini_api_key,
            gemini_model,
            gemini_base_url,
            generator_timeout_secs: parse_or("GENERATOR_TIMEOUT_SECS", 60),
            session_ttl_secs: parse_or("SESSION_TTL_SECS", 60 * 60),
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring unparsable {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}
