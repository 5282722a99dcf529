use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "LembreMed";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Timeout for the advice collaborator call. Failures past this
/// point fall back to the default advice text.
pub const ADVICE_TIMEOUT_SECS: u64 = 15;

/// SQLite database path (`LEMBREMED_DB` overrides the default
/// `medicamentos.db` in the working directory).
pub fn database_path() -> PathBuf {
    std::env::var("LEMBREMED_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("medicamentos.db"))
}

/// Socket address the HTTP server binds to (`LEMBREMED_ADDR` overrides).
pub fn bind_addr() -> String {
    std::env::var("LEMBREMED_ADDR").unwrap_or_else(|_| "127.0.0.1:5000".to_string())
}

/// Gemini API key. Absent means advice generation is disabled and
/// every creation receives the fallback text.
pub fn gemini_api_key() -> Option<String> {
    std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty())
}

/// Gemini model id (`GEMINI_MODEL` overrides).
pub fn gemini_model() -> String {
    std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash-lite".to_string())
}

/// Gemini API base URL (`GEMINI_BASE_URL` overrides; tests point this
/// at a local stub).
pub fn gemini_base_url() -> String {
    std::env::var("GEMINI_BASE_URL")
        .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string())
}

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "lembremed=info"
}
