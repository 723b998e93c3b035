//! Default values for configuration

/// Default backend base URL
pub fn default_backend_url() -> String {
    std::env::var("RAGCHAT_BACKEND_URL").unwrap_or_else(|_| "http://localhost:8000".to_string())
}

/// Default upload endpoint path
pub fn default_upload_path() -> String {
    "/upload".to_string()
}

/// Default query endpoint path
pub fn default_query_path() -> String {
    "/query".to_string()
}

/// Default user agent
pub fn default_user_agent() -> String {
    format!("ragchat/{}", env!("CARGO_PKG_VERSION"))
}

/// Default ingestion step interval (2 seconds)
pub fn default_ingest_step_ms() -> u64 {
    2000
}

/// Default query step interval (2 seconds)
pub fn default_query_step_ms() -> u64 {
    2000
}
