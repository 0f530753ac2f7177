use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("not signed in")]
    Missing,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file parse error: {0}")]
    Json(#[from] serde_json::Error),
}
