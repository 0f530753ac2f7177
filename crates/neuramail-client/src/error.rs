use neuramail_session::SessionError;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// No stored session. Callers check this before anything goes on the wire.
    #[error("not signed in")]
    MissingCredential,
    #[error("session store error: {0}")]
    Session(#[source] SessionError),
    /// Connection-level failures are flattened to one user-facing message.
    #[error("could not reach the server, check your connection")]
    Transport(#[source] reqwest::Error),
    /// The backend answered with an error payload; `message` is shown verbatim.
    #[error("{message}")]
    Backend { status: StatusCode, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err)
        }
    }
}

impl From<SessionError> for ClientError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Missing => Self::MissingCredential,
            other => Self::Session(other),
        }
    }
}
