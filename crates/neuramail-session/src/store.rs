use crate::SessionError;
use neuramail_core::Session;
use std::fs;
use std::path::{Path, PathBuf};

const SESSION_FILE: &str = "session.json";

/// File-backed session credentials. Every authenticated call goes through
/// this store rather than reading ambient state, so there is exactly one
/// place a credential can appear or disappear.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn open(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SESSION_FILE),
        }
    }

    pub fn load(&self) -> Result<Option<Session>, SessionError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Written only after the backend confirmed the sign-in.
    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        let content = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, content)?;
        tracing::debug!(user = %session.user_email, "session stored");
        Ok(())
    }

    /// Sign-out: all stored keys go away together.
    pub fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn require(&self) -> Result<Session, SessionError> {
        self.load()?.ok_or(SessionError::Missing)
    }
}

#[cfg(test)]
mod tests {
    use super::{SessionError, SessionStore};
    use neuramail_core::Session;

    fn sample() -> Session {
        Session {
            access_token: "tok-123".to_string(),
            user_email: "ada@example.com".to_string(),
            login_id: "login-9".to_string(),
            remember_user: true,
        }
    }

    #[test]
    fn round_trips_and_clears_wholesale() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = SessionStore::open(dir.path());

        assert!(store.load().expect("empty load").is_none());
        assert!(matches!(store.require(), Err(SessionError::Missing)));

        store.save(&sample()).expect("save");
        let loaded = store.require().expect("stored session");
        assert_eq!(loaded, sample());

        store.clear().expect("clear");
        assert!(store.load().expect("load after clear").is_none());
        // Clearing an already-empty store is not an error.
        store.clear().expect("second clear");
    }

    #[test]
    fn corrupt_file_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = SessionStore::open(dir.path());
        std::fs::write(dir.path().join("session.json"), "not json").expect("write");

        assert!(matches!(store.load(), Err(SessionError::Json(_))));
    }

    #[test]
    fn debug_never_prints_the_token() {
        let formatted = format!("{:?}", sample());
        assert!(!formatted.contains("tok-123"));
        assert!(formatted.contains("[REDACTED]"));
    }
}
