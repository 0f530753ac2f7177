use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bearer credential plus identity, written once on a successful sign-in
/// and destroyed wholesale on sign-out.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user_email: String,
    pub login_id: String,
    pub remember_user: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field("user_email", &self.user_email)
            .field("login_id", &self.login_id)
            .field("remember_user", &self.remember_user)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub profile_name: String,
    pub profile_email: String,
    pub auto_reply: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Profile {
    /// True when the assistant credential is present and non-empty.
    pub fn has_assistant_token(&self) -> bool {
        self.assistant_token
            .as_deref()
            .is_some_and(|token| !token.trim().is_empty())
    }
}

/// Outcome of asking the backend for the signed-in user's profile.
///
/// A 404, or a success envelope carrying no profile body, means the account
/// exists but no profile was created yet; that is `NotFound`, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileLookup {
    Found(Profile),
    NotFound,
    Error(String),
}

impl ProfileLookup {
    pub fn profile(&self) -> Option<&Profile> {
        match self {
            Self::Found(profile) => Some(profile),
            Self::NotFound | Self::Error(_) => None,
        }
    }
}

/// Requested voice for drafted replies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReplyTone {
    Professional,
    Casual,
    Friendly,
}

impl Default for ReplyTone {
    fn default() -> Self {
        Self::Professional
    }
}

impl std::fmt::Display for ReplyTone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Professional => "professional",
            Self::Casual => "casual",
            Self::Friendly => "friendly",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for ReplyTone {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "professional" => Ok(Self::Professional),
            "casual" => Ok(Self::Casual),
            "friendly" => Ok(Self::Friendly),
            other => Err(format!("unknown tone `{other}`")),
        }
    }
}

/// One message inside a ticket thread. `reply` transitions once from `None`
/// to a sent reply body and never reverts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub message_id: String,
    pub request_description: String,
    pub email_body: String,
    #[serde(rename = "Reply")]
    pub reply: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A backend-tracked email conversation. Serde renames mirror the backend's
/// JSON casing exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_no: String,
    pub sender_email: String,
    #[serde(rename = "Subject")]
    pub subject: String,
    pub request_type: String,
    /// Newest-first in list views.
    #[serde(rename = "Thread")]
    pub thread: Vec<ThreadMessage>,
    pub status: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn latest_message(&self) -> Option<&ThreadMessage> {
        self.thread.first()
    }
}

/// One email surfaced by a mailbox refresh. The backend is loose about
/// which fields it populates, so all of them are optional; the refresh
/// count is the primary observable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchedEmail {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub sender_email: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
}

/// Canonical result of a mailbox refresh, normalized from the backend's
/// nested `emails.email` envelope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    pub emails: Vec<FetchedEmail>,
}

impl FetchOutcome {
    pub fn count(&self) -> usize {
        self.emails.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{Profile, ProfileLookup, Ticket};

    #[test]
    fn ticket_honors_backend_casing() {
        let raw = r#"{
            "ticket_no": "T-100",
            "sender_email": "ada@example.com",
            "Subject": "Broken export",
            "request_type": "support",
            "Thread": [{
                "message_id": "m1",
                "request_description": "export fails",
                "email_body": "The CSV export hangs.",
                "Reply": null,
                "timestamp": "2025-04-02T09:30:00Z"
            }],
            "status": "open",
            "createdAt": "2025-04-02T09:30:00Z",
            "updatedAt": "2025-04-02T10:00:00Z"
        }"#;

        let ticket: Ticket = serde_json::from_str(raw).expect("ticket parses");
        assert_eq!(ticket.subject, "Broken export");
        assert_eq!(ticket.thread.len(), 1);
        assert!(ticket.latest_message().expect("one message").reply.is_none());
    }

    #[test]
    fn blank_assistant_token_does_not_count() {
        let mut profile = Profile {
            profile_name: "Ada".to_string(),
            profile_email: "ada@example.com".to_string(),
            auto_reply: true,
            assistant_id: None,
            assistant_token: Some("  ".to_string()),
            phone: None,
        };
        assert!(!profile.has_assistant_token());

        profile.assistant_token = Some("sk-live".to_string());
        assert!(profile.has_assistant_token());

        assert!(ProfileLookup::Found(profile).profile().is_some());
        assert!(ProfileLookup::NotFound.profile().is_none());
    }
}
