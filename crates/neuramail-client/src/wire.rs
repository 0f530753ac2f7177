//! Request and response shapes for the backend REST API.

use neuramail_core::{FetchedEmail, Profile, ThreadMessage, Ticket};
use serde::{Deserialize, Serialize};

/// Fields the user supplies when creating or updating a profile.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub auto_reply: bool,
}

/// Payload for a manual reply to a ticket message.
#[derive(Debug, Clone, Serialize)]
pub struct ReplyRequest {
    pub ticket_id: String,
    pub to_email: String,
    pub body: String,
    pub message_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub login_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// The `{ "status": "success" | "error", "message": ... }` envelope most
/// write endpoints answer with.
#[derive(Debug, Deserialize)]
pub(crate) struct StatusMessage {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileEnvelope {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub data: Option<Profile>,
}

/// Fetch responses nest the list twice: `{ "emails": { "email": [...] } }`.
/// Either level may be absent when the mailbox had nothing new.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct FetchEnvelope {
    #[serde(default)]
    pub emails: EmailBatch,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct EmailBatch {
    #[serde(default)]
    pub email: Vec<FetchedEmail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TicketListEnvelope {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Vec<Ticket>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TicketEnvelope {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Ticket>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ThreadListEnvelope {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Vec<ThreadMessage>,
}

/// Error bodies come in two dialects: `{ "detail": ... }` from the API
/// gateway and `{ "message": ... }` from the application layer.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
