use std::sync::Arc;
use std::time::Duration;

use neuramail_core::{FetchOutcome, ProfileLookup, Session, ThreadMessage, Ticket};
use neuramail_session::SessionStore;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use url::Url;

use crate::error::ClientError;
use crate::wire::{
    ErrorBody, FetchEnvelope, LoginResponse, ProfileDraft, ProfileEnvelope, ReplyRequest,
    StatusMessage, ThreadListEnvelope, TicketEnvelope, TicketListEnvelope,
};

/// Per-request deadlines. Mailbox fetches poll a slow upstream and automated
/// replies run a model call server-side, so both get their own budget.
#[derive(Debug, Clone, Copy)]
pub struct RequestTimeouts {
    pub request: Duration,
    pub fetch: Duration,
    pub automation: Duration,
}

impl Default for RequestTimeouts {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(10),
            fetch: Duration::from_secs(180),
            automation: Duration::from_secs(60),
        }
    }
}

/// Typed access to the NeuraMail REST backend.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
    timeouts: RequestTimeouts,
    sessions: Arc<SessionStore>,
}

impl BackendClient {
    pub fn new(base_url: Url, timeouts: RequestTimeouts, sessions: Arc<SessionStore>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            timeouts,
            sessions,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    fn session(&self) -> Result<Session, ClientError> {
        Ok(self.sessions.require()?)
    }

    // ---- auth ----

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.endpoint("/auth/sign-up"))
            .timeout(self.timeouts.request)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        read_status_message(response).await
    }

    pub async fn confirm_sign_up(&self, email: &str, code: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.endpoint("/auth/confirm-sign-up"))
            .timeout(self.timeouts.request)
            .json(&serde_json::json!({ "email": email, "confirmation_code": code }))
            .send()
            .await?;
        read_status_message(response).await
    }

    /// Exchanges credentials for an access token. The session file is written
    /// only after the backend confirms the sign-in, so a rejected attempt
    /// leaves no stored state behind.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
        remember: bool,
    ) -> Result<Session, ClientError> {
        let response = self
            .http
            .post(self.endpoint("/auth/login"))
            .timeout(self.timeouts.request)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(backend_error(status, &body));
        }

        let body: LoginResponse = response.json().await?;
        if !body.status {
            return Err(ClientError::Backend {
                status,
                message: body
                    .message
                    .unwrap_or_else(|| "sign-in rejected".to_string()),
            });
        }
        let access_token = body
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ClientError::Decode("login response missing access_token".into()))?;

        let session = Session {
            access_token,
            user_email: email.to_string(),
            login_id: body.login_id.unwrap_or_default(),
            remember_user: remember,
        };
        self.sessions.save(&session)?;
        tracing::info!(user = %session.user_email, "signed in");
        Ok(session)
    }

    /// Drops every stored credential in one step.
    pub fn sign_out(&self) -> Result<(), ClientError> {
        Ok(self.sessions.clear()?)
    }

    // ---- profile ----

    /// Looks up the signed-in user's profile and folds the outcome into a
    /// tri-state answer. A missing session is the only hard error here;
    /// transport and backend failures become [`ProfileLookup::Error`] so the
    /// caller can keep its automation gate closed without aborting.
    pub async fn check_profile(&self) -> Result<ProfileLookup, ClientError> {
        let session = self.session()?;

        let sent = self
            .http
            .get(self.endpoint("/profile/get-profile"))
            .timeout(self.timeouts.request)
            .bearer_auth(&session.access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await;
        let response = match sent {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!("profile lookup failed: {err}");
                return Ok(ProfileLookup::Error(ClientError::from(err).to_string()));
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(ProfileLookup::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Ok(ProfileLookup::Error(backend_message(status, &body)));
        }

        match response.json::<ProfileEnvelope>().await {
            Ok(envelope) if envelope.status == "success" => match envelope.data {
                Some(profile) => Ok(ProfileLookup::Found(profile)),
                None => Ok(ProfileLookup::NotFound),
            },
            Ok(_) => Ok(ProfileLookup::NotFound),
            Err(err) => Ok(ProfileLookup::Error(format!(
                "unexpected profile response: {err}"
            ))),
        }
    }

    pub async fn create_profile(&self, draft: &ProfileDraft) -> Result<String, ClientError> {
        self.post_profile("/profile/create-profile", draft).await
    }

    pub async fn update_profile(&self, draft: &ProfileDraft) -> Result<String, ClientError> {
        self.post_profile("/profile/update-profile", draft).await
    }

    async fn post_profile(&self, path: &str, draft: &ProfileDraft) -> Result<String, ClientError> {
        let session = self.session()?;
        let response = self
            .http
            .post(self.endpoint(path))
            .timeout(self.timeouts.request)
            .bearer_auth(&session.access_token)
            .json(draft)
            .send()
            .await?;
        read_status_message(response).await
    }

    /// Replaces the set of request categories the mailbox is sorted into.
    /// The backend expects the bare array as the request body.
    pub async fn update_request_types(
        &self,
        request_types: &[String],
    ) -> Result<String, ClientError> {
        let session = self.session()?;
        let response = self
            .http
            .post(self.endpoint("/profile/update-req-types"))
            .timeout(self.timeouts.request)
            .bearer_auth(&session.access_token)
            .json(&request_types)
            .send()
            .await?;
        read_status_message(response).await
    }

    /// Stores the assistant token that arms automated replies. Sent as a
    /// query parameter with an empty body.
    pub async fn update_assistant_token(&self, token: &str) -> Result<String, ClientError> {
        let session = self.session()?;
        let response = self
            .http
            .post(self.endpoint("/profile/update-assistant-token"))
            .timeout(self.timeouts.request)
            .bearer_auth(&session.access_token)
            .query(&[("token", token)])
            .send()
            .await?;
        read_status_message(response).await
    }

    // ---- email ----

    /// Pulls new mail from the connected mailbox into the ticket store.
    /// Runs under the long fetch deadline; the upstream mailbox scan can
    /// take minutes.
    pub async fn fetch_emails(&self, keyword: Option<&str>) -> Result<FetchOutcome, ClientError> {
        let session = self.session()?;
        let mut request = self
            .http
            .get(self.endpoint("/email/emails"))
            .timeout(self.timeouts.fetch)
            .bearer_auth(&session.access_token)
            .header(ACCEPT, "application/json");
        if let Some(keyword) = keyword {
            request = request.query(&[("keyword", keyword)]);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(backend_error(status, &body));
        }
        let envelope: FetchEnvelope = response.json().await?;
        Ok(FetchOutcome {
            emails: envelope.emails.email,
        })
    }

    pub async fn get_all_queries(&self) -> Result<Vec<Ticket>, ClientError> {
        let session = self.session()?;
        let response = self
            .http
            .get(self.endpoint("/email/get-all-queries"))
            .timeout(self.timeouts.request)
            .bearer_auth(&session.access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(backend_error(status, &body));
        }
        let envelope: TicketListEnvelope = response.json().await?;
        if envelope.status == "success" {
            Ok(envelope.data)
        } else {
            Err(ClientError::Backend {
                status,
                message: envelope
                    .message
                    .unwrap_or_else(|| "ticket listing failed".to_string()),
            })
        }
    }

    // ---- responses ----

    pub async fn reply_to_email(&self, reply: &ReplyRequest) -> Result<String, ClientError> {
        let session = self.session()?;
        let response = self
            .http
            .post(self.endpoint("/response/reply-to-email"))
            .timeout(self.timeouts.request)
            .bearer_auth(&session.access_token)
            .json(reply)
            .send()
            .await?;
        read_status_message(response).await
    }

    pub async fn get_full_thread(&self, ticket_id: &str) -> Result<Ticket, ClientError> {
        let session = self.session()?;
        let response = self
            .http
            .get(self.endpoint("/response/get-full-thread"))
            .timeout(self.timeouts.request)
            .bearer_auth(&session.access_token)
            .query(&[("ticket_id", ticket_id)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(backend_error(status, &body));
        }
        let envelope: TicketEnvelope = response.json().await?;
        if envelope.status != "success" {
            return Err(ClientError::Backend {
                status,
                message: envelope
                    .message
                    .unwrap_or_else(|| "thread lookup failed".to_string()),
            });
        }
        envelope
            .data
            .ok_or_else(|| ClientError::Decode("thread response missing data".into()))
    }

    pub async fn get_latest_threads(
        &self,
        ticket_id: &str,
    ) -> Result<Vec<ThreadMessage>, ClientError> {
        let session = self.session()?;
        let response = self
            .http
            .get(self.endpoint("/response/get-latest-email-threads"))
            .timeout(self.timeouts.request)
            .bearer_auth(&session.access_token)
            .query(&[("ticket_id", ticket_id)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(backend_error(status, &body));
        }
        let envelope: ThreadListEnvelope = response.json().await?;
        if envelope.status == "success" {
            Ok(envelope.data)
        } else {
            Err(ClientError::Backend {
                status,
                message: envelope
                    .message
                    .unwrap_or_else(|| "thread lookup failed".to_string()),
            })
        }
    }

    // ---- automation ----

    /// Asks the backend to draft and send replies for every unanswered
    /// ticket. The whole batch runs server-side under one deadline.
    pub async fn send_automated_reply(&self) -> Result<(), ClientError> {
        let session = self.session()?;
        let response = self
            .http
            .post(self.endpoint("/auto/response/automated-response/reply-to-email"))
            .timeout(self.timeouts.automation)
            .bearer_auth(&session.access_token)
            .header(ACCEPT, "application/json")
            .json(&serde_json::json!({}))
            .send()
            .await?;
        read_status_message(response).await.map(|_| ())
    }
}

async fn read_status_message(response: reqwest::Response) -> Result<String, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(backend_error(status, &body));
    }
    let envelope: StatusMessage = response.json().await?;
    if envelope.status == "success" {
        Ok(envelope.message.unwrap_or_default())
    } else {
        Err(ClientError::Backend {
            status,
            message: envelope
                .message
                .unwrap_or_else(|| "backend reported failure".to_string()),
        })
    }
}

fn backend_error(status: StatusCode, body: &str) -> ClientError {
    ClientError::Backend {
        status,
        message: backend_message(status, body),
    }
}

/// Pulls the human-readable error out of a failure body, trying the
/// `detail` dialect first, then `message`, then falling back to the status.
fn backend_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.detail.or(parsed.message))
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| format!("request failed with status {status}"))
}
