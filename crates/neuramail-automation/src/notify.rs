/// User-visible outcome of one automation cycle step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutomationEvent {
    EmailsFetched { count: usize },
    NoNewEmails,
    AutoReplied { count: usize },
    AutoReplyFailed { reason: String },
    FetchFailed { reason: String },
    SessionMissing,
}

impl std::fmt::Display for AutomationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmailsFetched { count } => write!(f, "Fetched {count} emails"),
            Self::NoNewEmails => f.write_str("No new emails"),
            Self::AutoReplied { count } => write!(f, "Auto-replied to {count} emails"),
            Self::AutoReplyFailed { reason } => write!(f, "Failed to auto-reply: {reason}"),
            Self::FetchFailed { reason } => write!(f, "Automation failed: {reason}"),
            Self::SessionMissing => f.write_str("Sign in to enable automation"),
        }
    }
}

/// Sink for cycle outcomes, kept apart from the cycle's decision logic.
/// The CLI prints them; tests collect them.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: AutomationEvent);
}

/// Routes events into the tracing stream.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, event: AutomationEvent) {
        match &event {
            AutomationEvent::AutoReplyFailed { .. }
            | AutomationEvent::FetchFailed { .. }
            | AutomationEvent::SessionMissing => tracing::warn!("{event}"),
            _ => tracing::info!("{event}"),
        }
    }
}
