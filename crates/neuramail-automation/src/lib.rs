//! Background polling loop that refreshes the mailbox every minute and
//! triggers backend auto-replies when the profile gate allows it.

mod backend;
mod engine;
mod notify;
mod status;

pub use backend::AutomationBackend;
pub use engine::{
    evaluate_gate, AutoReplyGate, AutomationHandle, AutomationLoop, CycleReport, LoopSettings,
};
pub use notify::{AutomationEvent, Notifier, TracingNotifier};
pub use status::{AutomationStatus, CyclePhase, Operation};
