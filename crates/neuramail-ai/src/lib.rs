mod error;
mod service;

pub use error::AiError;
pub use service::{
    AssistantAnswer, AssistantRuntime, AssistantService, GenerationBudget, RelevantTicket,
};
