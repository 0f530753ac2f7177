use neuramail_core::ReplyTone;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub version: u32,
    pub backend: BackendConfig,
    pub assistant: AssistantConfig,
    pub automation: AutomationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: Url,
    /// Default timeout for auth, profile, and response calls.
    pub request_timeout_secs: u64,
    /// Mailbox refresh blocks while the backend ingests new mail.
    pub fetch_timeout_secs: u64,
    pub automation_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    pub api_base: String,
    pub model: String,
    pub default_tone: ReplyTone,
    /// Maximum characters of thread context sent per prompt.
    pub max_context_chars: usize,
    pub reply: GenerationConfig,
    pub query: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    pub poll_interval_secs: u64,
    /// Cosmetic delay before the status badge falls back to idle.
    pub idle_reset_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            backend: BackendConfig {
                base_url: Url::parse("http://localhost:8000/api").expect("valid default base url"),
                request_timeout_secs: 10,
                fetch_timeout_secs: 180,
                automation_timeout_secs: 60,
            },
            assistant: AssistantConfig {
                api_base: "https://api.openai.com/v1".to_string(),
                model: "gpt-3.5-turbo".to_string(),
                default_tone: ReplyTone::Professional,
                max_context_chars: 2000,
                reply: GenerationConfig {
                    temperature: 0.7,
                    max_tokens: 500,
                },
                query: GenerationConfig {
                    temperature: 0.5,
                    max_tokens: 1500,
                },
            },
            automation: AutomationConfig {
                poll_interval_secs: 60,
                idle_reset_secs: 3,
            },
        }
    }
}
