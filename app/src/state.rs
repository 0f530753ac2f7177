use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use neuramail_ai::{AssistantRuntime, AssistantService, GenerationBudget};
use neuramail_automation::LoopSettings;
use neuramail_client::{BackendClient, RequestTimeouts};
use neuramail_config::{AppConfig, ConfigManager};
use neuramail_session::SessionStore;

/// Everything a command needs, wired once at startup.
pub struct App {
    pub config: AppConfig,
    pub sessions: Arc<SessionStore>,
    pub client: BackendClient,
}

impl App {
    pub fn initialize() -> anyhow::Result<Self> {
        let config_manager = ConfigManager::new().context("initialize config manager")?;
        let config = config_manager.load().context("load app config")?;

        let sessions = Arc::new(SessionStore::open(config_manager.data_dir()));
        let client = BackendClient::new(
            config.backend.base_url.clone(),
            request_timeouts(&config),
            sessions.clone(),
        );

        Ok(Self {
            config,
            sessions,
            client,
        })
    }

    /// Built on demand so commands that never touch the assistant do not
    /// require an API key.
    pub fn assistant(&self) -> anyhow::Result<AssistantService> {
        AssistantService::from_env(assistant_runtime(&self.config)).context("configure assistant")
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            poll_interval: Duration::from_secs(self.config.automation.poll_interval_secs),
            idle_reset: Duration::from_secs(self.config.automation.idle_reset_secs),
        }
    }
}

fn request_timeouts(config: &AppConfig) -> RequestTimeouts {
    RequestTimeouts {
        request: Duration::from_secs(config.backend.request_timeout_secs),
        fetch: Duration::from_secs(config.backend.fetch_timeout_secs),
        automation: Duration::from_secs(config.backend.automation_timeout_secs),
    }
}

fn assistant_runtime(config: &AppConfig) -> AssistantRuntime {
    AssistantRuntime {
        api_base: config.assistant.api_base.clone(),
        model: config.assistant.model.clone(),
        default_tone: config.assistant.default_tone,
        max_context_chars: config.assistant.max_context_chars,
        reply_budget: GenerationBudget {
            temperature: config.assistant.reply.temperature,
            max_tokens: config.assistant.reply.max_tokens,
        },
        query_budget: GenerationBudget {
            temperature: config.assistant.query.temperature,
            max_tokens: config.assistant.query.max_tokens,
        },
    }
}
