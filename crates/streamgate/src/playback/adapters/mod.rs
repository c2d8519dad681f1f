//! Concrete engines and the factory that picks between them

pub mod adaptive;
pub mod native;

pub use adaptive::HlsEngine;
pub use native::NativeSourceEngine;

use reqwest::Client;
use tracing::debug;

use crate::errors::AppResult;

use super::engine::{EngineConfig, EngineFactory, EventEmitter, StreamingEngine};
use super::strategy::PlaybackStrategy;

/// Maps each strategy to its engine. Holds the HTTP client shared by every
/// adaptive engine it creates.
#[derive(Clone)]
pub struct DefaultEngineFactory {
    client: Client,
    config: EngineConfig,
    bearer_token: Option<String>,
}

impl DefaultEngineFactory {
    pub fn new(config: EngineConfig, user_agent: &str) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .pool_idle_timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: EngineConfig) -> Self {
        Self {
            client,
            config,
            bearer_token: None,
        }
    }

    /// Credential sent with every manifest load
    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token.filter(|t| !t.trim().is_empty());
        self
    }
}

impl EngineFactory for DefaultEngineFactory {
    fn create(
        &self,
        strategy: PlaybackStrategy,
        emitter: EventEmitter,
    ) -> Box<dyn StreamingEngine> {
        debug!(token = %emitter.token(), strategy = strategy.as_str(), "Creating engine");
        match strategy {
            PlaybackStrategy::Adaptive => Box::new(HlsEngine::new(
                self.client.clone(),
                self.config.clone(),
                self.bearer_token.clone(),
                emitter,
            )),
            PlaybackStrategy::Native => Box::new(NativeSourceEngine::new(emitter, true)),
            PlaybackStrategy::Direct => Box::new(NativeSourceEngine::new(emitter, false)),
        }
    }
}
