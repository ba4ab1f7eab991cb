use std::sync::Arc;

use anyhow::Result;

use crate::ai::chat::ChatSession;
use crate::ai::{ModelClient, OpenAiClient, Pipeline, ReferenceGrammar};
use crate::core::AppConfig;

pub struct AppState {
    pub config: AppConfig,
    pub client: Arc<dyn ModelClient>,
    pub pipeline: Arc<Pipeline>,
    // The single server-side conversation
    pub session: ChatSession,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let client: Arc<dyn ModelClient> = Arc::new(OpenAiClient::from_config(&config));
        let grammar = ReferenceGrammar::from_config(&config)?;
        Ok(Self::with_client(config, client, grammar))
    }

    pub fn with_client(
        config: AppConfig,
        client: Arc<dyn ModelClient>,
        grammar: ReferenceGrammar,
    ) -> Self {
        let pipeline = Arc::new(Pipeline::new(Arc::clone(&client), grammar));
        let session = ChatSession::new(Arc::clone(&pipeline), &config.greeting);
        Self {
            config,
            client,
            pipeline,
            session,
        }
    }
}
