use crate::prompt::Prompt;
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use legal_rag_common::{RagConfig, RagError, Result};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Turns an assembled prompt into answer text. One call, one network round-trip.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    fn model_id(&self) -> &str;

    async fn generate(&self, prompt: &Prompt) -> Result<String>;
}

/// Chat completions against any OpenAI-compatible endpoint (Groq by default).
pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl OpenAiGenerator {
    pub fn new(config: &RagConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_base(&config.llm_api_base);
        match &config.api_key {
            Some(key) => openai_config = openai_config.with_api_key(key),
            None => warn!("No LLM API key configured; generation requests will be rejected"),
        }

        info!(
            "Using chat model '{}' at {}",
            config.llm_model, config.llm_api_base
        );

        Self {
            client: Client::with_config(openai_config),
            model: config.llm_model.clone(),
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

#[async_trait]
impl AnswerGenerator for OpenAiGenerator {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(prompt.system.clone())
                    .build()
                    .map_err(|e| RagError::Generation(e.to_string()))?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt.user.clone())
                    .build()
                    .map_err(|e| RagError::Generation(e.to_string()))?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .build()
            .map_err(|e| RagError::Generation(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| {
                error!("Chat completion timed out after {:?}", self.timeout);
                RagError::Generation(format!("request timed out after {:?}", self.timeout))
            })?
            .map_err(|e| {
                error!("Chat completion API error: {}", e);
                RagError::Generation(e.to_string())
            })?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                RagError::Generation("malformed response: no completion content".to_string())
            })?;

        debug!("Generated {} characters with '{}'", text.len(), self.model);
        Ok(text)
    }
}
