//! Completion provider abstraction.

use std::sync::Arc;

use async_trait::async_trait;
use ragqa_core::{ChatMessage, Generation, GenerationService, Role};
use rig::client::Nothing;
use rig::completion::{AssistantContent, CompletionError, CompletionModel as RigCompletionModel, Usage};
use rig::message::Message;
use rig::one_or_many::OneOrMany;
use rig::prelude::CompletionClient;
use rig::providers::{cohere, ollama, openai};
use serde::{Deserialize, Serialize};

use super::pricing::{generation_cost, supports_temperature};
use crate::{Error, Result, TRACING_TARGET_PROVIDER};

/// Sampling limits applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Maximum tokens generated.
    pub max_tokens: u64,
    /// Sampling temperature.
    pub temperature: f64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_tokens: 1000,
            temperature: 0.1,
        }
    }
}

/// Completion provider that wraps different rig completion model implementations.
///
/// This is a cheaply cloneable wrapper around an `Arc<CompletionService>`.
#[derive(Clone)]
pub struct CompletionProvider {
    service: Arc<CompletionService>,
    settings: GenerationSettings,
}

enum CompletionService {
    OpenAi {
        model: openai::CompletionModel,
        model_name: String,
    },
    Cohere {
        model: cohere::CompletionModel,
        model_name: String,
    },
    Ollama {
        client: ollama::Client,
        model_name: String,
    },
}

/// A request translated into rig messages.
struct Request<'a> {
    prompt: &'a str,
    preamble: Option<String>,
    history: Vec<Message>,
    max_tokens: u64,
    temperature: Option<f64>,
}

impl CompletionProvider {
    fn from_service(service: CompletionService) -> Self {
        Self {
            service: Arc::new(service),
            settings: GenerationSettings::default(),
        }
    }

    /// Creates an OpenAI completion provider.
    pub fn openai(api_key: &str, model: &str) -> Result<Self> {
        let client = openai::Client::new(api_key)
            .map_err(|e| Error::provider("openai", e.to_string()))?
            .completions_api();

        Ok(Self::from_service(CompletionService::OpenAi {
            model: client.completion_model(model),
            model_name: model.to_owned(),
        }))
    }

    /// Creates a Cohere completion provider.
    pub fn cohere(api_key: &str, model: &str) -> Result<Self> {
        let client =
            cohere::Client::new(api_key).map_err(|e| Error::provider("cohere", e.to_string()))?;

        Ok(Self::from_service(CompletionService::Cohere {
            model: client.completion_model(model),
            model_name: model.to_owned(),
        }))
    }

    /// Creates an Ollama completion provider.
    pub fn ollama(base_url: &str, model: &str) -> Result<Self> {
        let client = ollama::Client::builder()
            .api_key(Nothing)
            .base_url(base_url)
            .build()
            .map_err(|e| Error::provider("ollama", e.to_string()))?;

        Ok(Self::from_service(CompletionService::Ollama {
            client,
            model_name: model.to_owned(),
        }))
    }

    /// Sets the sampling limits.
    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns the sampling limits.
    pub fn settings(&self) -> GenerationSettings {
        self.settings
    }

    /// Returns the model name.
    pub fn model_name(&self) -> &str {
        match self.service.as_ref() {
            CompletionService::OpenAi { model_name, .. } => model_name,
            CompletionService::Cohere { model_name, .. } => model_name,
            CompletionService::Ollama { model_name, .. } => model_name,
        }
    }

    /// Returns the provider name.
    pub fn provider_name(&self) -> &'static str {
        match self.service.as_ref() {
            CompletionService::OpenAi { .. } => "openai",
            CompletionService::Cohere { .. } => "cohere",
            CompletionService::Ollama { .. } => "ollama",
        }
    }

    fn request<'a>(&self, prompt: &'a str, history: &[ChatMessage]) -> Request<'a> {
        let (preamble, history) = to_rig_history(history);
        let temperature =
            supports_temperature(self.model_name()).then_some(self.settings.temperature);

        Request {
            prompt,
            preamble,
            history,
            max_tokens: self.settings.max_tokens,
            temperature,
        }
    }
}

#[async_trait]
impl GenerationService for CompletionProvider {
    async fn generate(&self, prompt: &str, history: &[ChatMessage]) -> ragqa_core::Result<Generation> {
        let request = self.request(prompt, history);

        let result = match self.service.as_ref() {
            CompletionService::OpenAi { model, .. } => send(model, request).await,
            CompletionService::Cohere { model, .. } => send(model, request).await,
            CompletionService::Ollama { client, model_name } => {
                let model = client.completion_model(model_name);
                send(&model, request).await
            }
        };

        let (text, usage) =
            result.map_err(|e| Error::provider(self.provider_name(), e.to_string()))?;

        let total_tokens = match usage.total_tokens {
            0 => usage.input_tokens + usage.output_tokens,
            total => total,
        };
        let cost = generation_cost(self.model_name(), usage.input_tokens, usage.output_tokens);

        tracing::debug!(
            target: TRACING_TARGET_PROVIDER,
            provider = self.provider_name(),
            model = self.model_name(),
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            cost = %cost,
            "Generated completion"
        );

        Ok(Generation {
            text,
            total_tokens,
            cost,
        })
    }
}

async fn send<M: RigCompletionModel>(
    model: &M,
    request: Request<'_>,
) -> std::result::Result<(String, Usage), CompletionError> {
    let mut builder = model
        .completion_request(request.prompt)
        .messages(request.history)
        .max_tokens(request.max_tokens);

    if let Some(preamble) = request.preamble {
        builder = builder.preamble(preamble);
    }

    if let Some(temperature) = request.temperature {
        builder = builder.temperature(temperature);
    }

    let response = builder.send().await?;
    Ok((extract_text_content(&response.choice), response.usage))
}

/// Splits a chat history into a preamble built from its system messages and
/// the remaining turns.
fn to_rig_history(history: &[ChatMessage]) -> (Option<String>, Vec<Message>) {
    let system: Vec<&str> = history
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();

    let turns = history
        .iter()
        .filter_map(|m| match m.role {
            Role::System => None,
            Role::User => Some(Message::user(m.content.clone())),
            Role::Assistant => Some(Message::assistant(m.content.clone())),
        })
        .collect();

    let preamble = (!system.is_empty()).then(|| system.join("\n\n"));
    (preamble, turns)
}

/// Extracts text content from assistant content choices.
fn extract_text_content(choice: &OneOrMany<AssistantContent>) -> String {
    choice
        .iter()
        .filter_map(|content| match content {
            AssistantContent::Text(text) => Some(text.text()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("")
}

impl std::fmt::Debug for CompletionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self.service.as_ref() {
            CompletionService::OpenAi { .. } => "CompletionProvider::OpenAi",
            CompletionService::Cohere { .. } => "CompletionProvider::Cohere",
            CompletionService::Ollama { .. } => "CompletionProvider::Ollama",
        };

        f.debug_struct(name)
            .field("model", &self.model_name())
            .field("settings", &self.settings)
            .finish()
    }
}
