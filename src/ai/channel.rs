//! A single round trip to the text generation backend.
use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use thiserror::Error as ThisError;

use crate::ai::tokens::TokenEstimator;
use crate::openai::{CompletionParams, Message, completion};

/// Anything that can turn a transcript into the next assistant
/// message. Implementations should not retry on their own.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn complete(&self, turns: &[Message]) -> Result<String, Error>;
}

pub struct OpenAiBackend {
    api_hostname: String,
    api_key: String,
    model: String,
    params: CompletionParams,
}

impl OpenAiBackend {
    pub fn new(api_hostname: &str, api_key: &str, model: &str, params: CompletionParams) -> Self {
        Self {
            api_hostname: api_hostname.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            params,
        }
    }
}

#[async_trait]
impl Backend for OpenAiBackend {
    async fn complete(&self, turns: &[Message]) -> Result<String, Error> {
        let resp = completion(
            turns,
            &self.params,
            &self.api_hostname,
            &self.api_key,
            &self.model,
        )
        .await?;

        resp["choices"][0]["message"]["content"]
            .as_str()
            .map(String::from)
            .ok_or(anyhow!("No message received. Resp:\n\n {}", resp))
    }
}

#[derive(Debug, ThisError)]
pub enum ChannelError {
    #[error("Refusing to send an empty transcript")]
    EmptyHistory,
    #[error("Estimated {estimated} tokens exceeds the budget of {budget}")]
    BudgetExceeded { estimated: usize, budget: usize },
    #[error("Backend request failed: {0:#}")]
    Backend(Error),
}

pub struct Channel<B: Backend> {
    backend: B,
    estimator: TokenEstimator,
    budget: usize,
}

impl<B: Backend> Channel<B> {
    pub fn new(backend: B, estimator: TokenEstimator, budget: usize) -> Self {
        Self {
            backend,
            estimator,
            budget,
        }
    }

    pub fn estimate(&self, turns: &[Message]) -> usize {
        self.estimator.estimate(turns)
    }

    /// Send the transcript and return the reply text verbatim. The
    /// budget is checked before the backend is called and the
    /// transcript is never truncated to make it fit.
    pub async fn exchange(&self, turns: &[Message]) -> Result<String, ChannelError> {
        if turns.is_empty() {
            return Err(ChannelError::EmptyHistory);
        }

        let estimated = self.estimator.estimate(turns);
        tracing::debug!(
            "Estimated {} tokens for {} messages ({})",
            estimated,
            turns.len(),
            self.estimator.model()
        );
        if estimated > self.budget {
            return Err(ChannelError::BudgetExceeded {
                estimated,
                budget: self.budget,
            });
        }

        self.backend
            .complete(turns)
            .await
            .map_err(ChannelError::Backend)
    }
}
