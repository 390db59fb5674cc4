use anyhow::Error;
use handlebars::{RenderError, TemplateError};
use thiserror::Error as ThisError;

use crate::ai::channel::ChannelError;
use crate::ai::reply::MalformedReply;
use crate::openai::Message;

/// Errors from feeding an event to the conversation state machine
#[derive(Debug, ThisError)]
pub enum TransitionError {
    #[error("Invalid transition: can't handle {event} while {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },
    #[error("Failed to load prompt templates: {0}")]
    Templates(#[from] TemplateError),
    #[error("Failed to render prompt: {0}")]
    Prompt(#[from] RenderError),
}

/// Fatal errors that end a session
#[derive(Debug, ThisError)]
pub enum SessionError {
    #[error("Getting close to the token limit ({estimated} estimated, {budget} allowed), bailing")]
    BudgetExceeded { estimated: usize, budget: usize },
    #[error("Backend request failed: {0:#}")]
    Backend(Error),
    #[error("Exceeded max attempts ({attempts}) to get a well formed reply: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        last_error: MalformedReply,
        history: Vec<Message>,
    },
    #[error("Failed to read user input: {0:#}")]
    Input(Error),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl From<ChannelError> for SessionError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::BudgetExceeded { estimated, budget } => {
                SessionError::BudgetExceeded { estimated, budget }
            }
            ChannelError::Backend(e) => SessionError::Backend(e),
            other => SessionError::Backend(Error::new(other)),
        }
    }
}
