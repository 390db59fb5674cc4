//! The core models for managing a constraint elicitation session.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::openai::Message;

/// Ordered conversation history. Messages are only ever appended,
/// except for an explicit `reset` when the history is compacted.
#[derive(Clone, Debug, Default)]
pub struct Transcript(Vec<Message>);

impl Transcript {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn new_with_messages(messages: Vec<Message>) -> Self {
        Self(messages)
    }

    pub fn messages(&self) -> &[Message] {
        &self.0
    }

    pub fn push(&mut self, msg: Message) {
        self.0.push(msg)
    }

    /// Replace the whole history.
    pub fn reset(&mut self, messages: Vec<Message>) {
        self.0 = messages;
    }
}

/// A confirmed fact about the valid inputs of the function.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Constraint(String);

impl Constraint {
    pub fn new(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting on the backend for the next reply
    AwaitingReply,
    /// A question was surfaced and the user needs to answer it
    AwaitingUserInput,
    /// A constraint was proposed and the user needs to accept or
    /// reject it
    AwaitingConfirmation { proposed: String },
    Done,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::AwaitingReply => "AWAITING_REPLY",
            SessionState::AwaitingUserInput => "AWAITING_USER_INPUT",
            SessionState::AwaitingConfirmation { .. } => "AWAITING_CONFIRMATION",
            SessionState::Done => "DONE",
        }
    }
}
