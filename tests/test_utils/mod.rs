//! Test utilities for integration tests
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;

use elicit::ai::channel::{Backend, Channel};
use elicit::ai::session::UserInterface;
use elicit::ai::tokens::TokenEstimator;
use elicit::openai::Message;

pub type Requests = Arc<Mutex<Vec<Vec<Message>>>>;

/// Backend that plays back canned replies in order and records every
/// transcript it was sent.
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Requests,
}

impl ScriptedBackend {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            requests: Requests::default(),
        }
    }

    /// Backend whose next request fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Err(message.to_string())])),
            requests: Requests::default(),
        }
    }

    /// Shared log of the transcripts sent, still readable after the
    /// backend is moved into a channel.
    pub fn requests(&self) -> Requests {
        self.requests.clone()
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn complete(&self, turns: &[Message]) -> Result<String, Error> {
        self.requests.lock().unwrap().push(turns.to_vec());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("Script ran out of replies")),
        }
    }
}

/// User that answers every question from a script and records
/// everything shown to them.
#[derive(Default)]
pub struct ScriptedUi {
    answers: VecDeque<String>,
    pub shown: Vec<String>,
    pub asked: Vec<String>,
}

impl ScriptedUi {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            shown: Vec::new(),
            asked: Vec::new(),
        }
    }

    pub fn output(&self) -> String {
        self.shown.join("\n")
    }
}

impl UserInterface for ScriptedUi {
    fn show(&mut self, text: &str) {
        self.shown.push(text.to_string());
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        self.asked.push(prompt.to_string());
        self.answers
            .pop_front()
            .ok_or(anyhow!("Script ran out of answers"))
    }
}

pub fn channel<B: Backend>(backend: B, budget: usize) -> Channel<B> {
    let estimator = TokenEstimator::for_model("gpt-3.5-turbo").expect("Missing tokenizer");
    Channel::new(backend, estimator, budget)
}
