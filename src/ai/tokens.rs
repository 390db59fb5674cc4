//! Estimates how much of the model's context window a transcript
//! will consume. Only used as an admission check before a request is
//! sent, nothing here ever shortens the transcript.

use anyhow::Result;
use tiktoken_rs::CoreBPE;

use crate::openai::{Message, Role};

// Every message is wrapped in `<|start|>{role}\n{content}<|end|>\n`
// and every reply is primed with `<|start|>assistant<|message|>`.
const TOKENS_PER_MESSAGE: usize = 3;
const REPLY_PRIMING_TOKENS: usize = 3;

pub struct TokenEstimator {
    model: String,
    bpe: CoreBPE,
}

impl TokenEstimator {
    /// Resolve the tokenizer for `model`. Models `tiktoken` doesn't
    /// know about (e.g. a local OpenAI compatible server) are counted
    /// with `cl100k_base`.
    pub fn for_model(model: &str) -> Result<Self> {
        let bpe = match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => bpe,
            Err(e) => {
                tracing::debug!("No tokenizer for model {}, using cl100k_base: {}", model, e);
                tiktoken_rs::cl100k_base()?
            }
        };
        Ok(Self {
            model: model.to_string(),
            bpe,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn estimate(&self, turns: &[Message]) -> usize {
        let framed: usize = turns
            .iter()
            .map(|turn| {
                TOKENS_PER_MESSAGE
                    + self.count(role_name(turn.role()))
                    + self.count(turn.content())
            })
            .sum();
        framed + REPLY_PRIMING_TOKENS
    }

    fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

fn role_name(role: &Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::Assistant => "assistant",
        Role::User => "user",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_counts_reply_priming_for_empty_transcript() {
        let estimator = TokenEstimator::for_model("gpt-3.5-turbo").unwrap();
        assert_eq!(estimator.estimate(&[]), REPLY_PRIMING_TOKENS);
    }

    #[test]
    fn it_is_deterministic() {
        let estimator = TokenEstimator::for_model("gpt-3.5-turbo").unwrap();
        let turns = vec![
            Message::system("You are a large language model."),
            Message::user("Ask your first question"),
        ];
        assert_eq!(estimator.estimate(&turns), estimator.estimate(&turns));
    }

    #[test]
    fn it_grows_with_content() {
        let estimator = TokenEstimator::for_model("gpt-3.5-turbo").unwrap();
        let short = vec![Message::user("yes")];
        let long = vec![Message::user(
            "The input is a list of integers that may contain duplicates and negative numbers",
        )];
        assert!(estimator.estimate(&long) > estimator.estimate(&short));

        // Framing alone costs something per message
        let two = vec![Message::user("yes"), Message::user("yes")];
        assert!(estimator.estimate(&two) > estimator.estimate(&short));
    }

    #[test]
    fn it_falls_back_for_unknown_models() {
        let estimator = TokenEstimator::for_model("llama-3-local").unwrap();
        assert_eq!(estimator.model(), "llama-3-local");
        assert!(estimator.estimate(&[Message::user("hello")]) > REPLY_PRIMING_TOKENS);
    }
}
