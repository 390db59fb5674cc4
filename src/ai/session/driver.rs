use anyhow::{Error, Result};
use itertools::Itertools;
use tracing::Instrument;
use uuid::Uuid;

use super::error::SessionError;
use super::machine::{ConversationMachine, Directive, InputOutcome};
use super::models::Constraint;
use crate::ai::channel::{Backend, Channel};
use crate::ai::reply::{LenientExtractor, ReplyExtractor};

const CONFIRMATION_QUESTION: &str =
    "Is this correct? Write exactly 'yes' if it is, otherwise describe what you want improved.";

/// Line based interaction with whoever is answering the questions.
pub trait UserInterface {
    fn show(&mut self, text: &str);

    /// Show `prompt` and read back a single line.
    fn ask(&mut self, prompt: &str) -> Result<String, Error>;
}

/// Runs a session to completion, connecting the state machine to the
/// backend and the user.
pub struct SessionDriver<B: Backend, U: UserInterface> {
    channel: Channel<B>,
    ui: U,
    max_retries: u32,
}

impl<B: Backend, U: UserInterface> SessionDriver<B, U> {
    pub fn new(channel: Channel<B>, ui: U, max_retries: u32) -> Self {
        Self {
            channel,
            ui,
            max_retries,
        }
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub async fn run(&mut self, purpose: &str) -> Result<Vec<Constraint>, SessionError> {
        self.run_with_extractor(purpose, Box::new(LenientExtractor))
            .await
    }

    /// Collect constraints for the function described by `purpose`.
    /// Fatal errors are reported to the user, along with whatever
    /// state is useful for a postmortem, before being returned.
    pub async fn run_with_extractor(
        &mut self,
        purpose: &str,
        extractor: Box<dyn ReplyExtractor>,
    ) -> Result<Vec<Constraint>, SessionError> {
        let mut machine = ConversationMachine::new(purpose, extractor)?;
        let span = tracing::info_span!("session", id = %Uuid::new_v4());

        let result = self.drive(&mut machine).instrument(span).await;
        if let Err(err) = &result {
            self.report(&machine, err);
        }
        result
    }

    async fn drive(
        &mut self,
        machine: &mut ConversationMachine,
    ) -> Result<Vec<Constraint>, SessionError> {
        // Consecutive malformed replies since the last valid one
        let mut attempts = 0;

        loop {
            let raw = self.channel.exchange(machine.history()).await?;
            tracing::debug!("Received reply:\n{}", raw);

            match machine.on_reply(&raw)? {
                Directive::Retry { error } => {
                    attempts += 1;
                    tracing::warn!(
                        "Malformed reply ({}/{}): {}",
                        attempts,
                        self.max_retries,
                        error
                    );
                    if attempts >= self.max_retries {
                        return Err(SessionError::RetriesExhausted {
                            attempts,
                            last_error: error,
                            history: machine.history().to_vec(),
                        });
                    }
                }
                Directive::Ask { question, known } => {
                    attempts = 0;
                    if !known.is_empty() {
                        self.ui.show("Current constraints");
                        self.show_constraints(&known);
                    }
                    let answer = self.ui.ask(&question).map_err(SessionError::Input)?;
                    machine.on_user_input(&answer)?;
                }
                Directive::Confirm { summary } => {
                    attempts = 0;
                    self.ui.show("Constraint captured:");
                    self.ui.show(&summary);
                    let answer = self
                        .ui
                        .ask(CONFIRMATION_QUESTION)
                        .map_err(SessionError::Input)?;
                    match machine.on_user_input(&answer)? {
                        InputOutcome::Accepted(constraint) => {
                            tracing::info!(
                                "Stored constraint {}: {}",
                                machine.constraints().len(),
                                constraint
                            );
                        }
                        _ => tracing::debug!("Constraint needs revision"),
                    }
                }
                Directive::Finish { constraints } => {
                    self.ui.show("Finished collecting constraints");
                    self.show_constraints(&constraints);
                    return Ok(constraints);
                }
            }
        }
    }

    fn show_constraints(&mut self, constraints: &[Constraint]) {
        let listing = constraints
            .iter()
            .enumerate()
            .map(|(idx, constraint)| format!("Constraint {}: {}", idx + 1, constraint))
            .join("\n");
        self.ui.show(&listing);
    }

    fn report(&mut self, machine: &ConversationMachine, err: &SessionError) {
        tracing::error!("Session failed: {}", err);

        if let SessionError::RetriesExhausted { history, .. } = err {
            let log = serde_json::to_string_pretty(history)
                .unwrap_or_else(|_| format!("{:#?}", history));
            self.ui.show("Message log:");
            self.ui.show(&log);
        }

        let constraints = machine.constraints();
        if constraints.is_empty() {
            self.ui.show("No constraints were captured");
        } else {
            self.ui.show("Constraints captured so far");
            self.show_constraints(constraints);
        }
    }
}
