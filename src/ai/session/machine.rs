//! Conversation state machine for eliciting input constraints.
//!
//! The machine owns the transcript and the confirmed constraints and
//! never talks to the user or the backend itself. Each event returns
//! what the caller needs to do next.

use handlebars::Handlebars;

use super::error::TransitionError;
use super::models::{Constraint, SessionState, Transcript};
use crate::ai::prompt::{
    self, FIRST_QUESTION, NEXT_QUESTION, initial_prompt, interim_prompt, revision_request,
    unknown_format_prompt,
};
use crate::ai::reply::{MalformedReply, ReplyExtractor, StructuredReply};
use crate::openai::Message;

/// The only user reply that accepts a proposed constraint. Case
/// sensitive.
pub const CONFIRMATION_TOKEN: &str = "yes";

/// What the caller must do after a reply was handled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive {
    /// Ask the user `question`. Any `known` constraints are shown
    /// first so the user has context for a new line of questioning.
    Ask {
        question: String,
        known: Vec<Constraint>,
    },
    /// Show the proposed constraint and ask the user to accept or
    /// reject it.
    Confirm { summary: String },
    /// Elicitation is complete.
    Finish { constraints: Vec<Constraint> },
    /// The reply was unusable and a corrective instruction has been
    /// added to the transcript. Request another reply.
    Retry { error: MalformedReply },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputOutcome {
    Answered,
    Accepted(Constraint),
    RevisionRequested,
}

pub struct ConversationMachine {
    purpose: String,
    templates: Handlebars<'static>,
    extractor: Box<dyn ReplyExtractor>,
    transcript: Transcript,
    constraints: Vec<Constraint>,
    state: SessionState,
}

impl ConversationMachine {
    pub fn new(purpose: &str, extractor: Box<dyn ReplyExtractor>) -> Result<Self, TransitionError> {
        let templates = prompt::templates()?;
        let system = initial_prompt(&templates, purpose)?;
        let transcript = Transcript::new_with_messages(vec![
            Message::system(&system),
            Message::user(FIRST_QUESTION),
        ]);

        Ok(Self {
            purpose: purpose.to_string(),
            templates,
            extractor,
            transcript,
            constraints: Vec::new(),
            state: SessionState::AwaitingReply,
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn history(&self) -> &[Message] {
        self.transcript.messages()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Handle the raw text of a backend reply.
    pub fn on_reply(&mut self, raw: &str) -> Result<Directive, TransitionError> {
        if self.state != SessionState::AwaitingReply {
            return Err(self.invalid("reply"));
        }

        self.transcript.push(Message::assistant(raw));

        let directive = match self.extractor.parse(raw) {
            Ok(StructuredReply::Intro(question)) => {
                self.state = SessionState::AwaitingUserInput;
                Directive::Ask {
                    question,
                    known: self.constraints.clone(),
                }
            }
            Ok(StructuredReply::FollowUp(question)) => {
                self.state = SessionState::AwaitingUserInput;
                Directive::Ask {
                    question,
                    known: Vec::new(),
                }
            }
            Ok(StructuredReply::ConstraintSummary(summary)) => {
                self.state = SessionState::AwaitingConfirmation {
                    proposed: summary.clone(),
                };
                Directive::Confirm { summary }
            }
            Ok(StructuredReply::Finished(_)) => {
                self.state = SessionState::Done;
                Directive::Finish {
                    constraints: self.constraints.clone(),
                }
            }
            Err(error) => {
                let correction = unknown_format_prompt(&self.templates)?;
                self.transcript.push(Message::user(&correction));
                Directive::Retry { error }
            }
        };

        Ok(directive)
    }

    /// Handle a line of text from the user, either answering a
    /// question or responding to a proposed constraint.
    pub fn on_user_input(&mut self, text: &str) -> Result<InputOutcome, TransitionError> {
        let proposed = match &self.state {
            SessionState::AwaitingUserInput => None,
            SessionState::AwaitingConfirmation { proposed } => Some(Constraint::new(proposed)),
            _ => return Err(self.invalid("user input")),
        };

        let outcome = match proposed {
            None => {
                self.transcript.push(Message::user(text));
                InputOutcome::Answered
            }
            Some(constraint) if text == CONFIRMATION_TOKEN => {
                self.accept(constraint.clone())?;
                InputOutcome::Accepted(constraint)
            }
            Some(_) => {
                self.transcript.push(Message::user(&revision_request(text)));
                InputOutcome::RevisionRequested
            }
        };

        self.state = SessionState::AwaitingReply;
        Ok(outcome)
    }

    // Store the constraint and compact the transcript down to a
    // summary of everything confirmed so far. Nothing changes if the
    // summary can't be rendered.
    fn accept(&mut self, constraint: Constraint) -> Result<(), TransitionError> {
        let mut confirmed = self.constraints.clone();
        confirmed.push(constraint);
        let summary = interim_prompt(&self.templates, &self.purpose, &confirmed)?;

        self.constraints = confirmed;
        self.transcript
            .reset(vec![Message::system(&summary), Message::user(NEXT_QUESTION)]);
        Ok(())
    }

    fn invalid(&self, event: &'static str) -> TransitionError {
        TransitionError::InvalidTransition {
            state: self.state.name(),
            event,
        }
    }
}
