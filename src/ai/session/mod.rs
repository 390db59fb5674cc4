mod driver;
mod error;
mod machine;
mod models;

pub use driver::{SessionDriver, UserInterface};
pub use error::{SessionError, TransitionError};
pub use machine::{CONFIRMATION_TOKEN, ConversationMachine, Directive, InputOutcome};
pub use models::{Constraint, SessionState, Transcript};
