pub mod channel;
pub mod prompt;
pub mod reply;
pub mod session;
pub mod tokens;
