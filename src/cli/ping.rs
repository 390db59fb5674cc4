use anyhow::Result;

use super::openai_channel;
use crate::core::AppConfig;
use crate::openai::Message;

const SYSTEM_MESSAGE: &str = "You are a large language model. Answer as concisely as you can, and conform to the parameters given in prompts as tightly as you can.";

/// Smoke test the backend configuration with a single exchange.
pub async fn run(config: &AppConfig, prompt: &str) -> Result<()> {
    let channel = openai_channel(config)?;
    let messages = vec![Message::system(SYSTEM_MESSAGE), Message::user(prompt)];

    println!("Total tokens: {}", channel.estimate(&messages));
    let reply = channel.exchange(&messages).await?;
    println!("{}", reply);

    Ok(())
}
