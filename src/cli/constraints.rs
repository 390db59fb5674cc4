use anyhow::{Result, bail};
use serde_json::json;

use super::openai_channel;
use super::terminal::TerminalUi;
use crate::ai::reply::{LenientExtractor, ReplyExtractor, StrictExtractor};
use crate::ai::session::{SessionDriver, UserInterface};
use crate::core::AppConfig;

pub async fn run(config: &AppConfig, purpose: Option<String>, strict: bool, json: bool) -> Result<()> {
    let mut ui = TerminalUi::new()?;

    let purpose = match purpose {
        Some(p) => p,
        None => ui.ask("Describe the purpose of the function")?,
    };
    let purpose = purpose.trim();
    if purpose.is_empty() {
        bail!("A description of the function's purpose is required");
    }

    let extractor: Box<dyn ReplyExtractor> = if strict {
        Box::new(StrictExtractor)
    } else {
        Box::new(LenientExtractor)
    };

    let channel = openai_channel(config)?;
    let mut driver = SessionDriver::new(channel, ui, config.max_retries);

    println!("Entering phase 1: Establish input space.");
    let constraints = driver.run_with_extractor(purpose, extractor).await?;

    if json {
        println!(
            "{}",
            json!({
                "purpose": purpose,
                "constraints": constraints,
            })
        );
    }

    Ok(())
}
