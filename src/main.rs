use anyhow::Result;
use elicit::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
