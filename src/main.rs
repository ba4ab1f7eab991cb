use anyhow::Result;
use uidl_chat::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
