use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Result;
use futures_util::StreamExt;

use crate::ai::{OpenAiClient, Pipeline, ReferenceGrammar};
use crate::core::AppConfig;

fn pipeline(config: &AppConfig) -> Result<Pipeline> {
    let client = Arc::new(OpenAiClient::from_config(config));
    let grammar = ReferenceGrammar::from_config(config)?;
    Ok(Pipeline::new(client, grammar))
}

/// Run only the extraction stage
pub async fn extract(prompt: &str, config: AppConfig) -> Result<()> {
    let canonical = pipeline(&config)?.extract(prompt).await?;
    println!("{}", canonical);
    Ok(())
}

pub async fn run(prompt: &str, config: AppConfig) -> Result<()> {
    let mut generation = pipeline(&config)?.run(prompt).await?;
    eprintln!("{}", generation.canonical());

    let mut stdout = io::stdout();
    while let Some(fragment) = generation.next().await {
        write!(stdout, "{}", fragment?)?;
        stdout.flush()?;
    }
    writeln!(stdout)?;

    Ok(())
}
