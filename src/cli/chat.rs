use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;

use crate::ai::chat::ChatSession;
use crate::ai::{OpenAiClient, Pipeline, ReferenceGrammar};
use crate::core::AppConfig;

const RESET_COMMAND: &str = "/reset";

pub async fn run(config: AppConfig) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    let client = Arc::new(OpenAiClient::from_config(&config));
    let grammar = ReferenceGrammar::from_config(&config)?;
    let pipeline = Arc::new(Pipeline::new(client, grammar));
    let session = ChatSession::new(pipeline, &config.greeting);

    println!("{}", config.greeting);

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                if line == RESET_COMMAND {
                    session.reset();
                    println!("{}", config.greeting);
                    continue;
                }

                // Print fragments as they arrive
                let (tx, mut rx) = mpsc::unbounded_channel::<String>();
                let printer = tokio::spawn(async move {
                    let mut stdout = io::stdout();
                    while let Some(fragment) = rx.recv().await {
                        let _ = write!(stdout, "{}", fragment);
                        let _ = stdout.flush();
                    }
                });

                let result = session.send(line, Some(tx)).await;
                printer.await?;
                println!();

                if let Err(err) = result {
                    println!("Error: {:#}", err);
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
