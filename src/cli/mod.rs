use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod chat;
pub mod generate;
pub mod serve;

use crate::core::AppConfig;

#[derive(Subcommand)]
enum Command {
    /// Run the API server
    Serve {
        /// Set the server host address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Set the server port
        #[arg(long, default_value = "2222")]
        port: String,
    },
    /// Start an interactive UIDL chat session
    Chat {},
    /// Print the canonical requirement sentence for a prompt
    Extract {
        #[arg(long)]
        prompt: String,
    },
    /// Generate a UIDL document for a prompt and print it as it streams
    Generate {
        #[arg(long)]
        prompt: String,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();
    let config = AppConfig::default();

    // Handle each sub command
    match args.command {
        Some(Command::Serve { host, port }) => {
            serve::run(host, port, config).await?;
        }
        Some(Command::Chat {}) => {
            chat::run(config).await?;
        }
        Some(Command::Extract { prompt }) => {
            generate::extract(&prompt, config).await?;
        }
        Some(Command::Generate { prompt }) => {
            generate::run(&prompt, config).await?;
        }
        None => {}
    }

    Ok(())
}
