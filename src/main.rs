//! ragchat CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use ragchat::{
    commands::{cmd_ask, cmd_chat, cmd_ingest, cmd_init, print_document, print_init, print_message},
    config::Config,
    error::Result,
    progress::LogWriterFactory,
    session::Session,
};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "ragchat")]
#[command(version, about = "Chat with a PDF through a RAG backend", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Upload a PDF and print its document ID
    Ingest {
        /// Path to the PDF
        file: PathBuf,
    },

    /// Ask one question about an already uploaded document
    Ask {
        /// Document ID returned by 'ragchat ingest'
        #[arg(short, long)]
        document: String,

        /// The question
        query: String,
    },

    /// Upload a PDF, then ask questions from stdin (/quit to leave)
    Chat {
        /// Path to the PDF
        file: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory::default()))
        .with(filter)
        .init();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "ragchat", &mut std::io::stdout());
        return Ok(());
    }

    if let Commands::Init { force } = cli.command {
        // A --config pointing at a .toml file means its parent directory
        let base_dir = cli.config.map(|path| {
            if path.extension().is_some_and(|e| e == "toml") {
                path.parent().map(PathBuf::from).unwrap_or_else(Config::default_base_dir)
            } else {
                path
            }
        });
        let config = cmd_init(base_dir, force)?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            print_init(&config);
        }
        return Ok(());
    }

    let config = Config::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Ingest { file } => {
            let session = Session::connect(&config)?;
            let document = cmd_ingest(&session, &file, !cli.json).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&document)?);
            } else {
                print_document(&document);
            }
        }

        Commands::Ask { document, query } => {
            let outcome = cmd_ask(&config, &document, &query, !cli.json).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else if let Some(reply) = outcome.reply() {
                print_message(reply);
            }

            if !outcome.succeeded() {
                std::process::exit(1);
            }
        }

        Commands::Chat { file } => {
            cmd_chat(&config, &file, cli.json).await?;
        }

        Commands::Init { .. } | Commands::Completions { .. } => unreachable!(),
    }

    Ok(())
}
