//! Interactive chat: upload a document, then answer questions from stdin

use super::ingest::{cmd_ingest, print_document};
use crate::chat::{Message, MessageBody, Role, GREETING};
use crate::cite::{Span, TextBlock};
use crate::config::Config;
use crate::error::{ErrorClass, Result};
use crate::progress::track_pipeline;
use crate::session::Session;
use chrono::Local;
use crossterm::style::Stylize;
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

const QUIT_COMMANDS: [&str; 2] = ["/quit", "/exit"];

pub async fn cmd_chat(config: &Config, path: &Path, json: bool) -> Result<()> {
    let session = Session::connect(config)?;
    let document = cmd_ingest(&session, path, !json).await?;
    if !json {
        print_document(&document);
    }

    let greeting = session
        .log()
        .append(Role::Assistant, MessageBody::text(GREETING));
    emit(&greeting, json)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt(json);
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if QUIT_COMMANDS.contains(&line) {
            break;
        }
        if line.is_empty() {
            prompt(json);
            continue;
        }

        match session.ask(line) {
            Ok(handle) => {
                let tracker = (!json).then(|| track_pipeline(session.query().subscribe()));
                let reply = handle.wait().await?;
                if let Some(tracker) = tracker {
                    let _ = tracker.await;
                }
                emit(&reply, json)?;
            }
            Err(e) if e.class() == ErrorClass::Validation => warn!("{}", e),
            Err(e) => return Err(e),
        }
        prompt(json);
    }

    Ok(())
}

fn prompt(json: bool) {
    if json {
        return;
    }
    print!("\n> ");
    let _ = std::io::stdout().flush();
}

fn emit(message: &Message, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(message)?);
    } else {
        print_message(message);
    }
    Ok(())
}

fn styled(block: &TextBlock) -> String {
    block
        .spans
        .iter()
        .map(|span| match span {
            Span::Plain(text) => text.clone(),
            Span::Strong(text) => text.as_str().bold().to_string(),
        })
        .collect()
}

/// Print a message with its time and speaker
pub fn print_message(message: &Message) {
    let speaker = match message.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    let time = message.timestamp.with_timezone(&Local).format("%H:%M");
    println!("\n[{}] {}:", time, speaker);

    match &message.body {
        MessageBody::Text(text) => println!("{}", text),
        MessageBody::Blocks(blocks) => {
            for (i, block) in blocks.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                println!("{}", styled(block));
            }
        }
    }
}
