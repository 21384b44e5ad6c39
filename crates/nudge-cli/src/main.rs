mod repl;

use std::sync::Arc;

use chat_engine::{
    ConversationEngine, EngineConfig, HttpGateway, HttpTranscriptStore, TranscriptStore,
};
use clap::Parser;
use status_tools::StatusToolExecutor;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use repl::{describe_state, render, Input, HELP};

#[derive(Debug, Parser)]
#[command(name = "nudge")]
#[command(about = "Chat with Nudge from the terminal")]
struct Args {
    /// Resume an existing conversation
    #[arg(long)]
    conversation: Option<String>,

    /// List your conversations and exit
    #[arg(long, conflicts_with_all = ["conversation", "delete"])]
    list: bool,

    /// Delete a conversation and exit
    #[arg(long)]
    delete: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let config = EngineConfig::from_env()?;
    let store = Arc::new(HttpTranscriptStore::new(&config)?);

    if args.list {
        for info in store.get_conversations().await? {
            println!(
                "{}  updated {}  ({})",
                info.id,
                info.updated_at,
                describe_state(&info.metadata)
            );
        }
        return Ok(());
    }

    if let Some(id) = args.delete {
        store.delete_conversation(&id).await?;
        println!("Deleted {}", id);
        return Ok(());
    }

    let gateway = HttpGateway::new(&config)?;
    let engine =
        ConversationEngine::new(config, gateway, StatusToolExecutor::new()).with_store(store);

    if let Some(id) = args.conversation {
        engine.resume(&id).await?;
    }

    for message in engine.visible_messages().await {
        if let Some(line) = render(&message) {
            println!("{}", line);
        }
    }
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"you> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match Input::parse(&line) {
            Input::Quit => break,
            Input::Help => println!("{}", HELP),
            Input::Status => println!("Status: {}", describe_state(&engine.tool_state().await)),
            Input::Id => match engine.conversation_id().await {
                Some(id) => println!("Conversation: {}", id),
                None => println!("Conversation not saved yet"),
            },
            Input::Unknown(cmd) => println!("Unknown command {}. {}", cmd, HELP),
            Input::Message(text) => match engine.submit(&text).await {
                Ok(reply) => println!("nudge> {}", reply),
                Err(err) => println!("! {}", err.user_message()),
            },
        }
    }

    Ok(())
}
