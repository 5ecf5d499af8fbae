use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

use banter::config::{is_known_model, Config, KNOWN_MODELS};
use banter::gateway::{HttpInference, HttpPersistence};
use banter::session::ChatSession;
use banter::store::ConversationState;
use banter::types::Sender;

type Session = ChatSession<HttpPersistence, HttpInference>;

#[derive(Parser)]
#[command(name = "banter")]
#[command(version = "0.1.0")]
#[command(about = "Terminal client for a multi-model AI chat service", long_about = None)]
struct Cli {
    /// Model serving this session (overrides the configured default)
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start or resume an interactive chat
    Chat {
        /// Conversation to resume; omit to start fresh on first send
        conversation_id: Option<String>,
    },
    /// List all conversations
    List,
    /// Delete a conversation
    Delete { conversation_id: String },
    /// Show the models the service can route
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    let model = match cli.model {
        Some(model) => {
            if !is_known_model(&model) {
                println!("❌ Unknown model '{}'. Run 'banter models' to see what's available.", model);
                return Ok(());
            }
            model
        }
        None => config.default_model.clone(),
    };

    let token = config.get_auth_token();
    let persistence = HttpPersistence::new(&config.gateway_url, token.clone());
    let inference = HttpInference::new(&config.gateway_url, token);
    let session = ChatSession::new(persistence, inference, &model);

    match cli.command {
        None | Some(Commands::Chat { conversation_id: None }) => {
            run_chat(&session, None).await
        }
        Some(Commands::Chat { conversation_id }) => run_chat(&session, conversation_id).await,
        Some(Commands::List) => list_conversations(&session).await,
        Some(Commands::Delete { conversation_id }) => {
            delete_conversation(&session, &conversation_id).await
        }
        Some(Commands::Models) => {
            list_models();
            Ok(())
        }
    }
}

async fn list_conversations(session: &Session) -> Result<()> {
    session.load_conversations().await?;

    let store = session.store();
    if store.is_empty() {
        println!("📭 No conversations yet. Run 'banter chat' to start one!");
        return Ok(());
    }

    println!("💬 Your conversations:\n");
    for conv in store.iter() {
        println!("  {}  {}", conv.id(), conv.title());
    }
    Ok(())
}

async fn delete_conversation(session: &Session, conversation_id: &str) -> Result<()> {
    session.delete_conversation(conversation_id).await?;
    println!("🗑️  Deleted conversation {}", conversation_id);
    Ok(())
}

fn list_models() {
    println!("🧠 Models the service can route:\n");
    for model in KNOWN_MODELS.iter() {
        println!("  {:<24} ({})", model.id, model.provider);
    }
}

async fn run_chat(session: &Session, conversation_id: Option<String>) -> Result<()> {
    let mut current = conversation_id;

    if let Some(id) = &current {
        session.load_conversations().await?;
        session.ensure_messages_loaded(id).await?;
        let store = session.store();
        match store.get(id) {
            Some(conv) => print_transcript(conv),
            None => {
                println!("❌ Conversation '{}' not found.", id);
                return Ok(());
            }
        }
    } else {
        println!("💬 New conversation. Type a message to begin, or /help for commands.");
    }

    loop {
        print!("\n> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if let Some(command) = input.strip_prefix('/') {
            if handle_slash_command(session, command) {
                break;
            }
            continue;
        }

        print!("🤖 ");
        io::stdout().flush()?;

        let result = session
            .send_message_with(input, current.as_deref(), |delta| {
                print!("{}", delta);
                let _ = io::stdout().flush();
            })
            .await;
        println!();

        match result {
            Ok(outcome) => {
                if outcome.is_new {
                    let store = session.store();
                    if let Some(conv) = store.get(&outcome.conversation_id) {
                        println!("✨ Started \"{}\" ({})", conv.title(), conv.id());
                    }
                    drop(store);
                    current = Some(outcome.conversation_id);
                }
            }
            Err(err) => println!("❌ {}", err),
        }
    }

    println!("👋 Bye!");
    Ok(())
}

/// Returns true when the chat loop should exit.
fn handle_slash_command(session: &Session, command: &str) -> bool {
    let mut parts = command.split_whitespace();
    match parts.next() {
        Some("quit") | Some("bye") | Some("exit") => return true,
        Some("model") => match parts.next() {
            Some(model) if is_known_model(model) => {
                session.set_model(model);
                println!("🧠 Switched to {}", model);
            }
            Some(model) => {
                println!("❌ Unknown model '{}'. Run /models to see what's available.", model)
            }
            None => println!("🧠 Current model: {}", session.model()),
        },
        Some("models") => list_models(),
        Some("help") => {
            println!("Commands:");
            println!("  /model [id]  show or switch the active model");
            println!("  /models      list available models");
            println!("  /quit        leave the chat");
        }
        Some(other) => println!("❌ Unknown command '/{}'. Try /help.", other),
        None => {}
    }
    false
}

fn print_transcript(conversation: &ConversationState) {
    println!("💬 {}\n", conversation.title());
    for entry in conversation.entries() {
        let message = entry.message();
        match message.sender {
            Sender::User => println!("👤 {}", message.text),
            Sender::Bot => println!("🤖 {}", message.text),
        }
        println!();
    }
}
