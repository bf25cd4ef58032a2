// This is the entry point of the TintLab customer assistant.
//
// **Architecture Overview:**
// - `core/` = Business logic (retrieval, generation, fallbacks)
// - `infra/` = Implementations of core traits (OpenAI API, knowledge documents)
// - `config.rs` = Environment-driven settings
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Run the requested command (`ask`, `chat` or `diagnose`)

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with a pile of mod.rs files that all look the same.
mod config;
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::config::{KnowledgeLocation, Settings};
use crate::core::assistant::conversation::{Conversation, QUICK_QUESTIONS};
use crate::core::assistant::diagnostics::run_diagnostics;
use crate::core::assistant::models::BusinessProfile;
use crate::core::assistant::{AiProviders, AssistantService, KnowledgeSource, ServiceStatus};
use crate::infra::ai::OpenAiClient;
use crate::infra::knowledge::{FileKnowledgeSource, HttpKnowledgeSource};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tintlab-assistant", version, about = "Customer-facing Q&A assistant for TintLab")]
struct Cli {
    /// Skip the hosted API even when OPENAI_API_KEY is set.
    #[arg(long, global = true)]
    offline: bool,

    /// Read knowledge documents from this directory.
    #[arg(long, global = true, conflicts_with = "knowledge_url")]
    knowledge_dir: Option<PathBuf>,

    /// Fetch knowledge documents from this base URL.
    #[arg(long, global = true)]
    knowledge_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Answer a single question and print the reply as JSON.
    Ask { question: String },
    /// Interactive chat over stdin.
    Chat {
        /// Save the conversation as JSON to this file on exit.
        #[arg(long)]
        transcript: Option<PathBuf>,
    },
    /// Run the diagnostic question battery.
    Diagnose {
        /// Print the results as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::from_env();
    if let Some(dir) = cli.knowledge_dir.clone() {
        settings.knowledge = KnowledgeLocation::Directory(dir);
    }
    if let Some(url) = cli.knowledge_url.clone() {
        settings.knowledge = KnowledgeLocation::Url(url);
    }
    if cli.offline {
        settings.api_key = None;
    }

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    let source: Arc<dyn KnowledgeSource> = match &settings.knowledge {
        KnowledgeLocation::Directory(dir) => {
            tracing::info!(dir = %dir.display(), "Using knowledge directory");
            Arc::new(FileKnowledgeSource::new(dir.clone()))
        }
        KnowledgeLocation::Url(url) => {
            tracing::info!(url = %url, "Using remote knowledge documents");
            Arc::new(
                HttpKnowledgeSource::new(url, settings.options.provider_timeout)
                    .context("Failed to build knowledge HTTP client")?,
            )
        }
    };

    let providers = match settings.api_key.as_deref() {
        Some(key) => {
            let client = OpenAiClient::new(
                key,
                &settings.base_url,
                settings.embedding_model.clone(),
                settings.options.provider_timeout,
            )
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to build OpenAI client")?;
            AiProviders::shared(Arc::new(client))
        }
        None => {
            tracing::info!("No OpenAI API key configured, running keyword/canned mode");
            AiProviders::none()
        }
    };

    let profile = settings.options.profile.clone();
    let service = AssistantService::new(source, providers, settings.options);

    match cli.command {
        Command::Ask { question } => {
            service.initialize().await;
            let reply = service.get_response(&question).await;
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        Command::Chat { transcript } => {
            let conversation = run_chat(&service, &profile).await?;
            if let Some(path) = transcript {
                let json = serde_json::to_string_pretty(conversation.messages())?;
                tokio::fs::write(&path, json)
                    .await
                    .with_context(|| format!("Failed to write transcript to {}", path.display()))?;
                tracing::info!(path = %path.display(), "Saved chat transcript");
            }
        }
        Command::Diagnose { json } => {
            let status = service.initialize().await;
            let results = run_diagnostics(&service, &profile.phone).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
                return Ok(());
            }

            println!("Knowledge base status: {}", status);
            let mut current_category = "";
            for result in &results {
                if result.category != current_category {
                    current_category = result.category;
                    println!("\n=== {} ===", current_category);
                }
                println!(
                    "\nQ: {}\n[{:?}, {} ms] {}",
                    result.question, result.kind, result.elapsed_ms, result.reply.answer
                );
            }
        }
    }

    Ok(())
}

/// Line-oriented chat loop. A question typed while the knowledge base is still
/// loading waits for the load to finish.
async fn run_chat(
    service: &AssistantService,
    profile: &BusinessProfile,
) -> anyhow::Result<Conversation> {
    let mut conversation = Conversation::new();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if let Some(greeting) = conversation.last() {
        println!("{}: {}", profile.name, greeting.text);
    }
    println!("\nQuick questions:");
    for (i, question) in QUICK_QUESTIONS.iter().enumerate() {
        println!("  {}. {}", i + 1, question);
    }
    println!("(type a number to ask one, or 'quit' to leave)");

    let mut last_status = None;
    loop {
        let status = service.get_status();
        if last_status != Some(status) {
            match status {
                ServiceStatus::Initializing => println!("[Loading knowledge base...]"),
                ServiceStatus::Ready => println!("[AI ready]"),
                ServiceStatus::Error => println!("[Limited mode]"),
            }
            last_status = Some(status);
        }

        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            break;
        }

        let question = match input.parse::<usize>() {
            Ok(n) if (1..=QUICK_QUESTIONS.len()).contains(&n) => QUICK_QUESTIONS[n - 1],
            _ => input,
        };
        if conversation.push_user(question).is_none() {
            continue;
        }

        let reply = service.get_response(question).await;
        let message = conversation.push_reply(&reply);
        println!("{}: {}", profile.name, message.text);
        if message.show_contact_buttons {
            println!("  -> Call {}", profile.phone);
            println!("  -> Request a quote");
        }
    }

    Ok(conversation)
}
