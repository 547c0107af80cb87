//! CLI interface for quick-assist

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::agent::llm::OllamaClient;
use crate::config::Config;
use crate::memory::{KnowledgeEntry, KnowledgeRepository, SqliteKnowledgeStore};
use crate::pipeline::{LearningCoordinator, ResponseRouter};

#[derive(Parser)]
#[command(name = "quick-assist")]
#[command(about = "Fast local chat assistant that learns from your corrections", long_about = None)]
#[command(version)]
struct Cli {
    /// Keep learned answers in memory only (chat is the default command)
    #[arg(short, long)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Keep learned answers in memory only
        #[arg(short, long)]
        ephemeral: bool,
    },
    /// Answer a single question and exit
    Ask {
        /// Question text
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Inspect or seed the knowledge base
    Knowledge {
        #[command(subcommand)]
        command: KnowledgeCommands,
    },
    /// Show model server and knowledge base status
    Status,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum KnowledgeCommands {
    /// List learned entries
    List {
        /// Maximum entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Teach one question/answer pair
    Add {
        #[arg(short, long)]
        question: String,
        #[arg(short, long)]
        answer: String,
    },
    /// Seed entries from a JSON array of {"question", "answer"} objects
    Import {
        /// Path to the JSON file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Reset configuration to defaults
    Reset,
    /// Print the configuration file path
    Path,
    /// Print the default configuration as TOML
    Defaults,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            crate::agent::run_interactive(cli.ephemeral).await?;
        }
        Some(Commands::Chat { ephemeral }) => {
            crate::agent::run_interactive(ephemeral || cli.ephemeral).await?;
        }
        Some(Commands::Ask { text }) => {
            ask(&text.join(" ")).await?;
        }
        Some(Commands::Knowledge { command }) => {
            let config = Config::load()?;
            let store = open_store(&config).await?;
            match command {
                KnowledgeCommands::List { limit } => list_knowledge(store.as_ref(), limit).await?,
                KnowledgeCommands::Add { question, answer } => {
                    let learning = LearningCoordinator::new(store, true);
                    if learning.learn(&question, &answer).await {
                        println!("✅ ¡Aprendido! Respuesta guardada.");
                    } else {
                        anyhow::bail!("Could not store the answer (empty answer or store unavailable)");
                    }
                }
                KnowledgeCommands::Import { file } => {
                    let learning = LearningCoordinator::new(store, true);
                    import_knowledge(&learning, &file).await?;
                }
            }
        }
        Some(Commands::Status) => {
            show_status().await?;
        }
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => crate::config::show_config()?,
            ConfigCommands::Reset => crate::config::reset_config()?,
            ConfigCommands::Path => println!("{}", crate::config::config_path()?.display()),
            ConfigCommands::Defaults => print!("{}", crate::config::default_config_toml()),
        },
    }

    Ok(())
}

async fn open_store(config: &Config) -> Result<Arc<dyn KnowledgeRepository>> {
    let store = SqliteKnowledgeStore::new(&config.store.database_path)
        .await
        .with_context(|| format!("Failed to open knowledge store {}", config.store.database_path.display()))?;
    Ok(Arc::new(store))
}

async fn ask(question: &str) -> Result<()> {
    let config = Config::load()?;
    let mut router = ResponseRouter::from_config(&config).await?;
    let result = router.resolve(question).await;

    println!("{}", result.text);
    println!(
        "\x1b[90m[{}] {:.2}s\x1b[0m",
        result.source.as_tag(),
        result.elapsed.as_secs_f64()
    );
    Ok(())
}

async fn list_knowledge(store: &dyn KnowledgeRepository, limit: usize) -> Result<()> {
    let entries = store.fetch_all().await?;

    if entries.is_empty() {
        println!("No knowledge entries yet. Teach one with `quick-assist knowledge add`.");
        return Ok(());
    }

    println!("📚 Knowledge ({} entries, showing up to {}):", entries.len(), limit);
    println!();
    for (i, entry) in entries.iter().take(limit).enumerate() {
        let when = entry
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{}. [{}] {}", i + 1, when, entry.question);
        println!("   → {}", crate::truncate_safe(&entry.answer, 120));
    }
    Ok(())
}

/// Parse a seed file: a JSON array of knowledge entries
fn read_seed_file(path: &Path) -> Result<Vec<KnowledgeEntry>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let entries: Vec<KnowledgeEntry> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {} as a JSON array of question/answer objects", path.display()))?;
    Ok(entries)
}

async fn import_knowledge(learning: &LearningCoordinator, path: &Path) -> Result<()> {
    let entries = read_seed_file(path)?;
    let mut stored = 0;
    for entry in &entries {
        if learning.learn(&entry.question, &entry.answer).await {
            stored += 1;
        }
    }

    println!("Imported {} of {} entries from {}", stored, entries.len(), path.display());
    if stored < entries.len() {
        println!("Skipped entries have an empty answer or could not be stored.");
    }
    Ok(())
}

async fn show_status() -> Result<()> {
    let config = Config::load()?;
    let client = OllamaClient::from_config(&config.generation)?;

    println!("{}", crate::info());
    println!();

    let online = client.is_available().await;
    println!(
        "  Model server:  {} {}",
        client.base_url(),
        if online { "✓ reachable" } else { "✗ unreachable (placeholder replies)" }
    );
    println!("  Model:         {}", client.model());

    match SqliteKnowledgeStore::new(&config.store.database_path).await {
        Ok(store) => match store.count().await {
            Ok(count) => println!("  Knowledge:     {} entries ({})", count, config.store.database_path.display()),
            Err(e) => println!("  Knowledge:     ✗ {}", e),
        },
        Err(e) => println!("  Knowledge:     ✗ {}", e),
    }

    println!("  Config:        {}", crate::config::config_path()?.display());
    Ok(())
}
