use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use docassist_core::{
    assistant::Assistant,
    config::{ClientSettings, Config},
    provider::{NullProvider, StreamingProvider},
    providers::openai::ChatClient,
    tasks::Task,
};
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Stream document-assistant answers from a chat-completion API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a task over a document (stdin unless --file is given)
    Run {
        #[arg(short, long, help = "Task name, see `docassist tasks`")]
        task: Task,
        #[arg(short, long, help = "Read the document from this file")]
        file: Option<PathBuf>,
        #[arg(short, long, help = "Config file (JSON or TOML)")]
        config: Option<PathBuf>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long, help = "Base URL of an OpenAI-compatible server")]
        base_url: Option<String>,
    },
    /// List the available tasks
    Tasks,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Tasks => {
            for task in Task::all() {
                println!("{task}");
            }
        }
        Commands::Run {
            task,
            file,
            config,
            model,
            base_url,
        } => {
            let mut cfg = match &config {
                Some(path) => Config::from_path(path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => Config::default(),
            };
            if model.is_some() {
                cfg.model = model;
            }
            if base_url.is_some() {
                cfg.base_url = base_url;
            }

            let (provider, settings): (Arc<dyn StreamingProvider>, ClientSettings) =
                match ClientSettings::resolve(&cfg) {
                    Ok(settings) => {
                        let client = ChatClient::from_settings(settings.clone(), &cfg.http)?;
                        (Arc::new(client), settings)
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "no API key, using null provider");
                        let settings = ClientSettings::new(
                            "",
                            cfg.base_url.as_deref(),
                            cfg.model.as_deref(),
                        );
                        (Arc::new(NullProvider), settings)
                    }
                };

            let content = match &file {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    tokio::io::stdin().read_to_string(&mut buf).await?;
                    buf
                }
            };

            let assistant = Assistant::new(provider, settings).with_params(cfg.params);
            tracing::info!(task = %task, provider = assistant.provider_name(), "running");

            let mut stdout = std::io::stdout();
            let outcome = assistant
                .run(task, &content, |delta| {
                    print!("{delta}");
                    stdout.flush().ok();
                })
                .await;
            println!();
            let end = outcome?;
            tracing::debug!(completion = end.as_str(), "done");
        }
    }

    Ok(())
}
