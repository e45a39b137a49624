//! Answer Bot - fuzzy question-answer lookup that learns from its users.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use answer_bot::chat::{Console, ConsoleOptions, Reply, Tutor};
use answer_bot::config::{AppConfig, ConfigLoader};
use answer_bot::knowledge::KnowledgeBase;
use answer_bot::web::{ChatServer, NO_MATCH_RESPONSE};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser)]
#[command(
    name = "answer-bot",
    about = "Fuzzy question-answer lookup that learns from its users",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file to use instead of the default search paths.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Knowledge file (overrides the config file).
    #[arg(short, long, global = true)]
    knowledge: Option<PathBuf>,

    /// Append diagnostics to this file instead of stderr.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat in the terminal, teaching the bot what it doesn't know.
    Chat {
        /// Ask after each answer whether it was right.
        #[arg(long)]
        confirm: bool,
        /// Disable colored output.
        #[arg(long)]
        no_color: bool,
    },
    /// Serve the chat page and JSON endpoints over HTTP.
    Serve {
        /// Host address to bind to.
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on.
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Answer a single question and exit.
    Ask {
        /// The question.
        #[arg(required = true)]
        question: Vec<String>,
    },
    /// Validate the knowledge file.
    Check,
}

fn init_tracing(verbosity: u8, log_file: Option<&Path>) {
    let level = match (verbosity, log_file.is_some()) {
        (0, true) => "debug",
        (0, false) => "warn",
        (1, _) => "info",
        (2, _) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Warning: cannot open log file {}: {e}", path.display());
                None
            }
        }
    });

    let (file_layer, stderr_layer) = match file {
        Some(file) => (
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))),
            None,
        ),
        None => (None, Some(fmt::layer().with_writer(io::stderr))),
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> Result<AppConfig, BoxError> {
    let loader = match &cli.config {
        Some(path) => ConfigLoader::with_path(path.clone()),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load()?;

    if let Some(path) = &cli.knowledge {
        config.knowledge_file.clone_from(path);
    }
    if cli.log_file.is_some() {
        config.log_file.clone_from(&cli.log_file);
    }
    Ok(config)
}

async fn run(command: Commands, mut config: AppConfig) -> Result<(), BoxError> {
    match command {
        Commands::Chat { confirm, no_color } => {
            let options = ConsoleOptions {
                confirm_answers: confirm || config.chat.confirm_answers,
                color: config.chat.color && !no_color,
            };
            let path = config.knowledge_file;

            tokio::task::spawn_blocking(move || -> Result<(), BoxError> {
                let mut tutor = Tutor::open(&path)?;
                tracing::info!(
                    path = %path.display(),
                    entries = tutor.knowledge().len(),
                    "Starting chat session"
                );

                let stdin = io::stdin();
                let mut console = Console::new(stdin.lock(), io::stdout(), options);
                let summary = console.run(&mut tutor)?;
                if summary.unsaved > 0 {
                    tracing::warn!(
                        unsaved = summary.unsaved,
                        "Some learned answers were not saved"
                    );
                }
                Ok(())
            })
            .await?
        }
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Err(e) = KnowledgeBase::load(&config.knowledge_file) {
                tracing::warn!(error = %e, "Knowledge file not loadable yet; requests will fail until fixed");
            }

            let server = ChatServer::new(config.knowledge_file).with_config(config.server);
            let cancel = server.cancel_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            });
            server.run().await?;
            Ok(())
        }
        Commands::Ask { question } => {
            let question = question.join(" ");
            let mut tutor = Tutor::open(&config.knowledge_file)?;
            match tutor.respond(&question) {
                Reply::Answer { answer, .. } => println!("{answer}"),
                Reply::Empty | Reply::Unknown { .. } => println!("{NO_MATCH_RESPONSE}"),
            }
            Ok(())
        }
        Commands::Check => {
            let base = KnowledgeBase::load(&config.knowledge_file)?;
            println!(
                "{}: {} entries, {} phrasings",
                config.knowledge_file.display(),
                base.len(),
                base.phrasings().count()
            );
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(cli.verbose, config.log_file.as_deref());

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
