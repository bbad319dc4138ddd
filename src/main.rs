//! askdoc CLI - chat with a PDF, text or Word document

use clap::{ArgGroup, Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use askdoc::config::{self, AskdocConfig};
use askdoc::query::{build_knowledge_base, KnowledgeBase, OpenAiProviders, ProviderFactory, StuffChain};
use askdoc::storage::SqliteStore;
use askdoc::ui::{self, Icons, Spinner};
use askdoc::{loader, Document};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "askdoc")]
#[command(version)]
#[command(about = "Ask your PDF - answer questions about a document with a hosted language model")]
#[command(long_about = r#"
askdoc extracts the text of a document, splits it into overlapping chunks,
embeds them into a vector index and answers questions using the chunks
closest to each question.

Example usage:
  askdoc serve --port 7860
  askdoc ask --file paper.pdf --question "What is the main topic of the file?"
  askdoc index --url https://example.com/paper.pdf --database paper.db
  askdoc ask --database paper.db
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// OpenAI API key
    #[arg(long, global = true, env = config::API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the single-page form and the dashboard
    Serve {
        /// Address to bind (defaults to the config value)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (defaults to the config value)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Embed a document and save the knowledge base
    #[command(group(ArgGroup::new("input").required(true).args(["file", "url"])))]
    Index {
        /// Local file to index
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// URL of the file to index
        #[arg(short, long)]
        url: Option<String>,

        /// Path to the knowledge base file
        #[arg(short, long, default_value = "askdoc.db")]
        database: PathBuf,

        /// Re-embed even if the document is already indexed
        #[arg(long)]
        force: bool,
    },

    /// Ask questions about a document
    #[command(group(ArgGroup::new("input").required(true).args(["file", "url", "database"])))]
    Ask {
        /// Local file to ask about
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// URL of the file to ask about
        #[arg(short, long)]
        url: Option<String>,

        /// Saved knowledge base to ask about
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Question (reads questions from stdin when omitted)
        #[arg(short, long)]
        question: Option<String>,

        /// Number of chunks handed to the model
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Show what a saved knowledge base contains
    Inspect {
        /// Path to the knowledge base file
        #[arg(short, long, default_value = "askdoc.db")]
        database: PathBuf,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Write a config file with the default settings
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("askdoc=debug,tower_http=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    let api_key = config::resolve_api_key(cli.api_key.as_deref());

    if let Err(e) = run(cli.command, config, api_key, cli.config).await {
        ui::error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

async fn run(
    command: Commands,
    mut config: AskdocConfig,
    api_key: Option<String>,
    config_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    match command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            // fail on a bad chunking config before accepting requests
            config.chunking.splitter()?;

            ui::header("Ask your PDF");
            if api_key.is_none() {
                ui::info("API key", "none configured, users enter their own");
            }

            let providers = OpenAiProviders::new(config.clone(), api_key)?;
            askdoc::server::start_server(config, Arc::new(providers)).await?;
        }

        Commands::Index { file, url, database, force } => {
            let providers = OpenAiProviders::new(config.clone(), api_key)?;
            let http = http_client(&config)?;
            let max_bytes = config.server.max_upload_bytes;

            ui::header("Indexing document");
            let document = load_document(&http, file.as_deref(), url.as_deref(), max_bytes).await?;
            ui::status(Icons::FILE, "Source", &document.source);
            ui::status(Icons::DATABASE, "Database", &database.display().to_string());

            let mut store = SqliteStore::open(&database)?;
            let embedder = providers.embedder(None)?;

            if !force {
                if let Some((hash, model)) = store.fingerprint()? {
                    if hash == document.content_hash() && model == embedder.model_name() {
                        ui::success("Document already indexed (use --force to re-embed)");
                        return Ok(());
                    }
                }
            }

            let kb = embed_with_spinner(&config, &document, &providers).await?;
            store.save_knowledge_base(&kb)?;
            ui::success(&format!("Indexed {} chunks into {}", kb.len(), database.display()));
        }

        Commands::Ask { file, url, database, question, top_k } => {
            let providers = OpenAiProviders::new(config.clone(), api_key)?;
            let embedder = providers.embedder(None)?;
            let llm = providers.language_model(None)?;

            let kb = match database {
                Some(path) => load_saved(&path, embedder.model_name())?,
                None => {
                    let http = http_client(&config)?;
                    let max_bytes = config.server.max_upload_bytes;
                    let document = load_document(&http, file.as_deref(), url.as_deref(), max_bytes).await?;
                    embed_with_spinner(&config, &document, &providers).await?
                }
            };

            let chain = StuffChain::new(top_k.unwrap_or(config.top_k));

            if let Some(question) = question {
                let spinner = Spinner::new("Thinking...");
                let answer = chain.answer(&kb, &question, embedder.as_ref(), llm.as_ref()).await;
                spinner.finish_and_clear();
                ui::answer(&answer?.text);
                return Ok(());
            }

            ui::info("Document", kb.source());
            ui::status(Icons::QUESTION, "Ask a question about your file", "(empty line or Ctrl-D to quit)");

            let stdin = std::io::stdin();
            loop {
                print!("> ");
                std::io::stdout().flush()?;

                let mut line = String::new();
                if stdin.lock().read_line(&mut line)? == 0 {
                    break;
                }
                let question = line.trim();
                if question.is_empty() {
                    break;
                }

                let spinner = Spinner::new("Thinking...");
                let answer = chain.answer(&kb, question, embedder.as_ref(), llm.as_ref()).await;
                spinner.finish_and_clear();

                match answer {
                    Ok(answer) => ui::answer(&answer.text),
                    Err(e) => ui::error(&e.to_string()),
                }
            }
        }

        Commands::Inspect { database, format } => {
            if !database.exists() {
                anyhow::bail!("no knowledge base at {}", database.display());
            }
            let store = SqliteStore::open(&database)?;
            let stats = store.stats()?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{} Knowledge base ({})", Icons::STATS, database.display());
                println!(
                    "{}",
                    ui::stats_table(&[
                        ("Source", stats.source.clone().unwrap_or_else(|| "-".to_string())),
                        ("Embedding model", stats.embedding_model.clone().unwrap_or_else(|| "-".to_string())),
                        ("Dimensions", stats.dimensions.to_string()),
                        ("Chunks", stats.chunks.to_string()),
                    ])
                );
            }
        }

        Commands::Init { force } => {
            let path = config_path.unwrap_or_else(config::default_config_path);
            config::write_config(&path, &AskdocConfig::default(), force)?;
            ui::success(&format!("Wrote {}", path.display()));
            println!("{}", ui::muted("The API key is read from --api-key or OPENAI_API_KEY, never from the file."));
        }
    }

    Ok(())
}

fn http_client(config: &AskdocConfig) -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
        .build()?)
}

async fn load_document(
    http: &reqwest::Client,
    file: Option<&Path>,
    url: Option<&str>,
    max_bytes: usize,
) -> anyhow::Result<Document> {
    let spinner = Spinner::new("Loading document...");
    let result = match (file, url) {
        (Some(path), _) => loader::load_path(path),
        (None, Some(url)) => loader::load_url(http, url, max_bytes).await.map(|(_, doc)| doc),
        (None, None) => {
            spinner.finish_and_clear();
            anyhow::bail!("pass --file or --url");
        }
    };
    spinner.finish_and_clear();
    Ok(result?)
}

async fn embed_with_spinner(
    config: &AskdocConfig,
    document: &Document,
    providers: &OpenAiProviders,
) -> anyhow::Result<KnowledgeBase> {
    let splitter = config.chunking.splitter()?;
    let embedder = providers.embedder(None)?;

    let spinner = Spinner::new(&format!("{} Embedding {}...", Icons::BRAIN, document.source));
    let kb = build_knowledge_base(document, &splitter, embedder.as_ref()).await;
    spinner.finish_and_clear();
    Ok(kb?)
}

fn load_saved(path: &Path, embedding_model: &str) -> anyhow::Result<KnowledgeBase> {
    if !path.exists() {
        anyhow::bail!("no knowledge base at {} (run `askdoc index` first)", path.display());
    }
    let store = SqliteStore::open(path)?;
    let Some(kb) = store.load_knowledge_base()? else {
        anyhow::bail!("{} is empty (run `askdoc index` first)", path.display());
    };

    if kb.embedding_model() != embedding_model {
        anyhow::bail!(
            "{} was embedded with {}, but the configured embedder is {}",
            path.display(),
            kb.embedding_model(),
            embedding_model
        );
    }
    Ok(kb)
}
