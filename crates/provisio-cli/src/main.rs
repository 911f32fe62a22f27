//! CLI entry point for provisio (for dev, and for agents that shell out).

use std::fmt::Display;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use provisio_core::persist::index_path;
use provisio_core::{
    app_data_dir, load_config, set_source, status, watch_source, Config, CorpusManager,
    DocumentSource, Embedder, IndexOrigin, QueryEngine, WithTimeout,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset. Logs go to stderr; stdout carries results only.
const DEFAULT_LOG_FILTER: &str = "warn,provisio_core=info,provisio=info";

#[derive(Parser)]
#[command(name = "provisio")]
#[command(about = "Provisio: semantic retrieval of building-code provisions")]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Per-invocation overrides of the persisted config.
#[derive(clap::Args)]
struct Overrides {
    /// Use the built-in mock corpus.
    #[arg(long, global = true, conflicts_with_all = ["text_dir", "pdf"])]
    mock: bool,
    /// Use a directory of clause text files (one `.txt` file per clause).
    #[arg(long, global = true, value_name = "DIR", conflicts_with = "pdf")]
    text_dir: Option<PathBuf>,
    /// Use a PDF of the code (needs poppler's `pdftotext`).
    #[arg(long, global = true, value_name = "FILE")]
    pdf: Option<PathBuf>,
    /// Where the index is persisted.
    #[arg(long, global = true, value_name = "DIR")]
    index_dir: Option<PathBuf>,
}

impl Overrides {
    fn source(&self) -> Option<DocumentSource> {
        if self.mock {
            return Some(DocumentSource::Mock);
        }
        if let Some(dir) = &self.text_dir {
            return Some(DocumentSource::TextCorpus { dir: dir.clone() });
        }
        self.pdf
            .as_ref()
            .map(|path| DocumentSource::Pdf { path: path.clone() })
    }
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show backend status, the active source and whether an index is stored.
    Status,
    /// Show where provisio stores its config and index (app data directory).
    DataDir,
    /// Build the index, or confirm the stored one is current.
    Build,
    /// Retrieve the provisions most relevant to a question.
    Query {
        #[arg(value_name = "TEXT", required = true, num_args = 1..)]
        text: Vec<String>,
        /// Number of results (defaults to `top_k` from config).
        #[arg(short, long)]
        k: Option<usize>,
        /// Print the response as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show every chunk tagged with a clause number, e.g. `provisio clause 8.4.2`.
    Clause {
        #[arg(value_name = "NUMBER")]
        number: String,
    },
    /// Rebuild the index whenever the source changes (Ctrl+C to stop).
    Watch,
    /// Save the source given by --mock, --text-dir or --pdf as the default.
    SetSource,
}

struct Session {
    source: DocumentSource,
    index_dir: PathBuf,
    manager: Arc<CorpusManager>,
}

fn session(config: &Config, overrides: &Overrides) -> Session {
    let source = overrides.source().unwrap_or_else(|| config.source.clone());
    let index_dir = overrides
        .index_dir
        .clone()
        .or_else(|| config.index_dir())
        .unwrap_or_else(|| fail("could not determine index directory; pass --index-dir"));
    let chunking = config.chunking().unwrap_or_else(|e| fail(e));
    let client = config.embedder().unwrap_or_else(|e| fail(e));
    let embedder: Arc<dyn Embedder> = Arc::new(
        WithTimeout::new(client, config.embed_timeout()).with_batch_size(config.embed_batch_size),
    );
    Session {
        source,
        index_dir,
        manager: Arc::new(CorpusManager::new(embedder, chunking)),
    }
}

fn fail(e: impl Display) -> ! {
    eprintln!("Error: {e}");
    process::exit(1)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config();

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Status => {
            let s = session(&config, &cli.overrides);
            let stored = index_path(&s.index_dir);
            println!("Provisio backend");
            println!("  core:   {}", status());
            println!("  source: {}", s.source);
            println!("  model:  {} at {}", config.embed_model, config.ollama_url);
            println!(
                "  index:  {} ({})",
                stored.display(),
                if stored.exists() { "stored" } else { "not built" }
            );
        }
        Commands::DataDir => match app_data_dir() {
            Some(p) => println!("{}", p.display()),
            None => eprintln!("Could not determine app data directory."),
        },
        Commands::Build => {
            let s = session(&config, &cli.overrides);
            match s.manager.open(&s.source, &s.index_dir).await {
                Ok((index, origin)) => {
                    let how = match origin {
                        IndexOrigin::Loaded => "up to date",
                        IndexOrigin::Built => "rebuilt",
                    };
                    println!(
                        "Index {how}: {} chunk(s), dimension {}, from {}",
                        index.len(),
                        index.dimension(),
                        s.source
                    );
                    println!("  fingerprint: {}", index.fingerprint());
                    println!("  stored at:   {}", index_path(&s.index_dir).display());
                }
                Err(e) => fail(e),
            }
        }
        Commands::Query { text, k, json } => {
            let s = session(&config, &cli.overrides);
            let engine = QueryEngine::connect(&s.manager, &s.source, &s.index_dir).await;
            let response = engine.query(&text.join(" "), k.unwrap_or(config.top_k)).await;
            if json {
                match serde_json::to_string_pretty(&response) {
                    Ok(out) => println!("{out}"),
                    Err(e) => fail(e),
                }
            } else {
                print!("{response}");
            }
        }
        Commands::Clause { number } => {
            let s = session(&config, &cli.overrides);
            let engine = QueryEngine::connect(&s.manager, &s.source, &s.index_dir).await;
            let hits = engine.clause(&number);
            if hits.is_empty() {
                fail(format!("no provisions tagged {}", number.trim()));
            }
            for chunk in hits {
                println!("--- Clause {} ({}) ---", chunk.source_tag, chunk.id);
                println!("{}", chunk.text.trim());
                println!();
            }
        }
        Commands::Watch => {
            let Session {
                source,
                index_dir,
                manager,
            } = session(&config, &cli.overrides);
            if let Err(e) = manager.open(&source, &index_dir).await {
                warn!(error = %e, "initial build failed");
            }
            println!("Watching {source} (Ctrl+C to stop)");

            let handle = tokio::runtime::Handle::current();
            let watched = source.clone();
            let rebuild = move || match handle.block_on(manager.open(&source, &index_dir)) {
                Ok((index, IndexOrigin::Built)) => info!(chunks = index.len(), "index rebuilt"),
                Ok((_, IndexOrigin::Loaded)) => info!("index still current"),
                Err(e) => warn!(error = %e, "rebuild failed"),
            };
            match tokio::task::spawn_blocking(move || watch_source(&watched, rebuild)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => fail(e),
                Err(e) => fail(e),
            }
        }
        Commands::SetSource => {
            let Some(source) = cli.overrides.source() else {
                fail("pass one of --mock, --text-dir or --pdf");
            };
            match set_source(source) {
                Ok(()) => println!("Source saved: {}", load_config().source),
                Err(e) => fail(e),
            }
        }
    }
}
