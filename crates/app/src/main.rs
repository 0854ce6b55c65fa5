use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use corpus_qa_core::{
    AnswerEngine, IngestPipeline, IngestionReport, RagConfig, RetrievalConfig, VectorStore,
    SOURCE_UPLOADED,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "corpus-qa", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Use deterministic offline embeddings and completions
    #[arg(long, env = "CORPUS_QA_OFFLINE", default_value_t = false)]
    offline: bool,

    /// Downgrade to offline mode on provider quota/billing failures
    #[arg(long, env = "CORPUS_QA_FALLBACK_OFFLINE_ON_QUOTA", default_value_t = false)]
    fallback_offline_on_quota: bool,

    /// Embedding model passed through to the provider
    #[arg(
        long,
        env = "CORPUS_QA_EMBEDDING_MODEL",
        default_value = "text-embedding-3-small"
    )]
    embedding_model: String,

    /// Chat model passed through to the provider
    #[arg(long, env = "CORPUS_QA_CHAT_MODEL", default_value = "gpt-4o-mini")]
    chat_model: String,

    /// Provider API base URL
    #[arg(long, env = "CORPUS_QA_API_BASE", default_value = "https://api.openai.com")]
    api_base: String,

    /// Permit a clearly labeled general-knowledge section in answers
    #[arg(long, env = "CORPUS_QA_ALLOW_GENERAL_KNOWLEDGE", default_value_t = false)]
    allow_general_knowledge: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest markdown/plain-text files and print the batch report.
    Ingest {
        /// File or folder to ingest recursively.
        #[arg(long)]
        path: PathBuf,
        /// Source tag recorded on every chunk.
        #[arg(long, default_value = SOURCE_UPLOADED)]
        source: String,
        /// Tenant namespace recorded on every chunk.
        #[arg(long)]
        namespace: Option<String>,
        /// Drop existing chunks in the namespace before ingesting.
        #[arg(long, default_value_t = false)]
        replace_namespace: bool,
    },
    /// Ingest documents and answer a question grounded in them.
    Ask {
        /// The question to answer.
        #[arg(long)]
        question: String,
        /// Files or folders to ingest before answering.
        #[arg(long)]
        ingest: Vec<PathBuf>,
        /// Tenant namespace to scope ingestion and retrieval.
        #[arg(long)]
        namespace: Option<String>,
        /// Number of chunks to retrieve.
        #[arg(long, default_value = "5")]
        max_results: usize,
    },
    /// Show chunk counts and a store preview.
    Status {
        /// Files or folders to ingest before inspecting.
        #[arg(long)]
        ingest: Vec<PathBuf>,
        /// Tenant namespace to inspect.
        #[arg(long)]
        namespace: Option<String>,
        /// Maximum preview rows to print.
        #[arg(long, default_value = "5")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = RagConfig {
        offline_mode: cli.offline,
        fallback_to_offline_on_quota: cli.fallback_offline_on_quota,
        embedding_model: cli.embedding_model.clone(),
        chat_model: cli.chat_model.clone(),
        allow_general_knowledge: cli.allow_general_knowledge,
        api_base: cli.api_base.clone(),
        api_key: RagConfig::from_env().api_key,
    };

    let provider = config
        .build_provider()
        .context("failed to construct model provider")?;
    let store = Arc::new(VectorStore::new());
    let pipeline = IngestPipeline::new(store.clone(), provider.clone());

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        offline = config.offline_mode,
        "corpus-qa boot"
    );

    match cli.command {
        Command::Ingest {
            path,
            source,
            namespace,
            replace_namespace,
        } => {
            let files = discover_text_files(&path);
            if files.is_empty() {
                anyhow::bail!("no ingestible files found in {}", path.display());
            }

            if replace_namespace {
                if let Some(ns) = namespace.as_deref() {
                    let removed = store.clear_namespace(ns);
                    info!(namespace = ns, removed, "cleared namespace before ingest");
                }
            }

            let report = pipeline
                .ingest_files(&files, &source, namespace.as_deref())
                .await?;
            print_report(&report);
        }
        Command::Ask {
            question,
            ingest,
            namespace,
            max_results,
        } => {
            let files: Vec<PathBuf> = ingest
                .iter()
                .flat_map(|path| discover_text_files(path))
                .collect();
            if !files.is_empty() {
                let report = pipeline
                    .ingest_files(&files, SOURCE_UPLOADED, namespace.as_deref())
                    .await?;
                print_report(&report);
            }

            let engine = AnswerEngine::new(store.clone(), provider.clone(), &config)
                .with_retrieval(RetrievalConfig {
                    max_results,
                    ..RetrievalConfig::default()
                });

            let outcome = engine.answer(&question, namespace.as_deref()).await?;

            println!("{}", outcome.answer);
            if !outcome.sources.is_empty() {
                println!();
                for (index, source) in outcome.sources.iter().enumerate() {
                    match &source.section {
                        Some(section) => println!("[{}] {} - {}", index + 1, source.title, section),
                        None => println!("[{}] {}", index + 1, source.title),
                    }
                }
            }
            println!(
                "retrieved {} chunk(s) in {} ms",
                outcome.retrieved_chunk_count, outcome.elapsed_ms
            );
        }
        Command::Status {
            ingest,
            namespace,
            limit,
        } => {
            let files: Vec<PathBuf> = ingest
                .iter()
                .flat_map(|path| discover_text_files(path))
                .collect();
            if !files.is_empty() {
                pipeline
                    .ingest_files(&files, SOURCE_UPLOADED, namespace.as_deref())
                    .await?;
            }

            let engine = AnswerEngine::new(store.clone(), provider.clone(), &config);
            println!("{} chunk(s) stored", engine.count(namespace.as_deref()));
            for preview in engine.preview(namespace.as_deref(), limit) {
                println!("[{}] {} ({})", preview.id, preview.title, preview.source);
                println!("  {}", preview.content_preview);
            }
        }
    }

    Ok(())
}

fn discover_text_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).into_iter().filter_map(|item| item.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }

        let ingestible = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                matches!(ext.to_ascii_lowercase().as_str(), "md" | "markdown" | "txt")
            });

        if ingestible {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

fn print_report(report: &IngestionReport) {
    println!(
        "batch {}: {} file(s) processed, {}/{} chunk(s) embedded at {}",
        report.batch_id,
        report.files_processed,
        report.chunks_succeeded,
        report.chunks_total,
        report.finished_at.to_rfc3339()
    );

    for skipped in &report.skipped_files {
        warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped file");
    }
    for error in &report.errors {
        warn!(%error, "chunk failure");
    }
}
