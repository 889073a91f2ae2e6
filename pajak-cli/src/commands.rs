use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use pajak_rag::chroma::ChromaVectorStore;
use pajak_rag::export::{DEFAULT_PAGE_SIZE, fetch_snapshot, save_snapshot};
use pajak_rag::openai::{OpenAIChatModel, OpenAIEmbeddingProvider};
use pajak_rag::{DumpOutcome, IngestionPipeline, QueryOutcome, QueryPipeline, RagConfig};
use tracing::info;

use crate::cli::Commands;
use crate::output;

/// Run one subcommand against the configured backends.
pub async fn run(command: Commands, config: RagConfig) -> Result<()> {
    match command {
        Commands::Ingest => ingest(config).await,
        Commands::Query { query_text } => query(config, &query_text).await,
        Commands::Dump { output } => dump(config, &output).await,
    }
}

fn describe_connection(config: &RagConfig) -> String {
    match config.chroma.api_key() {
        Some(_) => "Menghubungkan ke ChromaDB Cloud...".to_string(),
        None => format!("Menghubungkan ke ChromaDB Self-hosted di {}...", config.chroma.base_url()),
    }
}

async fn ingest(config: RagConfig) -> Result<()> {
    println!("Memuat dokumen dari {}...", config.data_dir.display());
    println!("{}", describe_connection(&config));

    let collection = config.collection.clone();
    let pipeline = IngestionPipeline::builder()
        .embedding_provider(Arc::new(OpenAIEmbeddingProvider::from_config(&config)?))
        .vector_store(Arc::new(ChromaVectorStore::from_config(&config)))
        .config(config)
        .build()?;

    let report = pipeline.run().await.context("ingestion failed")?;
    print!("{}", output::format_ingest_report(&report, &collection));
    Ok(())
}

async fn query(config: RagConfig, query_text: &str) -> Result<()> {
    println!("Mencari jawaban untuk: '{query_text}'");
    println!("{}", describe_connection(&config));

    let pipeline = QueryPipeline::builder()
        .embedding_provider(Arc::new(OpenAIEmbeddingProvider::from_config(&config)?))
        .vector_store(Arc::new(ChromaVectorStore::from_config(&config)))
        .chat_model(Arc::new(OpenAIChatModel::from_config(&config)?))
        .config(config)
        .build()?;

    match pipeline.answer(query_text).await.context("query failed")? {
        QueryOutcome::Answered(answer) => print!("{}", output::format_answer(&answer)),
        QueryOutcome::NoRelevantResult { best_score } => {
            println!("{}", output::format_no_result(best_score));
        }
    }
    Ok(())
}

async fn dump(config: RagConfig, path: &Path) -> Result<()> {
    println!("{}", describe_connection(&config));

    let store = ChromaVectorStore::from_config(&config);
    let snapshot = fetch_snapshot(&store, &config.collection, DEFAULT_PAGE_SIZE)
        .await
        .with_context(|| format!("could not read collection '{}'", config.collection))?;

    if snapshot.chunks.is_empty() {
        println!("Collection '{}' is empty. Run `pajak ingest` first.", config.collection);
        return Ok(());
    }
    print!("{}", output::format_snapshot(&snapshot));

    let mut confirm = |prompt: &str| ask_yes_no(prompt, io::stdin().lock());
    match save_snapshot(&snapshot, path, &mut confirm)? {
        DumpOutcome::Saved { count, path } => println!("Saved {count} chunks to {}", path.display()),
        DumpOutcome::Declined { .. } => info!("export skipped"),
        DumpOutcome::Empty => {}
    }
    Ok(())
}

/// Print `prompt` and read one line; only `y` (any case) counts as yes.
pub fn ask_yes_no(prompt: &str, mut input: impl BufRead) -> bool {
    print!("\n{prompt}: ");
    let _ = io::stdout().flush();

    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(_) => line.trim().eq_ignore_ascii_case("y"),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_y_confirms() {
        assert!(ask_yes_no("Save?", "y\n".as_bytes()));
        assert!(ask_yes_no("Save?", " Y \n".as_bytes()));
        assert!(!ask_yes_no("Save?", "yes\n".as_bytes()));
        assert!(!ask_yes_no("Save?", "".as_bytes()));
    }

    #[test]
    fn connection_message_names_local_host() {
        let config = RagConfig::builder()
            .chroma(pajak_rag::ChromaConnection::local("http://chroma:8001").unwrap())
            .build()
            .unwrap();
        assert_eq!(
            describe_connection(&config),
            "Menghubungkan ke ChromaDB Self-hosted di http://chroma:8001..."
        );
    }
}
