use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Default export file written by `pajak dump`.
pub const DEFAULT_EXPORT_PATH: &str = "all_chunks.json";

#[derive(Parser, Debug)]
#[command(name = "pajak")]
#[command(author, version, about = "Tanya-jawab peraturan pajak berbasis RAG")]
#[command(long_about = r#"
Builds a ChromaDB collection from the PDF, Markdown, and TXT files in the
data directory and answers questions against it with OpenAI.

Settings come from the environment (a .env file in the working directory
overrides it). See OPENAI_API_KEY, CHROMA_MODE, CHROMA_HOST, DATA_PATH.

Examples:
  pajak ingest
  pajak query "Apa itu pajak penghasilan?"
  pajak dump --output chunks.json
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Delete and rebuild the collection from the data directory
    Ingest,

    /// Answer a question from the collection
    Query {
        /// The question to answer
        query_text: String,
    },

    /// Show what the collection contains and optionally save it as JSON
    Dump {
        /// Where to write the export file
        #[arg(short, long, default_value = DEFAULT_EXPORT_PATH)]
        output: PathBuf,
    },
}
