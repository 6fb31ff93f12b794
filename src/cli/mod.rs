//! CLI command definitions and parsing
use crate::retrieval::DEFAULT_TOP_K;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "docrag",
    version,
    about = "Local document question answering over chunked embeddings",
    long_about = "Docrag ingests text and markdown documents, splits them into overlapping \
                  token windows, embeds each window locally, and answers questions by exact \
                  vector search over the selected files, with optional answer generation \
                  through a local Ollama instance."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/docrag/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest a document into the index
    Ingest {
        /// Path to the document to ingest
        path: PathBuf,

        /// Override the file type inferred from the extension (txt, md, pdf, docx)
        #[arg(short = 't', long)]
        file_type: Option<String>,
    },

    /// Ask a question over previously ingested files
    Query {
        /// Question to ask
        question: String,

        /// Comma-separated filenames to search (e.g., "notes.txt,report.md")
        #[arg(short, long, value_delimiter = ',', required = true)]
        files: Vec<String>,

        /// Number of passages to retrieve
        #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,

        /// Show the answer and sources in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List indexed files with their chunk counts
    Files {
        /// Show the catalog in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show index statistics
    Status,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Show only a specific section
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in dot notation (e.g., "generation.enabled")
        key: String,

        /// Value to set
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key in dot notation
        key: String,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
