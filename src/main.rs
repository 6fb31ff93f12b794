use docrag::chunking::FileType;
use docrag::cli::{Cli, Commands, ConfigAction};
use docrag::config::Config;
use docrag::embedding::{EmbeddingProvider, FastEmbedProvider};
use docrag::error::{DocragError, Result};
use docrag::extract::extract_text;
use docrag::generation::{GenerationProvider, OllamaGenerator};
use docrag::index::VectorIndex;
use docrag::retrieval::RetrievalPipeline;
use docrag::storage::{StorageManager, StorageStats};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    // Handle commands
    match cli.command {
        Commands::Ingest { path, file_type } => {
            cmd_ingest(cli.config, &path, file_type)?;
        }
        Commands::Query {
            question,
            files,
            top_k,
            json,
        } => {
            cmd_query(cli.config, &question, files, top_k, json)?;
        }
        Commands::Files { json } => {
            cmd_files(cli.config, json)?;
        }
        Commands::Status => {
            cmd_status(cli.config)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_filter = if verbose { "docrag=debug" } else { "docrag=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn cmd_ingest(
    config_path: Option<PathBuf>,
    path: &Path,
    file_type_override: Option<String>,
) -> Result<()> {
    let config = load_config(config_path)?;

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            DocragError::Config(format!("Invalid document path: {}", path.display()))
        })?
        .to_string();

    let file_type = match file_type_override {
        Some(s) => FileType::from_str(&s)?,
        None => FileType::from_extension(&filename)?,
    };

    let bytes = std::fs::read(path).map_err(|e| DocragError::Io {
        source: e,
        context: format!("Failed to read document: {}", path.display()),
    })?;

    let text = extract_text(&filename, file_type, &bytes)?;

    let pipeline = build_pipeline(&config)?;

    let rt = runtime()?;
    let report = rt.block_on(pipeline.ingest(&filename, file_type, &text))?;

    println!("✓ Ingested {} ({})", report.filename, report.file_type);
    println!("  Chunks created: {}", report.chunks_created);

    Ok(())
}

fn cmd_query(
    config_path: Option<PathBuf>,
    question: &str,
    files: Vec<String>,
    top_k: usize,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let pipeline = build_pipeline(&config)?;

    let active_files: HashSet<String> = files.into_iter().collect();

    let rt = runtime()?;
    let outcome = rt.block_on(pipeline.query(question, &active_files, top_k))?;

    if json {
        let rendered = serde_json::to_string_pretty(&outcome).map_err(|e| DocragError::Json {
            source: e,
            context: "Failed to serialize query outcome".to_string(),
        })?;
        println!("{}", rendered);
        return Ok(());
    }

    println!("{}", outcome.answer);

    if !outcome.sources.is_empty() {
        println!("\nSources:");
        for (rank, source) in outcome.sources.iter().enumerate() {
            println!(
                "  {}. {} (chunk {}, score {:.3})",
                rank + 1,
                source.filename,
                source.chunk_index,
                source.score
            );
        }
    }

    Ok(())
}

fn cmd_files(config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let storage = open_storage(&config)?;
    // Catalog listing never needs the embedding model
    let index = VectorIndex::load(storage.database.clone(), config.embedding.dimension)?;

    let catalog = index.file_catalog();

    if json {
        let rendered = serde_json::to_string_pretty(&catalog).map_err(|e| DocragError::Json {
            source: e,
            context: "Failed to serialize file catalog".to_string(),
        })?;
        println!("{}", rendered);
        return Ok(());
    }

    if catalog.is_empty() {
        println!("No files indexed yet. Run 'docrag ingest <path>' first.");
        return Ok(());
    }

    println!("Indexed files: {}", catalog.len());
    for entry in &catalog {
        println!(
            "  {} ({}, {} chunks)",
            entry.filename, entry.file_type, entry.num_chunks
        );
    }

    Ok(())
}

fn cmd_status(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let storage = open_storage(&config)?;
    let index = VectorIndex::load(storage.database.clone(), config.embedding.dimension)?;
    let stats = storage.stats()?;

    println!("Docrag Status");
    println!("=============");
    println!("\nIndex entries: {}", index.len());
    println!("Indexed files: {}", index.file_catalog().len());
    println!("Vector dimension: {}", index.dimension());
    println!("\nDocuments archived: {}", stats.db.document_count);
    println!(
        "Corpus size: {}",
        StorageStats::format_size(stats.db.corpus_bytes)
    );
    println!(
        "Store size on disk: {}",
        StorageStats::format_size(stats.disk_size)
    );

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show { section } => {
            let config = load_config(config_path)?;
            let mut tree = serde_json::to_value(&config).map_err(|e| DocragError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;

            if let Some(section) = section {
                tree = tree
                    .get(&section)
                    .cloned()
                    .ok_or_else(|| DocragError::InvalidConfigValue {
                        path: section.clone(),
                        message: "Unknown configuration section".to_string(),
                    })?;
            }

            let rendered = serde_json::to_string_pretty(&tree).map_err(|e| DocragError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", rendered);
        }
        ConfigAction::Get { key } => {
            let config = load_config(config_path)?;
            let tree = serde_json::to_value(&config).map_err(|e| DocragError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;

            let mut cursor = &tree;
            for part in key.split('.') {
                cursor = cursor
                    .get(part)
                    .ok_or_else(|| DocragError::InvalidConfigValue {
                        path: key.clone(),
                        message: "Unknown configuration key".to_string(),
                    })?;
            }

            println!("{}", cursor);
        }
        ConfigAction::Set { key, value } => {
            let path = config_file_path(config_path)?;
            let config = Config::load_or_default(&path)?;

            let mut tree = serde_json::to_value(&config).map_err(|e| DocragError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;

            let (parents, leaf) =
                key.rsplit_once('.')
                    .ok_or_else(|| DocragError::InvalidConfigValue {
                        path: key.clone(),
                        message: "Key must be in section.key notation".to_string(),
                    })?;

            let mut cursor = &mut tree;
            for part in parents.split('.') {
                cursor = cursor
                    .get_mut(part)
                    .ok_or_else(|| DocragError::InvalidConfigValue {
                        path: key.clone(),
                        message: "Unknown configuration key".to_string(),
                    })?;
            }

            let slot = cursor
                .get_mut(leaf)
                .ok_or_else(|| DocragError::InvalidConfigValue {
                    path: key.clone(),
                    message: "Unknown configuration key".to_string(),
                })?;

            // Booleans and numbers parse as JSON; anything else is a string
            *slot = value
                .parse::<serde_json::Value>()
                .unwrap_or(serde_json::Value::String(value.clone()));

            let mut updated: Config =
                serde_json::from_value(tree).map_err(|e| DocragError::Json {
                    source: e,
                    context: format!("Value '{}' is not valid for {}", value, key),
                })?;
            updated.meta.last_modified = chrono::Utc::now().to_rfc3339();

            docrag::config::ConfigValidator::validate(&updated)?;

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| DocragError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }
            updated.save(&path)?;

            println!("✓ Set {} = {}", key, value);
        }
        ConfigAction::Validate { file } => {
            let path = match file {
                Some(p) => p,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = Config::default_path()?;

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            // Create parent directory
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| DocragError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            // Save default config
            let config = Config::default();
            config.save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = config_file_path(config_path)?;

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'docrag config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        return Ok(config);
    }

    Config::load(&path)
}

fn config_file_path(config_path: Option<PathBuf>) -> Result<PathBuf> {
    match config_path {
        Some(path) => Ok(path),
        None => Config::default_path(),
    }
}

fn open_storage(config: &Config) -> Result<StorageManager> {
    let data_dir = expand_path(&config.storage.data_dir)?;
    StorageManager::new(data_dir)
}

fn build_pipeline(config: &Config) -> Result<RetrievalPipeline> {
    let storage = open_storage(config)?;

    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(FastEmbedProvider::new(
        &config.embedding.model,
        config.embedding.batch_size,
    )?);

    let generator: Option<Arc<dyn GenerationProvider>> = if config.generation.enabled {
        Some(Arc::new(OllamaGenerator::new(
            &config.generation.endpoint,
            &config.generation.model,
            config.generation.timeout_secs,
            config.generation.temperature,
            config.generation.top_p,
        )?))
    } else {
        None
    };

    RetrievalPipeline::new(config, storage, embedder, generator)
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| DocragError::Io {
        source: e,
        context: "Failed to create tokio runtime".to_string(),
    })
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| DocragError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| DocragError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}
