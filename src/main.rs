//! Inference Search - CLI
//!
//! Provision inference endpoints, load the demo corpus, and run semantic
//! searches against an Elasticsearch deployment.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use inference_search::elastic::models::{InferenceConfig, TaskType};
use inference_search::cluster;
use inference_search::indexing::{self, documents, Indexer};
use inference_search::provision::Provisioned;
use inference_search::search::{render_result, RenderOptions, SemanticSearch};
use inference_search::{AppState, Config};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "isearch")]
#[command(about = "Inference provisioning and semantic search for Elasticsearch")]
struct Cli {
    /// YAML config file (env vars override its values)
    #[arg(long, env = "ISEARCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the connection and show cluster information
    Info {
        /// Also list licensed features
        #[arg(long)]
        features: bool,

        /// Also list indices with their document counts
        #[arg(long)]
        indices: bool,
    },

    /// Create an inference endpoint unless it already exists
    Provision {
        #[command(subcommand)]
        preset: Preset,
    },

    /// Run a completion endpoint on one input, provisioning it first
    Infer {
        /// Inference endpoint name
        name: String,

        /// Text sent to the model
        input: String,
    },

    /// Print the token weights a trained model produces for a text
    Embed {
        /// Text to expand
        text: String,

        /// Trained model id (defaults to search.model_id)
        #[arg(long)]
        model: Option<String>,
    },

    /// Recreate the demo index and load ELSER-embedded documents into it
    Seed {
        /// Target index (defaults to search.index)
        #[arg(long)]
        index: Option<String>,
    },

    /// Semantic search; starts an interactive prompt when no query is given
    Search {
        /// Query text
        query: Option<String>,

        /// Target index (defaults to search.index)
        #[arg(long)]
        index: Option<String>,

        /// Show the relevance explanation of each hit
        #[arg(long)]
        explain: bool,

        /// Print the shaped result as JSON
        #[arg(long)]
        raw: bool,
    },

    /// Create an index template
    Template {
        /// Template name
        name: String,

        /// Index patterns the template applies to
        #[arg(required = true)]
        patterns: Vec<String>,

        #[arg(long, default_value = "2")]
        shards: u32,

        #[arg(long, default_value = "1")]
        priority: u32,
    },

    /// Bulk-load JSON lines into an index (demo vectors when no file is given)
    Bulk {
        index: String,

        /// File with one JSON document per line
        file: Option<PathBuf>,
    },

    /// Print an index mapping, or one document
    Show {
        index: String,

        /// Document id
        #[arg(long)]
        id: Option<String>,
    },
}

#[derive(Subcommand)]
enum Preset {
    /// ELSER sparse embedding endpoint
    Elser {
        #[arg(long, default_value = "elser_embeddings")]
        name: String,

        #[arg(long, default_value = "1")]
        allocations: u32,

        #[arg(long, default_value = "1")]
        threads: u32,
    },

    /// OpenAI chat completion endpoint (needs OPENAI_API_KEY)
    Openai {
        #[arg(long, default_value = "openai_chat_completions")]
        name: String,

        /// Model id (defaults to openai.model_id)
        #[arg(long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Diagnostics go to stderr, results to stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,inference_search=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_yaml_and_env(cli.config.as_deref())?;
    let state = AppState::new(config)?;

    match cli.command {
        Commands::Info { features, indices } => run_info(&state, features, indices).await,
        Commands::Provision { preset } => run_provision(&state, preset).await.map(|_| ()),
        Commands::Infer { name, input } => run_infer(&state, &name, &input).await,
        Commands::Embed { text, model } => run_embed(&state, &text, model).await,
        Commands::Seed { index } => run_seed(&state, index).await,
        Commands::Search {
            query,
            index,
            explain,
            raw,
        } => {
            let index = index.unwrap_or_else(|| state.config.search.index.clone());
            let options = RenderOptions { explain };
            let search = state.semantic_search();
            match query {
                Some(query) => run_search(&search, &index, &query, options, raw).await,
                None => run_interactive(&search, &index, options).await,
            }
        }
        Commands::Template {
            name,
            patterns,
            shards,
            priority,
        } => {
            let body = indexing::index_template_body(&patterns, priority, shards);
            state.indexer().put_template(&name, &body).await?;
            println!("Index template '{}' created for {}", name, patterns.join(", "));
            Ok(())
        }
        Commands::Bulk { index, file } => run_bulk(&state, &index, file).await,
        Commands::Show { index, id } => run_show(&state, &index, id).await,
    }
}

async fn run_info(state: &AppState, features: bool, indices: bool) -> Result<()> {
    let overview = cluster::overview(state.store.as_ref(), features, indices)
        .await
        .context("Error connecting to Elasticsearch")?;
    println!("Connected to Elasticsearch cluster: {}", overview.info.cluster_name);
    println!("Elasticsearch version: {}", overview.info.version.number);

    match overview.features {
        Some(Ok(xpack)) => {
            println!("\nAvailable features:");
            for (feature, details) in &xpack.features {
                let status = if details.enabled { "enabled" } else { "disabled" };
                println!("{}: {}", feature, status);
            }
        }
        Some(Err(err)) => println!("\nError retrieving feature info: {:#}", anyhow::Error::from(err)),
        None => {}
    }

    match overview.indices {
        Some(Ok(list)) => {
            println!("\nAvailable indices:");
            for index in &list {
                println!(
                    "Index: {}, Docs count: {}",
                    index.index,
                    index.docs_count.as_deref().unwrap_or("?")
                );
            }
        }
        Some(Err(err)) => println!("\nError listing indices: {:#}", anyhow::Error::from(err)),
        None => {}
    }
    Ok(())
}

async fn run_provision(state: &AppState, preset: Preset) -> Result<Provisioned> {
    let (name, task_type, config) = match preset {
        Preset::Elser {
            name,
            allocations,
            threads,
        } => (
            name,
            TaskType::SparseEmbedding,
            InferenceConfig::elser(allocations, threads),
        ),
        Preset::Openai { name, model } => {
            let config = openai_config(&state.config, model)?;
            (name, TaskType::Completion, config)
        }
    };

    let provisioned = state
        .provisioner()
        .ensure_inference(&name, task_type, &config)
        .await?;
    print_provisioned(&provisioned)?;
    Ok(provisioned)
}

fn openai_config(config: &Config, model: Option<String>) -> Result<InferenceConfig> {
    let Some(api_key) = config.openai.api_key.clone() else {
        bail!("OPENAI_API_KEY environment variable is not set");
    };
    let model = model.unwrap_or_else(|| config.openai.model_id.clone());
    Ok(InferenceConfig::openai_completion(api_key, model))
}

fn print_provisioned(provisioned: &Provisioned) -> Result<()> {
    if provisioned.created {
        println!("Inference '{}' created:", provisioned.name());
    } else {
        println!("Inference '{}' already exists:", provisioned.name());
    }
    if provisioned.was_renamed() {
        println!(
            "Note: '{}' was taken, the endpoint was created as '{}'",
            provisioned.requested_name,
            provisioned.name()
        );
    }
    println!("{}", serde_json::to_string_pretty(&provisioned.endpoint)?);
    Ok(())
}

async fn run_infer(state: &AppState, name: &str, input: &str) -> Result<()> {
    let config = openai_config(&state.config, None)?;
    let provisioned = state
        .provisioner()
        .ensure_inference(name, TaskType::Completion, &config)
        .await
        .context("Failed to create or get inference, skipping inference request")?;
    print_provisioned(&provisioned)?;

    let response = state
        .store
        .run_inference(TaskType::Completion, provisioned.name(), input)
        .await
        .context("Error during inference")?;
    println!("Inference response:");
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn run_embed(state: &AppState, text: &str, model: Option<String>) -> Result<()> {
    let mut config = state.config.search.clone();
    if let Some(model) = model {
        config.model_id = model;
    }
    let embedding = Indexer::new(state.store.clone(), config).embed(text).await?;
    println!("Text Embedding Result:");
    println!("{}", serde_json::to_string_pretty(&embedding)?);
    Ok(())
}

async fn run_seed(state: &AppState, index: Option<String>) -> Result<()> {
    let index = index.unwrap_or_else(|| state.config.search.index.clone());
    let indexer = state.indexer();

    indexer.recreate_index(&index).await?;
    println!("Index '{}' created.", index);

    let count = indexer
        .index_with_embeddings(&index, documents::health_articles())
        .await?;
    println!("{} documents indexed and refreshed.", count);

    let all = state.semantic_search().all_documents(&index).await?;
    println!("\nAll documents in the index:");
    for hit in &all.hits {
        println!("ID: {}", hit.id);
        println!("Title: {}", hit.title.as_deref().unwrap_or("No title"));
        println!("Content: {}", hit.content.as_deref().unwrap_or(""));
        println!("---");
    }
    Ok(())
}

async fn run_search(
    search: &SemanticSearch,
    index: &str,
    query: &str,
    options: RenderOptions,
    raw: bool,
) -> Result<()> {
    let result = search.search(index, query).await?;
    println!("Search Query: {}", query);
    if raw {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render_result(&result, options));
    }
    Ok(())
}

async fn run_interactive(search: &SemanticSearch, index: &str, options: RenderOptions) -> Result<()> {
    println!("Semantic search on '{}'. Type /help for commands.", index);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"search> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        match input {
            "" => continue,
            "/quit" | "/q" | "/exit" => break,
            "/help" | "/h" => {
                println!("  <query>  run a semantic search");
                println!("  /help    show this help");
                println!("  /quit    leave");
            }
            query => match search.search(index, query).await {
                Ok(result) => print!("{}", render_result(&result, options)),
                Err(err) => eprintln!("An error occurred: {:#}", anyhow::Error::from(err)),
            },
        }
    }
    Ok(())
}

async fn run_bulk(state: &AppState, index: &str, file: Option<PathBuf>) -> Result<()> {
    let docs = match file {
        Some(path) => {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            indexing::parse_json_lines(&contents)?
        }
        None => documents::vector_samples(),
    };

    let failures = state.indexer().bulk_load(index, &docs).await?;
    println!(
        "Bulk insert into '{}': {} submitted, {} failed",
        index,
        docs.len(),
        failures.len()
    );
    for reason in &failures {
        println!("  - {}", reason);
    }
    Ok(())
}

async fn run_show(state: &AppState, index: &str, id: Option<String>) -> Result<()> {
    let value = match id {
        Some(id) => serde_json::to_value(state.store.get_document(index, &id).await?)?,
        None => state.store.get_mapping(index).await?,
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
