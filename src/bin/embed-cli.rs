// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::{Parser, Subcommand};
use fabstir_embedding_server::{embeddings::cosine_similarity, EmbeddingClient};

/// Fabstir Embedding Server CLI
#[derive(Parser, Debug)]
#[command(name = "embed-cli")]
#[command(version = fabstir_embedding_server::version::VERSION_NUMBER)]
#[command(about = "Query a running embedding server", long_about = None)]
struct Cli {
    /// Base URL of the server
    #[arg(long, env = "EMBEDDING_URL", default_value = "http://127.0.0.1:8001")]
    url: String,

    /// Value sent as X-API-Key
    #[arg(long, env = "EMBEDDING_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show server health
    Health,

    /// Embed one or more texts
    Embed {
        #[arg(required = true)]
        texts: Vec<String>,

        /// Components of each vector to print
        #[arg(long, default_value_t = 8)]
        preview: usize,
    },

    /// Cosine similarity of two texts
    Similarity { a: String, b: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "warn");
    }
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match execute(cli).await {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let api_key = cli.api_key.filter(|k| !k.is_empty());
    let client = EmbeddingClient::new(cli.url, api_key)?;

    match cli.command {
        Commands::Health => {
            let health = client.health().await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        Commands::Embed { texts, preview } => {
            let response = client.embed(texts.clone()).await?;
            println!(
                "count={} dimension={} time_ms={}",
                response.count, response.dimension, response.time_ms
            );
            for (text, vector) in texts.iter().zip(&response.embeddings) {
                let head: Vec<String> = vector
                    .iter()
                    .take(preview)
                    .map(|v| format!("{:.4}", v))
                    .collect();
                println!("{:?}: [{}, ...]", text, head.join(", "));
            }
        }
        Commands::Similarity { a, b } => {
            let response = client.embed(vec![a, b]).await?;
            let [first, second] = response.embeddings.as_slice() else {
                anyhow::bail!("Expected 2 embeddings, got {}", response.embeddings.len());
            };
            println!("{:.6}", cosine_similarity(first, second)?);
        }
    }

    Ok(())
}
