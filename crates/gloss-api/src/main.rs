//! Gloss API server binary

use gloss_api::{config::ApiConfig, start_server, ServerError};
use std::env;
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    let args: Vec<String> = env::args().collect();

    let config = if args.len() > 2 && args[1] == "--config" {
        ApiConfig::from_file(&args[2])?
    } else if args.len() > 1 && args[1] == "--help" {
        print_help();
        process::exit(0);
    } else {
        eprintln!("No config file specified, using defaults");
        eprintln!("Usage: gloss-api --config <path-to-config.toml>");
        eprintln!();
        ApiConfig::default()
    };

    start_server(config).await
}

fn print_help() {
    println!("Gloss API - LLM annotation and edge-case synthesis service");
    println!();
    println!("USAGE:");
    println!("    gloss-api --config <path-to-config.toml>");
    println!();
    println!("OPTIONS:");
    println!("    --config <file>    Load configuration from TOML file");
    println!("    --help             Print this help message");
    println!();
    println!("CONFIGURATION:");
    println!("    bind_address, bind_port    Where to listen (default 127.0.0.1:8000)");
    println!("    database_path              SQLite state file (default gloss.db)");
    println!("    results_dir                Snapshot directory (default annotation_results)");
    println!("    api_base_url, api_key_env  Provider endpoint and key env var");
    println!("    annotation_model, aggregation_model, embedding_model, batch_size");
    println!();
}
