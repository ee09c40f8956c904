//! Today I Learned fact board client.
//!
//! A line-oriented interface over the fact board: browse by category, share
//! facts and vote on them.
//!
//! ```bash
//! cargo run -p til                # against the Supabase project in .env
//! cargo run -p til -- --memory    # against a seeded in-memory table
//! ```

mod headless;

use std::sync::Arc;
use til_core::{FactStore, MemoryStore, StoreConfig, SupabaseFactStore};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();
    setup_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let store: Arc<dyn FactStore> = if args.iter().any(|a| a == "--memory") {
        info!("using in-memory fact table");
        Arc::new(MemoryStore::with_sample_facts())
    } else {
        let config = match StoreConfig::from_env() {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error: {e}");
                eprintln!("Set SUPABASE_URL and SUPABASE_KEY in .env, or run with --memory.");
                std::process::exit(1);
            }
        };
        info!(url = %config.url, table = %config.table, "using Supabase fact table");
        Arc::new(SupabaseFactStore::new(&config)?)
    };

    headless::run_headless(store).await?;
    Ok(())
}

fn setup_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_help() {
    println!("Today I Learned - share and vote on facts");
    println!();
    println!("USAGE:");
    println!("  til [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help       Show this help message");
    println!("  --memory         Use a seeded in-memory table instead of Supabase");
    println!();
    println!("ENVIRONMENT:");
    println!("  SUPABASE_URL     Project URL, e.g. https://xyz.supabase.co");
    println!("  SUPABASE_KEY     Project API key");
    println!("  TIL_TABLE        Table name (default: facts)");
    println!("  RUST_LOG         Log filter (default: warn)");
    println!();
    println!("CATEGORIES:");
    println!("  technology, science, finance, society, entertainment, health, history, news");
}
