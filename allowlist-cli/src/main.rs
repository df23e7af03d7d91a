//! Allowlist CLI
//!
//! Command-line interface for the Fediseer verified-domain allowlist.
//!
//! Logs go to stderr. `fetch` writes only the domains to stdout, so its
//! output can be piped.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use allowlist_api::{ApiConfig, ApiServer};
use allowlist_cache::{CacheSnapshot, VerifiedDomainCache};
use allowlist_fediseer::FediseerClient;

/// Allowlist - Fediseer verified domains for the Lemmy federation exporter
#[derive(Parser)]
#[command(name = "allowlist")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the verified domains once and print them
    Fetch {
        /// Print JSON instead of one domain per line
        #[arg(long)]
        json: bool,
        /// Whitelist endpoint
        #[arg(long, env = "FEDISEER_WHITELIST_URL")]
        endpoint: Option<String>,
    },

    /// Run the API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "9100")]
        port: u16,
        /// Bind address
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: IpAddr,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "allowlist=debug,info"
    } else {
        "allowlist=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Fetch { json, endpoint } => cmd_fetch(json, endpoint).await,
        Commands::Serve { port, bind } => cmd_serve(port, bind).await,
    }
}

/// Fetch verified domains once
async fn cmd_fetch(json: bool, endpoint: Option<String>) -> Result<()> {
    let mut config = ApiConfig::from_env();
    if let Some(url) = endpoint {
        config.whitelist_url = url;
    }

    let client = FediseerClient::with_config(config.fediseer_config())
        .context("Failed to create Fediseer client")?;
    let cache = VerifiedDomainCache::from_config(&config.allowlist, Arc::new(client))
        .await
        .context("Failed to fetch verified domains")?;

    let snapshot = cache.snapshot();

    if !json {
        let params = cache.params();
        eprintln!(
            "{} {} domains (endorsements >= {}, guarantors >= {}, limit {})",
            "✅ Fetched".green().bold(),
            snapshot.allowlist.len(),
            params.endorsements,
            params.guarantors,
            params.limit,
        );
    }
    print!("{}", render_fetch(&snapshot, json)?);

    Ok(())
}

/// Renders `fetch` output: pretty JSON, or one domain per line.
fn render_fetch(snapshot: &CacheSnapshot, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(snapshot)? + "\n");
    }

    Ok(snapshot
        .allowlist
        .iter()
        .map(|domain| format!("{domain}\n"))
        .collect())
}

/// Run API server
async fn cmd_serve(port: u16, bind: IpAddr) -> Result<()> {
    let config = ApiConfig::from_env();

    let addr = SocketAddr::new(bind, port);

    println!("{}", "🚀 Starting allowlist API server...".cyan().bold());
    println!("   {} http://{}", "Listening on:".green(), addr);
    println!("   {} http://{}/health", "Health check:".dimmed(), addr);
    if !config.allowlist.filter_verified_domains {
        println!(
            "   {} set FILTER_VERIFIED_DOMAINS=true to serve domains",
            "Filter disabled:".yellow()
        );
    }
    println!("\n   Press Ctrl+C to stop.\n");

    let server = ApiServer::new(config)
        .await
        .context("Failed to populate verified domain cache")?;

    server.run(addr).await?;

    Ok(())
}
