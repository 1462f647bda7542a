//! Docs sponsors service
//!
//! Serves the aggregated GitHub sponsor list and the docs navigation config
//! to the documentation site.

use anyhow::Result;
use clap::Parser;
use docs_sponsors::{
    config::{Environment, Settings},
    server::App,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Docs sponsors service
#[derive(Parser, Debug)]
#[command(name = "docs-sponsors")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on (overrides PORT env var)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (overrides HOST env var)
    #[arg(long)]
    host: Option<String>,

    /// Log level: trace, debug, info, warn, error (overrides LOG_LEVEL env var)
    #[arg(long)]
    log_level: Option<String>,

    /// Environment: dev, staging, prod (overrides ENVIRONMENT env var)
    #[arg(short, long)]
    env: Option<Environment>,

    /// Do not generate an ephemeral API key
    #[arg(long)]
    no_ephemeral_key: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration first (before logging, so we can use log_level)
    let mut settings = Settings::load()?;

    if let Some(port) = args.port {
        settings.port = port;
    }
    if let Some(host) = args.host {
        settings.host = host;
    }
    if let Some(log_level) = args.log_level {
        settings.log_level = log_level;
    }
    if let Some(env) = args.env {
        settings.environment = env;
    }

    init_tracing(&settings.log_level);

    // Overrides may have changed the environment; validate again with logging on
    settings.validate()?;

    if settings.require_api_key && !args.no_ephemeral_key {
        let ephemeral_key = settings.generate_ephemeral_key();

        println!("\n{}", "=".repeat(60));
        println!("  Ephemeral API Key (valid for this session only):");
        println!("  {}", ephemeral_key);
        println!("{}\n", "=".repeat(60));
        println!("  Usage:");
        println!(
            "    curl -H \"x-api-key: {}\" http://{}:{}/api/github-sponsors-webhook\n",
            ephemeral_key, settings.host, settings.port
        );
        println!("{}\n", "=".repeat(60));
    }

    tracing::info!(
        app_name = %settings.app_name,
        version = %settings.app_version,
        environment = %settings.environment,
        host = %settings.host,
        port = %settings.port,
        sponsors_configured = settings.sponsors_configured(),
        api_keys = settings.api_keys.len(),
        "Starting application"
    );

    let app = App::new(settings)?;

    app.run_with_graceful_shutdown().await?;

    tracing::info!("Application shutdown complete");

    Ok(())
}

/// Initialize the JSON console subscriber; `RUST_LOG` wins over `log_level`
fn init_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let console_layer = fmt::layer().json().with_filter(filter);

    tracing_subscriber::registry().with(console_layer).init();
}
