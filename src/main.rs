use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use brand_logo_cache::{
    config::Config,
    observability::{LogoMetrics, init_metrics, init_tracing},
    services::LogoService,
};

#[derive(Parser)]
#[command(name = "brand-logo-cache")]
#[command(version)]
#[command(about = "Resolve company logos through a tiered Redis cache")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path (defaults to $LOGO_CACHE_CONFIG or logo-cache.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Redis URL (overrides config file)
    #[arg(short = 'r', long, value_name = "URL")]
    redis_url: Option<String>,

    /// Log level (overrides config file)
    #[arg(short = 'v', long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a company name to its logo
    Resolve {
        company_name: String,
        /// Write the image bytes to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List company suggestions for a partial name
    Search {
        query: String,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show per-tier cache statistics
    Stats,
    /// Show backend and provider health
    Health,
    /// Clear one company's cached entries, or all of them
    Clear { company_name: Option<String> },
    /// Read or change the active brand-data provider
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Get,
    Set { provider: String },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let (mut config, created_config) = Config::read_or_create(&config_path)?;
    if let Some(url) = cli.redis_url {
        config.redis.url = url;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    init_tracing(&config.logging.level, config.logging.json)?;
    if created_config {
        info!("Created default config file: {}", config_path);
    }
    let meter_provider = init_metrics();
    info!("Starting brand-logo-cache v{}", env!("CARGO_PKG_VERSION"));

    let service =
        LogoService::from_config(&config, LogoMetrics::from_provider(&meter_provider)).await?;

    match cli.command {
        Command::Resolve {
            company_name,
            output,
        } => {
            let Some(image) = service.resolve_logo(&company_name).await else {
                bail!("No logo found for '{}'", company_name);
            };
            match output {
                Some(path) => {
                    tokio::fs::write(&path, &image.bytes).await?;
                    println!(
                        "Wrote {} bytes ({}) to {}",
                        image.size_bytes(),
                        image.content_type,
                        path.display()
                    );
                }
                None => println!("{} bytes ({})", image.size_bytes(), image.content_type),
            }
        }
        Command::Search { query, limit } => {
            print_json(&service.search_companies(&query, limit).await)?;
        }
        Command::Stats => print_json(&service.get_stats().await)?,
        Command::Health => print_json(&service.health().await)?,
        Command::Clear { company_name } => {
            print_json(&service.clear_cache(company_name.as_deref()).await)?;
        }
        Command::Config { action } => match action {
            ConfigAction::Get => print_json(&service.get_config().await)?,
            ConfigAction::Set { provider } => print_json(&service.set_config(&provider).await?)?,
        },
    }

    if let Err(e) = meter_provider.shutdown() {
        tracing::debug!("Meter provider shutdown: {}", e);
    }
    Ok(())
}
