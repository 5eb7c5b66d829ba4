//! Pryzor Backend
//!
//! Command line entry point for the discount forecast pipeline:
//! - `predict` one or more games
//! - `inspect` the feature vector of a game
//! - `info` about the active model

use clap::{Parser, Subcommand};
use pryzor_backend::config::AppConfig;
use pryzor_backend::database::{create_pool, run_migrations};
use pryzor_backend::error::{AppError, AppResult};
use pryzor_backend::models::AppId;
use pryzor_backend::AppState;
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "pryzor-backend")]
#[command(about = "Steam discount forecasts from price history")]
#[command(version)]
struct Cli {
    /// Model artifact to load instead of MODEL_PATH or the default
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// Skip running database migrations on startup
    #[arg(long, global = true)]
    skip_migrations: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probability that each game is discounted within the horizon
    Predict {
        /// One or more Steam appids
        #[arg(required = true)]
        appids: Vec<AppId>,
    },
    /// Aligned feature vector for one game
    Inspect { appid: AppId },
    /// Active model version, features and metrics
    Info,
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("pryzor_backend={},sqlx=warn", config.log_level).into());

    // stdout carries the JSON results, logs go to stderr
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_json(value: &Value) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        AppError::Config(e)
    })?;

    init_tracing(&config);

    info!("Pryzor backend starting");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);

    // =========================================================================
    // DATABASE
    // =========================================================================
    info!("Connecting to database...");
    let pool = create_pool(&config.database).await.map_err(|e| {
        error!("Failed to create database pool: {}", e);
        AppError::Database(e)
    })?;
    info!("✓ Database connection established");

    if cli.skip_migrations {
        warn!("Skipping database migrations");
    } else {
        run_migrations(&pool, None).await.map_err(|e| {
            error!("Failed to run migrations: {}", e);
            AppError::Database(e)
        })?;
        info!("✓ Database migrations completed");
    }

    // =========================================================================
    // FORECAST SERVICE
    // =========================================================================
    let state = AppState::new(pool, config.forecast.clone(), cli.model);
    let service = state.forecast.clone();

    // A missing or corrupt artifact leaves the service up without a model
    match service.reload().await {
        Ok(()) => info!("✓ Model artifact loaded"),
        Err(e) => warn!("Model not available: {}", e),
    }

    match cli.command {
        Commands::Predict { appids } => {
            let results = service.predict_batch(&appids).await;
            let body: serde_json::Map<String, Value> = results
                .into_iter()
                .map(|(appid, outcome)| {
                    let value = match outcome {
                        Ok(result) => serde_json::to_value(result),
                        Err(e) => serde_json::to_value(e.to_payload()).map(|p| json!({ "error": p })),
                    };
                    value.map(|v| (appid.to_string(), v))
                })
                .collect::<Result<_, _>>()?;
            print_json(&Value::Object(body))?;
        }
        Commands::Inspect { appid } => {
            let report = service.inspect(appid).await;
            print_json(&serde_json::to_value(report)?)?;
        }
        Commands::Info => {
            let info = service.model_info().await;
            print_json(&serde_json::to_value(info)?)?;
        }
    }

    state.database.pool().close().await;
    Ok(())
}
