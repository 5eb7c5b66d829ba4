//! Pryzor Backend Library
//!
//! Discount forecasting for Steam games: price-history access, feature
//! extraction, model artifacts and the inference service.

pub mod config;
pub mod database;
pub mod error;
pub mod features;
pub mod model;
pub mod models;
pub mod repositories;
pub mod services;

// Re-export commonly used types
pub use config::{AppConfig, ForecastConfig};
pub use error::{AppError, AppResult, ForecastError};
pub use services::{DiscountForecastService, PgPriceStore, PriceStore};

use database::Database;
use std::path::PathBuf;
use std::sync::Arc;

/// Application state: the database and the forecast service built on it
pub struct AppState {
    pub database: Database,
    pub forecast: Arc<DiscountForecastService>,
}

impl AppState {
    /// Wire the forecast service to Postgres. No model is loaded yet.
    pub fn new(pool: sqlx::PgPool, config: ForecastConfig, model_path: Option<PathBuf>) -> Self {
        let database = Database::new(pool.clone());
        let store: Arc<dyn PriceStore> = Arc::new(PgPriceStore::new(pool));

        let mut forecast = DiscountForecastService::new(store, config);
        if let Some(path) = model_path {
            forecast = forecast.with_model_path(path);
        }

        Self {
            database,
            forecast: Arc::new(forecast),
        }
    }
}
