#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate};
use pryzor_backend::config::ForecastConfig;
use pryzor_backend::error::RepositoryError;
use pryzor_backend::model::{parse_artifact, ModelArtifact};
use pryzor_backend::models::{AppId, GameRow, PriceHistoryRow};
use pryzor_backend::services::{DiscountForecastService, PriceStore};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Price store held in memory that counts every query it answers
#[derive(Default)]
pub struct InMemoryPriceStore {
    games: Mutex<HashMap<AppId, GameRow>>,
    rows: Mutex<HashMap<AppId, Vec<PriceHistoryRow>>>,
    queries: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryPriceStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_game(&self, appid: AppId, name: &str, game_type: &str) {
        self.games.lock().unwrap().insert(
            appid,
            GameRow {
                appid,
                name: name.to_string(),
                game_type: Some(game_type.to_string()),
                release_date: NaiveDate::from_ymd_opt(2015, 6, 1),
            },
        );
    }

    /// Append `(date, price in cents, discount)` rows
    pub fn add_rows(&self, appid: AppId, rows: &[(NaiveDate, i64, i32)]) {
        let mut all = self.rows.lock().unwrap();
        let entry = all.entry(appid).or_default();
        for (date, cents, discount) in rows {
            entry.push(PriceHistoryRow::new(*date, Decimal::new(*cents, 2), *discount));
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), RepositoryError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::NotFound("store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PriceStore for InMemoryPriceStore {
    async fn fetch_game(&self, appid: AppId) -> Result<Option<GameRow>, RepositoryError> {
        self.check()?;
        Ok(self.games.lock().unwrap().get(&appid).cloned())
    }

    async fn fetch_price_rows(&self, appid: AppId) -> Result<Vec<PriceHistoryRow>, RepositoryError> {
        self.check()?;
        Ok(self.rows.lock().unwrap().get(&appid).cloned().unwrap_or_default())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Weekly rows starting 2020-01-01 from `(price in cents, discount)` pairs
pub fn weekly(points: &[(i64, i32)]) -> Vec<(NaiveDate, i64, i32)> {
    let start = date(2020, 1, 1);
    points
        .iter()
        .enumerate()
        .map(|(i, (cents, discount))| (start + ChronoDuration::days(7 * i as i64), *cents, *discount))
        .collect()
}

/// Ten weekly rows, 50% off in the third and seventh week
pub fn scenario_rows() -> Vec<(NaiveDate, i64, i32)> {
    weekly(&[
        (1000, 0),
        (1000, 0),
        (500, 50),
        (1000, 0),
        (1000, 0),
        (1000, 0),
        (500, 50),
        (1000, 0),
        (1000, 0),
        (1000, 0),
    ])
}

/// Store with game 10 (scenario rows), game 20 (no rows) and game 30 (3 rows)
pub fn seeded_store() -> Arc<InMemoryPriceStore> {
    let store = InMemoryPriceStore::new();
    store.add_game(10, "Scenario Game", "game");
    store.add_rows(10, &scenario_rows());
    store.add_game(20, "Empty Game", "game");
    store.add_game(30, "Short Game", "dlc");
    store.add_rows(30, &weekly(&[(999, 0), (999, 0), (499, 50)]));
    store
}

/// Two-feature logistic bundle over `price_ma7` and `disc_freq7`
pub fn logistic_bundle() -> Value {
    json!({
        "model": {
            "model_type": "logistic_regression",
            "coefficients": [0.0, 4.0],
            "intercept": -1.0
        },
        "features": ["price_ma7", "disc_freq7"],
        "threshold": 0.5,
        "meta": {
            "version": "2024.1",
            "created_at": "2024-03-01T00:00:00Z",
            "lookback_days": 90,
            "horizon_days": 30
        },
        "metrics": { "roc_auc": 0.77 }
    })
}

pub fn write_artifact(dir: &Path, name: &str, doc: &Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, doc.to_string()).expect("Failed to write artifact");
    path
}

pub fn artifact_from(doc: &Value) -> ModelArtifact {
    parse_artifact(&doc.to_string(), None).expect("Failed to parse artifact")
}

/// Config that never falls back to a real model on disk
pub fn test_config() -> ForecastConfig {
    ForecastConfig {
        model_path: None,
        default_model_path: PathBuf::from("/nonexistent/pryzor/model.json"),
        ..ForecastConfig::default()
    }
}

pub fn service(store: Arc<InMemoryPriceStore>, config: ForecastConfig) -> DiscountForecastService {
    DiscountForecastService::new(store, config)
}

/// Service with `doc` written to a temp dir and loaded through `reload`
pub async fn loaded_service(
    store: Arc<InMemoryPriceStore>,
    config: ForecastConfig,
    doc: &Value,
) -> (DiscountForecastService, tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = write_artifact(dir.path(), "model.json", doc);
    let service = DiscountForecastService::new(store, config).with_model_path(path.clone());
    service.reload().await.expect("Failed to load artifact");
    (service, dir, path)
}

pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
