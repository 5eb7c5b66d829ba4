use crate::config::ForecastConfig;
use crate::error::{ForecastError, RepositoryError};
use crate::models::{AppId, GameMetadata, GameRow, PriceHistoryRow, PriceObservation};
use crate::repositories::{GameRepository, PriceHistoryRepository};
use async_trait::async_trait;
use sqlx::PgPool;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Read access to game metadata and raw price rows
#[async_trait]
pub trait PriceStore: Send + Sync {
    async fn fetch_game(&self, appid: AppId) -> Result<Option<GameRow>, RepositoryError>;

    /// Rows ordered by date ascending, insertion order within a date
    async fn fetch_price_rows(&self, appid: AppId) -> Result<Vec<PriceHistoryRow>, RepositoryError>;
}

/// Postgres-backed [`PriceStore`]
pub struct PgPriceStore {
    games: GameRepository,
    prices: PriceHistoryRepository,
}

impl PgPriceStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            games: GameRepository::new(pool.clone()),
            prices: PriceHistoryRepository::new(pool),
        }
    }
}

#[async_trait]
impl PriceStore for PgPriceStore {
    async fn fetch_game(&self, appid: AppId) -> Result<Option<GameRow>, RepositoryError> {
        Ok(self.games.find_by_appid(appid).await?)
    }

    async fn fetch_price_rows(&self, appid: AppId) -> Result<Vec<PriceHistoryRow>, RepositoryError> {
        Ok(self.prices.find_by_appid(appid).await?)
    }
}

/// A game's metadata with its cleaned price series
#[derive(Debug, Clone)]
pub struct GameSeries {
    pub metadata: GameMetadata,
    /// Ascending by date, one observation per date
    pub observations: Vec<PriceObservation>,
    /// Rows rejected during normalization
    pub dropped_rows: usize,
}

impl GameSeries {
    pub fn latest(&self) -> Option<&PriceObservation> {
        self.observations.last()
    }
}

/// Coerce raw rows into a clean series.
///
/// Unusable rows are dropped, the rest are stably sorted by date and
/// deduplicated so the last row recorded for a date wins. Returns the
/// series and the number of rejected rows.
pub fn normalize_rows(rows: &[PriceHistoryRow]) -> (Vec<PriceObservation>, usize) {
    let mut observations: Vec<PriceObservation> =
        rows.iter().filter_map(PriceHistoryRow::normalize).collect();
    let dropped = rows.len() - observations.len();

    observations.sort_by_key(|o| o.date);

    let mut deduped: Vec<PriceObservation> = Vec::with_capacity(observations.len());
    for obs in observations {
        match deduped.last_mut() {
            Some(last) if last.date == obs.date => *last = obs,
            _ => deduped.push(obs),
        }
    }
    (deduped, dropped)
}

/// Loads and validates the series a forecast needs
pub struct PriceSeriesAccessor {
    store: Arc<dyn PriceStore>,
    min_rows: usize,
    query_timeout: Duration,
}

impl PriceSeriesAccessor {
    pub fn new(store: Arc<dyn PriceStore>, min_rows: usize, query_timeout: Duration) -> Self {
        Self {
            store,
            min_rows,
            query_timeout,
        }
    }

    pub fn from_config(store: Arc<dyn PriceStore>, config: &ForecastConfig) -> Self {
        Self::new(store, config.min_history_rows, config.query_timeout())
    }

    pub fn min_rows(&self) -> usize {
        self.min_rows
    }

    /// Fetch metadata and at least `min_rows` usable observations
    pub async fn fetch(&self, appid: AppId) -> Result<GameSeries, ForecastError> {
        let game = self
            .with_timeout(appid, self.store.fetch_game(appid))
            .await?
            .ok_or(ForecastError::GameNotFound(appid))?;

        let rows = self
            .with_timeout(appid, self.store.fetch_price_rows(appid))
            .await?;

        let (observations, dropped_rows) = normalize_rows(&rows);
        if dropped_rows > 0 {
            debug!(appid, dropped_rows, "Dropped unusable price rows");
        }

        if observations.is_empty() {
            return Err(ForecastError::NoPriceHistory(appid));
        }
        if observations.len() < self.min_rows {
            return Err(ForecastError::InsufficientHistory {
                appid,
                found: observations.len(),
                required: self.min_rows,
            });
        }

        Ok(GameSeries {
            metadata: GameMetadata::from(game),
            observations,
            dropped_rows,
        })
    }

    async fn with_timeout<T>(
        &self,
        appid: AppId,
        query: impl Future<Output = Result<T, RepositoryError>>,
    ) -> Result<T, ForecastError> {
        let outcome = match tokio::time::timeout(self.query_timeout, query).await {
            Ok(result) => result,
            Err(_) => Err(RepositoryError::Timeout(self.query_timeout)),
        };
        outcome.map_err(|e| {
            warn!(appid, error = %e, "Price store query failed");
            ForecastError::InternalComputation(format!(
                "price store query for game {} failed: {}",
                appid, e
            ))
        })
    }
}
