use super::cache::ResultCache;
use super::price_series::{GameSeries, PriceSeriesAccessor, PriceStore};
use crate::config::ForecastConfig;
use crate::error::ForecastError;
use crate::features::{FeatureExtractor, FeatureVector};
use crate::model::{self, ModelArtifact};
use crate::models::{AppId, InspectReport, ModelInfo, PredictionResult, Recommendation};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Default)]
struct ModelState {
    artifact: Option<Arc<ModelArtifact>>,
    last_error: Option<String>,
}

/// 30-day discount forecasts for individual games.
///
/// Owns the active model artifact and the result cache. Requests take an
/// `Arc` snapshot of the artifact, so a concurrent [`reload`](Self::reload)
/// never pairs a new classifier with an old feature list.
pub struct DiscountForecastService {
    accessor: PriceSeriesAccessor,
    extractor: FeatureExtractor,
    cache: ResultCache,
    config: ForecastConfig,
    explicit_model_path: Option<PathBuf>,
    model: RwLock<ModelState>,
}

impl DiscountForecastService {
    /// Create a service with no model loaded yet
    pub fn new(store: Arc<dyn PriceStore>, config: ForecastConfig) -> Self {
        Self {
            accessor: PriceSeriesAccessor::from_config(store, &config),
            extractor: FeatureExtractor::default(),
            cache: ResultCache::new(config.cache_ttl()),
            config,
            explicit_model_path: None,
            model: RwLock::new(ModelState::default()),
        }
    }

    /// Load the artifact from this path instead of the configured ones
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_model_path = Some(path.into());
        self
    }

    pub fn with_extractor(mut self, extractor: FeatureExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub async fn is_loaded(&self) -> bool {
        self.model.read().await.artifact.is_some()
    }

    async fn artifact(&self) -> Option<Arc<ModelArtifact>> {
        self.model.read().await.artifact.clone()
    }

    /// Resolve the artifact path, load it and clear the result cache.
    ///
    /// On failure the previous artifact (if any) stays active and the error
    /// is remembered for [`model_info`](Self::model_info). The cache is
    /// cleared either way.
    pub async fn reload(&self) -> Result<(), ForecastError> {
        let path = model::resolve_path(self.explicit_model_path.as_deref(), &self.config);
        info!(path = %path.display(), "Loading model artifact");

        match model::load(&path).await {
            Ok(artifact) => {
                self.install(artifact).await;
                Ok(())
            }
            Err(e) => {
                {
                    let mut state = self.model.write().await;
                    warn!(
                        error = %e,
                        keeping_previous = state.artifact.is_some(),
                        "Model artifact load failed"
                    );
                    state.last_error = Some(e.to_string());
                }
                self.cache.clear().await;
                Err(e)
            }
        }
    }

    /// Make `artifact` the active model and invalidate cached results.
    ///
    /// The cache is cleared while the model write lock is held, so no
    /// request can see the new artifact next to a result of the old one.
    pub async fn install(&self, artifact: ModelArtifact) {
        let mut state = self.model.write().await;
        self.cache.clear().await;
        state.artifact = Some(Arc::new(artifact));
        state.last_error = None;
    }

    /// Forecast for one game, served from cache when fresh
    pub async fn predict(&self, appid: AppId) -> Result<PredictionResult, ForecastError> {
        if let Some(hit) = self.cache.get(appid).await {
            debug!(appid, "Forecast served from cache");
            return Ok(hit);
        }

        // Read the generation before the artifact: a reload in between
        // bumps it and the put below is discarded
        let generation = self.cache.generation().await;
        let artifact = self.artifact().await.ok_or(ForecastError::ModelNotLoaded)?;

        let result = self.compute(appid, &artifact).await?;
        self.cache.put(appid, result.clone(), generation).await;
        Ok(result)
    }

    /// Forecast several games independently; one failure never affects another
    pub async fn predict_batch(
        &self,
        appids: &[AppId],
    ) -> BTreeMap<AppId, Result<PredictionResult, ForecastError>> {
        let outcomes = join_all(appids.iter().map(|&id| async move {
            (id, self.predict(id).await)
        }))
        .await;

        let results: BTreeMap<_, _> = outcomes.into_iter().collect();
        let failed = results.values().filter(|r| r.is_err()).count();
        debug!(requested = appids.len(), failed, "Batch forecast finished");
        results
    }

    /// Aligned feature vector for one game. Failures are reported in the
    /// returned value, never as an error.
    pub async fn inspect(&self, appid: AppId) -> InspectReport {
        let Some(artifact) = self.artifact().await else {
            return InspectReport::failed(appid, Vec::new(), ForecastError::ModelNotLoaded.to_string());
        };
        let names = artifact.feature_names.clone();

        let series = match self.accessor.fetch(appid).await {
            Ok(series) => series,
            Err(e) => return InspectReport::failed(appid, names, e.to_string()),
        };

        match self.features(&series, &artifact) {
            Ok(vector) => InspectReport {
                appid,
                features: Some(vector),
                feature_names: names,
                as_of_date: series.latest().map(|o| o.date),
                row_count: series.observations.len(),
                error: None,
            },
            Err(e) => InspectReport {
                row_count: series.observations.len(),
                ..InspectReport::failed(appid, names, e.to_string())
            },
        }
    }

    /// Health and provenance of the active model
    pub async fn model_info(&self) -> ModelInfo {
        let state = self.model.read().await;
        let last_error = state.last_error.clone();

        match &state.artifact {
            Some(a) => ModelInfo {
                loaded: true,
                path: a.source_display(),
                version: a.metadata.version.clone(),
                created_at: a.metadata.created_at.clone(),
                trained_at: a.metadata.trained_at.clone(),
                validation_method: a.metadata.validation_method.clone(),
                scorer: Some(a.scorer.kind()),
                features_count: a.feature_names.len(),
                decision_threshold: Some(self.threshold_for(a)),
                calibrated: a.calibration.is_some(),
                metrics: a.metadata.metrics.clone(),
                loaded_at: Some(a.loaded_at),
                last_error,
            },
            None => ModelInfo {
                loaded: false,
                path: None,
                version: None,
                created_at: None,
                trained_at: None,
                validation_method: None,
                scorer: None,
                features_count: 0,
                decision_threshold: None,
                calibrated: false,
                metrics: BTreeMap::new(),
                loaded_at: None,
                last_error,
            },
        }
    }

    fn threshold_for(&self, artifact: &ModelArtifact) -> f64 {
        self.config
            .threshold_override
            .unwrap_or(artifact.decision_threshold)
    }

    fn discount_pct_for(&self, artifact: &ModelArtifact) -> f64 {
        artifact
            .discount_threshold_pct()
            .unwrap_or(self.config.discount_significance_pct)
    }

    fn features(
        &self,
        series: &GameSeries,
        artifact: &ModelArtifact,
    ) -> Result<FeatureVector, ForecastError> {
        let raw = self.extractor.extract_for(
            &series.metadata,
            &series.observations,
            None,
            self.discount_pct_for(artifact),
            &artifact.feature_names,
        )?;

        let missing = FeatureVector::missing(&raw, &artifact.feature_names);
        if !missing.is_empty() {
            debug!(?missing, "Features not produced by any feature set, filling 0.0");
        }
        Ok(FeatureVector::align(&raw, &artifact.feature_names))
    }

    async fn compute(
        &self,
        appid: AppId,
        artifact: &ModelArtifact,
    ) -> Result<PredictionResult, ForecastError> {
        let series = self.accessor.fetch(appid).await?;
        let latest = *series.latest().ok_or(ForecastError::NoPriceHistory(appid))?;

        let vector = self.features(&series, artifact)?;
        let score = artifact.score(&vector)?;

        let threshold = self.threshold_for(artifact);
        let probability = score.calibrated;
        let current_discount = latest.discount();

        debug!(
            appid,
            probability,
            raw = score.raw,
            threshold,
            rows = series.observations.len(),
            "Forecast computed"
        );

        Ok(PredictionResult {
            game_id: appid,
            game_name: series.metadata.display_name.clone(),
            as_of_date: latest.date,
            probability,
            raw_probability: score.raw,
            decision: probability >= threshold,
            threshold_used: threshold,
            confidence: (probability - 0.5).abs() * 2.0,
            current_price: latest.final_price,
            current_discount,
            recommendation: Recommendation::from_forecast(probability, current_discount),
            feature_names_used: artifact.feature_names.clone(),
            model: artifact.snapshot(self.discount_pct_for(artifact)),
        })
    }
}
