use super::estimator::Scorer;
use crate::error::ForecastError;
use crate::features::FeatureVector;
use crate::models::ModelSnapshot;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Logistic function
pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

const CALIBRATION_EPS: f64 = 1e-6;

/// Platt scaling parameters fitted after training
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub a: f64,
    pub b: f64,
}

impl Calibration {
    /// `sigmoid(a * clamp(p, eps, 1 - eps) + b)`
    pub fn apply(&self, p: f64) -> f64 {
        let p = p.clamp(CALIBRATION_EPS, 1.0 - CALIBRATION_EPS);
        sigmoid(self.a * p + self.b)
    }
}

fn default_window_days() -> u32 {
    30
}

/// Training-time context stored with the classifier
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArtifactMetadata {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub trained_at: Option<String>,
    #[serde(default)]
    pub validation_method: Option<String>,
    #[serde(default = "default_window_days")]
    pub lookback_days: u32,
    #[serde(default = "default_window_days")]
    pub horizon_days: u32,
    /// Minimum discount that counted as "on sale" when labelling
    #[serde(default)]
    pub discount_threshold_percent: Option<f64>,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(skip)]
    pub metrics: BTreeMap<String, f64>,
}

impl Default for ArtifactMetadata {
    fn default() -> Self {
        Self {
            version: None,
            created_at: None,
            trained_at: None,
            validation_method: None,
            lookback_days: default_window_days(),
            horizon_days: default_window_days(),
            discount_threshold_percent: None,
            threshold: None,
            metrics: BTreeMap::new(),
        }
    }
}

/// A loaded, validated model bundle. Never mutated after load.
#[derive(Debug)]
pub struct ModelArtifact {
    pub scorer: Box<dyn Scorer>,
    pub model_type: &'static str,
    pub feature_names: Vec<String>,
    pub decision_threshold: f64,
    pub calibration: Option<Calibration>,
    pub metadata: ArtifactMetadata,
    pub source_path: Option<PathBuf>,
    pub loaded_at: DateTime<Utc>,
}

/// Raw and calibrated probability for one vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub raw: f64,
    pub calibrated: f64,
}

impl ModelArtifact {
    /// Score an aligned vector.
    ///
    /// The vector must follow this artifact's feature order. A non-finite
    /// or out-of-range probability is reported as an internal error.
    pub fn score(&self, features: &FeatureVector) -> Result<Score, ForecastError> {
        if features.names() != self.feature_names.as_slice() {
            return Err(ForecastError::InternalComputation(
                "feature vector does not match the model's feature order".to_string(),
            ));
        }

        let raw = self.scorer.score(features.values());
        if !raw.is_finite() || !(0.0..=1.0).contains(&raw) {
            return Err(ForecastError::InternalComputation(format!(
                "classifier produced invalid probability {}",
                raw
            )));
        }

        let calibrated = match &self.calibration {
            Some(c) => c.apply(raw),
            None => raw,
        };
        if !calibrated.is_finite() {
            return Err(ForecastError::InternalComputation(format!(
                "calibration produced invalid probability {}",
                calibrated
            )));
        }

        Ok(Score { raw, calibrated })
    }

    /// On-discount percentage declared by the artifact, if any
    pub fn discount_threshold_pct(&self) -> Option<f64> {
        self.metadata.discount_threshold_percent
    }

    pub fn snapshot(&self, discount_threshold_percent: f64) -> ModelSnapshot {
        ModelSnapshot {
            version: self.metadata.version.clone(),
            created_at: self.metadata.created_at.clone(),
            lookback_days: self.metadata.lookback_days,
            horizon_days: self.metadata.horizon_days,
            discount_threshold_percent,
        }
    }

    pub fn source_display(&self) -> Option<String> {
        self.source_path.as_ref().map(|p| p.display().to_string())
    }
}
