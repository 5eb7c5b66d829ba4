use super::AppId;
use crate::features::FeatureVector;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Buying advice derived from the discount probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// High chance of a better discount within the horizon
    Wait,
    ConsiderWaiting,
    /// Current discount is already strong
    BuyNow,
    BuyIfWanted,
}

impl Recommendation {
    pub fn from_forecast(probability: f64, current_discount: f64) -> Self {
        if probability > 0.7 {
            Recommendation::Wait
        } else if probability > 0.5 {
            Recommendation::ConsiderWaiting
        } else if current_discount > 50.0 {
            Recommendation::BuyNow
        } else {
            Recommendation::BuyIfWanted
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Wait => "wait",
            Recommendation::ConsiderWaiting => "consider_waiting",
            Recommendation::BuyNow => "buy_now",
            Recommendation::BuyIfWanted => "buy_if_wanted",
        }
    }
}

/// Artifact metadata copied into each result for auditability
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSnapshot {
    pub version: Option<String>,
    pub created_at: Option<String>,
    pub lookback_days: u32,
    pub horizon_days: u32,
    pub discount_threshold_percent: f64,
}

/// Outcome of one single-game forecast. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub game_id: AppId,
    pub game_name: String,
    pub as_of_date: NaiveDate,
    /// Probability after optional calibration
    pub probability: f64,
    /// Probability straight from the classifier
    pub raw_probability: f64,
    pub decision: bool,
    pub threshold_used: f64,
    pub confidence: f64,
    pub current_price: f64,
    pub current_discount: f64,
    pub recommendation: Recommendation,
    pub feature_names_used: Vec<String>,
    pub model: ModelSnapshot,
}

/// Diagnostic view of the feature vector for one game.
///
/// Never an error value: failures are carried in `error`.
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub appid: AppId,
    pub features: Option<FeatureVector>,
    pub feature_names: Vec<String>,
    pub as_of_date: Option<NaiveDate>,
    pub row_count: usize,
    pub error: Option<String>,
}

impl InspectReport {
    pub fn failed(appid: AppId, feature_names: Vec<String>, error: impl Into<String>) -> Self {
        Self {
            appid,
            features: None,
            feature_names,
            as_of_date: None,
            row_count: 0,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Health and provenance of the active model
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub loaded: bool,
    pub path: Option<String>,
    pub version: Option<String>,
    pub created_at: Option<String>,
    pub trained_at: Option<String>,
    pub validation_method: Option<String>,
    pub scorer: Option<&'static str>,
    pub features_count: usize,
    pub decision_threshold: Option<f64>,
    pub calibrated: bool,
    pub metrics: BTreeMap<String, f64>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}
