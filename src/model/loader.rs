use super::artifact::{ArtifactMetadata, Calibration, ModelArtifact};
use super::estimator::Estimator;
use crate::config::ForecastConfig;
use crate::error::ForecastError;
use crate::features::default_feature_names;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CLASSIFIER_KEYS: [&str; 3] = ["model", "clf", "estimator"];
const DEFAULT_DECISION_THRESHOLD: f64 = 0.5;

/// Pick the artifact location.
///
/// Order: `explicit` when it exists, then the configured `MODEL_PATH`
/// (a directory resolves to `model_filename` inside it) when that exists,
/// then the built-in default whether or not it exists.
pub fn resolve_path(explicit: Option<&Path>, config: &ForecastConfig) -> PathBuf {
    if let Some(path) = explicit {
        if path.exists() {
            return path.to_path_buf();
        }
        debug!("Explicit model path {} does not exist, falling back", path.display());
    }

    if let Some(configured) = &config.model_path {
        let candidate = if configured.is_dir() {
            configured.join(&config.model_filename)
        } else {
            configured.clone()
        };
        if candidate.exists() {
            return candidate;
        }
        debug!("MODEL_PATH candidate {} does not exist, falling back", candidate.display());
    }

    config.default_model_path.clone()
}

/// Read and decode the artifact at `path`
pub async fn load(path: &Path) -> Result<ModelArtifact, ForecastError> {
    let failure = |reason: String| ForecastError::ArtifactLoad {
        path: path.display().to_string(),
        reason,
    };

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| failure(format!("cannot read file: {}", e)))?;

    let artifact = parse_artifact(&content, Some(path.to_path_buf())).map_err(failure)?;

    info!(
        path = %path.display(),
        model_type = artifact.model_type,
        scorer = artifact.scorer.kind(),
        features = artifact.feature_names.len(),
        threshold = artifact.decision_threshold,
        calibrated = artifact.calibration.is_some(),
        "Model artifact loaded"
    );
    Ok(artifact)
}

#[derive(Debug, Default, Deserialize)]
struct CalibrationJson {
    method: Option<String>,
    a: Option<f64>,
    b: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct BundleJson {
    #[serde(alias = "feature_names")]
    features: Option<Vec<String>>,
    threshold: Option<f64>,
    calibration: Option<CalibrationJson>,
    #[serde(alias = "metadata")]
    meta: Option<Map<String, Value>>,
    version: Option<Value>,
    created_at: Option<Value>,
    trained_at: Option<Value>,
    validation_method: Option<Value>,
    metrics: Option<Value>,
}

/// Decode an artifact from its JSON text.
///
/// Accepts a bundle object (classifier under `model`, `clf` or
/// `estimator`) or a bare classifier object.
pub fn parse_artifact(content: &str, source_path: Option<PathBuf>) -> Result<ModelArtifact, String> {
    let mut root: Value =
        serde_json::from_str(content).map_err(|e| format!("invalid JSON: {}", e))?;

    let obj = root
        .as_object_mut()
        .ok_or_else(|| "artifact must be a JSON object".to_string())?;

    let classifier_key = CLASSIFIER_KEYS
        .iter()
        .find(|k| obj.get(**k).map_or(false, |v| !v.is_null()));

    let (classifier, bundle) = match classifier_key {
        Some(key) => {
            let classifier = obj.remove(*key).unwrap_or(Value::Null);
            for other in CLASSIFIER_KEYS {
                obj.remove(other);
            }
            let bundle: BundleJson = serde_json::from_value(root)
                .map_err(|e| format!("invalid bundle: {}", e))?;
            (classifier, bundle)
        }
        None if obj.contains_key("model_type") => (root, BundleJson::default()),
        None => {
            return Err(format!(
                "no classifier found under any of {:?} and no model_type",
                CLASSIFIER_KEYS
            ))
        }
    };

    let estimator = Estimator::from_value(classifier)?;

    let feature_names = match bundle.features {
        Some(names) if !names.is_empty() => names,
        _ => {
            debug!("Artifact declares no features, using the default list");
            default_feature_names()
        }
    };
    let mut seen = HashSet::new();
    if let Some(dup) = feature_names.iter().find(|n| !seen.insert(n.as_str())) {
        return Err(format!("duplicate feature name '{}'", dup));
    }

    estimator.validate(feature_names.len())?;

    let mut meta_map = bundle.meta.unwrap_or_default();
    for (key, value) in [
        ("version", bundle.version),
        ("created_at", bundle.created_at),
        ("trained_at", bundle.trained_at),
        ("validation_method", bundle.validation_method),
        ("metrics", bundle.metrics),
    ] {
        if let Some(v) = value {
            meta_map.entry(key.to_string()).or_insert(v);
        }
    }
    let metadata = decode_metadata(meta_map)?;

    let decision_threshold = bundle
        .threshold
        .or(metadata.threshold)
        .unwrap_or(DEFAULT_DECISION_THRESHOLD);
    if !(0.0..=1.0).contains(&decision_threshold) {
        return Err(format!(
            "decision threshold must be within [0, 1], got {}",
            decision_threshold
        ));
    }

    let calibration = bundle.calibration.and_then(|c| match (c.method.as_deref(), c.a, c.b) {
        (Some("platt"), Some(a), Some(b)) if a.is_finite() && b.is_finite() => {
            Some(Calibration { a, b })
        }
        (None, None, None) => None,
        (method, _, _) => {
            warn!(?method, "Ignoring unusable calibration block");
            None
        }
    });

    let model_type = estimator.model_type();
    Ok(ModelArtifact {
        scorer: estimator.into_scorer(),
        model_type,
        feature_names,
        decision_threshold,
        calibration,
        metadata,
        source_path,
        loaded_at: Utc::now(),
    })
}

fn decode_metadata(mut map: Map<String, Value>) -> Result<ArtifactMetadata, String> {
    // Versions and timestamps are sometimes written as numbers
    for key in ["version", "created_at", "trained_at", "validation_method"] {
        if let Some(v) = map.get_mut(key) {
            match v {
                Value::String(_) | Value::Null => {}
                other => *other = Value::String(other.to_string()),
            }
        }
    }

    // Older bundles spell it `discount_threshold`; the long name wins when both are set
    if let Some(legacy) = map.remove("discount_threshold") {
        match map.get("discount_threshold_percent") {
            Some(v) if !v.is_null() => {}
            _ => {
                map.insert("discount_threshold_percent".to_string(), legacy);
            }
        }
    }

    let metrics = match map.remove("metrics") {
        Some(Value::Object(m)) => m
            .into_iter()
            .filter_map(|(k, v)| v.as_f64().map(|f| (k, f)))
            .collect(),
        _ => BTreeMap::new(),
    };

    let mut metadata: ArtifactMetadata = serde_json::from_value(Value::Object(map))
        .map_err(|e| format!("invalid metadata: {}", e))?;
    metadata.metrics = metrics;
    Ok(metadata)
}
