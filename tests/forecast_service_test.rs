mod helpers;

use helpers::*;
use pryzor_backend::error::ForecastError;
use pryzor_backend::features::SIMPLE_CALENDAR_FEATURE_NAMES;
use pryzor_backend::model::Calibration;
use pryzor_backend::models::Recommendation;
use pryzor_backend::ForecastConfig;
use serde_json::json;
use std::time::Duration;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// disc_freq7 over the scenario rows is 1/7
fn scenario_probability() -> f64 {
    sigmoid(4.0 / 7.0 - 1.0)
}

#[tokio::test]
async fn test_predict_builds_full_result() {
    let (service, _dir, _) = loaded_service(seeded_store(), test_config(), &logistic_bundle()).await;

    let result = service.predict(10).await.unwrap();
    assert_eq!(result.game_id, 10);
    assert_eq!(result.game_name, "Scenario Game");
    assert_eq!(result.as_of_date, date(2020, 3, 4));
    assert!(approx(result.probability, scenario_probability()));
    assert_eq!(result.probability, result.raw_probability);
    assert_eq!(result.threshold_used, 0.5);
    assert!(!result.decision);
    assert!(approx(result.confidence, (result.probability - 0.5).abs() * 2.0));
    assert!(approx(result.current_price, 10.0));
    assert_eq!(result.current_discount, 0.0);
    assert_eq!(result.recommendation, Recommendation::BuyIfWanted);
    assert_eq!(result.feature_names_used, vec!["price_ma7", "disc_freq7"]);
    assert_eq!(result.model.version.as_deref(), Some("2024.1"));
    assert_eq!(result.model.lookback_days, 90);
    assert_eq!(result.model.horizon_days, 30);
    assert_eq!(result.model.discount_threshold_percent, 20.0);
}

#[tokio::test]
async fn test_scenario_feature_values() {
    let (service, _dir, _) = loaded_service(seeded_store(), test_config(), &logistic_bundle()).await;

    let report = service.inspect(10).await;
    assert!(report.is_ok(), "{:?}", report.error);
    let features = report.features.unwrap();
    assert_eq!(features.names(), &["price_ma7".to_string(), "disc_freq7".to_string()]);
    assert!(approx(features.get("price_ma7").unwrap(), 65.0 / 7.0));
    assert!(approx(features.get("disc_freq7").unwrap(), 1.0 / 7.0));
    assert_eq!(report.row_count, 10);
    assert_eq!(report.as_of_date, Some(date(2020, 3, 4)));
}

#[tokio::test]
async fn test_second_predict_is_served_from_cache() {
    let store = seeded_store();
    let (service, _dir, _) = loaded_service(store.clone(), test_config(), &logistic_bundle()).await;

    let first = service.predict(10).await.unwrap();
    let queries = store.query_count();
    let second = service.predict(10).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.probability.to_bits(), second.probability.to_bits());
    assert_eq!(store.query_count(), queries);
}

#[tokio::test]
async fn test_reload_forces_fresh_computation() {
    let store = seeded_store();
    let (service, _dir, _) = loaded_service(store.clone(), test_config(), &logistic_bundle()).await;

    service.predict(10).await.unwrap();
    let queries = store.query_count();

    service.reload().await.unwrap();
    assert!(service.cache().is_empty().await);

    service.predict(10).await.unwrap();
    assert!(store.query_count() > queries);
}

#[tokio::test]
async fn test_install_invalidates_before_publishing() {
    let store = seeded_store();
    let service = service(store.clone(), test_config());
    service.install(artifact_from(&logistic_bundle())).await;

    let old = service.predict(10).await.unwrap();
    let stale_generation = service.cache().generation().await;
    assert_eq!(service.cache().len().await, 1);

    let mut doc = logistic_bundle();
    doc["model"]["intercept"] = json!(2.0);
    service.install(artifact_from(&doc)).await;

    assert!(service.cache().is_empty().await);
    assert_eq!(service.cache().generation().await, stale_generation + 1);
    // a result computed under the old model cannot land after the swap
    assert!(!service.cache().put(10, old.clone(), stale_generation).await);

    let new = service.predict(10).await.unwrap();
    assert!(approx(new.probability, sigmoid(4.0 / 7.0 + 2.0)));
    assert_ne!(new.probability, old.probability);
}

#[tokio::test]
async fn test_oversized_ttl_never_panics() {
    let config = ForecastConfig {
        cache_ttl_minutes: 1e20,
        ..test_config()
    };
    assert!(config.validate().is_err());

    let service = service(seeded_store(), config);
    assert!(!service.cache().is_enabled());
    service.install(artifact_from(&logistic_bundle())).await;
    assert!(service.predict(10).await.is_ok());
}

#[tokio::test]
async fn test_missing_history_is_typed() {
    let (service, _dir, _) = loaded_service(seeded_store(), test_config(), &logistic_bundle()).await;

    assert_eq!(
        service.predict(20).await.unwrap_err(),
        ForecastError::NoPriceHistory(20)
    );
    assert_eq!(
        service.predict(30).await.unwrap_err(),
        ForecastError::InsufficientHistory {
            appid: 30,
            found: 3,
            required: 7
        }
    );
    assert_eq!(
        service.predict(404).await.unwrap_err(),
        ForecastError::GameNotFound(404)
    );
}

#[tokio::test]
async fn test_batch_isolates_failures() {
    let (service, _dir, _) = loaded_service(seeded_store(), test_config(), &logistic_bundle()).await;

    let results = service.predict_batch(&[10, 999]).await;
    assert_eq!(results.len(), 2);
    assert!(results[&10].is_ok());
    assert_eq!(results[&999], Err(ForecastError::GameNotFound(999)));
}

#[tokio::test]
async fn test_store_failure_is_internal_error() {
    let store = seeded_store();
    let (service, _dir, _) = loaded_service(store.clone(), test_config(), &logistic_bundle()).await;

    store.set_failing(true);
    let err = service.predict(10).await.unwrap_err();
    assert!(matches!(err, ForecastError::InternalComputation(_)));

    let report = service.inspect(10).await;
    assert!(report.error.is_some());
}

#[tokio::test]
async fn test_corrupt_reload_keeps_active_artifact() {
    let (service, _dir, path) = loaded_service(seeded_store(), test_config(), &logistic_bundle()).await;
    let before = service.predict(10).await.unwrap();

    std::fs::write(&path, "{ this is not an artifact").unwrap();
    let err = service.reload().await.unwrap_err();
    assert_eq!(err.kind(), "artifact_load_failure");

    assert!(service.is_loaded().await);
    let after = service.predict(10).await.unwrap();
    assert_eq!(before.probability, after.probability);

    let info = service.model_info().await;
    assert!(info.loaded);
    assert!(info.last_error.is_some());
}

#[tokio::test]
async fn test_predict_without_model() {
    let service = service(seeded_store(), test_config());

    let err = service.reload().await.unwrap_err();
    assert!(matches!(err, ForecastError::ArtifactLoad { .. }));
    assert!(!service.is_loaded().await);

    assert_eq!(service.predict(10).await.unwrap_err(), ForecastError::ModelNotLoaded);
    let batch = service.predict_batch(&[10]).await;
    assert_eq!(batch[&10], Err(ForecastError::ModelNotLoaded));

    let info = service.model_info().await;
    assert!(!info.loaded);
    assert_eq!(info.features_count, 0);
    assert!(info.last_error.is_some());
}

#[tokio::test]
async fn test_inspect_never_fails() {
    let unloaded = service(seeded_store(), test_config());
    let report = unloaded.inspect(10).await;
    assert_eq!(report.error.as_deref(), Some("Model not loaded"));
    assert!(report.features.is_none());

    let (service, _dir, _) = loaded_service(seeded_store(), test_config(), &logistic_bundle()).await;
    let report = service.inspect(404).await;
    assert_eq!(report.error.as_deref(), Some("Game 404 not found"));
    assert_eq!(report.feature_names.len(), 2);
}

#[tokio::test]
async fn test_raising_threshold_only_flips_true_to_false() {
    let thresholds = [0.0, 0.1, 0.2, 0.3, 0.35, 0.4, 0.5, 0.7, 0.9, 1.0];
    let mut decisions = Vec::new();
    for t in thresholds {
        let config = ForecastConfig {
            threshold_override: Some(t),
            ..test_config()
        };
        let (service, _dir, _) = loaded_service(seeded_store(), config, &logistic_bundle()).await;
        let result = service.predict(10).await.unwrap();
        assert_eq!(result.threshold_used, t);
        decisions.push(result.decision);
    }

    assert!(decisions[0]);
    assert!(!decisions[decisions.len() - 1]);
    for pair in decisions.windows(2) {
        assert!(pair[0] || !pair[1], "decision went false -> true: {:?}", decisions);
    }
}

#[tokio::test]
async fn test_platt_calibration_applied() {
    let mut doc = logistic_bundle();
    doc["calibration"] = json!({ "method": "platt", "a": 2.0, "b": -0.5 });
    let (service, _dir, _) = loaded_service(seeded_store(), test_config(), &doc).await;

    let result = service.predict(10).await.unwrap();
    assert!(approx(result.raw_probability, scenario_probability()));
    let expected = Calibration { a: 2.0, b: -0.5 }.apply(result.raw_probability);
    assert_eq!(result.probability, expected);
    assert!(service.model_info().await.calibrated);
}

#[tokio::test]
async fn test_artifact_discount_threshold_drives_features() {
    let mut doc = logistic_bundle();
    doc["meta"]["discount_threshold_percent"] = json!(60.0);
    let (service, _dir, _) = loaded_service(seeded_store(), test_config(), &doc).await;

    let report = service.inspect(10).await;
    let features = report.features.unwrap();
    assert_eq!(features.get("disc_freq7"), Some(0.0));

    let result = service.predict(10).await.unwrap();
    assert_eq!(result.model.discount_threshold_percent, 60.0);
    assert!(approx(result.probability, sigmoid(-1.0)));
}

#[tokio::test]
async fn test_decision_score_model() {
    let doc = json!({
        "estimator": { "model_type": "linear_svm", "weights": [0.0, 7.0], "bias": 0.0 },
        "feature_names": ["price_ma7", "disc_freq7"]
    });
    let (service, _dir, _) = loaded_service(seeded_store(), test_config(), &doc).await;

    let result = service.predict(10).await.unwrap();
    assert!(approx(result.probability, sigmoid(1.0)));
    assert!(result.decision);
    assert_eq!(result.recommendation, Recommendation::Wait);
    assert_eq!(service.model_info().await.scorer, Some("decision_function"));
}

#[tokio::test]
async fn test_simple_calendar_artifact() {
    let names: Vec<&str> = SIMPLE_CALENDAR_FEATURE_NAMES.to_vec();
    let doc = json!({
        "model": {
            "model_type": "decision_tree",
            "nodes": [
                { "feature": 6, "threshold": 0.5, "left": 1, "right": 2 },
                { "feature": -1, "value": [8.0, 2.0] },
                { "feature": -1, "value": [1.0, 9.0] }
            ]
        },
        "features": names
    });
    let (service, _dir, _) = loaded_service(seeded_store(), test_config(), &doc).await;

    // last scenario row is 2020-03-04, a Wednesday outside the winter sale months
    let report = service.inspect(10).await;
    let features = report.features.unwrap();
    assert_eq!(features.len(), 8);
    assert_eq!(features.get("month"), Some(3.0));
    assert_eq!(features.get("day_of_week"), Some(2.0));
    assert_eq!(features.get("is_winter_sale"), Some(0.0));

    let result = service.predict(10).await.unwrap();
    assert!(approx(result.probability, 0.2));
}

#[tokio::test]
async fn test_default_feature_list_for_bare_classifier() {
    let coefficients = vec![0.0; 51];
    let doc = json!({
        "model_type": "logistic_regression",
        "coefficients": coefficients,
        "intercept": 0.0
    });
    let (service, _dir, _) = loaded_service(seeded_store(), test_config(), &doc).await;

    let result = service.predict(10).await.unwrap();
    assert_eq!(result.feature_names_used.len(), 51);
    assert_eq!(result.probability, 0.5);
    assert!(result.decision);

    let report = service.inspect(10).await;
    let features = report.features.unwrap();
    assert!(features.values().iter().all(|v| v.is_finite()));
    assert_eq!(features.get("type_encoded"), Some(1.0));
}

#[tokio::test(start_paused = true)]
async fn test_cached_result_expires_after_ttl() {
    let store = seeded_store();
    let config = ForecastConfig {
        cache_ttl_minutes: 1.0,
        ..test_config()
    };
    let service = service(store.clone(), config);
    service.install(artifact_from(&logistic_bundle())).await;

    service.predict(10).await.unwrap();
    let queries = store.query_count();

    tokio::time::advance(Duration::from_secs(30)).await;
    service.predict(10).await.unwrap();
    assert_eq!(store.query_count(), queries);

    tokio::time::advance(Duration::from_secs(31)).await;
    service.predict(10).await.unwrap();
    assert!(store.query_count() > queries);
}

#[tokio::test]
async fn test_zero_ttl_always_recomputes() {
    let store = seeded_store();
    let config = ForecastConfig {
        cache_ttl_minutes: 0.0,
        ..test_config()
    };
    let service = service(store.clone(), config);
    service.install(artifact_from(&logistic_bundle())).await;

    service.predict(10).await.unwrap();
    let queries = store.query_count();
    service.predict(10).await.unwrap();
    assert_eq!(store.query_count(), queries + 2);
}
