//! Postgres-backed tests. They need a running database reachable through
//! `DATABASE_URL` and are ignored by default:
//!
//! ```text
//! cargo test --test database_test -- --ignored
//! ```

mod helpers;

use helpers::*;
use pryzor_backend::error::ForecastError;
use pryzor_backend::models::GameCategory;
use pryzor_backend::repositories::*;
use pryzor_backend::services::{PgPriceStore, PriceSeriesAccessor};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Migration Tests
// ============================================================================

#[sqlx::test]
#[ignore = "requires Postgres"]
async fn test_migrations_ran(pool: PgPool) {
    for table in ["games", "price_history"] {
        let exists: bool = sqlx::query(
            "SELECT EXISTS (SELECT FROM information_schema.tables WHERE table_name = $1)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap()
        .get(0);
        assert!(exists, "Table {} should exist", table);
    }
}

// ============================================================================
// Repository Tests
// ============================================================================

#[sqlx::test]
#[ignore = "requires Postgres"]
async fn test_game_upsert_and_find(pool: PgPool) {
    let repo = GameRepository::new(pool);

    repo.upsert(570, "Dota 2", Some("game"), Some(date(2013, 7, 9)))
        .await
        .unwrap();
    let updated = repo
        .upsert(570, "Dota 2 Reborn", Some("game"), Some(date(2013, 7, 9)))
        .await
        .unwrap();
    assert_eq!(updated.name, "Dota 2 Reborn");

    let found = repo.find_by_appid(570).await.unwrap().unwrap();
    assert_eq!(found.game_type.as_deref(), Some("game"));
    assert!(repo.find_by_appid(1).await.unwrap().is_none());
}

#[sqlx::test]
#[ignore = "requires Postgres"]
async fn test_price_history_order(pool: PgPool) {
    GameRepository::new(pool.clone())
        .upsert(440, "Team Fortress 2", Some("game"), None)
        .await
        .unwrap();
    let repo = PriceHistoryRepository::new(pool);

    repo.insert(440, date(2021, 2, 1), Some(Decimal::new(999, 2)), Some(0))
        .await
        .unwrap();
    repo.insert(440, date(2021, 1, 1), Some(Decimal::new(499, 2)), Some(50))
        .await
        .unwrap();
    repo.insert(440, date(2021, 2, 1), Some(Decimal::new(749, 2)), Some(25))
        .await
        .unwrap();

    let rows = repo.find_by_appid(440).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].date, Some(date(2021, 1, 1)));
    // same date keeps insertion order
    assert_eq!(rows[2].discount, Some(25));
    assert_eq!(repo.count_by_appid(440).await.unwrap(), 3);
}

// ============================================================================
// Accessor Tests
// ============================================================================

#[sqlx::test]
#[ignore = "requires Postgres"]
async fn test_accessor_over_postgres(pool: PgPool) {
    let games = GameRepository::new(pool.clone());
    games
        .upsert(730, "Counter-Strike", Some("dlc"), Some(date(2012, 8, 21)))
        .await
        .unwrap();
    games.upsert(731, "No Prices", Some("game"), None).await.unwrap();

    let prices = PriceHistoryRepository::new(pool.clone());
    for (day, cents, discount) in scenario_rows() {
        prices
            .insert(730, day, Some(Decimal::new(cents, 2)), Some(discount))
            .await
            .unwrap();
    }
    // null price is dropped during normalization
    prices.insert(730, date(2020, 3, 11), None, Some(0)).await.unwrap();

    let accessor = PriceSeriesAccessor::new(
        Arc::new(PgPriceStore::new(pool)),
        7,
        Duration::from_secs(5),
    );

    let series = accessor.fetch(730).await.unwrap();
    assert_eq!(series.observations.len(), 10);
    assert_eq!(series.dropped_rows, 1);
    assert_eq!(series.metadata.category, GameCategory::Addon);

    assert_eq!(
        accessor.fetch(731).await.unwrap_err(),
        ForecastError::NoPriceHistory(731)
    );
    assert_eq!(
        accessor.fetch(9999).await.unwrap_err(),
        ForecastError::GameNotFound(9999)
    );
}
