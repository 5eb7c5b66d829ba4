use crate::models::{AppId, PriceHistoryRow};
use rust_decimal::Decimal;
use sqlx::{PgPool, Result as SqlxResult};

/// Repository for price history access
pub struct PriceHistoryRepository {
    pool: PgPool,
}

impl PriceHistoryRepository {
    /// Create a new PriceHistoryRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All rows for a game, oldest first.
    ///
    /// Rows sharing a date come back in insertion order so the most recently
    /// recorded value is last.
    pub async fn find_by_appid(&self, appid: AppId) -> SqlxResult<Vec<PriceHistoryRow>> {
        sqlx::query_as::<_, PriceHistoryRow>(
            r#"
            SELECT
                date,
                final_price,
                discount
            FROM price_history
            WHERE appid = $1
            ORDER BY date ASC, id ASC
            "#,
        )
        .bind(appid)
        .fetch_all(&self.pool)
        .await
    }

    /// Record one observation
    pub async fn insert(
        &self,
        appid: AppId,
        date: chrono::NaiveDate,
        final_price: Option<Decimal>,
        discount: Option<i32>,
    ) -> SqlxResult<()> {
        sqlx::query(
            r#"
            INSERT INTO price_history (appid, date, final_price, discount)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(appid)
        .bind(date)
        .bind(final_price)
        .bind(discount)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Number of stored rows for a game
    pub async fn count_by_appid(&self, appid: AppId) -> SqlxResult<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM price_history WHERE appid = $1")
                .bind(appid)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
