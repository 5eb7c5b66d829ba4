use crate::models::{AppId, GameRow};
use sqlx::{PgPool, Result as SqlxResult};

/// Repository for game metadata access
pub struct GameRepository {
    pool: PgPool,
}

impl GameRepository {
    /// Create a new GameRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a game by appid
    pub async fn find_by_appid(&self, appid: AppId) -> SqlxResult<Option<GameRow>> {
        sqlx::query_as::<_, GameRow>(
            r#"
            SELECT
                appid,
                name,
                type AS game_type,
                release_date
            FROM games
            WHERE appid = $1
            "#,
        )
        .bind(appid)
        .fetch_optional(&self.pool)
        .await
    }

    /// Insert or update a game
    pub async fn upsert(
        &self,
        appid: AppId,
        name: &str,
        game_type: Option<&str>,
        release_date: Option<chrono::NaiveDate>,
    ) -> SqlxResult<GameRow> {
        sqlx::query_as::<_, GameRow>(
            r#"
            INSERT INTO games (appid, name, type, release_date)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (appid) DO UPDATE
                SET name = EXCLUDED.name,
                    type = EXCLUDED.type,
                    release_date = EXCLUDED.release_date
            RETURNING
                appid,
                name,
                type AS game_type,
                release_date
            "#,
        )
        .bind(appid)
        .bind(name)
        .bind(game_type)
        .bind(release_date)
        .fetch_one(&self.pool)
        .await
    }
}
