use super::AppId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Product category as far as the forecast model is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameCategory {
    Standard,
    Addon,
    Trial,
    Unknown,
}

impl GameCategory {
    /// Convert from the Steam `type` column ("game", "dlc", "demo", ...)
    pub fn from_steam_type(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "game" => GameCategory::Standard,
            "dlc" => GameCategory::Addon,
            "demo" => GameCategory::Trial,
            _ => GameCategory::Unknown,
        }
    }

    /// Convert to the Steam `type` string
    pub fn as_str(&self) -> &'static str {
        match self {
            GameCategory::Standard => "game",
            GameCategory::Addon => "dlc",
            GameCategory::Trial => "demo",
            GameCategory::Unknown => "unknown",
        }
    }

    /// Integer code used as the `type_encoded` feature
    pub fn encoded(&self) -> f64 {
        match self {
            GameCategory::Standard => 1.0,
            GameCategory::Addon => 2.0,
            GameCategory::Trial => 3.0,
            GameCategory::Unknown => 0.0,
        }
    }
}

impl From<Option<String>> for GameCategory {
    fn from(s: Option<String>) -> Self {
        s.as_deref()
            .map(GameCategory::from_steam_type)
            .unwrap_or(GameCategory::Unknown)
    }
}

/// Row of the `games` table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GameRow {
    pub appid: AppId,
    pub name: String,
    pub game_type: Option<String>, // `type` column, aliased in queries
    pub release_date: Option<NaiveDate>,
}

/// Read-only snapshot of a game's metadata, fetched per request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMetadata {
    pub id: AppId,
    pub display_name: String,
    pub category: GameCategory,
    pub release_date: Option<NaiveDate>,
}

impl GameMetadata {
    pub fn new(id: AppId, display_name: impl Into<String>, category: GameCategory) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            category,
            release_date: None,
        }
    }

    pub fn with_release_date(mut self, release_date: NaiveDate) -> Self {
        self.release_date = Some(release_date);
        self
    }
}

impl From<GameRow> for GameMetadata {
    fn from(row: GameRow) -> Self {
        Self {
            id: row.appid,
            display_name: row.name,
            category: GameCategory::from(row.game_type),
            release_date: row.release_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_steam_type() {
        assert_eq!(GameCategory::from_steam_type("game"), GameCategory::Standard);
        assert_eq!(GameCategory::from_steam_type("DLC"), GameCategory::Addon);
        assert_eq!(GameCategory::from_steam_type(" demo "), GameCategory::Trial);
        assert_eq!(GameCategory::from_steam_type("music"), GameCategory::Unknown);
        assert_eq!(GameCategory::from(None), GameCategory::Unknown);
    }

    #[test]
    fn test_category_encoding() {
        assert_eq!(GameCategory::Standard.encoded(), 1.0);
        assert_eq!(GameCategory::Addon.encoded(), 2.0);
        assert_eq!(GameCategory::Trial.encoded(), 3.0);
        assert_eq!(GameCategory::Unknown.encoded(), 0.0);
    }

    #[test]
    fn test_metadata_from_row() {
        let row = GameRow {
            appid: 730,
            name: "Counter-Strike".to_string(),
            game_type: Some("game".to_string()),
            release_date: NaiveDate::from_ymd_opt(2012, 8, 21),
        };
        let meta = GameMetadata::from(row);
        assert_eq!(meta.id, 730);
        assert_eq!(meta.category, GameCategory::Standard);
        assert_eq!(meta.release_date, NaiveDate::from_ymd_opt(2012, 8, 21));
    }
}
