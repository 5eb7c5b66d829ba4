//! Domain models for the Pryzor backend.
//!
//! Database rows for games and price history, the normalized shapes the
//! forecast pipeline works on, and the results it hands back.

pub mod game;
pub mod prediction;
pub mod price_history;

// Re-export all models for convenient access
pub use game::{GameCategory, GameMetadata, GameRow};
pub use prediction::{InspectReport, ModelInfo, ModelSnapshot, PredictionResult, Recommendation};
pub use price_history::{PriceHistoryRow, PriceObservation};

/// External identifier of one Steam game or product
pub type AppId = i64;
