//! Forecast pipeline services.
//!
//! [`PriceSeriesAccessor`] loads a game's history, [`DiscountForecastService`]
//! turns it into a prediction with the active model, and [`ResultCache`]
//! keeps recent predictions until the TTL passes or the model is reloaded.

pub mod cache;
pub mod forecast_service;
pub mod price_series;

pub use cache::ResultCache;
pub use forecast_service::DiscountForecastService;
pub use price_series::{normalize_rows, GameSeries, PgPriceStore, PriceSeriesAccessor, PriceStore};
