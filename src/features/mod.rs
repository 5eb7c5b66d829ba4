//! Feature extraction from a game's price history.
//!
//! Features are grouped into [`FeatureSet`]s. The active model artifact
//! declares which feature names it needs; the [`FeatureExtractor`] runs only
//! the sets that produce at least one of them, and [`FeatureVector::align`]
//! puts the result into the artifact's exact order.
//!
//! ```text
//! observations (sorted, <= as_of)
//!     │
//!     ├─ RollingPriceFeatures   price_ma30, disc_freq7, days_since_last_disc, ...
//!     ├─ MetadataFeatures       type_encoded, years_since_release
//!     ├─ SeasonalFeatures       season_*, sale_*
//!     └─ SimpleCalendarFeatures month, quarter, is_weekend, ...
//!     │
//!     ▼
//! FeatureMap ──align(feature_names)──▶ FeatureVector
//! ```

mod calendar;
mod rolling;
pub mod stats;
mod vector;

pub use calendar::{
    DayRange, SaleCalendar, SaleWindow, SeasonalFeatures, SimpleCalendarFeatures,
    SIMPLE_CALENDAR_FEATURE_NAMES,
};
pub use rolling::{MetadataFeatures, RollingConfig, RollingPriceFeatures};
pub use vector::FeatureVector;

use crate::error::ForecastError;
use crate::models::{GameMetadata, PriceObservation};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Raw extraction output: feature name to value
pub type FeatureMap = BTreeMap<String, f64>;

/// Feature list used when an artifact does not declare one.
pub const DEFAULT_FEATURE_NAMES: &[&str] = &[
    "price_ma7", "price_ma14", "price_ma30", "price_ma60", "price_ma90",
    "price_std14", "price_std30", "price_std60", "price_std90",
    "price_ema7", "price_ema30", "price_z_ma30", "price_z_ma90",
    "price_slope7", "price_slope30", "price_slope90",
    "price_var7", "price_var30", "price_var90",
    "price_max30", "price_min30", "price_max90", "price_min90",
    "disc_freq7", "disc_freq14", "disc_freq30", "disc_freq60", "disc_freq90",
    "disc_mean30", "disc_mean90", "disc_max30", "disc_max90",
    "disc_strong_freq30", "disc_strong_freq90",
    "avg_gap_disc90", "days_since_max_disc90",
    "price_ma7_over_30", "days_since_last_disc",
    "type_encoded", "years_since_release",
    "season_winter", "season_spring", "season_summer", "season_fall",
    "sale_winter", "sale_summer", "sale_autumn", "sale_lunar_new_year",
    "sale_halloween", "sale_spring", "sale_black_friday",
];

/// Everything a feature set may look at for one extraction
#[derive(Debug, Clone, Copy)]
pub struct SeriesContext<'a> {
    pub metadata: &'a GameMetadata,
    /// Ascending by date, nothing after `as_of`
    pub observations: &'a [PriceObservation],
    pub as_of: NaiveDate,
    /// A row counts as discounted at or above this percentage
    pub discount_threshold_pct: f64,
}

impl SeriesContext<'_> {
    pub fn latest(&self) -> Option<&PriceObservation> {
        self.observations.last()
    }

    pub fn is_discounted(&self, obs: &PriceObservation) -> bool {
        obs.discount() >= self.discount_threshold_pct
    }
}

/// A named group of features computed together.
///
/// Implementations must be pure and must not fail; degenerate input
/// produces 0.0 values.
pub trait FeatureSet: Send + Sync {
    fn name(&self) -> &'static str;

    /// Every name this set can produce
    fn feature_names(&self) -> &[String];

    fn extract(&self, ctx: &SeriesContext<'_>, out: &mut FeatureMap);

    fn provides_any(&self, names: &[String]) -> bool {
        let own = self.feature_names();
        names.iter().any(|n| own.contains(n))
    }
}

/// Tunables shared by the built-in feature sets
#[derive(Debug, Clone, Default)]
pub struct FeatureConfig {
    pub rolling: RollingConfig,
    pub sale_calendar: SaleCalendar,
}

/// Runs feature sets over a price series
pub struct FeatureExtractor {
    sets: Vec<Box<dyn FeatureSet>>,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(FeatureConfig::default())
    }
}

impl FeatureExtractor {
    /// Extractor with every built-in feature set
    pub fn new(config: FeatureConfig) -> Self {
        Self {
            sets: vec![
                Box::new(RollingPriceFeatures::new(config.rolling)),
                Box::new(MetadataFeatures::new()),
                Box::new(SeasonalFeatures::new(config.sale_calendar)),
                Box::new(SimpleCalendarFeatures::new()),
            ],
        }
    }

    /// Extractor over a custom list of sets
    pub fn with_sets(sets: Vec<Box<dyn FeatureSet>>) -> Self {
        Self { sets }
    }

    pub fn set_names(&self) -> Vec<&'static str> {
        self.sets.iter().map(|s| s.name()).collect()
    }

    /// All names any registered set can produce
    pub fn available_names(&self) -> Vec<&str> {
        self.sets
            .iter()
            .flat_map(|s| s.feature_names().iter().map(String::as_str))
            .collect()
    }

    /// Run every feature set.
    ///
    /// `as_of` defaults to the date of the latest observation. Fails only
    /// when there are no observations and no `as_of` to anchor the calendar.
    pub fn extract(
        &self,
        metadata: &GameMetadata,
        observations: &[PriceObservation],
        as_of: Option<NaiveDate>,
        discount_threshold_pct: f64,
    ) -> Result<FeatureMap, ForecastError> {
        self.run(metadata, observations, as_of, discount_threshold_pct, None)
    }

    /// Run only the sets that produce at least one of `required`
    pub fn extract_for(
        &self,
        metadata: &GameMetadata,
        observations: &[PriceObservation],
        as_of: Option<NaiveDate>,
        discount_threshold_pct: f64,
        required: &[String],
    ) -> Result<FeatureMap, ForecastError> {
        self.run(
            metadata,
            observations,
            as_of,
            discount_threshold_pct,
            Some(required),
        )
    }

    fn run(
        &self,
        metadata: &GameMetadata,
        observations: &[PriceObservation],
        as_of: Option<NaiveDate>,
        discount_threshold_pct: f64,
        required: Option<&[String]>,
    ) -> Result<FeatureMap, ForecastError> {
        let mut series = observations.to_vec();
        if !series.windows(2).all(|w| w[0].date <= w[1].date) {
            series.sort_by_key(|o| o.date);
        }

        let as_of = match as_of.or_else(|| series.last().map(|o| o.date)) {
            Some(date) => date,
            None => {
                return Err(ForecastError::InternalComputation(format!(
                    "no observations to anchor features for game {}",
                    metadata.id
                )))
            }
        };
        series.retain(|o| o.date <= as_of);

        let ctx = SeriesContext {
            metadata,
            observations: &series,
            as_of,
            discount_threshold_pct,
        };

        let mut out = FeatureMap::new();
        for set in &self.sets {
            if required.map_or(true, |names| set.provides_any(names)) {
                set.extract(&ctx, &mut out);
            }
        }

        for value in out.values_mut() {
            *value = stats::finite_or_zero(*value);
        }
        Ok(out)
    }
}

impl std::fmt::Debug for FeatureExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureExtractor")
            .field("sets", &self.set_names())
            .finish()
    }
}

/// The default feature list as owned strings
pub fn default_feature_names() -> Vec<String> {
    DEFAULT_FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
}
