use super::stats::{self, tail};
use super::{FeatureMap, FeatureSet, SeriesContext};
use crate::models::PriceObservation;

/// Window and span choices for [`RollingPriceFeatures`].
///
/// Windows count rows, not calendar days: the most recent `n` observations
/// up to the as-of date.
#[derive(Debug, Clone)]
pub struct RollingConfig {
    pub windows: Vec<usize>,
    /// Spans for `price_ema{span}`, computed over the whole series
    pub ema_spans: Vec<usize>,
    /// `(short, long)` pairs for `price_ma{short}_over_{long}`
    pub ratio_pairs: Vec<(usize, usize)>,
    /// Discount percentage counted by `disc_strong_freq{n}`
    pub strong_discount_pct: f64,
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self {
            windows: vec![7, 14, 30, 60, 90],
            ema_spans: vec![7, 30],
            ratio_pairs: vec![(7, 30)],
            strong_discount_pct: 40.0,
        }
    }
}

/// Price level, dispersion, trend and discount activity over trailing windows
pub struct RollingPriceFeatures {
    config: RollingConfig,
    names: Vec<String>,
}

impl RollingPriceFeatures {
    pub fn new(config: RollingConfig) -> Self {
        let mut names = Vec::new();
        for w in &config.windows {
            for prefix in [
                "price_ma",
                "price_std",
                "price_var",
                "price_min",
                "price_max",
                "price_slope",
                "price_z_ma",
                "disc_freq",
                "disc_mean",
                "disc_max",
                "disc_strong_freq",
                "avg_gap_disc",
                "days_since_max_disc",
            ] {
                names.push(format!("{}{}", prefix, w));
            }
        }
        for span in &config.ema_spans {
            names.push(format!("price_ema{}", span));
        }
        for (short, long) in &config.ratio_pairs {
            names.push(format!("price_ma{}_over_{}", short, long));
        }
        names.push("days_since_last_disc".to_string());

        Self { config, names }
    }

    fn window_features(
        &self,
        ctx: &SeriesContext<'_>,
        window: &[PriceObservation],
        n: usize,
        latest_price: f64,
        out: &mut FeatureMap,
    ) {
        let prices: Vec<f64> = window.iter().map(|o| o.final_price).collect();
        let discounts: Vec<f64> = window.iter().map(PriceObservation::discount).collect();

        let ma = stats::mean(&prices);
        let sd = stats::std_dev(&prices);

        out.insert(format!("price_ma{}", n), ma);
        out.insert(format!("price_std{}", n), sd);
        out.insert(format!("price_var{}", n), stats::variance(&prices));
        out.insert(format!("price_min{}", n), stats::min(&prices));
        out.insert(format!("price_max{}", n), stats::max(&prices));
        out.insert(format!("price_slope{}", n), stats::ols_slope(&prices));
        let z = if window.is_empty() {
            0.0
        } else {
            stats::z_score(latest_price, ma, sd)
        };
        out.insert(format!("price_z_ma{}", n), z);

        out.insert(
            format!("disc_freq{}", n),
            stats::fraction(window.iter().map(|o| ctx.is_discounted(o))),
        );
        out.insert(format!("disc_mean{}", n), stats::mean(&discounts));
        out.insert(format!("disc_max{}", n), stats::max(&discounts));
        out.insert(
            format!("disc_strong_freq{}", n),
            stats::fraction(
                window
                    .iter()
                    .map(|o| o.discount() >= self.config.strong_discount_pct),
            ),
        );

        let discount_positions: Vec<usize> = window
            .iter()
            .enumerate()
            .filter(|(_, o)| ctx.is_discounted(o))
            .map(|(i, _)| i)
            .collect();
        out.insert(
            format!("avg_gap_disc{}", n),
            stats::mean_gap(&discount_positions),
        );

        let days_since_max = stats::first_argmax(&discounts)
            .map(|i| (ctx.as_of - window[i].date).num_days() as f64)
            .unwrap_or(0.0);
        out.insert(format!("days_since_max_disc{}", n), days_since_max);
    }
}

impl FeatureSet for RollingPriceFeatures {
    fn name(&self) -> &'static str {
        "rolling_price"
    }

    fn feature_names(&self) -> &[String] {
        &self.names
    }

    fn extract(&self, ctx: &SeriesContext<'_>, out: &mut FeatureMap) {
        let series = ctx.observations;
        let latest_price = ctx.latest().map(|o| o.final_price).unwrap_or(0.0);

        for &n in &self.config.windows {
            self.window_features(ctx, tail(series, n), n, latest_price, out);
        }

        let all_prices: Vec<f64> = series.iter().map(|o| o.final_price).collect();
        for &span in &self.config.ema_spans {
            out.insert(format!("price_ema{}", span), stats::ema(&all_prices, span));
        }

        for &(short, long) in &self.config.ratio_pairs {
            let short_ma = stats::mean(tail(&all_prices, short));
            let long_ma = stats::mean(tail(&all_prices, long));
            out.insert(
                format!("price_ma{}_over_{}", short, long),
                stats::ratio_or_zero(short_ma, long_ma),
            );
        }

        let days_since_last = series
            .iter()
            .rev()
            .find(|o| ctx.is_discounted(o))
            .map(|o| (ctx.as_of - o.date).num_days() as f64)
            .unwrap_or(0.0);
        out.insert("days_since_last_disc".to_string(), days_since_last);
    }
}

/// Features derived from the game's metadata rather than its prices
pub struct MetadataFeatures {
    names: Vec<String>,
}

impl Default for MetadataFeatures {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataFeatures {
    pub fn new() -> Self {
        Self {
            names: vec!["type_encoded".to_string(), "years_since_release".to_string()],
        }
    }
}

impl FeatureSet for MetadataFeatures {
    fn name(&self) -> &'static str {
        "metadata"
    }

    fn feature_names(&self) -> &[String] {
        &self.names
    }

    fn extract(&self, ctx: &SeriesContext<'_>, out: &mut FeatureMap) {
        out.insert("type_encoded".to_string(), ctx.metadata.category.encoded());

        // Unknown or future release dates count as zero
        let years = ctx
            .metadata
            .release_date
            .map(|released| (ctx.as_of - released).num_days() as f64 / 365.25)
            .map(|y| y.max(0.0))
            .unwrap_or(0.0);
        out.insert("years_since_release".to_string(), years);
    }
}
