use super::{FeatureMap, FeatureSet, SeriesContext};
use chrono::{Datelike, NaiveDate};

/// Inclusive `(month, day)` span within one calendar year
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    pub start: (u32, u32),
    pub end: (u32, u32),
}

impl DayRange {
    pub const fn new(start: (u32, u32), end: (u32, u32)) -> Self {
        Self { start, end }
    }

    /// Ranges never wrap the year; a sale crossing New Year is two ranges.
    pub fn contains(&self, date: NaiveDate) -> bool {
        let md = (date.month(), date.day());
        self.start <= md && md <= self.end
    }
}

/// A named recurring sale, active when any of its ranges contains the date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleWindow {
    pub name: String,
    pub ranges: Vec<DayRange>,
}

impl SaleWindow {
    pub fn new(name: impl Into<String>, ranges: Vec<DayRange>) -> Self {
        Self {
            name: name.into(),
            ranges,
        }
    }

    pub fn is_active(&self, date: NaiveDate) -> bool {
        self.ranges.iter().any(|r| r.contains(date))
    }

    pub fn feature_name(&self) -> String {
        format!("sale_{}", self.name)
    }
}

/// Recurring Steam sale periods
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleCalendar {
    pub windows: Vec<SaleWindow>,
}

impl Default for SaleCalendar {
    fn default() -> Self {
        Self {
            windows: vec![
                SaleWindow::new(
                    "winter",
                    vec![DayRange::new((12, 15), (12, 31)), DayRange::new((1, 1), (1, 7))],
                ),
                SaleWindow::new("summer", vec![DayRange::new((6, 20), (7, 10))]),
                SaleWindow::new("autumn", vec![DayRange::new((11, 20), (11, 30))]),
                SaleWindow::new(
                    "lunar_new_year",
                    vec![DayRange::new((1, 1), (1, 15)), DayRange::new((2, 1), (2, 15))],
                ),
                SaleWindow::new("halloween", vec![DayRange::new((10, 25), (10, 31))]),
                SaleWindow::new(
                    "spring",
                    vec![DayRange::new((3, 1), (3, 15)), DayRange::new((4, 1), (4, 15))],
                ),
                SaleWindow::new("black_friday", vec![DayRange::new((11, 20), (11, 30))]),
            ],
        }
    }
}

impl SaleCalendar {
    /// `(sale_<name>, 0.0 | 1.0)` for every window
    pub fn flags(&self, date: NaiveDate) -> Vec<(String, f64)> {
        self.windows
            .iter()
            .map(|w| (w.feature_name(), flag(w.is_active(date))))
            .collect()
    }
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

const SEASONS: [(&str, [u32; 3]); 4] = [
    ("season_winter", [12, 1, 2]),
    ("season_spring", [3, 4, 5]),
    ("season_summer", [6, 7, 8]),
    ("season_fall", [9, 10, 11]),
];

/// Meteorological season and sale-window flags for the as-of date
pub struct SeasonalFeatures {
    calendar: SaleCalendar,
    names: Vec<String>,
}

impl SeasonalFeatures {
    pub fn new(calendar: SaleCalendar) -> Self {
        let names = SEASONS
            .iter()
            .map(|(name, _)| name.to_string())
            .chain(calendar.windows.iter().map(SaleWindow::feature_name))
            .collect();
        Self { calendar, names }
    }
}

impl FeatureSet for SeasonalFeatures {
    fn name(&self) -> &'static str {
        "seasonal"
    }

    fn feature_names(&self) -> &[String] {
        &self.names
    }

    fn extract(&self, ctx: &SeriesContext<'_>, out: &mut FeatureMap) {
        let month = ctx.as_of.month();
        for (name, months) in SEASONS {
            out.insert(name.to_string(), flag(months.contains(&month)));
        }
        out.extend(self.calendar.flags(ctx.as_of));
    }
}

/// Names of the compact calendar feature set, in model order
pub const SIMPLE_CALENDAR_FEATURE_NAMES: [&str; 8] = [
    "discount_percent",
    "final_price",
    "month",
    "quarter",
    "day_of_week",
    "is_weekend",
    "is_winter_sale",
    "is_summer_sale",
];

/// Compact calendar set used by lighter models: latest price point plus
/// coarse date parts
pub struct SimpleCalendarFeatures {
    names: Vec<String>,
}

impl Default for SimpleCalendarFeatures {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleCalendarFeatures {
    pub fn new() -> Self {
        Self {
            names: SIMPLE_CALENDAR_FEATURE_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl FeatureSet for SimpleCalendarFeatures {
    fn name(&self) -> &'static str {
        "simple_calendar"
    }

    fn feature_names(&self) -> &[String] {
        &self.names
    }

    fn extract(&self, ctx: &SeriesContext<'_>, out: &mut FeatureMap) {
        let (discount, price) = ctx
            .latest()
            .map(|o| (o.discount(), o.final_price))
            .unwrap_or((0.0, 0.0));
        let date = ctx.as_of;
        let month = date.month();
        let weekday = date.weekday().num_days_from_monday();

        out.insert("discount_percent".to_string(), discount);
        out.insert("final_price".to_string(), price);
        out.insert("month".to_string(), f64::from(month));
        out.insert("quarter".to_string(), f64::from((month - 1) / 3 + 1));
        out.insert("day_of_week".to_string(), f64::from(weekday));
        out.insert("is_weekend".to_string(), flag(weekday >= 5));
        out.insert("is_winter_sale".to_string(), flag(matches!(month, 12 | 1)));
        out.insert("is_summer_sale".to_string(), flag(matches!(month, 6 | 7)));
    }
}
