use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Row of the `price_history` table as stored; every column may be dirty
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PriceHistoryRow {
    pub date: Option<NaiveDate>,
    pub final_price: Option<Decimal>, // NUMERIC(10, 2) in database
    pub discount: Option<i32>,
}

impl PriceHistoryRow {
    pub fn new(date: NaiveDate, final_price: Decimal, discount: i32) -> Self {
        Self {
            date: Some(date),
            final_price: Some(final_price),
            discount: Some(discount),
        }
    }

    /// Coerce into a usable observation.
    ///
    /// Rows without a date or price, with a negative or unrepresentable price,
    /// or with a discount outside 0..=100 are rejected. A missing discount
    /// counts as no discount.
    pub fn normalize(&self) -> Option<PriceObservation> {
        let date = self.date?;
        let final_price = self.final_price?.to_f64()?;
        if !final_price.is_finite() || final_price < 0.0 {
            return None;
        }

        let discount = self.discount.unwrap_or(0);
        let discount_percent = u8::try_from(discount).ok().filter(|d| *d <= 100)?;

        Some(PriceObservation {
            date,
            final_price,
            discount_percent,
        })
    }
}

/// One normalized point of a game's price series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub date: NaiveDate,
    pub final_price: f64,
    pub discount_percent: u8,
}

impl PriceObservation {
    pub fn new(date: NaiveDate, final_price: f64, discount_percent: u8) -> Self {
        Self {
            date,
            final_price,
            discount_percent,
        }
    }

    pub fn discount(&self) -> f64 {
        f64::from(self.discount_percent)
    }
}
