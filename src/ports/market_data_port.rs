//! Market price port used by correlation analysis.

use crate::domain::correlation::PricePoint;
use crate::domain::error::AstroError;
use chrono::NaiveDate;

pub trait MarketDataPort {
    /// Daily closes in `[start, end]`, sorted by date.
    fn fetch_prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, AstroError>;

    /// Simple return between the first bar on/after `start` and the last
    /// bar on/before `end`, `None` when either side is missing.
    fn compute_return(&self, prices: &[PricePoint], start: NaiveDate, end: NaiveDate) -> Option<f64> {
        let entry = prices.iter().find(|p| p.date >= start)?;
        let exit = prices.iter().rev().find(|p| p.date <= end)?;
        if exit.date < entry.date || entry.close == 0.0 {
            return None;
        }
        Some(exit.close / entry.close - 1.0)
    }
}
