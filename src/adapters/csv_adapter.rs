//! CSV market data: one `<ticker>.csv` file per ticker.
//!
//! Columns are located by header name: `Date` plus `Adj Close`, falling
//! back to `Close` when no adjusted column exists.

use crate::domain::correlation::PricePoint;
use crate::domain::error::AstroError;
use crate::ports::market_data_port::MarketDataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{ticker}.csv"))
    }
}

fn column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|name| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    })
}

impl MarketDataPort for CsvAdapter {
    fn fetch_prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, AstroError> {
        let path = self.csv_path(ticker);
        if !path.exists() {
            return Err(AstroError::NoPriceData {
                ticker: ticker.to_string(),
            });
        }
        let content = fs::read_to_string(&path).map_err(|e| AstroError::MarketData {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| AstroError::MarketData {
                reason: format!("CSV header error: {}", e),
            })?
            .clone();
        let date_col = column(&headers, &["Date"]).ok_or_else(|| AstroError::MarketData {
            reason: format!("{} has no Date column", path.display()),
        })?;
        let close_col =
            column(&headers, &["Adj Close", "Close"]).ok_or_else(|| AstroError::MarketData {
                reason: format!("{} has neither Adj Close nor Close", path.display()),
            })?;

        let mut prices = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| AstroError::MarketData {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(date_col).unwrap_or_default().trim();
            // yfinance exports may carry a time component
            let date_part = date_str.split([' ', 'T']).next().unwrap_or_default();
            let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|e| {
                AstroError::MarketData {
                    reason: format!("invalid date '{}': {}", date_str, e),
                }
            })?;

            if date < start || date > end {
                continue;
            }

            let close_str = record.get(close_col).unwrap_or_default().trim();
            // gaps in the series are left out rather than failing the fetch
            if close_str.is_empty() || close_str.eq_ignore_ascii_case("null") {
                continue;
            }
            let close: f64 = close_str.parse().map_err(|e| AstroError::MarketData {
                reason: format!("invalid close value '{}': {}", close_str, e),
            })?;

            prices.push(PricePoint { date, close });
        }

        prices.sort_by_key(|p| p.date);
        log::debug!("{} bars of {ticker} from {}", prices.len(), path.display());
        Ok(prices)
    }
}
