//! Correlation of evaluation records with subsequent price moves.
//!
//! For each record the entry bar is the first bar on or after the record
//! date and the exit bar sits `h` bars later. The return is signed by the
//! outcome's effect (+1 bullish, -1 bearish); neutral records are listed
//! but stay out of the directional statistics.

use crate::domain::event::EvaluationRecord;
use crate::domain::rule::Effect;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Calendar days fetched past the longest horizon to cover non-trading days.
const FETCH_MARGIN_DAYS: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HorizonStats {
    pub horizon: usize,
    pub count: usize,
    pub hit_rate: f64,
    pub avg_return: f64,
    pub median_return: f64,
    pub std_return: f64,
}

impl HorizonStats {
    pub fn from_returns(horizon: usize, returns: &[f64]) -> Self {
        if returns.is_empty() {
            return Self {
                horizon,
                count: 0,
                hit_rate: 0.0,
                avg_return: 0.0,
                median_return: 0.0,
                std_return: 0.0,
            };
        }
        let n = returns.len() as f64;
        let hits = returns.iter().filter(|r| **r > 0.0).count();
        let mean = returns.iter().sum::<f64>() / n;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;

        Self {
            horizon,
            count: returns.len(),
            hit_rate: hits as f64 / n,
            avg_return: mean,
            median_return: median(returns),
            std_return: variance.sqrt(),
        }
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordReturns {
    pub entry_date: NaiveDate,
    pub sector: String,
    pub effect: Effect,
    /// Outcome weight scaled by rule confidence.
    pub weight: f64,
    /// Raw return per horizon; `None` when the series is too short.
    pub returns: BTreeMap<usize, Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleCorrelation {
    pub rule_id: String,
    pub name: String,
    pub count: usize,
    pub records: Vec<RecordReturns>,
    pub stats: Vec<HorizonStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationReport {
    pub ticker: String,
    pub horizons: Vec<usize>,
    pub per_rule: Vec<RuleCorrelation>,
    pub aggregate: Vec<HorizonStats>,
}

/// Return from the first bar on/after `entry` to the bar `horizon` rows
/// later. `prices` must be sorted by date.
pub fn horizon_return(prices: &[PricePoint], entry: NaiveDate, horizon: usize) -> Option<f64> {
    let idx = prices.partition_point(|p| p.date < entry);
    let entry_bar = prices.get(idx)?;
    let exit_bar = prices.get(idx + horizon)?;
    if entry_bar.close <= 0.0 {
        return None;
    }
    Some(exit_bar.close / entry_bar.close - 1.0)
}

/// Date span of prices needed to score `records` at every horizon.
pub fn price_window(records: &[EvaluationRecord], horizons: &[usize]) -> Option<(NaiveDate, NaiveDate)> {
    let first = records.iter().map(|r| r.date).min()?;
    let last = records.iter().map(|r| r.date).max()?;
    let max_h = horizons.iter().copied().max().unwrap_or(0);
    Some((first, last + Duration::days(max_h as i64 + FETCH_MARGIN_DAYS)))
}

pub fn analyze_correlation(
    ticker: &str,
    records: &[EvaluationRecord],
    prices: &[PricePoint],
    horizons: &[usize],
) -> CorrelationReport {
    let mut prices = prices.to_vec();
    prices.sort_by_key(|p| p.date);

    let mut grouped: BTreeMap<&str, Vec<&EvaluationRecord>> = BTreeMap::new();
    for record in records {
        grouped.entry(record.rule_id.as_str()).or_default().push(record);
    }

    let mut aggregate: BTreeMap<usize, Vec<f64>> = horizons.iter().map(|h| (*h, Vec::new())).collect();
    let mut per_rule = Vec::with_capacity(grouped.len());

    for (rule_id, rule_records) in grouped {
        let mut directional: BTreeMap<usize, Vec<f64>> =
            horizons.iter().map(|h| (*h, Vec::new())).collect();
        let mut scored = Vec::with_capacity(rule_records.len());

        for record in &rule_records {
            let mut returns = BTreeMap::new();
            for &h in horizons {
                let ret = horizon_return(&prices, record.date, h);
                if let (Some(r), Some(direction)) = (ret, record.effect.direction()) {
                    let signed = r * direction;
                    directional.entry(h).or_default().push(signed);
                    aggregate.entry(h).or_default().push(signed);
                }
                returns.insert(h, ret);
            }
            scored.push(RecordReturns {
                entry_date: record.date,
                sector: record.sector.clone(),
                effect: record.effect,
                weight: record.weight * record.confidence,
                returns,
            });
        }

        let name = rule_records
            .iter()
            .find_map(|r| r.rule_name.clone())
            .unwrap_or_else(|| rule_id.to_string());
        per_rule.push(RuleCorrelation {
            rule_id: rule_id.to_string(),
            name,
            count: scored.len(),
            records: scored,
            stats: horizons
                .iter()
                .map(|h| HorizonStats::from_returns(*h, &directional[h]))
                .collect(),
        });
    }

    log::info!(
        "correlated {} records across {} rules against {} bars of {ticker}",
        records.len(),
        per_rule.len(),
        prices.len()
    );

    CorrelationReport {
        ticker: ticker.to_string(),
        horizons: horizons.to_vec(),
        per_rule,
        aggregate: horizons
            .iter()
            .map(|h| HorizonStats::from_returns(*h, &aggregate[h]))
            .collect(),
    }
}
