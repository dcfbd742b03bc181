//! Range evaluation: every enabled rule, every day, as flat records.

use crate::domain::config_validation::validate_date_range;
use crate::domain::error::AstroError;
use crate::domain::event::EvaluationRecord;
use crate::domain::rule::Rule;
use crate::domain::rule_eval::{RuleEvaluator, day_start};
use chrono::NaiveDate;

/// Evaluates the enabled rules for each day of `[start, end]` at midnight
/// UTC. Records come out ordered by date, then by rule order.
pub fn evaluate_rules_for_range(
    rules: &[Rule],
    evaluator: &RuleEvaluator,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<EvaluationRecord>, AstroError> {
    validate_date_range(start, end)?;
    let enabled: Vec<&Rule> = rules.iter().filter(|r| r.enabled).collect();
    log::info!(
        "evaluating {} enabled rules over {start}..{end} (provider {})",
        enabled.len(),
        evaluator.provider_name()
    );

    let mut records = Vec::new();
    for date in start.iter_days().take_while(|d| *d <= end) {
        let at = day_start(date);
        for rule in &enabled {
            records.extend(evaluator.evaluate_rule(rule, at).into_iter().map(|mut record| {
                record.rule_name = Some(rule.name.clone());
                record
            }));
        }
    }
    log::info!("{} evaluation records", records.len());
    Ok(records)
}
