//! Rule persistence port.

use crate::domain::error::AstroError;
use crate::domain::rule::Rule;

pub trait RuleStorePort {
    /// `Ok(None)` when no rule has this id.
    fn get_rule(&self, rule_id: &str) -> Result<Option<Rule>, AstroError>;

    /// Enabled rules ordered by id.
    fn list_enabled_rules(&self) -> Result<Vec<Rule>, AstroError>;

    /// Inserts or replaces the rule with its conditions and outcomes.
    fn upsert_rule(&self, rule: &Rule) -> Result<(), AstroError>;

    fn require_rule(&self, rule_id: &str) -> Result<Rule, AstroError> {
        self.get_rule(rule_id)?
            .ok_or_else(|| AstroError::RuleNotFound {
                rule_id: rule_id.to_string(),
            })
    }
}
