//! Rule evaluation engine.
//!
//! Evaluates one rule at one instant against an ephemeris provider.
//!
//! # Evaluation Semantics
//!
//! - Conditions are AND-combined in declaration order and short-circuit on
//!   the first unmet one
//! - A rule without conditions holds trivially
//! - A condition whose relation has no registered handler is unmet
//! - When the rule holds, one [`EvaluationRecord`] is emitted per outcome

use crate::domain::error::AstroError;
use crate::domain::event::EvaluationRecord;
use crate::domain::relation::Relation;
use crate::domain::relations::RelationRegistry;
use crate::domain::rule::{Condition, Rule};
use crate::domain::settings::EngineSettings;
use crate::domain::zodiac::{Planet, Sign};
use crate::ports::ephemeris_port::EphemerisProvider;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Midnight UTC of `date`, the instant every daily scan samples.
pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Condition truth for one day plus the positions behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct DayEvaluation {
    pub date: NaiveDate,
    pub holds: bool,
    /// Snapshot of the involved bodies, `Null` when the rule does not hold.
    pub context: Value,
}

#[derive(Clone)]
pub struct RuleEvaluator {
    provider: Arc<dyn EphemerisProvider>,
    registry: Arc<RelationRegistry>,
    default_orb: f64,
}

impl RuleEvaluator {
    pub fn new(
        provider: Arc<dyn EphemerisProvider>,
        registry: Arc<RelationRegistry>,
        default_orb: f64,
    ) -> Self {
        Self {
            provider,
            registry,
            default_orb,
        }
    }

    /// Standard registry with the configured combustion overrides.
    pub fn from_settings(provider: Arc<dyn EphemerisProvider>, settings: &EngineSettings) -> Self {
        let registry = RelationRegistry::standard(settings.combustion_orbs.clone());
        Self::new(provider, Arc::new(registry), settings.default_orb)
    }

    pub fn provider(&self) -> &dyn EphemerisProvider {
        self.provider.as_ref()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn default_orb(&self) -> f64 {
        self.default_orb
    }

    pub fn check_condition(&self, condition: &Condition, at: DateTime<Utc>) -> bool {
        let Some(handler) = self.registry.get(condition.relation) else {
            log::warn!(
                "no handler registered for {}; treating as unmet",
                condition.relation
            );
            return false;
        };
        let met = handler.check(self.provider.as_ref(), condition, at, self.default_orb);
        log::debug!(
            "{} {} {:?} at {at}: {met}",
            condition.planet,
            condition.relation,
            condition.target
        );
        met
    }

    pub fn conditions_hold(&self, rule: &Rule, at: DateTime<Utc>) -> bool {
        rule.conditions.iter().all(|c| self.check_condition(c, at))
    }

    pub fn evaluate_rule(&self, rule: &Rule, at: DateTime<Utc>) -> Vec<EvaluationRecord> {
        if !self.conditions_hold(rule, at) {
            return Vec::new();
        }
        let date = at.date_naive();
        rule.outcomes
            .iter()
            .map(|outcome| EvaluationRecord {
                rule_id: rule.rule_id.clone(),
                rule_name: None,
                date,
                sector: outcome.sector.clone(),
                effect: outcome.effect,
                weight: outcome.weight,
                confidence: rule.confidence,
            })
            .collect()
    }

    /// Evaluates `rule` at the start of `date` and, when it holds, captures
    /// the positions of every body the rule mentions.
    pub fn evaluate_day(&self, rule: &Rule, date: NaiveDate) -> Result<DayEvaluation, AstroError> {
        let at = day_start(date);
        if !self.conditions_hold(rule, at) {
            return Ok(DayEvaluation {
                date,
                holds: false,
                context: Value::Null,
            });
        }
        Ok(DayEvaluation {
            date,
            holds: true,
            context: self.snapshot(rule, at)?,
        })
    }

    fn snapshot(&self, rule: &Rule, at: DateTime<Utc>) -> Result<Value, AstroError> {
        let mut bodies = BTreeSet::new();
        for condition in &rule.conditions {
            bodies.insert(condition.planet);
            if condition.relation.needs_target_planet() {
                if let Ok(target) = condition.target_planet() {
                    bodies.insert(target);
                }
            }
            if condition.relation == Relation::CombustBySun {
                bodies.insert(Planet::Sun);
            }
        }

        let mut positions = Map::new();
        for planet in bodies {
            let longitude = self.provider.longitude(planet, at)?;
            let nakshatra = self.provider.nakshatra_index(longitude);
            positions.insert(
                planet.key().to_string(),
                json!({
                    "longitude": longitude,
                    "sign": Sign::from_longitude(longitude).name(),
                    "nakshatra": nakshatra,
                    "nakshatra_owner": self.provider.nakshatra_owner(nakshatra).key(),
                }),
            );
        }

        Ok(json!({
            "provider": self.provider.name(),
            "instant": at.to_rfc3339(),
            "positions": Value::Object(positions),
        }))
    }
}
