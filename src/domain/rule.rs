//! Rule definitions: conditions, outcomes and the rule that owns them.
//!
//! - `Condition`: one planetary test (planet, relation, target, orb, value)
//! - `Outcome`: sector effect emitted when every condition holds
//! - `Rule`: ordered conditions (implicit AND) plus ordered outcomes

use crate::domain::error::AstroError;
use crate::domain::relation::Relation;
use crate::domain::zodiac::{NAKSHATRA_OWNERS, Planet, Sign};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_CONDITION_ORB: f64 = 5.0;
pub const DEFAULT_CONFIDENCE: f64 = 0.8;
pub const DEFAULT_WEIGHT: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Effect {
    Bullish,
    Bearish,
    Neutral,
}

impl Effect {
    pub fn name(self) -> &'static str {
        match self {
            Effect::Bullish => "Bullish",
            Effect::Bearish => "Bearish",
            Effect::Neutral => "Neutral",
        }
    }

    /// Sign applied to a raw return: +1 bullish, -1 bearish, none for neutral.
    pub fn direction(self) -> Option<f64> {
        match self {
            Effect::Bullish => Some(1.0),
            Effect::Bearish => Some(-1.0),
            Effect::Neutral => None,
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Effect {
    type Err = AstroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bullish" => Ok(Effect::Bullish),
            "bearish" => Ok(Effect::Bearish),
            "neutral" => Ok(Effect::Neutral),
            _ => Err(AstroError::UnsupportedEffect {
                name: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Effect {
    type Error = AstroError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Effect> for String {
    fn from(effect: Effect) -> Self {
        effect.name().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub planet: Planet,
    pub relation: Relation,
    #[serde(default)]
    pub target: Option<String>,
    /// `None` defers to the evaluator's default orb.
    #[serde(default = "default_condition_orb")]
    pub orb: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub value: Option<f64>,
}

fn default_condition_orb() -> Option<f64> {
    Some(DEFAULT_CONDITION_ORB)
}

/// Accepts a number or a numeric string; anything else reads as absent.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

impl Condition {
    pub fn new(planet: Planet, relation: Relation) -> Self {
        Self {
            planet,
            relation,
            target: None,
            orb: Some(DEFAULT_CONDITION_ORB),
            value: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_orb(mut self, orb: Option<f64>) -> Self {
        self.orb = orb;
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn effective_orb(&self, default_orb: f64) -> f64 {
        self.orb.unwrap_or(default_orb)
    }

    pub fn target_planet(&self) -> Result<Planet, AstroError> {
        match self.target.as_deref() {
            Some(name) => name.parse(),
            None => Err(AstroError::RuleInvalid {
                reason: format!("{} requires a target planet", self.relation),
            }),
        }
    }

    pub fn validate(&self) -> Result<(), AstroError> {
        if let Some(orb) = self.orb.filter(|o| o.is_nan() || *o < 0.0) {
            return Err(AstroError::RuleInvalid {
                reason: format!("orb must be non-negative, got {orb}"),
            });
        }

        if self.relation.needs_target_planet() {
            self.target_planet()?;
        }

        match self.relation {
            Relation::InSign => {
                let target = self.target.as_deref().ok_or_else(|| AstroError::RuleInvalid {
                    reason: "in_sign requires a target sign".into(),
                })?;
                target.parse::<Sign>()?;
            }
            Relation::InNakshatraOwnedBy => {
                let target = self.target.as_deref().ok_or_else(|| AstroError::RuleInvalid {
                    reason: "in_nakshatra_owned_by requires a target ruler".into(),
                })?;
                let owner: Planet = target.parse()?;
                if !NAKSHATRA_OWNERS.contains(&owner) {
                    return Err(AstroError::RuleInvalid {
                        reason: format!("{owner} does not rule any nakshatra"),
                    });
                }
            }
            Relation::InHouseRelativeTo => match self.value {
                Some(house) if house.fract() == 0.0 && (1.0..=12.0).contains(&house) => {}
                other => {
                    return Err(AstroError::RuleInvalid {
                        reason: format!("house must be an integer in 1..=12, got {other:?}"),
                    });
                }
            },
            Relation::AspectWith if self.value.is_none() => {
                return Err(AstroError::RuleInvalid {
                    reason: "aspect_with requires a numeric angle in value".into(),
                });
            }
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    #[serde(alias = "sector_code")]
    pub sector: String,
    pub effect: Effect,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    DEFAULT_WEIGHT
}

impl Outcome {
    pub fn new(sector: impl Into<String>, effect: Effect) -> Self {
        Self {
            sector: sector.into(),
            effect,
            weight: DEFAULT_WEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub rule_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub outcomes: Vec<Outcome>,
}

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

fn default_enabled() -> bool {
    true
}

impl Rule {
    pub fn new(rule_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            name: name.into(),
            description: None,
            confidence: DEFAULT_CONFIDENCE,
            enabled: true,
            conditions: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcomes.push(outcome);
        self
    }

    pub fn validate(&self) -> Result<(), AstroError> {
        let invalid = |reason: String| AstroError::RuleInvalid {
            reason: format!("rule {}: {reason}", self.rule_id),
        };

        if self.rule_id.trim().is_empty() {
            return Err(AstroError::RuleInvalid {
                reason: "rule_id must not be empty".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(invalid(format!(
                "confidence must be within [0, 1], got {}",
                self.confidence
            )));
        }
        for outcome in &self.outcomes {
            if outcome.weight.is_nan() || outcome.weight < 0.0 {
                return Err(invalid(format!(
                    "outcome weight for {} must be non-negative, got {}",
                    outcome.sector, outcome.weight
                )));
            }
        }
        for condition in &self.conditions {
            condition.validate().map_err(|e| invalid(e.to_string()))?;
        }
        Ok(())
    }
}
