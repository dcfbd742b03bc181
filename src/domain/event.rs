//! Generated events and per-day evaluation records.

use crate::domain::error::AstroError;
use crate::domain::rule::Effect;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationType {
    Point,
    Interval,
}

impl DurationType {
    pub fn from_days(days: i64) -> Self {
        if days <= 1 {
            DurationType::Point
        } else {
            DurationType::Interval
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DurationType::Point => "point",
            DurationType::Interval => "interval",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSubtype {
    /// One day.
    Instant,
    /// Two or three days.
    Transient,
    /// More than three days.
    Period,
}

impl EventSubtype {
    pub fn from_days(days: i64) -> Self {
        match days {
            i64::MIN..=1 => EventSubtype::Instant,
            2..=3 => EventSubtype::Transient,
            _ => EventSubtype::Period,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventSubtype::Instant => "instant",
            EventSubtype::Transient => "transient",
            EventSubtype::Period => "period",
        }
    }
}

impl fmt::Display for DurationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for EventSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DurationType {
    type Err = AstroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "point" => Ok(DurationType::Point),
            "interval" => Ok(DurationType::Interval),
            _ => Err(AstroError::DatabaseQuery {
                reason: format!("unknown duration type '{s}'"),
            }),
        }
    }
}

impl FromStr for EventSubtype {
    type Err = AstroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instant" => Ok(EventSubtype::Instant),
            "transient" => Ok(EventSubtype::Transient),
            "period" => Ok(EventSubtype::Period),
            _ => Err(AstroError::DatabaseQuery {
                reason: format!("unknown event subtype '{s}'"),
            }),
        }
    }
}

/// A maximal run of consecutive days on which a rule held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub rule_id: String,
    pub start_date: NaiveDate,
    /// Points carry `end_date == start_date`; `None` is read as a point too.
    pub end_date: Option<NaiveDate>,
    pub duration_type: DurationType,
    pub event_subtype: EventSubtype,
    pub provider: String,
    pub metadata: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl RuleEvent {
    /// Builds an event covering `start..=end` and classifies it.
    pub fn closed(
        rule_id: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
        provider: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Self {
        let days = (end - start).num_days() + 1;
        Self {
            id: None,
            rule_id: rule_id.into(),
            start_date: start,
            end_date: Some(end),
            duration_type: DurationType::from_days(days),
            event_subtype: EventSubtype::from_days(days),
            provider: provider.into(),
            metadata,
            created_at: None,
        }
    }

    pub fn last_day(&self) -> NaiveDate {
        self.end_date.unwrap_or(self.start_date)
    }

    pub fn duration_days(&self) -> i64 {
        (self.last_day() - self.start_date).num_days() + 1
    }

    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && self.last_day() >= start
    }
}

/// One triggered outcome on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub rule_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
    pub date: NaiveDate,
    pub sector: String,
    pub effect: Effect,
    pub weight: f64,
    pub confidence: f64,
}
