#![allow(dead_code)]

use astrorules::domain::correlation::PricePoint;
use astrorules::domain::error::{AstroError, EphemerisError};
use astrorules::domain::event::RuleEvent;
use astrorules::domain::relation::Relation;
use astrorules::domain::relations::RelationRegistry;
use astrorules::domain::rule::{Condition, Effect, Outcome, Rule};
use astrorules::domain::rule_eval::RuleEvaluator;
use astrorules::domain::zodiac::Planet;
use astrorules::ports::ephemeris_port::EphemerisProvider;
use astrorules::ports::event_store_port::EventStorePort;
use astrorules::ports::market_data_port::MarketDataPort;
use astrorules::ports::rule_store_port::RuleStorePort;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Day `n` (1-based) of January 2024.
pub fn day(n: u32) -> NaiveDate {
    date(2024, 1, n)
}

/// Sun fixed at 0°; the Moon sits on the Sun on "true" days and 90° away
/// otherwise, so `sun conjunct_with moon` follows the script exactly.
pub struct ScriptedProvider {
    moon: HashMap<NaiveDate, f64>,
    failing: HashSet<NaiveDate>,
}

impl ScriptedProvider {
    pub fn signal(start: NaiveDate, days: &[bool]) -> Self {
        let moon = days
            .iter()
            .enumerate()
            .map(|(i, holds)| {
                let d = start + chrono::Duration::days(i as i64);
                (d, if *holds { 0.0 } else { 90.0 })
            })
            .collect();
        Self {
            moon,
            failing: HashSet::new(),
        }
    }

    pub fn failing_on(mut self, d: NaiveDate) -> Self {
        self.failing.insert(d);
        self
    }
}

impl EphemerisProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn longitude(&self, planet: Planet, at: DateTime<Utc>) -> Result<f64, EphemerisError> {
        let d = at.date_naive();
        if self.failing.contains(&d) {
            return Err(EphemerisError::CalculationFailed {
                body: planet.key().into(),
                jd: 0.0,
                reason: "scripted failure".into(),
            });
        }
        match planet {
            Planet::Sun => Ok(0.0),
            Planet::Moon => Ok(self.moon.get(&d).copied().unwrap_or(90.0)),
            other => Err(EphemerisError::UnsupportedBody {
                provider: "scripted".into(),
                body: other.key().into(),
            }),
        }
    }
}

pub fn scripted_evaluator(provider: ScriptedProvider) -> RuleEvaluator {
    RuleEvaluator::new(
        std::sync::Arc::new(provider),
        std::sync::Arc::new(RelationRegistry::default()),
        5.0,
    )
}

pub fn conjunction_rule(id: &str) -> Rule {
    Rule::new(id, format!("Sun conjunct Moon ({id})"))
        .with_condition(
            Condition::new(Planet::Sun, Relation::ConjunctWith)
                .with_target("moon")
                .with_orb(Some(1.0)),
        )
        .with_outcome(Outcome::new("BANKS", Effect::Bullish))
}

#[derive(Default)]
pub struct MemoryRuleStore {
    rules: Mutex<BTreeMap<String, Rule>>,
}

impl MemoryRuleStore {
    pub fn with_rules(rules: &[Rule]) -> Self {
        let store = Self::default();
        for rule in rules {
            store.upsert_rule(rule).unwrap();
        }
        store
    }

    pub fn enabled_ids(&self) -> Vec<String> {
        self.list_enabled_rules()
            .unwrap()
            .into_iter()
            .map(|r| r.rule_id)
            .collect()
    }
}

impl RuleStorePort for MemoryRuleStore {
    fn get_rule(&self, rule_id: &str) -> Result<Option<Rule>, AstroError> {
        Ok(self.rules.lock().unwrap().get(rule_id).cloned())
    }

    fn list_enabled_rules(&self) -> Result<Vec<Rule>, AstroError> {
        Ok(self
            .rules
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.enabled)
            .cloned()
            .collect())
    }

    fn upsert_rule(&self, rule: &Rule) -> Result<(), AstroError> {
        self.rules
            .lock()
            .unwrap()
            .insert(rule.rule_id.clone(), rule.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryEventStore {
    pub events: Mutex<Vec<RuleEvent>>,
    pub next_id: Mutex<i64>,
    pub fail_inserts: bool,
}

impl MemoryEventStore {
    pub fn all(&self) -> Vec<RuleEvent> {
        self.events.lock().unwrap().clone()
    }

    fn assign_ids(&self, events: &[RuleEvent]) -> Vec<RuleEvent> {
        let mut next_id = self.next_id.lock().unwrap();
        events
            .iter()
            .map(|event| {
                *next_id += 1;
                let mut saved = event.clone();
                saved.id = Some(*next_id);
                saved.created_at = Some(Utc::now());
                saved
            })
            .collect()
    }
}

impl EventStorePort for MemoryEventStore {
    fn delete_overlapping(
        &self,
        rule_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<usize, AstroError> {
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|e| !(e.rule_id == rule_id && e.overlaps(start, end)));
        Ok(before - events.len())
    }

    fn insert_events(&self, events: &[RuleEvent]) -> Result<Vec<RuleEvent>, AstroError> {
        if self.fail_inserts {
            return Err(AstroError::DatabaseQuery {
                reason: "insert refused".into(),
            });
        }
        let stored = self.assign_ids(events);
        self.events.lock().unwrap().extend(stored.iter().cloned());
        Ok(stored)
    }

    fn replace_events(
        &self,
        rule_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        events: &[RuleEvent],
    ) -> Result<(usize, Vec<RuleEvent>), AstroError> {
        if self.fail_inserts {
            return Err(AstroError::DatabaseQuery {
                reason: "insert refused".into(),
            });
        }
        let deleted = self.delete_overlapping(rule_id, start, end)?;
        let stored = self.assign_ids(events);
        self.events.lock().unwrap().extend(stored.iter().cloned());
        Ok((deleted, stored))
    }

    fn list_events(&self, rule_id: &str) -> Result<Vec<RuleEvent>, AstroError> {
        let mut events: Vec<RuleEvent> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.rule_id == rule_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.start_date, e.id));
        Ok(events)
    }
}

/// Rules and events in one in-memory handle.
#[derive(Default)]
pub struct MemoryStore {
    pub rules: MemoryRuleStore,
    pub events: MemoryEventStore,
}

impl RuleStorePort for MemoryStore {
    fn get_rule(&self, rule_id: &str) -> Result<Option<Rule>, AstroError> {
        self.rules.get_rule(rule_id)
    }

    fn list_enabled_rules(&self) -> Result<Vec<Rule>, AstroError> {
        self.rules.list_enabled_rules()
    }

    fn upsert_rule(&self, rule: &Rule) -> Result<(), AstroError> {
        self.rules.upsert_rule(rule)
    }
}

impl EventStorePort for MemoryStore {
    fn delete_overlapping(
        &self,
        rule_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<usize, AstroError> {
        self.events.delete_overlapping(rule_id, start, end)
    }

    fn insert_events(&self, events: &[RuleEvent]) -> Result<Vec<RuleEvent>, AstroError> {
        self.events.insert_events(events)
    }

    fn replace_events(
        &self,
        rule_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        events: &[RuleEvent],
    ) -> Result<(usize, Vec<RuleEvent>), AstroError> {
        self.events.replace_events(rule_id, start, end, events)
    }

    fn list_events(&self, rule_id: &str) -> Result<Vec<RuleEvent>, AstroError> {
        self.events.list_events(rule_id)
    }
}

pub struct MockMarketData {
    pub prices: HashMap<String, Vec<PricePoint>>,
}

impl MockMarketData {
    /// One bar per calendar day from `start`, closes as given.
    pub fn daily(ticker: &str, start: NaiveDate, closes: &[f64]) -> Self {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, close)| PricePoint {
                date: start + chrono::Duration::days(i as i64),
                close: *close,
            })
            .collect();
        Self {
            prices: HashMap::from([(ticker.to_string(), bars)]),
        }
    }
}

impl MarketDataPort for MockMarketData {
    fn fetch_prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, AstroError> {
        let bars = self
            .prices
            .get(ticker)
            .ok_or_else(|| AstroError::NoPriceData {
                ticker: ticker.to_string(),
            })?;
        Ok(bars
            .iter()
            .filter(|p| p.date >= start && p.date <= end)
            .copied()
            .collect())
    }
}
