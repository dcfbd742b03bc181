//! Event generation: daily rule scans run-length encoded into events.
//!
//! A scan walks `[start, end]` one day at a time through a two-state
//! machine. `Inactive` + true opens an event, `Active` + true extends it,
//! `Active` + false closes it at the last true day, and an event still open
//! at the end of the range is closed at `end`. A day whose evaluation fails
//! is logged and counted as false.

use crate::domain::config_validation::validate_date_range;
use crate::domain::error::AstroError;
use crate::domain::event::RuleEvent;
use crate::domain::rule::Rule;
use crate::domain::rule_eval::RuleEvaluator;
use crate::ports::event_store_port::EventStorePort;
use crate::ports::rule_store_port::RuleStorePort;
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, PartialEq)]
enum SegmentState {
    Inactive,
    Active {
        start: NaiveDate,
        last_true: NaiveDate,
        context: Value,
    },
}

/// Run-length encoder turning a daily boolean signal into events.
#[derive(Debug)]
pub struct EventSegmenter {
    rule_id: String,
    provider: String,
    state: SegmentState,
    events: Vec<RuleEvent>,
}

impl EventSegmenter {
    pub fn new(rule_id: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            provider: provider.into(),
            state: SegmentState::Inactive,
            events: Vec::new(),
        }
    }

    /// Feeds one day. Days must arrive in ascending order.
    pub fn push(&mut self, date: NaiveDate, holds: bool, context: Value) {
        let state = std::mem::replace(&mut self.state, SegmentState::Inactive);
        self.state = match (state, holds) {
            (SegmentState::Inactive, true) => {
                log::debug!("{}: active from {date}", self.rule_id);
                SegmentState::Active {
                    start: date,
                    last_true: date,
                    context,
                }
            }
            (SegmentState::Active { start, .. }, true) => SegmentState::Active {
                start,
                last_true: date,
                context,
            },
            (
                SegmentState::Active {
                    start,
                    last_true,
                    context: last_context,
                },
                false,
            ) => {
                self.close(start, last_true, last_context);
                SegmentState::Inactive
            }
            (SegmentState::Inactive, false) => SegmentState::Inactive,
        };
    }

    /// Closes any open event at `range_end` and returns everything emitted.
    pub fn finish(mut self, range_end: NaiveDate) -> Vec<RuleEvent> {
        let state = std::mem::replace(&mut self.state, SegmentState::Inactive);
        if let SegmentState::Active {
            start,
            last_true,
            context,
        } = state
        {
            self.close(start, last_true.min(range_end), context);
        }
        self.events
    }

    fn close(&mut self, start: NaiveDate, end: NaiveDate, context: Value) {
        let metadata = match context {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        let event = RuleEvent::closed(&self.rule_id, start, end, &self.provider, metadata);
        log::debug!(
            "{}: event {start}..{end} ({})",
            self.rule_id,
            event.event_subtype
        );
        self.events.push(event);
    }
}

/// Outcome of generating (and persisting) events for one rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationSummary {
    pub rule_id: String,
    pub provider: String,
    pub deleted: usize,
    pub events: Vec<RuleEvent>,
}

pub struct EventGenerator {
    evaluator: RuleEvaluator,
    cancel: Option<Arc<AtomicBool>>,
}

impl EventGenerator {
    pub fn new(evaluator: RuleEvaluator) -> Self {
        Self {
            evaluator,
            cancel: None,
        }
    }

    /// Scans stop with [`AstroError::Cancelled`] once `flag` is set.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.evaluator.provider_name()
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Evaluates `rule` for every day of `[start, end]` without persisting.
    pub fn scan(
        &self,
        rule: &Rule,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RuleEvent>, AstroError> {
        validate_date_range(start, end)?;
        let mut segmenter = EventSegmenter::new(&rule.rule_id, self.provider_name());

        for date in start.iter_days().take_while(|d| *d <= end) {
            if self.is_cancelled() {
                log::info!("{}: scan cancelled at {date}", rule.rule_id);
                return Err(AstroError::Cancelled);
            }
            match self.evaluator.evaluate_day(rule, date) {
                Ok(day) => segmenter.push(date, day.holds, day.context),
                Err(e) => {
                    log::warn!("{}: evaluation failed on {date}, counted as false: {e}", rule.rule_id);
                    segmenter.push(date, false, Value::Null);
                }
            }
        }
        Ok(segmenter.finish(end))
    }

    /// Loads one rule, scans it and persists the events.
    ///
    /// With `overwrite`, stored events of the rule overlapping the range are
    /// replaced together with the insert, so regenerating the same range is
    /// idempotent and a failed write leaves the old events in place.
    pub fn generate_for_rule<R, S>(
        &self,
        rules: &R,
        store: &S,
        rule_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        overwrite: bool,
    ) -> Result<GenerationSummary, AstroError>
    where
        R: RuleStorePort + ?Sized,
        S: EventStorePort + ?Sized,
    {
        validate_date_range(start, end)?;
        let rule = rules.require_rule(rule_id)?;
        log::info!(
            "generating events for {rule_id} over {start}..{end} (provider {}, overwrite {overwrite})",
            self.provider_name()
        );
        let events = self.scan(&rule, start, end)?;
        self.persist(store, &rule.rule_id, events, start, end, overwrite)
    }

    /// Scans several rules in parallel, then persists them one by one in the
    /// order given. Nothing is persisted if any scan fails or is cancelled.
    pub fn generate_for_rules<S>(
        &self,
        rules: &[Rule],
        store: &S,
        start: NaiveDate,
        end: NaiveDate,
        overwrite: bool,
    ) -> Result<Vec<GenerationSummary>, AstroError>
    where
        S: EventStorePort + ?Sized,
    {
        validate_date_range(start, end)?;
        log::info!(
            "generating events for {} rules over {start}..{end} (provider {})",
            rules.len(),
            self.provider_name()
        );
        let scanned: Vec<Vec<RuleEvent>> = rules
            .par_iter()
            .map(|rule| self.scan(rule, start, end))
            .collect::<Result<_, _>>()?;

        rules
            .iter()
            .zip(scanned)
            .map(|(rule, events)| self.persist(store, &rule.rule_id, events, start, end, overwrite))
            .collect()
    }

    fn persist<S: EventStorePort + ?Sized>(
        &self,
        store: &S,
        rule_id: &str,
        events: Vec<RuleEvent>,
        start: NaiveDate,
        end: NaiveDate,
        overwrite: bool,
    ) -> Result<GenerationSummary, AstroError> {
        if events.is_empty() {
            log::warn!("{rule_id}: no events detected in {start}..{end}");
        }

        let (deleted, events) = if overwrite {
            let (deleted, stored) = store
                .replace_events(rule_id, start, end, &events)
                .inspect_err(|e| log::error!("{rule_id}: failed to replace events: {e}"))?;
            log::info!(
                "{rule_id}: replaced {deleted} overlapping events with {}",
                stored.len()
            );
            (deleted, stored)
        } else if events.is_empty() {
            (0, events)
        } else {
            let stored = store
                .insert_events(&events)
                .inspect_err(|e| log::error!("{rule_id}: failed to store events: {e}"))?;
            log::info!("{rule_id}: stored {} events", stored.len());
            (0, stored)
        };

        Ok(GenerationSummary {
            rule_id: rule_id.to_string(),
            provider: self.provider_name().to_string(),
            deleted,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::{DurationType, EventSubtype};
    use crate::domain::relations::RelationRegistry;
    use crate::domain::relations::test_support::FixedProvider;
    use crate::domain::zodiac::Planet;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn run(signal: &[bool]) -> Vec<RuleEvent> {
        let mut seg = EventSegmenter::new("r", "test");
        for (i, holds) in signal.iter().enumerate() {
            seg.push(d(i as u32 + 1), *holds, serde_json::json!({"day": i + 1}));
        }
        seg.finish(d(signal.len() as u32))
    }

    #[test]
    fn middle_run_becomes_transient_interval() {
        let events = run(&[false, true, true, true, false, false, false]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start_date, d(2));
        assert_eq!(events[0].end_date, Some(d(4)));
        assert_eq!(events[0].duration_days(), 3);
        assert_eq!(events[0].event_subtype, EventSubtype::Transient);
        assert_eq!(events[0].duration_type, DurationType::Interval);
        // context comes from the last true day
        assert_eq!(events[0].metadata["day"], 4);
    }

    #[test]
    fn single_first_day_is_instant_point() {
        let events = run(&[true, false, false, false, false]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start_date, d(1));
        assert_eq!(events[0].end_date, Some(d(1)));
        assert_eq!(events[0].event_subtype, EventSubtype::Instant);
        assert_eq!(events[0].duration_type, DurationType::Point);
    }

    #[test]
    fn open_run_is_closed_at_range_end() {
        let events = run(&[true; 7]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start_date, d(1));
        assert_eq!(events[0].end_date, Some(d(7)));
        assert_eq!(events[0].event_subtype, EventSubtype::Period);
    }

    #[test]
    fn separate_runs_stay_separate() {
        let events = run(&[true, true, false, true, false, true]);
        let spans: Vec<_> = events
            .iter()
            .map(|e| (e.start_date, e.last_day()))
            .collect();
        assert_eq!(spans, vec![(d(1), d(2)), (d(4), d(4)), (d(6), d(6))]);
    }

    #[test]
    fn all_false_emits_nothing() {
        assert!(run(&[false; 5]).is_empty());
    }

    #[test]
    fn null_context_becomes_empty_object() {
        let mut seg = EventSegmenter::new("r", "test");
        seg.push(d(1), true, Value::Null);
        let events = seg.finish(d(1));
        assert_eq!(events[0].metadata, serde_json::json!({}));
    }

    fn generator(flag: Option<Arc<AtomicBool>>) -> EventGenerator {
        let provider = FixedProvider::new(&[(Planet::Sun, 10.0)]);
        let evaluator = RuleEvaluator::new(
            Arc::new(provider),
            Arc::new(RelationRegistry::default()),
            5.0,
        );
        let generator = EventGenerator::new(evaluator);
        match flag {
            Some(flag) => generator.with_cancellation(flag),
            None => generator,
        }
    }

    #[test]
    fn scan_rejects_inverted_range() {
        let err = generator(None).scan(&Rule::new("r", "x"), d(5), d(1)).unwrap_err();
        assert!(matches!(err, AstroError::InvalidDateRange { .. }));
    }

    #[test]
    fn scan_of_trivial_rule_covers_range() {
        let events = generator(None).scan(&Rule::new("r", "x"), d(1), d(10)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].provider, "fixed");
        assert_eq!(events[0].duration_days(), 10);
    }

    #[test]
    fn cancelled_scan_returns_error() {
        let flag = Arc::new(AtomicBool::new(true));
        let err = generator(Some(flag))
            .scan(&Rule::new("r", "x"), d(1), d(10))
            .unwrap_err();
        assert!(matches!(err, AstroError::Cancelled));
    }
}
