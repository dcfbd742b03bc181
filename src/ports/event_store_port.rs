//! Event persistence port.

use crate::domain::error::AstroError;
use crate::domain::event::RuleEvent;
use chrono::NaiveDate;

pub trait EventStorePort {
    /// Removes events of `rule_id` touching `[start, end]`; returns how many went.
    ///
    /// An event overlaps when `start_date <= end` and its end (or its start,
    /// for events without one) is `>= start`.
    fn delete_overlapping(
        &self,
        rule_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<usize, AstroError>;

    /// Persists events in order and returns them with ids and timestamps set.
    fn insert_events(&self, events: &[RuleEvent]) -> Result<Vec<RuleEvent>, AstroError>;

    /// Deletes what [`delete_overlapping`](Self::delete_overlapping) would
    /// and inserts `events` as one unit. On error the store is unchanged.
    fn replace_events(
        &self,
        rule_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        events: &[RuleEvent],
    ) -> Result<(usize, Vec<RuleEvent>), AstroError>;

    /// Events of one rule ordered by start date.
    fn list_events(&self, rule_id: &str) -> Result<Vec<RuleEvent>, AstroError>;
}
