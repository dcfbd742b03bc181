//! SQLite rule and event store.
//!
//! Rules keep their conditions and outcomes as JSON columns; events are one
//! row each with the context snapshot in `metadata`.

use crate::domain::error::AstroError;
use crate::domain::event::{DurationType, EventSubtype, RuleEvent};
use crate::domain::rule::{Condition, Outcome, Rule};
use crate::ports::config_port::ConfigPort;
use crate::ports::event_store_port::EventStorePort;
use crate::ports::rule_store_port::RuleStorePort;
use chrono::{DateTime, NaiveDate, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Row, params};

const DATE_FORMAT: &str = "%Y-%m-%d";

const RULE_COLUMNS: &str =
    "rule_id, name, description, confidence, enabled, conditions, outcomes";

const EVENT_COLUMNS: &str = "id, rule_id, start_date, end_date, duration_type, event_subtype, \
                             provider, metadata, created_at";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn query_err(e: rusqlite::Error) -> AstroError {
    AstroError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn conversion_err<E>(column: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, AstroError> {
    serde_json::to_string(value).map_err(|e| AstroError::DatabaseQuery {
        reason: format!("cannot encode column: {e}"),
    })
}

fn parse_date(column: usize, value: &str) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| conversion_err(column, e))
}

fn rule_from_row(row: &Row<'_>) -> Result<Rule, rusqlite::Error> {
    let conditions: String = row.get(5)?;
    let outcomes: String = row.get(6)?;
    Ok(Rule {
        rule_id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        confidence: row.get(3)?,
        enabled: row.get(4)?,
        conditions: serde_json::from_str::<Vec<Condition>>(&conditions)
            .map_err(|e| conversion_err(5, e))?,
        outcomes: serde_json::from_str::<Vec<Outcome>>(&outcomes)
            .map_err(|e| conversion_err(6, e))?,
    })
}

fn event_from_row(row: &Row<'_>) -> Result<RuleEvent, rusqlite::Error> {
    let start: String = row.get(2)?;
    let end: Option<String> = row.get(3)?;
    let duration_type: String = row.get(4)?;
    let event_subtype: String = row.get(5)?;
    let metadata: String = row.get(7)?;
    let created_at: Option<String> = row.get(8)?;

    let created_at = created_at
        .map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| conversion_err(8, e))
        })
        .transpose()?;

    Ok(RuleEvent {
        id: row.get(0)?,
        rule_id: row.get(1)?,
        start_date: parse_date(2, &start)?,
        end_date: end.as_deref().map(|s| parse_date(3, s)).transpose()?,
        duration_type: duration_type
            .parse::<DurationType>()
            .map_err(|e| conversion_err(4, e))?,
        event_subtype: event_subtype
            .parse::<EventSubtype>()
            .map_err(|e| conversion_err(5, e))?,
        provider: row.get(6)?,
        metadata: serde_json::from_str(&metadata).map_err(|e| conversion_err(7, e))?,
        created_at,
    })
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, AstroError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| AstroError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool =
            Pool::builder()
                .max_size(pool_size)
                .build(manager)
                .map_err(|e: r2d2::Error| AstroError::Database {
                    reason: e.to_string(),
                })?;

        log::debug!("sqlite store at {db_path} (pool {pool_size})");
        Ok(Self { pool })
    }

    /// Single-connection in-memory store; the database lives as long as the adapter.
    pub fn in_memory() -> Result<Self, AstroError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| AstroError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, AstroError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| AstroError::Database {
                reason: e.to_string(),
            })
    }

    pub fn initialize_schema(&self) -> Result<(), AstroError> {
        let conn = self.conn()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS rules (
                rule_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                confidence REAL NOT NULL,
                enabled INTEGER NOT NULL,
                conditions TEXT NOT NULL,
                outcomes TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS rule_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                rule_id TEXT NOT NULL REFERENCES rules(rule_id) ON DELETE CASCADE,
                start_date TEXT NOT NULL,
                end_date TEXT,
                duration_type TEXT NOT NULL,
                event_subtype TEXT NOT NULL,
                provider TEXT NOT NULL,
                metadata TEXT NOT NULL,
                created_at TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_rule_events_rule_start ON rule_events(rule_id, start_date);",
        )
        .map_err(query_err)?;

        Ok(())
    }

    pub fn count_rules(&self) -> Result<usize, AstroError> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM rules", [], |row| row.get(0))
            .map_err(query_err)?;
        Ok(count as usize)
    }
}

impl RuleStorePort for SqliteAdapter {
    fn get_rule(&self, rule_id: &str) -> Result<Option<Rule>, AstroError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {RULE_COLUMNS} FROM rules WHERE rule_id = ?1"),
            params![rule_id],
            rule_from_row,
        )
        .optional()
        .map_err(query_err)
    }

    fn list_enabled_rules(&self) -> Result<Vec<Rule>, AstroError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {RULE_COLUMNS} FROM rules WHERE enabled = 1 ORDER BY rule_id"
            ))
            .map_err(query_err)?;

        let rows = stmt.query_map([], rule_from_row).map_err(query_err)?;

        let mut rules = Vec::new();
        for row in rows {
            rules.push(row.map_err(query_err)?);
        }
        Ok(rules)
    }

    fn upsert_rule(&self, rule: &Rule) -> Result<(), AstroError> {
        let conditions = to_json(&rule.conditions)?;
        let outcomes = to_json(&rule.outcomes)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO rules (rule_id, name, description, confidence, enabled, conditions, outcomes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(rule_id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                confidence = excluded.confidence,
                enabled = excluded.enabled,
                conditions = excluded.conditions,
                outcomes = excluded.outcomes",
            params![
                rule.rule_id,
                rule.name,
                rule.description,
                rule.confidence,
                rule.enabled,
                conditions,
                outcomes
            ],
        )
        .map_err(query_err)?;
        Ok(())
    }
}

const DELETE_OVERLAPPING: &str = "DELETE FROM rule_events
     WHERE rule_id = ?1
       AND start_date <= ?3
       AND COALESCE(end_date, start_date) >= ?2";

fn delete_in(
    conn: &rusqlite::Connection,
    rule_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<usize, AstroError> {
    conn.execute(
        DELETE_OVERLAPPING,
        params![
            rule_id,
            start.format(DATE_FORMAT).to_string(),
            end.format(DATE_FORMAT).to_string()
        ],
    )
    .map_err(query_err)
}

fn insert_in(
    conn: &rusqlite::Connection,
    events: &[RuleEvent],
) -> Result<Vec<RuleEvent>, AstroError> {
    let now = Utc::now();
    let mut stored = Vec::with_capacity(events.len());
    for event in events {
        conn.execute(
            "INSERT INTO rule_events
                (rule_id, start_date, end_date, duration_type, event_subtype, provider, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                event.rule_id,
                event.start_date.format(DATE_FORMAT).to_string(),
                event.end_date.map(|d| d.format(DATE_FORMAT).to_string()),
                event.duration_type.as_str(),
                event.event_subtype.as_str(),
                event.provider,
                to_json(&event.metadata)?,
                now.to_rfc3339()
            ],
        )
        .map_err(query_err)?;

        let mut saved = event.clone();
        saved.id = Some(conn.last_insert_rowid());
        saved.created_at = Some(now);
        stored.push(saved);
    }
    Ok(stored)
}

impl EventStorePort for SqliteAdapter {
    fn delete_overlapping(
        &self,
        rule_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<usize, AstroError> {
        let conn = self.conn()?;
        delete_in(&conn, rule_id, start, end)
    }

    fn insert_events(&self, events: &[RuleEvent]) -> Result<Vec<RuleEvent>, AstroError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        let stored = insert_in(&tx, events)?;
        tx.commit().map_err(query_err)?;
        Ok(stored)
    }

    fn replace_events(
        &self,
        rule_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        events: &[RuleEvent],
    ) -> Result<(usize, Vec<RuleEvent>), AstroError> {
        let mut conn = self.conn()?;
        // dropping the transaction on error rolls the delete back
        let tx = conn.transaction().map_err(query_err)?;
        let deleted = delete_in(&tx, rule_id, start, end)?;
        let stored = insert_in(&tx, events)?;
        tx.commit().map_err(query_err)?;
        Ok((deleted, stored))
    }

    fn list_events(&self, rule_id: &str) -> Result<Vec<RuleEvent>, AstroError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM rule_events WHERE rule_id = ?1 ORDER BY start_date, id"
            ))
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![rule_id], event_from_row)
            .map_err(query_err)?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row.map_err(query_err)?);
        }
        Ok(events)
    }
}
