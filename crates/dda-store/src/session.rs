//! SQLite log of evaluation sessions.
//!
//! Each session records, per cycle, the normalized metrics the engine saw,
//! the deltas it returned and the rules that fired. The per-cycle
//! metric/delta pairs double as training rows for offline model fitting.

use std::collections::BTreeMap;
use std::path::Path;

use dda_core::{FuzzyConfig, Metrics, RuleFired};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::schema;

/// One cycle to record.
#[derive(Clone, Copy, Debug)]
pub struct CycleRecord<'a> {
    pub time: f64,
    pub normalized: &'a Metrics,
    pub deltas: &'a Metrics,
    pub activations: &'a [RuleFired],
}

#[derive(Clone, Debug, PartialEq)]
pub struct SessionSummary {
    pub id: Uuid,
    pub label: String,
    pub started_at: String,
    pub cycles: u64,
}

/// Metrics and deltas of one cycle, keyed by name.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingRow {
    pub time: f64,
    pub metrics: BTreeMap<String, f64>,
    pub deltas: BTreeMap<String, f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RuleStat {
    pub rule: usize,
    pub fires: u64,
    pub mean_activation: f64,
}

pub struct SessionLog {
    conn: Connection,
}

impl SessionLog {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        tracing::info!("opened session log {}", path.display());
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Create a session. The config, when given, is stored as JSON so the
    /// session can be replayed against the same rules.
    pub fn start_session(&self, label: &str, config: Option<&FuzzyConfig>) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let config_json = match config {
            Some(c) => c.to_json()?,
            None => String::new(),
        };
        self.conn.execute(
            "INSERT INTO sessions (id, label, config_json) VALUES (?1, ?2, ?3)",
            params![id.to_string(), label, config_json],
        )?;
        tracing::info!("started session {id} '{label}'");
        Ok(id)
    }

    /// Append a cycle to `session`. Returns the cycle's sequence number.
    pub fn record_cycle(&self, session: Uuid, record: &CycleRecord<'_>) -> Result<u64> {
        let tx = self.conn.unchecked_transaction()?;
        let session_id = session.to_string();

        let seq: i64 = tx.query_row(
            "SELECT COUNT(*) FROM cycles WHERE session_id = ?1",
            [&session_id],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO cycles (session_id, seq, time) VALUES (?1, ?2, ?3)",
            params![session_id, seq, record.time],
        )?;
        let cycle_id = tx.last_insert_rowid();

        {
            let mut insert_value = tx.prepare(
                "INSERT INTO cycle_values (cycle_id, kind, name, value) VALUES (?1, ?2, ?3, ?4)",
            )?;
            // NaN binds as NULL; non-finite values are skipped like the
            // engine skips them
            let values = record
                .normalized
                .iter()
                .map(|entry| ("metric", entry))
                .chain(record.deltas.iter().map(|entry| ("delta", entry)));
            for (kind, (name, value)) in values {
                if !value.is_finite() {
                    tracing::debug!(kind, name = %name, "skipping non-finite value");
                    continue;
                }
                insert_value.execute(params![cycle_id, kind, name, value])?;
            }

            let mut insert_rule = tx.prepare(
                "INSERT INTO rule_activations (cycle_id, rule, activation) VALUES (?1, ?2, ?3)",
            )?;
            for fired in record.activations {
                insert_rule.execute(params![cycle_id, fired.rule as i64, fired.activation])?;
            }
        }

        tx.commit()?;
        Ok(seq as u64)
    }

    pub fn cycle_count(&self, session: Uuid) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM cycles WHERE session_id = ?1",
            [session.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// All sessions, oldest first.
    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.id, s.label, s.started_at,
                    (SELECT COUNT(*) FROM cycles c WHERE c.session_id = s.id)
             FROM sessions s ORDER BY s.rowid",
        )?;
        let rows: Vec<(String, String, String, i64)> = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<std::result::Result<_, _>>()?;

        rows.into_iter()
            .map(|(id, label, started_at, cycles)| {
                Ok(SessionSummary {
                    id: parse_uuid(&id)?,
                    label,
                    started_at,
                    cycles: cycles as u64,
                })
            })
            .collect()
    }

    /// Config stored with the session, if any.
    pub fn session_config(&self, session: Uuid) -> Result<Option<FuzzyConfig>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT config_json FROM sessions WHERE id = ?1",
                [session.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(j) if !j.is_empty() => Ok(Some(FuzzyConfig::from_json(&j)?)),
            _ => Ok(None),
        }
    }

    /// Per-cycle metrics and deltas in cycle order.
    pub fn training_rows(&self, session: Uuid) -> Result<Vec<TrainingRow>> {
        let mut cycle_stmt = self
            .conn
            .prepare("SELECT id, time FROM cycles WHERE session_id = ?1 ORDER BY seq")?;
        let cycles: Vec<(i64, f64)> = cycle_stmt
            .query_map([session.to_string()], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<_, _>>()?;

        let mut value_stmt = self
            .conn
            .prepare("SELECT kind, name, value FROM cycle_values WHERE cycle_id = ?1")?;

        let mut rows = Vec::with_capacity(cycles.len());
        for (cycle_id, time) in cycles {
            let values: Vec<(String, String, f64)> = value_stmt
                .query_map([cycle_id], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .collect::<std::result::Result<_, _>>()?;

            let mut row = TrainingRow {
                time,
                metrics: BTreeMap::new(),
                deltas: BTreeMap::new(),
            };
            for (kind, name, value) in values {
                match kind.as_str() {
                    "metric" => row.metrics.insert(name, value),
                    "delta" => row.deltas.insert(name, value),
                    other => {
                        return Err(StoreError::InvalidData(format!(
                            "unknown value kind '{other}'"
                        )));
                    }
                };
            }
            rows.push(row);
        }
        Ok(rows)
    }

    /// Fire count and mean activation per rule that fired at least once.
    pub fn rule_coverage(&self, session: Uuid) -> Result<Vec<RuleStat>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.rule, COUNT(*), AVG(r.activation)
             FROM rule_activations r JOIN cycles c ON c.id = r.cycle_id
             WHERE c.session_id = ?1
             GROUP BY r.rule ORDER BY r.rule",
        )?;
        let stats = stmt
            .query_map([session.to_string()], |row| {
                Ok(RuleStat {
                    rule: row.get::<_, i64>(0)? as usize,
                    fires: row.get::<_, i64>(1)? as u64,
                    mean_activation: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<_, _>>()?;
        Ok(stats)
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| StoreError::InvalidData(format!("bad UUID '{s}': {e}")))
}
