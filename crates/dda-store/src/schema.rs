use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id          TEXT PRIMARY KEY,
            label       TEXT NOT NULL DEFAULT '',
            started_at  TEXT NOT NULL DEFAULT (datetime('now')),
            config_json TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS cycles (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id TEXT NOT NULL REFERENCES sessions(id),
            seq        INTEGER NOT NULL,
            time       REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cycle_values (
            cycle_id INTEGER NOT NULL REFERENCES cycles(id),
            kind     TEXT NOT NULL CHECK (kind IN ('metric', 'delta')),
            name     TEXT NOT NULL,
            value    REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS rule_activations (
            cycle_id   INTEGER NOT NULL REFERENCES cycles(id),
            rule       INTEGER NOT NULL,
            activation REAL NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_cycles_session ON cycles(session_id, seq);
        CREATE INDEX IF NOT EXISTS idx_values_cycle ON cycle_values(cycle_id);
        CREATE INDEX IF NOT EXISTS idx_rules_cycle ON rule_activations(cycle_id);
        ",
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'schema_version'")?;
    let version = stmt
        .query_row([], |row| {
            let v: String = row.get(0)?;
            Ok(v.parse::<i64>().unwrap_or(0))
        })
        .ok();
    Ok(version)
}
