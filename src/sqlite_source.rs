use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags, params};
use tracing::info;

use crate::match_data::RawMatchRow;

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS matches (
            row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            home TEXT NOT NULL,
            away TEXT NOT NULL,
            kickoff TEXT NULL,
            home_goals NULL,
            away_goals NULL,
            league TEXT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_matches_home ON matches(home);
        CREATE INDEX IF NOT EXISTS idx_matches_away ON matches(away);
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

/// Appends raw rows in one transaction. Goal cells are stored as given so the
/// same coercion runs on load regardless of the source.
pub fn insert_raw_matches(conn: &mut Connection, rows: &[RawMatchRow]) -> Result<usize> {
    let tx = conn.transaction().context("begin ingest transaction")?;
    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO matches (home, away, kickoff, home_goals, away_goals, league)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .context("prepare insert match")?;
        for row in rows {
            stmt.execute(params![
                row.home,
                row.away,
                row.kickoff,
                row.home_goals,
                row.away_goals,
                row.league,
            ])
            .context("insert match")?;
        }
    }
    tx.commit().context("commit ingest transaction")?;
    Ok(rows.len())
}

pub fn clear_matches(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM matches", [])
        .context("clear matches table")?;
    Ok(())
}

/// Loads every stored row in insertion order.
pub fn load_raw_matches(conn: &Connection) -> Result<Vec<RawMatchRow>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT home, away, kickoff, home_goals, away_goals, league
            FROM matches
            ORDER BY row_id ASC
            "#,
        )
        .context("prepare load matches query")?;

    let rows = stmt
        .query_map([], |row| {
            Ok(RawMatchRow {
                home: sql_text(row.get::<_, SqlValue>(0)?).unwrap_or_default(),
                away: sql_text(row.get::<_, SqlValue>(1)?).unwrap_or_default(),
                kickoff: sql_text(row.get::<_, SqlValue>(2)?),
                home_goals: sql_text(row.get::<_, SqlValue>(3)?),
                away_goals: sql_text(row.get::<_, SqlValue>(4)?),
                league: sql_text(row.get::<_, SqlValue>(5)?),
            })
        })
        .context("query load matches")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode match row")?);
    }
    info!(rows = out.len(), "loaded historical matches from sqlite");
    Ok(out)
}

/// Opens an existing database read-only. A missing file is an error rather than an
/// empty log.
pub fn open_db_read_only(path: &Path) -> Result<Connection> {
    if !path.is_file() {
        bail!("sqlite db {} does not exist", path.display());
    }
    Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("open sqlite db {} read-only", path.display()))
}

pub fn load_raw_matches_from_path(path: &Path) -> Result<Vec<RawMatchRow>> {
    let conn = open_db_read_only(path)?;
    load_raw_matches(&conn).with_context(|| format!("load matches from {}", path.display()))
}

// Any storage class is rendered as text so numeric coercion happens in one place.
fn sql_text(value: SqlValue) -> Option<String> {
    match value {
        SqlValue::Null => None,
        SqlValue::Integer(n) => Some(n.to_string()),
        SqlValue::Real(v) => Some(v.to_string()),
        SqlValue::Text(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        SqlValue::Blob(bytes) => String::from_utf8(bytes)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
    }
}
