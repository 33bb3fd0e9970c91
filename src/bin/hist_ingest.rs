use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use fixture_forecast::DataPaths;
use fixture_forecast::logging::init_tracing;
use fixture_forecast::match_source::load_matches_csv;
use fixture_forecast::sqlite_source::{clear_matches, insert_raw_matches, open_db};

const DEFAULT_DB: &str = "matches.db";

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_tracing()?;

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let paths = DataPaths::from_env();
    let csv_path = parse_path_arg(&args, "--csv").unwrap_or(paths.master_csv);
    let db_path = parse_path_arg(&args, "--db")
        .or(paths.match_db)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB));
    let replace = args.iter().any(|a| a == "--replace");

    let rows = load_matches_csv(&csv_path)?;
    if rows.is_empty() {
        return Err(anyhow!("{} has no match rows", csv_path.display()));
    }

    let mut conn = open_db(&db_path)?;
    if replace {
        clear_matches(&conn).context("clear existing matches")?;
    }
    let inserted = insert_raw_matches(&mut conn, &rows)?;

    println!("Historical ingest complete");
    println!("CSV: {}", csv_path.display());
    println!("DB: {}", db_path.display());
    println!("Rows inserted: {inserted}");
    Ok(())
}

fn parse_path_arg(args: &[String], flag: &str) -> Option<PathBuf> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix(&prefix) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}
