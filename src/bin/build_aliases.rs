use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use fixture_forecast::DataPaths;
use fixture_forecast::logging::init_tracing;
use fixture_forecast::match_source::{clean_csv_file, load_fixtures_csv, load_matches_csv};
use fixture_forecast::team_identity::{TeamResolver, write_alias_csv};

/// Scans the historical and upcoming CSVs, extends the alias table with every unseen
/// spelling and writes it back. With `--clean`, also writes copies of both CSVs with
/// harmonized team names.
fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_tracing()?;

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let clean = args.iter().any(|a| a == "--clean");
    let paths = DataPaths::from_env();

    let mut resolver = if paths.alias_csv.exists() {
        TeamResolver::from_csv_path(&paths.alias_csv)?
    } else {
        TeamResolver::new()
    };

    let mut names: Vec<String> = Vec::new();
    for row in load_matches_csv(&paths.master_csv)? {
        names.push(row.home);
        names.push(row.away);
    }
    if paths.upcoming_csv.exists() {
        for row in load_fixtures_csv(&paths.upcoming_csv)? {
            names.push(row.home);
            names.push(row.away);
        }
    }

    let added = resolver.learn_observed(names.iter().map(String::as_str));
    let rows = resolver.rows();
    let out = File::create(&paths.alias_csv)
        .with_context(|| format!("create {}", paths.alias_csv.display()))?;
    write_alias_csv(&rows, out)?;
    println!(
        "Alias table: {} ({} entries, {} new)",
        paths.alias_csv.display(),
        rows.len(),
        added
    );

    if clean {
        let master_out = cleaned_path(&paths.master_csv);
        let n = clean_csv_file(&paths.master_csv, &master_out, &resolver)?;
        println!("Cleaned {} rows -> {}", n, master_out.display());
        if paths.upcoming_csv.exists() {
            let upcoming_out = cleaned_path(&paths.upcoming_csv);
            let n = clean_csv_file(&paths.upcoming_csv, &upcoming_out, &resolver)?;
            println!("Cleaned {} rows -> {}", n, upcoming_out.display());
        }
    }
    Ok(())
}

/// `master_matches.csv` -> `master_matches_cleaned.csv`, next to the input.
fn cleaned_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_string());
    input.with_file_name(format!("{stem}_cleaned.csv"))
}
