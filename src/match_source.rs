use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use csv::StringRecord;
use tracing::info;

use crate::match_data::{RawFixtureRow, RawMatchRow};
use crate::team_identity::TeamResolver;

const DATE_COLUMNS: &[&str] = &["datetime", "date"];

/// Column positions resolved once from the header row.
#[derive(Debug, Clone, Copy)]
struct Columns {
    home: usize,
    away: usize,
    kickoff: usize,
    home_goals: Option<usize>,
    away_goals: Option<usize>,
    league: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let home = find("home").ok_or_else(|| anyhow!("missing 'home' column"))?;
        let away = find("away").ok_or_else(|| anyhow!("missing 'away' column"))?;
        let kickoff = DATE_COLUMNS
            .iter()
            .find_map(|c| find(*c))
            .ok_or_else(|| anyhow!("csv must have a 'datetime' or 'date' column"))?;
        Ok(Self {
            home,
            away,
            kickoff,
            home_goals: find("fthg"),
            away_goals: find("ftag"),
            league: find("league"),
        })
    }
}

fn cell(record: &StringRecord, idx: usize) -> String {
    record.get(idx).unwrap_or_default().trim().to_string()
}

fn opt_cell(record: &StringRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn read_matches_csv<R: Read>(rdr: R) -> Result<Vec<RawMatchRow>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
    let headers = reader.headers().context("read csv headers")?.clone();
    let cols = Columns::from_headers(&headers)?;

    let mut out = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("read match row {}", line + 1))?;
        out.push(RawMatchRow {
            home: cell(&record, cols.home),
            away: cell(&record, cols.away),
            kickoff: opt_cell(&record, Some(cols.kickoff)),
            home_goals: opt_cell(&record, cols.home_goals),
            away_goals: opt_cell(&record, cols.away_goals),
            league: opt_cell(&record, cols.league),
        });
    }
    Ok(out)
}

pub fn read_fixtures_csv<R: Read>(rdr: R) -> Result<Vec<RawFixtureRow>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
    let headers = reader.headers().context("read csv headers")?.clone();
    let cols = Columns::from_headers(&headers)?;

    let mut out = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("read fixture row {}", line + 1))?;
        out.push(RawFixtureRow {
            home: cell(&record, cols.home),
            away: cell(&record, cols.away),
            kickoff: opt_cell(&record, Some(cols.kickoff)),
            league: opt_cell(&record, cols.league),
        });
    }
    Ok(out)
}

pub fn load_matches_csv(path: &Path) -> Result<Vec<RawMatchRow>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let rows = read_matches_csv(file).with_context(|| format!("parse {}", path.display()))?;
    info!(path = %path.display(), rows = rows.len(), "loaded historical matches");
    Ok(rows)
}

pub fn load_fixtures_csv(path: &Path) -> Result<Vec<RawFixtureRow>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let rows = read_fixtures_csv(file).with_context(|| format!("parse {}", path.display()))?;
    info!(path = %path.display(), rows = rows.len(), "loaded upcoming fixtures");
    Ok(rows)
}

/// Copies a CSV through, replacing the `home` and `away` cells with canonical names.
/// Every other column and the row order are kept. Returns the number of rows written.
pub fn clean_csv<R: Read, W: Write>(input: R, output: W, resolver: &TeamResolver) -> Result<usize> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let headers = reader.headers().context("read csv headers")?.clone();
    let team_cols: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| {
            let h = h.trim();
            h.eq_ignore_ascii_case("home") || h.eq_ignore_ascii_case("away")
        })
        .map(|(i, _)| i)
        .collect();

    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(&headers).context("write csv headers")?;
    let mut written = 0usize;
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("read row {}", line + 1))?;
        let cleaned: StringRecord = record
            .iter()
            .enumerate()
            .map(|(i, value)| {
                if team_cols.contains(&i) && !value.trim().is_empty() {
                    resolver.resolve(value).to_string()
                } else {
                    value.to_string()
                }
            })
            .collect();
        writer.write_record(&cleaned).with_context(|| format!("write row {}", line + 1))?;
        written += 1;
    }
    writer.flush().context("flush cleaned csv")?;
    Ok(written)
}

pub fn clean_csv_file(input: &Path, output: &Path, resolver: &TeamResolver) -> Result<usize> {
    let src = File::open(input).with_context(|| format!("open {}", input.display()))?;
    let dst = File::create(output).with_context(|| format!("create {}", output.display()))?;
    let rows = clean_csv(src, dst, resolver)?;
    info!(input = %input.display(), output = %output.display(), rows, "wrote cleaned csv");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_column_is_required() {
        let raw = "home,away,fthg,ftag\nA,B,1,0\n";
        let err = read_matches_csv(raw.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("datetime"));
    }

    #[test]
    fn missing_goal_columns_read_as_none() {
        let raw = "home,away,date,league\n Arsenal , Chelsea ,2024-01-01,EPL\n";
        let rows = read_matches_csv(raw.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].home, "Arsenal");
        assert!(rows[0].home_goals.is_none());
        assert_eq!(rows[0].league.as_deref(), Some("EPL"));
    }

    #[test]
    fn datetime_column_wins_over_date() {
        let raw = "home,away,date,datetime\nA,B,2024-01-01,2024-01-02 15:00\n";
        let rows = read_fixtures_csv(raw.as_bytes()).unwrap();
        assert_eq!(rows[0].kickoff.as_deref(), Some("2024-01-02 15:00"));
    }

    #[test]
    fn clean_csv_harmonizes_only_team_columns() {
        let resolver = TeamResolver::from_rows(vec![crate::team_identity::AliasRow {
            alias: "man utd".to_string(),
            canonical: "Manchester United".to_string(),
        }]);
        let raw = "date,home,away,fthg,note\n2024-01-01,Man Utd,  wolves ,2,man utd\n";
        let mut out = Vec::new();
        assert_eq!(clean_csv(raw.as_bytes(), &mut out, &resolver).unwrap(), 1);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "date,home,away,fthg,note\n2024-01-01,Manchester United,Wolves,2,man utd\n"
        );
    }
}
