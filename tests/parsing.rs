use std::fs;
use std::path::PathBuf;

use chrono::{NaiveDate, Timelike};

use fixture_forecast::match_data::{coerce_goals, parse_kickoff};
use fixture_forecast::match_source::{read_fixtures_csv, read_matches_csv};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_master_matches_fixture() {
    let raw = read_fixture("master_matches.csv");
    let rows = read_matches_csv(raw.as_bytes()).expect("fixture should parse");
    assert_eq!(rows.len(), 19);
    assert_eq!(rows[0].home, "Arsenal");
    assert_eq!(rows[0].kickoff.as_deref(), Some("2024-01-06"));
    assert_eq!(rows[16].home_goals.as_deref(), Some("nan"));
    assert_eq!(rows[18].kickoff.as_deref(), Some("not a date"));
    assert_eq!(rows[13].away, "Atlético Madrid");
}

#[test]
fn parses_upcoming_fixture() {
    let raw = read_fixture("upcoming_matches.csv");
    let rows = read_fixtures_csv(raw.as_bytes()).expect("fixture should parse");
    assert_eq!(rows.len(), 7);
    assert_eq!(rows[1].kickoff.as_deref(), Some("2024-06-01 17:30"));
    assert_eq!(rows[4].league.as_deref(), Some("Scottish Premiership"));
    assert_eq!(rows[5].away, "");
}

#[test]
fn kickoff_formats() {
    let midnight = parse_kickoff("2024-03-09").expect("date only");
    assert_eq!(midnight.date(), NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
    assert_eq!(midnight.hour(), 0);

    let short_year = parse_kickoff("09/03/24").expect("two-digit year");
    assert_eq!(short_year.date(), NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
    let long_year = parse_kickoff("09/03/2024").expect("four-digit year");
    assert_eq!(long_year, short_year);

    let with_time = parse_kickoff("2024-03-09 17:30").expect("datetime");
    assert_eq!(with_time.hour(), 17);
    assert_eq!(with_time.minute(), 30);

    let utc = parse_kickoff("2024-03-09T17:30:00+01:00").expect("rfc3339");
    assert_eq!(utc.hour(), 16);

    assert!(parse_kickoff("").is_none());
    assert!(parse_kickoff("next tuesday").is_none());
}

#[test]
fn goal_cells_coerce_to_neutral_values() {
    assert_eq!(coerce_goals(Some("3")), 3);
    assert_eq!(coerce_goals(Some(" 2.0 ")), 2);
    assert_eq!(coerce_goals(Some("nan")), 0);
    assert_eq!(coerce_goals(Some("-1")), 0);
    assert_eq!(coerce_goals(Some("")), 0);
    assert_eq!(coerce_goals(None), 0);
}
