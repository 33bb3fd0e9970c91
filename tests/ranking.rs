use std::path::PathBuf;

use fixture_forecast::config::{DataPaths, EngineConfig};
use fixture_forecast::engine::PredictionEngine;
use fixture_forecast::match_data::parse_kickoff;

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn engine(config: EngineConfig) -> PredictionEngine {
    let paths = DataPaths {
        master_csv: fixture_path("master_matches.csv"),
        upcoming_csv: fixture_path("upcoming_matches.csv"),
        alias_csv: fixture_path("team_aliases.csv"),
        match_db: None,
    };
    PredictionEngine::from_paths(&paths, config).expect("engine from fixtures")
}

#[test]
fn upcoming_fixtures_are_ranked_and_predicted() {
    let e = engine(EngineConfig::default());
    let fixtures = e.load_upcoming(&fixture_path("upcoming_matches.csv")).unwrap();
    assert_eq!(fixtures.len(), 5);

    let now = parse_kickoff("2024-06-01 12:00").unwrap();
    let ranked = e.rank_and_predict(&fixtures, now);
    let order: Vec<(&str, &str)> = ranked
        .iter()
        .map(|(f, _)| (f.home.as_str(), f.away.as_str()))
        .collect();
    assert_eq!(
        order,
        [
            ("Liverpool", "Chelsea"),
            ("Arsenal", "Manchester United"),
            ("Real Madrid", "Atlético Madrid"),
            ("Celtic", "Rangers"),
        ]
    );
    for (_, p) in &ranked {
        assert!((p.outcome_sum() - 100.0).abs() <= 0.1);
    }
}

#[test]
fn ranking_is_stable_and_respects_the_cap() {
    let mut cfg = EngineConfig::default();
    cfg.ranking.per_league_cap = 1;
    let e = engine(cfg);
    let fixtures = e.load_upcoming(&fixture_path("upcoming_matches.csv")).unwrap();
    let now = parse_kickoff("2024-06-01 12:00").unwrap();

    let first = e.rank_and_predict(&fixtures, now);
    let second = e.rank_and_predict(&fixtures, now);
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    assert_eq!(first[0].0.home.as_str(), "Liverpool");
}

#[test]
fn nothing_ranks_after_the_last_kickoff() {
    let e = engine(EngineConfig::default());
    let fixtures = e.load_upcoming(&fixture_path("upcoming_matches.csv")).unwrap();
    let later = parse_kickoff("2024-07-01").unwrap();
    assert!(e.rank_and_predict(&fixtures, later).is_empty());
}
