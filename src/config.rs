use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::expected_goals::XgConfig;
use crate::fixture_rank::{RankConfig, default_league_priority};
use crate::outcome::{MIN_MAX_GOALS, OutcomeConfig, ScorelineStrategy};
use crate::priors::PriorSource;

/// Form entries shown per side on a prediction.
pub const DISPLAY_FORM_LEN: usize = 4;
pub const HEAD_TO_HEAD_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub xg: XgConfig,
    pub outcome: OutcomeConfig,
    pub ranking: RankConfig,
    pub display_form: usize,
    pub head_to_head: usize,
    /// Base seed for Monte Carlo draws; each fixture in a batch offsets it by its index.
    pub seed: Option<u64>,
    /// Cache closed-form predictions per (home, away) pair.
    pub memoize: bool,
    pub prior_source: PriorSource,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            xg: XgConfig::default(),
            outcome: OutcomeConfig::default(),
            ranking: RankConfig::default(),
            display_form: DISPLAY_FORM_LEN,
            head_to_head: HEAD_TO_HEAD_LEN,
            seed: None,
            memoize: true,
            prior_source: PriorSource::None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unset or unparseable values keep
    /// their defaults.
    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(n) = parse_var::<usize, _>(&get, "FORM_WINDOW") {
            cfg.xg.form_window = n.max(1);
        }
        if let Some(h) = parse_var::<f64, _>(&get, "HOME_ADVANTAGE").filter(|h| h.is_finite() && *h > 1.0) {
            cfg.xg.home_advantage = h;
        }
        if let Some(k) = parse_var::<usize, _>(&get, "MAX_GOALS") {
            cfg.outcome.max_goals = k.max(MIN_MAX_GOALS);
        }

        let samples = parse_var::<usize, _>(&get, "MONTE_CARLO_SAMPLES").unwrap_or(0);
        if samples > 0 {
            cfg.outcome.strategy = ScorelineStrategy::MonteCarlo {
                samples,
                empirical_probabilities: parse_flag(&get, "MONTE_CARLO_PROBS").unwrap_or(false),
            };
        }

        if let Some(raw) = get("LEAGUE_ORDER") {
            let order: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            cfg.ranking.league_priority = if order.is_empty() {
                default_league_priority()
            } else {
                order
            };
        }
        if let Some(cap) = parse_var::<usize, _>(&get, "FIXTURES_PER_LEAGUE") {
            cfg.ranking.per_league_cap = cap;
        }

        cfg.seed = parse_var::<u64, _>(&get, "PREDICTION_SEED");
        if let Some(memoize) = parse_flag(&get, "MEMOIZE_PREDICTIONS") {
            cfg.memoize = memoize;
        }

        cfg.prior_source = match get("PRIORS_JSON").filter(|p| !p.trim().is_empty()) {
            Some(path) => PriorSource::File(path.trim().to_string()),
            None if parse_flag(&get, "PRIORS_FROM_ELO").unwrap_or(false) => PriorSource::Elo,
            None => PriorSource::None,
        };

        cfg
    }
}

/// Where the binaries read their inputs from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPaths {
    pub master_csv: PathBuf,
    pub upcoming_csv: PathBuf,
    pub alias_csv: PathBuf,
    /// Preferred over `master_csv` when set.
    pub match_db: Option<PathBuf>,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            master_csv: PathBuf::from("master_matches.csv"),
            upcoming_csv: PathBuf::from("upcoming_matches.csv"),
            alias_csv: PathBuf::from("team_aliases.csv"),
            match_db: None,
        }
    }
}

impl DataPaths {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let path = |key: &str| {
            get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };
        Self {
            master_csv: path("MASTER_CSV").unwrap_or(defaults.master_csv),
            upcoming_csv: path("UPCOMING_CSV").unwrap_or(defaults.upcoming_csv),
            alias_csv: path("ALIAS_CSV").unwrap_or(defaults.alias_csv),
            match_db: path("MATCH_DB"),
        }
    }
}

fn parse_var<T, F>(get: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    get(key).and_then(|val| val.trim().parse::<T>().ok())
}

fn parse_flag<F>(get: &F, key: &str) -> Option<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let val = get(key)?;
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(EngineConfig::from_lookup(lookup(&[])), EngineConfig::default());
        assert_eq!(DataPaths::from_lookup(lookup(&[])), DataPaths::default());
    }

    #[test]
    fn values_override_and_bad_values_fall_back() {
        let cfg = EngineConfig::from_lookup(lookup(&[
            ("FORM_WINDOW", "7"),
            ("HOME_ADVANTAGE", "abc"),
            ("MAX_GOALS", "3"),
            ("MONTE_CARLO_SAMPLES", "2000"),
            ("MONTE_CARLO_PROBS", "yes"),
            ("LEAGUE_ORDER", " Serie A , EPL ,"),
            ("FIXTURES_PER_LEAGUE", "3"),
            ("PREDICTION_SEED", "99"),
            ("MEMOIZE_PREDICTIONS", "false"),
            ("PRIORS_FROM_ELO", "1"),
        ]));
        assert_eq!(cfg.xg.form_window, 7);
        assert_eq!(cfg.xg.home_advantage, 1.1);
        assert_eq!(cfg.outcome.max_goals, MIN_MAX_GOALS);
        assert_eq!(
            cfg.outcome.strategy,
            ScorelineStrategy::MonteCarlo {
                samples: 2000,
                empirical_probabilities: true
            }
        );
        assert_eq!(cfg.ranking.league_priority, ["Serie A", "EPL"]);
        assert_eq!(cfg.ranking.per_league_cap, 3);
        assert_eq!(cfg.seed, Some(99));
        assert!(!cfg.memoize);
        assert_eq!(cfg.prior_source, PriorSource::Elo);
    }

    #[test]
    fn home_advantage_must_favour_the_home_side() {
        for bad in ["0.5", "1.0", "-2", "inf"] {
            let cfg = EngineConfig::from_lookup(lookup(&[("HOME_ADVANTAGE", bad)]));
            assert_eq!(cfg.xg.home_advantage, XgConfig::default().home_advantage, "{bad}");
        }
        let cfg = EngineConfig::from_lookup(lookup(&[("HOME_ADVANTAGE", "1.25")]));
        assert_eq!(cfg.xg.home_advantage, 1.25);
    }

    #[test]
    fn priors_file_wins_over_elo_flag() {
        let cfg = EngineConfig::from_lookup(lookup(&[
            ("PRIORS_JSON", "priors.json"),
            ("PRIORS_FROM_ELO", "true"),
        ]));
        assert_eq!(cfg.prior_source, PriorSource::File("priors.json".to_string()));
    }

    #[test]
    fn match_db_is_optional() {
        let paths = DataPaths::from_lookup(lookup(&[("MATCH_DB", "matches.db"), ("MASTER_CSV", " ")]));
        assert_eq!(paths.match_db, Some(PathBuf::from("matches.db")));
        assert_eq!(paths.master_csv, PathBuf::from("master_matches.csv"));
    }
}
