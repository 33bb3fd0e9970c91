use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::elo::{EloConfig, compute_elo};
use crate::match_repository::MatchRepository;
use crate::team_identity::{TeamIdentity, TeamResolver};

/// Static per-team strength ratings. Unknown teams read as the neutral 0.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrengthPriors {
    ratings: HashMap<TeamIdentity, f64>,
}

/// Where strength priors come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriorSource {
    #[default]
    None,
    File(String),
    Elo,
}

impl StrengthPriors {
    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn from_ratings(ratings: HashMap<TeamIdentity, f64>) -> Self {
        let ratings = ratings
            .into_iter()
            .filter(|(_, r)| r.is_finite())
            .collect();
        Self { ratings }
    }

    /// Parses `{"team name": rating, ...}`; names go through the resolver.
    pub fn from_json_str(raw: &str, resolver: &TeamResolver) -> Result<Self> {
        let parsed: HashMap<String, f64> =
            serde_json::from_str(raw).context("parse strength priors json")?;
        let ratings = parsed
            .into_iter()
            .map(|(name, rating)| (resolver.resolve(&name), rating))
            .collect();
        Ok(Self::from_ratings(ratings))
    }

    pub fn from_json_path(path: &Path, resolver: &TeamResolver) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read strength priors {}", path.display()))?;
        let priors = Self::from_json_str(&raw, resolver)?;
        info!(path = %path.display(), teams = priors.len(), "loaded strength priors");
        Ok(priors)
    }

    /// Elo ratings over the whole log, scaled so 400 Elo points make one rating unit.
    pub fn from_elo(repo: &MatchRepository, cfg: EloConfig) -> Self {
        let ratings = compute_elo(repo, cfg)
            .into_iter()
            .map(|(team, elo)| (team, (elo - cfg.initial) / 400.0))
            .collect();
        Self::from_ratings(ratings)
    }

    pub fn load(
        source: &PriorSource,
        repo: &MatchRepository,
        resolver: &TeamResolver,
    ) -> Result<Self> {
        match source {
            PriorSource::None => Ok(Self::neutral()),
            PriorSource::File(path) => Self::from_json_path(Path::new(path), resolver),
            PriorSource::Elo => Ok(Self::from_elo(repo, EloConfig::default())),
        }
    }

    pub fn rating(&self, team: &TeamIdentity) -> f64 {
        self.ratings.get(team).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_keys_are_resolved() {
        let resolver = TeamResolver::new();
        let priors =
            StrengthPriors::from_json_str(r#"{"  real   madrid ": 0.8, "Getafe": -0.3}"#, &resolver)
                .unwrap();
        assert_eq!(priors.rating(&resolver.resolve("Real Madrid")), 0.8);
        assert_eq!(priors.rating(&resolver.resolve("getafe")), -0.3);
        assert_eq!(priors.rating(&resolver.resolve("Girona")), 0.0);
    }

    #[test]
    fn bad_json_is_an_error() {
        assert!(StrengthPriors::from_json_str("[1,2]", &TeamResolver::new()).is_err());
    }
}
