use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::{DataPaths, EngineConfig};
use crate::error::{PredictError, Side};
use crate::expected_goals::expected_goals;
use crate::fixture_rank::{UpcomingFixture, fixtures_from_raw, rank_with};
use crate::form::{head_to_head, recent_form};
use crate::match_data::RawMatchRow;
use crate::match_repository::MatchRepository;
use crate::match_source::{load_fixtures_csv, load_matches_csv};
use crate::outcome::{self, Prediction};
use crate::priors::StrengthPriors;
use crate::sqlite_source::load_raw_matches_from_path;
use crate::team_identity::{TeamIdentity, TeamResolver};

type PairKey = (TeamIdentity, TeamIdentity);

/// Read-only prediction service over one loaded match log. Safe to share across
/// threads; every Monte Carlo call builds its own RNG.
pub struct PredictionEngine {
    resolver: Arc<TeamResolver>,
    repo: Arc<MatchRepository>,
    priors: Arc<StrengthPriors>,
    config: EngineConfig,
    cache: Mutex<HashMap<PairKey, Prediction>>,
}

impl PredictionEngine {
    pub fn new(
        resolver: TeamResolver,
        repo: MatchRepository,
        priors: StrengthPriors,
        config: EngineConfig,
    ) -> Self {
        Self {
            resolver: Arc::new(resolver),
            repo: Arc::new(repo),
            priors: Arc::new(priors),
            config,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Learns the log's own spellings, normalizes `rows` and loads priors from the
    /// configured source.
    pub fn build(
        mut resolver: TeamResolver,
        rows: &[RawMatchRow],
        config: EngineConfig,
    ) -> Result<Self> {
        resolver.learn_observed(rows.iter().flat_map(|r| [r.home.as_str(), r.away.as_str()]));
        let repo = MatchRepository::from_raw(rows, &resolver);
        let priors = StrengthPriors::load(&config.prior_source, &repo, &resolver)
            .context("load strength priors")?;
        Ok(Self::new(resolver, repo, priors, config))
    }

    /// Alias table (when the file exists), then the SQLite log if configured,
    /// otherwise the master CSV.
    pub fn from_paths(paths: &DataPaths, config: EngineConfig) -> Result<Self> {
        let resolver = load_resolver(&paths.alias_csv)?;
        let rows = match &paths.match_db {
            Some(db) => load_raw_matches_from_path(db)
                .with_context(|| format!("load match log from {}", db.display()))?,
            None => load_matches_csv(&paths.master_csv)
                .with_context(|| format!("load match log from {}", paths.master_csv.display()))?,
        };
        Self::build(resolver, &rows, config)
    }

    pub fn resolver(&self) -> &TeamResolver {
        &self.resolver
    }

    pub fn repository(&self) -> &MatchRepository {
        &self.repo
    }

    pub fn priors(&self) -> &StrengthPriors {
        &self.priors
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn resolve(&self, raw: &str) -> TeamIdentity {
        self.resolver.resolve(raw)
    }

    pub fn cached_predictions(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Swaps in a new match log. Priors derived from history are rebuilt and memoized
    /// predictions are dropped.
    pub fn reload(&mut self, repo: MatchRepository) -> Result<()> {
        let priors = StrengthPriors::load(&self.config.prior_source, &repo, &self.resolver)
            .context("reload strength priors")?;
        self.repo = Arc::new(repo);
        self.priors = Arc::new(priors);
        match self.cache.get_mut() {
            Ok(cache) => cache.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
        info!(matches = self.repo.len(), "prediction engine reloaded");
        Ok(())
    }

    pub fn predict(&self, home_name: &str, away_name: &str) -> Result<Prediction, PredictError> {
        let mut rng = self.rng_for(0);
        self.predict_with_rng(home_name, away_name, &mut rng)
    }

    pub fn predict_with_rng<R: Rng + ?Sized>(
        &self,
        home_name: &str,
        away_name: &str,
        rng: &mut R,
    ) -> Result<Prediction, PredictError> {
        let (home, away) = self.resolve_pair(home_name, away_name)?;
        Ok(self.predict_teams(&home, &away, rng))
    }

    /// Prediction for two already resolved teams. Closed-form results are memoized
    /// when enabled and both teams appear in the log, so arbitrary caller names never
    /// grow the cache.
    pub fn predict_teams<R: Rng + ?Sized>(
        &self,
        home: &TeamIdentity,
        away: &TeamIdentity,
        rng: &mut R,
    ) -> Prediction {
        let cacheable = self.config.memoize
            && self.config.outcome.is_deterministic()
            && self.repo.contains_team(home)
            && self.repo.contains_team(away);
        if !cacheable {
            return self.compute(home, away, rng);
        }
        let key = (home.clone(), away.clone());
        if let Some(hit) = self.cache.lock().ok().and_then(|c| c.get(&key).cloned()) {
            return hit;
        }

        let prediction = self.compute(home, away, rng);
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, prediction.clone());
        }
        prediction
    }

    /// Ranks the batch, then predicts every surviving fixture in parallel. Fixtures
    /// naming the same team twice are skipped.
    pub fn rank_and_predict(
        &self,
        fixtures: &[UpcomingFixture],
        now: NaiveDateTime,
    ) -> Vec<(UpcomingFixture, Prediction)> {
        let ranked = rank_with(fixtures, &self.config.ranking, now);
        debug!(input = fixtures.len(), ranked = ranked.len(), "ranked upcoming fixtures");
        ranked
            .into_par_iter()
            .enumerate()
            .filter_map(|(idx, fixture)| {
                if fixture.home == fixture.away {
                    warn!(team = %fixture.home, "skipping fixture of a team against itself");
                    return None;
                }
                let mut rng = self.rng_for(idx as u64);
                let prediction = self.predict_teams(&fixture.home, &fixture.away, &mut rng);
                Some((fixture, prediction))
            })
            .collect()
    }

    pub fn load_upcoming(&self, path: &Path) -> Result<Vec<UpcomingFixture>> {
        let rows = load_fixtures_csv(path)?;
        Ok(fixtures_from_raw(&rows, &self.resolver))
    }

    fn resolve_pair(
        &self,
        home_name: &str,
        away_name: &str,
    ) -> Result<(TeamIdentity, TeamIdentity), PredictError> {
        let home = self.resolver.resolve(home_name);
        if home.is_empty() {
            return Err(PredictError::MissingTeam { side: Side::Home });
        }
        let away = self.resolver.resolve(away_name);
        if away.is_empty() {
            return Err(PredictError::MissingTeam { side: Side::Away });
        }
        if home == away {
            return Err(PredictError::SameTeam { team: home });
        }
        Ok((home, away))
    }

    fn compute<R: Rng + ?Sized>(
        &self,
        home: &TeamIdentity,
        away: &TeamIdentity,
        rng: &mut R,
    ) -> Prediction {
        let xg = expected_goals(&self.repo, home, away, &self.priors, &self.config.xg);
        let mut prediction =
            outcome::predict(xg, &self.config.outcome, rng).with_teams(home.clone(), away.clone());
        prediction.home_form = recent_form(&self.repo, home, self.config.display_form);
        prediction.away_form = recent_form(&self.repo, away, self.config.display_form);
        prediction.head_to_head = head_to_head(&self.repo, home, away, self.config.head_to_head);
        prediction
    }

    fn rng_for(&self, index: u64) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index)),
            None => StdRng::from_entropy(),
        }
    }
}

fn load_resolver(path: &Path) -> Result<TeamResolver> {
    if path.exists() {
        TeamResolver::from_csv_path(path)
    } else {
        info!(path = %path.display(), "no alias table, names resolve by normalization only");
        Ok(TeamResolver::new())
    }
}
