use serde::{Deserialize, Serialize};

use crate::form::{FormEntry, GoalAverages, average_goals, recent_form};
use crate::match_repository::MatchRepository;
use crate::priors::StrengthPriors;
use crate::team_identity::TeamIdentity;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpectedGoals {
    pub home: f64,
    pub away: f64,
}

impl ExpectedGoals {
    pub fn total(&self) -> f64 {
        self.home + self.away
    }
}

/// Blend policy for the expected-goals model. The coefficients are tunable; only the
/// shape of the model is fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XgConfig {
    /// Matches of recent form fed into the form score.
    pub form_window: usize,
    /// Leading recency weights, most recent first. Matches past the end weigh 1.0.
    pub recency_weights: Vec<f64>,
    /// Share of a side's rate taken from its own attack; the rest comes from the
    /// opponent's defence.
    pub attack_weight: f64,
    /// How far a perfect form gap moves the rate (0.15 = up to +/-15%).
    pub form_weight: f64,
    /// Multiplier slope per rating point of strength prior difference.
    pub prior_weight: f64,
    pub home_advantage: f64,
    pub lambda_min: f64,
    pub lambda_max: f64,
}

impl Default for XgConfig {
    fn default() -> Self {
        Self {
            form_window: 5,
            recency_weights: vec![1.5, 1.3, 1.15],
            attack_weight: 0.5,
            form_weight: 0.15,
            prior_weight: 0.25,
            home_advantage: 1.1,
            lambda_min: 0.2,
            lambda_max: 4.5,
        }
    }
}

impl XgConfig {
    pub fn recency_weight(&self, idx: usize) -> f64 {
        self.recency_weights.get(idx).copied().unwrap_or(1.0)
    }

    pub fn clamp_lambda(&self, lambda: f64) -> f64 {
        if lambda.is_nan() {
            return self.lambda_min;
        }
        lambda.clamp(self.lambda_min, self.lambda_max)
    }
}

/// Everything the model needs to know about one side of a fixture.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamProfile {
    pub averages: GoalAverages,
    /// Recency-weighted mean of W/D/L points, in [-1, 1].
    pub form_score: f64,
    pub rating: f64,
}

impl TeamProfile {
    pub fn neutral() -> Self {
        Self {
            averages: GoalAverages::NEUTRAL,
            form_score: 0.0,
            rating: 0.0,
        }
    }

    pub fn build(
        repo: &MatchRepository,
        team: &TeamIdentity,
        priors: &StrengthPriors,
        cfg: &XgConfig,
    ) -> Self {
        let form = recent_form(repo, team, cfg.form_window);
        Self {
            averages: average_goals(repo, team),
            form_score: form_score(&form, cfg),
            rating: priors.rating(team),
        }
    }
}

/// Recency-weighted form in [-1, 1]; 0.0 for a side with no dated matches.
pub fn form_score(entries: &[FormEntry], cfg: &XgConfig) -> f64 {
    let mut weighted = 0.0;
    let mut weight_sum = 0.0;
    for (k, e) in entries.iter().enumerate() {
        let w = cfg.recency_weight(k).max(0.0);
        weighted += w * e.result.points();
        weight_sum += w;
    }
    if weight_sum <= 0.0 {
        return 0.0;
    }
    (weighted / weight_sum).clamp(-1.0, 1.0)
}

/// Bound on the prior exponent so extreme rating gaps saturate instead of overflowing.
const MAX_PRIOR_EXPONENT: f64 = 20.0;

fn prior_exponent(shift: f64) -> f64 {
    if shift.is_nan() {
        return 0.0;
    }
    shift.clamp(-MAX_PRIOR_EXPONENT, MAX_PRIOR_EXPONENT)
}

pub fn expected_goals_from_profiles(
    home: &TeamProfile,
    away: &TeamProfile,
    cfg: &XgConfig,
) -> ExpectedGoals {
    let w_att = cfg.attack_weight.clamp(0.0, 1.0);
    let form_weight = cfg.form_weight.clamp(0.0, 0.9);

    let base_home = w_att * home.averages.goals_for + (1.0 - w_att) * away.averages.goals_against;
    let base_away = w_att * away.averages.goals_for + (1.0 - w_att) * home.averages.goals_against;

    let form_gap = (home.form_score - away.form_score) / 2.0;
    let form_home = 1.0 + form_weight * form_gap;
    let form_away = 1.0 - form_weight * form_gap;

    let prior_shift = prior_exponent(cfg.prior_weight * (home.rating - away.rating));
    let prior_home = prior_shift.exp();
    let prior_away = (-prior_shift).exp();

    ExpectedGoals {
        home: cfg.clamp_lambda(base_home * form_home * prior_home * cfg.home_advantage),
        away: cfg.clamp_lambda(base_away * form_away * prior_away),
    }
}

pub fn expected_goals(
    repo: &MatchRepository,
    home: &TeamIdentity,
    away: &TeamIdentity,
    priors: &StrengthPriors,
    cfg: &XgConfig,
) -> ExpectedGoals {
    let home_profile = TeamProfile::build(repo, home, priors, cfg);
    let away_profile = TeamProfile::build(repo, away, priors, cfg);
    expected_goals_from_profiles(&home_profile, &away_profile, cfg)
}
