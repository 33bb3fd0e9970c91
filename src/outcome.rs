use std::collections::HashMap;
use std::fmt;

use rand::Rng;
use rand_distr::{Distribution, Poisson};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::expected_goals::ExpectedGoals;
use crate::form::{FormEntry, HeadToHeadEntry};
use crate::team_identity::TeamIdentity;

/// Smallest matrix bound accepted; below this the truncated tail gets too heavy.
pub const MIN_MAX_GOALS: usize = 6;
pub const DEFAULT_MAX_GOALS: usize = 10;

const GOAL_LINE: u32 = 2;

/// Full-time result, read from the home side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Home, Outcome::Draw, Outcome::Away];

    pub fn from_score(home_goals: u32, away_goals: u32) -> Self {
        match home_goals.cmp(&away_goals) {
            std::cmp::Ordering::Greater => Outcome::Home,
            std::cmp::Ordering::Equal => Outcome::Draw,
            std::cmp::Ordering::Less => Outcome::Away,
        }
    }
}

/// Home/draw/away probabilities as fractions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prob3 {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl Prob3 {
    pub fn uniform() -> Self {
        Self::from_fn(|_| 1.0 / 3.0)
    }

    /// All mass on one result.
    pub fn certain(outcome: Outcome) -> Self {
        Self::from_fn(|o| if o == outcome { 1.0 } else { 0.0 })
    }

    pub fn from_fn<F: Fn(Outcome) -> f64>(f: F) -> Self {
        Self {
            home: f(Outcome::Home),
            draw: f(Outcome::Draw),
            away: f(Outcome::Away),
        }
    }

    /// Relative frequency of each result; uniform when there is nothing to count.
    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        if outcomes.is_empty() {
            return Self::uniform();
        }
        let n = outcomes.len() as f64;
        Self::from_fn(|o| outcomes.iter().filter(|&&x| x == o).count() as f64 / n)
    }

    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    /// Most probable result. Ties go to home, then draw.
    pub fn favourite(&self) -> Outcome {
        Outcome::ALL
            .into_iter()
            .fold(Outcome::Home, |best, o| if self.get(o) > self.get(best) { o } else { best })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scoreline {
    pub home: u32,
    pub away: u32,
}

impl fmt::Display for Scoreline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.home, self.away)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScorelineStrategy {
    ClosedForm,
    MonteCarlo {
        samples: usize,
        /// Replace matrix probabilities with sampled frequencies.
        empirical_probabilities: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeConfig {
    pub max_goals: usize,
    pub strategy: ScorelineStrategy,
}

impl Default for OutcomeConfig {
    fn default() -> Self {
        Self {
            max_goals: DEFAULT_MAX_GOALS,
            strategy: ScorelineStrategy::ClosedForm,
        }
    }
}

impl OutcomeConfig {
    pub fn is_deterministic(&self) -> bool {
        match self.strategy {
            ScorelineStrategy::ClosedForm => true,
            ScorelineStrategy::MonteCarlo { samples, .. } => samples == 0,
        }
    }
}

/// Joint scoreline probabilities for two independent Poisson rates, truncated at
/// `max_goals` per side. Cells are left unnormalized; every derived probability
/// is divided by `total_mass`.
#[derive(Debug, Clone)]
pub struct ScoreMatrix {
    max_goals: usize,
    cells: Vec<f64>,
    total_mass: f64,
}

impl ScoreMatrix {
    pub fn new(lambda_home: f64, lambda_away: f64, max_goals: usize) -> Self {
        let max_goals = max_goals.max(MIN_MAX_GOALS);
        let pmf_h = poisson_pmf(lambda_home, max_goals);
        let pmf_a = poisson_pmf(lambda_away, max_goals);

        let side = max_goals + 1;
        let mut cells = Vec::with_capacity(side * side);
        for p_h in &pmf_h {
            for p_a in &pmf_a {
                cells.push(p_h * p_a);
            }
        }
        let total_mass = cells.iter().sum();
        Self {
            max_goals,
            cells,
            total_mass,
        }
    }

    pub fn max_goals(&self) -> usize {
        self.max_goals
    }

    pub fn total_mass(&self) -> f64 {
        self.total_mass
    }

    pub fn cell(&self, home: usize, away: usize) -> f64 {
        if home > self.max_goals || away > self.max_goals {
            return 0.0;
        }
        self.cells[home * (self.max_goals + 1) + away]
    }

    fn iter(&self) -> impl Iterator<Item = (u32, u32, f64)> + '_ {
        let side = self.max_goals + 1;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, p)| ((i / side) as u32, (i % side) as u32, *p))
    }

    fn normalized_sum<F>(&self, pred: F) -> f64
    where
        F: Fn(u32, u32) -> bool,
    {
        if self.total_mass <= 0.0 {
            return 0.0;
        }
        let sum: f64 = self
            .iter()
            .filter(|(h, a, _)| pred(*h, *a))
            .map(|(_, _, p)| p)
            .sum();
        (sum / self.total_mass).clamp(0.0, 1.0)
    }

    pub fn outcome_probs(&self) -> Prob3 {
        if self.total_mass <= 0.0 || !self.total_mass.is_finite() {
            warn!("score matrix has no mass, falling back to uniform outcome split");
            return Prob3::uniform();
        }
        let mut mass = [0.0_f64; 3];
        for (h, a, p) in self.iter() {
            mass[Outcome::from_score(h, a) as usize] += p;
        }
        Prob3::from_fn(|o| mass[o as usize] / self.total_mass)
    }

    pub fn over_probability(&self) -> f64 {
        self.normalized_sum(|h, a| h + a > GOAL_LINE)
    }

    pub fn btts_probability(&self) -> f64 {
        self.normalized_sum(|h, a| h > 0 && a > 0)
    }

    /// Modal cell; ties go to the first cell in row-major order.
    pub fn most_likely_score(&self) -> Scoreline {
        let mut best = Scoreline { home: 0, away: 0 };
        let mut best_p = f64::NEG_INFINITY;
        for (h, a, p) in self.iter() {
            if p > best_p {
                best_p = p;
                best = Scoreline { home: h, away: a };
            }
        }
        best
    }
}

fn poisson_pmf(lambda: f64, max_k: usize) -> Vec<f64> {
    let lambda = if lambda.is_finite() { lambda.max(0.0) } else { 0.0 };
    let mut out = vec![0.0; max_k + 1];
    out[0] = (-lambda).exp();
    for k in 1..=max_k {
        out[k] = out[k - 1] * lambda / k as f64;
    }
    out
}

/// Frequencies gathered from independent Poisson draws.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSummary {
    pub samples: usize,
    pub scoreline: Scoreline,
    pub probs: Prob3,
    pub over: f64,
    pub btts: f64,
}

fn sampler(lambda: f64) -> Option<Poisson<f64>> {
    if lambda > 0.0 && lambda.is_finite() {
        Poisson::new(lambda).ok()
    } else {
        None
    }
}

/// Draws `samples` scorelines. The modal pair wins; ties go to the pair seen first.
/// Returns `None` for zero samples.
pub fn sample_scorelines<R: Rng + ?Sized>(
    xg: ExpectedGoals,
    samples: usize,
    rng: &mut R,
) -> Option<SampleSummary> {
    if samples == 0 {
        return None;
    }
    let home_dist = sampler(xg.home);
    let away_dist = sampler(xg.away);

    // (count, first index seen)
    let mut seen: HashMap<Scoreline, (usize, usize)> = HashMap::new();
    let (mut home_wins, mut draws, mut away_wins) = (0usize, 0usize, 0usize);
    let (mut over, mut btts) = (0usize, 0usize);

    for i in 0..samples {
        let h = home_dist.as_ref().map_or(0, |d| d.sample(rng) as u32);
        let a = away_dist.as_ref().map_or(0, |d| d.sample(rng) as u32);
        seen.entry(Scoreline { home: h, away: a })
            .and_modify(|(count, _)| *count += 1)
            .or_insert((1, i));
        match h.cmp(&a) {
            std::cmp::Ordering::Greater => home_wins += 1,
            std::cmp::Ordering::Equal => draws += 1,
            std::cmp::Ordering::Less => away_wins += 1,
        }
        if h + a > GOAL_LINE {
            over += 1;
        }
        if h > 0 && a > 0 {
            btts += 1;
        }
    }

    let scoreline = seen
        .iter()
        .max_by(|(_, (ca, fa)), (_, (cb, fb))| ca.cmp(cb).then(fb.cmp(fa)))
        .map(|(s, _)| *s)
        .unwrap_or(Scoreline { home: 0, away: 0 });

    let n = samples as f64;
    Some(SampleSummary {
        samples,
        scoreline,
        probs: Prob3 {
            home: home_wins as f64 / n,
            draw: draws as f64 / n,
            away: away_wins as f64 / n,
        },
        over: over as f64 / n,
        btts: btts as f64 / n,
    })
}

/// Probabilities as fractions plus the representative scoreline.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeDistribution {
    pub expected_goals: ExpectedGoals,
    pub probs: Prob3,
    pub over: f64,
    pub btts: f64,
    pub scoreline: Scoreline,
}

pub fn closed_form(xg: ExpectedGoals, max_goals: usize) -> OutcomeDistribution {
    let matrix = ScoreMatrix::new(xg.home, xg.away, max_goals);
    OutcomeDistribution {
        expected_goals: xg,
        probs: matrix.outcome_probs(),
        over: matrix.over_probability(),
        btts: matrix.btts_probability(),
        scoreline: matrix.most_likely_score(),
    }
}

pub fn distribution<R: Rng + ?Sized>(
    xg: ExpectedGoals,
    cfg: &OutcomeConfig,
    rng: &mut R,
) -> OutcomeDistribution {
    let mut dist = closed_form(xg, cfg.max_goals);
    let ScorelineStrategy::MonteCarlo {
        samples,
        empirical_probabilities,
    } = cfg.strategy
    else {
        return dist;
    };
    if let Some(summary) = sample_scorelines(xg, samples, rng) {
        dist.scoreline = summary.scoreline;
        if empirical_probabilities {
            dist.probs = summary.probs;
            dist.over = summary.over;
            dist.btts = summary.btts;
        }
    }
    dist
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(default)]
    pub home: TeamIdentity,
    #[serde(default)]
    pub away: TeamIdentity,
    pub home_win_pct: f64,
    pub draw_pct: f64,
    pub away_win_pct: f64,
    pub predicted_score: Scoreline,
    pub expected_goals: ExpectedGoals,
    pub over_2_5_pct: f64,
    pub under_2_5_pct: f64,
    pub btts_pct: f64,
    #[serde(default)]
    pub home_form: Vec<FormEntry>,
    #[serde(default)]
    pub away_form: Vec<FormEntry>,
    #[serde(default)]
    pub head_to_head: Vec<HeadToHeadEntry>,
}

impl Prediction {
    pub fn from_distribution(dist: &OutcomeDistribution) -> Self {
        let outcome = round_percentages(&[dist.probs.home, dist.probs.draw, dist.probs.away]);
        let goals = round_percentages(&[dist.over, 1.0 - dist.over]);
        Self {
            home: TeamIdentity::default(),
            away: TeamIdentity::default(),
            home_win_pct: outcome[0],
            draw_pct: outcome[1],
            away_win_pct: outcome[2],
            predicted_score: dist.scoreline,
            expected_goals: dist.expected_goals,
            over_2_5_pct: goals[0],
            under_2_5_pct: goals[1],
            btts_pct: round_tenth(dist.btts.clamp(0.0, 1.0) * 100.0),
            home_form: Vec::new(),
            away_form: Vec::new(),
            head_to_head: Vec::new(),
        }
    }

    pub fn with_teams(mut self, home: TeamIdentity, away: TeamIdentity) -> Self {
        self.home = home;
        self.away = away;
        self
    }

    pub fn btts_label(&self) -> &'static str {
        if self.btts_pct >= 50.0 { "Yes" } else { "No" }
    }

    pub fn over_2_5_label(&self) -> &'static str {
        if self.over_2_5_pct >= 50.0 {
            "Over 2.5"
        } else {
            "Under 2.5"
        }
    }

    pub fn outcome_sum(&self) -> f64 {
        self.home_win_pct + self.draw_pct + self.away_win_pct
    }
}

/// Closed-form or sampled distribution for two rates, as a display-ready prediction.
pub fn predict<R: Rng + ?Sized>(xg: ExpectedGoals, cfg: &OutcomeConfig, rng: &mut R) -> Prediction {
    Prediction::from_distribution(&distribution(xg, cfg, rng))
}

fn round_tenth(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Turns fractions into percentages with one decimal that sum to exactly 100.0,
/// handing leftover tenths to the largest remainders.
fn round_percentages(fractions: &[f64]) -> Vec<f64> {
    const UNITS: i64 = 1000;
    let clean: Vec<f64> = fractions
        .iter()
        .map(|p| if p.is_finite() { p.max(0.0) } else { 0.0 })
        .collect();
    let total: f64 = clean.iter().sum();
    if total <= 0.0 {
        let mut out = vec![0.0; fractions.len()];
        if let Some(first) = out.first_mut() {
            *first = 100.0;
        }
        return out;
    }

    let scaled: Vec<f64> = clean
        .iter()
        .map(|p| p / total * UNITS as f64)
        .collect();
    let mut units: Vec<i64> = scaled.iter().map(|s| s.floor() as i64).collect();
    let mut leftover = UNITS - units.iter().sum::<i64>();

    let mut order: Vec<usize> = (0..scaled.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = scaled[a] - scaled[a].floor();
        let rb = scaled[b] - scaled[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });
    for idx in order.into_iter().cycle() {
        if leftover <= 0 {
            break;
        }
        units[idx] += 1;
        leftover -= 1;
    }

    units.into_iter().map(|u| u as f64 / 10.0).collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn favourite_prefers_home_then_draw_on_ties() {
        assert_eq!(Prob3::uniform().favourite(), Outcome::Home);
        let p = Prob3 {
            home: 0.2,
            draw: 0.4,
            away: 0.4,
        };
        assert_eq!(p.favourite(), Outcome::Draw);
        assert_eq!(Prob3::certain(Outcome::Away).favourite(), Outcome::Away);
    }

    #[test]
    fn base_rates_count_each_result() {
        let seen = [(2, 0), (1, 1), (0, 3), (4, 2)].map(|(h, a)| Outcome::from_score(h, a));
        let p = Prob3::from_outcomes(&seen);
        assert_eq!(p.home, 0.5);
        assert_eq!(p.draw, 0.25);
        assert_eq!(p.away, 0.25);
        assert_eq!(Prob3::from_outcomes(&[]), Prob3::uniform());
    }

    fn xg(home: f64, away: f64) -> ExpectedGoals {
        ExpectedGoals { home, away }
    }

    #[test]
    fn outcome_percentages_sum_to_100() {
        let cfg = OutcomeConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        for h in 0..=45 {
            for a in (0..=45).step_by(5) {
                let p = predict(xg(h as f64 / 10.0, a as f64 / 10.0), &cfg, &mut rng);
                assert!((p.outcome_sum() - 100.0).abs() <= 0.1);
                for v in [p.home_win_pct, p.draw_pct, p.away_win_pct] {
                    assert!((0.0..=100.0).contains(&v));
                }
                assert!((p.over_2_5_pct + p.under_2_5_pct - 100.0).abs() <= 0.1);
            }
        }
    }

    #[test]
    fn zero_rates_put_everything_on_nil_nil() {
        let m = ScoreMatrix::new(0.0, 0.0, 6);
        assert_eq!(m.cell(0, 0), 1.0);
        let p = Prediction::from_distribution(&closed_form(xg(0.0, 0.0), 6));
        assert_eq!(p.draw_pct, 100.0);
        assert_eq!(p.home_win_pct, 0.0);
        assert_eq!(p.predicted_score, Scoreline { home: 0, away: 0 });
        assert_eq!(p.btts_pct, 0.0);
        assert_eq!(p.over_2_5_pct, 0.0);
    }

    #[test]
    fn truncated_matrix_draw_probability_matches_closed_form() {
        let m = ScoreMatrix::new(1.2, 1.0, 6);
        assert!(m.total_mass() < 1.0);
        let probs = m.outcome_probs();
        let draw = probs.draw * 100.0;
        assert!((26.0..=30.0).contains(&draw), "draw {draw}");
        assert!((probs.home + probs.draw + probs.away - 1.0).abs() < 1e-12);

        let again = ScoreMatrix::new(1.2, 1.0, 6).outcome_probs();
        assert_eq!(probs.draw.to_bits(), again.draw.to_bits());
        assert_eq!(probs.home.to_bits(), again.home.to_bits());
    }

    #[test]
    fn equal_rates_are_symmetric_and_draw_shaped() {
        for lambda in [0.3, 0.8, 1.4, 2.5] {
            let p = Prediction::from_distribution(&closed_form(xg(lambda, lambda), 10));
            assert!((p.home_win_pct - p.away_win_pct).abs() <= 0.1);
            assert_eq!(p.predicted_score.home, p.predicted_score.away);
        }
        for lambda in [0.2, 0.5, 0.8] {
            let probs = ScoreMatrix::new(lambda, lambda, 10).outcome_probs();
            assert!(probs.draw >= probs.home && probs.draw >= probs.away);
        }
    }

    #[test]
    fn stronger_home_rate_favours_home() {
        let p = Prediction::from_distribution(&closed_form(xg(1.65, 1.5), 10));
        assert!(p.home_win_pct > p.away_win_pct);
    }

    #[test]
    fn monte_carlo_is_reproducible_with_a_seed() {
        let cfg = OutcomeConfig {
            max_goals: 10,
            strategy: ScorelineStrategy::MonteCarlo {
                samples: 5_000,
                empirical_probabilities: true,
            },
        };
        let a = predict(xg(1.4, 0.9), &cfg, &mut StdRng::seed_from_u64(42));
        let b = predict(xg(1.4, 0.9), &cfg, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
        assert!((a.outcome_sum() - 100.0).abs() <= 0.1);

        let closed = Prediction::from_distribution(&closed_form(xg(1.4, 0.9), 10));
        assert!((a.home_win_pct - closed.home_win_pct).abs() < 5.0);
    }

    #[test]
    fn sampled_zero_rates_are_nil_nil() {
        let summary = sample_scorelines(xg(0.0, 0.0), 100, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(summary.scoreline, Scoreline { home: 0, away: 0 });
        assert_eq!(summary.probs.draw, 1.0);
        assert!(sample_scorelines(xg(1.0, 1.0), 0, &mut StdRng::seed_from_u64(1)).is_none());
    }

    #[test]
    fn round_percentages_hands_out_leftover_tenths() {
        let out = round_percentages(&[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]);
        let units: i64 = out.iter().map(|v| (v * 10.0).round() as i64).sum();
        assert_eq!(units, 1000);
        assert_eq!(out[0], 33.4);
        assert_eq!(round_percentages(&[0.0, 0.0]), vec![100.0, 0.0]);
    }

    #[test]
    fn labels_follow_percentages() {
        let p = Prediction::from_distribution(&closed_form(xg(2.8, 2.2), 10));
        assert_eq!(p.btts_label(), "Yes");
        assert_eq!(p.over_2_5_label(), "Over 2.5");
        let p = Prediction::from_distribution(&closed_form(xg(0.3, 0.2), 10));
        assert_eq!(p.btts_label(), "No");
        assert_eq!(p.over_2_5_label(), "Under 2.5");
    }
}
