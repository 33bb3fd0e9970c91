use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::EngineConfig;
use crate::expected_goals::expected_goals;
use crate::match_data::MatchRecord;
use crate::match_repository::MatchRepository;
use crate::outcome::{Outcome, Prob3, closed_form};
use crate::priors::StrengthPriors;

/// Floor applied before taking logs so a confident miss scores finitely.
const LOG_LOSS_FLOOR: f64 = 1e-12;
pub const CALIBRATION_BINS: usize = 10;

/// Mean Brier score, log loss and hit rate over a set of predictions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub samples: usize,
    pub brier: f64,
    pub log_loss: f64,
    pub accuracy: f64,
}

impl Metrics {
    pub const EMPTY: Metrics = Metrics {
        samples: 0,
        brier: 0.0,
        log_loss: 0.0,
        accuracy: 0.0,
    };

    /// Scores `predictions` against what happened, pairwise. Empty or mismatched
    /// inputs score nothing.
    pub fn score(predictions: &[Prob3], outcomes: &[Outcome]) -> Self {
        if predictions.is_empty() || predictions.len() != outcomes.len() {
            return Self::EMPTY;
        }
        let (brier, log_loss, hits) = predictions.iter().zip(outcomes).fold(
            (0.0_f64, 0.0_f64, 0usize),
            |(brier, log_loss, hits), (p, &actual)| {
                let truth = Prob3::certain(actual);
                let squared: f64 = Outcome::ALL
                    .iter()
                    .map(|&o| (p.get(o) - truth.get(o)).powi(2))
                    .sum();
                let surprise = -p.get(actual).clamp(LOG_LOSS_FLOOR, 1.0).ln();
                let hit = usize::from(p.favourite() == actual);
                (brier + squared, log_loss + surprise, hits + hit)
            },
        );
        let n = predictions.len() as f64;
        Self {
            samples: predictions.len(),
            brier: brier / n,
            log_loss: log_loss / n,
            accuracy: hits as f64 / n,
        }
    }
}

/// One bucket of a reliability table: predictions whose probability for the class
/// fell in `[bucket_start, bucket_end)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBin {
    pub bucket_start: f64,
    pub bucket_end: f64,
    pub count: usize,
    pub avg_pred: f64,
    pub actual_rate: f64,
}

/// Reliability table for one result: how often `class` happened against how likely
/// it was called. A probability of exactly 1.0 lands in the last bucket.
pub fn calibration_bins(
    predictions: &[Prob3],
    outcomes: &[Outcome],
    class: Outcome,
    bins: usize,
) -> Vec<CalibrationBin> {
    let bins = bins.max(2);
    let width = 1.0 / bins as f64;
    let mut table: Vec<CalibrationBin> = (0..bins)
        .map(|i| CalibrationBin {
            bucket_start: i as f64 * width,
            bucket_end: (i + 1) as f64 * width,
            count: 0,
            avg_pred: 0.0,
            actual_rate: 0.0,
        })
        .collect();

    for (p, &actual) in predictions.iter().zip(outcomes) {
        let called = p.get(class).clamp(0.0, 1.0);
        let bin = &mut table[((called * bins as f64) as usize).min(bins - 1)];
        bin.count += 1;
        bin.avg_pred += called;
        if actual == class {
            bin.actual_rate += 1.0;
        }
    }

    // Sums become means once every prediction is placed.
    for bin in table.iter_mut().filter(|b| b.count > 0) {
        bin.avg_pred /= bin.count as f64;
        bin.actual_rate /= bin.count as f64;
    }
    table
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub metrics: Metrics,
    /// What always predicting the evaluated matches' own base rates would score.
    pub baseline: Metrics,
    pub home_bins: Vec<CalibrationBin>,
    pub draw_bins: Vec<CalibrationBin>,
    pub away_bins: Vec<CalibrationBin>,
    /// Target matches with no earlier history to predict from.
    pub skipped: usize,
}

/// Walk-forward evaluation over the last `last_n` dated matches. Each match is
/// predicted from a snapshot holding only matches that kicked off strictly before it.
/// Closed-form probabilities are scored regardless of the configured scoreline
/// strategy so the report is reproducible.
pub fn walk_forward(
    repo: &MatchRepository,
    priors: &StrengthPriors,
    cfg: &EngineConfig,
    last_n: usize,
) -> BacktestReport {
    let mut dated: Vec<(usize, &MatchRecord)> = repo
        .records()
        .iter()
        .enumerate()
        .filter(|(_, m)| m.kickoff.is_some() && m.home != m.away)
        .collect();
    dated.sort_by(|(ia, a), (ib, b)| a.kickoff.cmp(&b.kickoff).then(ia.cmp(ib)));
    let start = dated.len().saturating_sub(last_n);
    let targets = &dated[start..];

    let scored: Vec<Option<(Prob3, Outcome)>> = targets
        .par_iter()
        .map(|(_, m)| {
            let kickoff = m.kickoff?;
            let snapshot = repo.before(kickoff);
            if snapshot.is_empty() {
                return None;
            }
            let xg = expected_goals(&snapshot, &m.home, &m.away, priors, &cfg.xg);
            let probs = closed_form(xg, cfg.outcome.max_goals).probs;
            Some((probs, m.outcome()))
        })
        .collect();

    let skipped = scored.iter().filter(|s| s.is_none()).count();
    let (predictions, outcomes): (Vec<Prob3>, Vec<Outcome>) = scored.into_iter().flatten().unzip();

    let metrics = Metrics::score(&predictions, &outcomes);
    let base_rate = Prob3::from_outcomes(&outcomes);
    let baseline = Metrics::score(&vec![base_rate; outcomes.len()], &outcomes);
    info!(
        evaluated = metrics.samples,
        skipped,
        brier = metrics.brier,
        log_loss = metrics.log_loss,
        "walk-forward backtest finished"
    );

    BacktestReport {
        metrics,
        baseline,
        home_bins: calibration_bins(&predictions, &outcomes, Outcome::Home, CALIBRATION_BINS),
        draw_bins: calibration_bins(&predictions, &outcomes, Outcome::Draw, CALIBRATION_BINS),
        away_bins: calibration_bins(&predictions, &outcomes, Outcome::Away, CALIBRATION_BINS),
        skipped,
    }
}
