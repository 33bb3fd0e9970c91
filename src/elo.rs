use std::collections::HashMap;

use crate::match_data::MatchRecord;
use crate::match_repository::MatchRepository;
use crate::outcome::Outcome;
use crate::team_identity::TeamIdentity;

#[derive(Debug, Clone, Copy)]
pub struct EloConfig {
    pub k: f64,
    pub home_adv_pts: f64,
    pub initial: f64,
}

impl Default for EloConfig {
    fn default() -> Self {
        Self {
            k: 20.0,
            home_adv_pts: 60.0,
            initial: 1500.0,
        }
    }
}

/// Replays every dated match in kickoff order. Undated matches cannot be placed in
/// the sequence and are skipped.
pub fn compute_elo(repo: &MatchRepository, cfg: EloConfig) -> HashMap<TeamIdentity, f64> {
    let mut matches: Vec<(usize, &MatchRecord)> = repo
        .records()
        .iter()
        .enumerate()
        .filter(|(_, m)| m.kickoff.is_some())
        .collect();
    matches.sort_by(|(ia, a), (ib, b)| a.kickoff.cmp(&b.kickoff).then(ia.cmp(ib)));

    let mut elo: HashMap<TeamIdentity, f64> = HashMap::new();
    for (_, m) in matches {
        if m.home == m.away {
            continue;
        }
        let eh = *elo.entry(m.home.clone()).or_insert(cfg.initial);
        let ea = *elo.entry(m.away.clone()).or_insert(cfg.initial);

        let expected_home = expected_score(eh + cfg.home_adv_pts, ea);
        let s_home = match m.outcome() {
            Outcome::Home => 1.0,
            Outcome::Away => 0.0,
            Outcome::Draw => 0.5,
        };

        let delta = cfg.k * (s_home - expected_home);
        elo.insert(m.home.clone(), eh + delta);
        elo.insert(m.away.clone(), ea - delta);
    }

    elo
}

fn expected_score(r_a: f64, r_b: f64) -> f64 {
    1.0 / (1.0 + 10.0_f64.powf(-(r_a - r_b) / 400.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_data::RawMatchRow;
    use crate::team_identity::TeamResolver;

    #[test]
    fn winners_gain_and_ratings_are_zero_sum() {
        let resolver = TeamResolver::new();
        let rows: Vec<RawMatchRow> = (1..=6)
            .map(|day| RawMatchRow {
                home: "Porto".to_string(),
                away: "Braga".to_string(),
                kickoff: Some(format!("2024-03-0{day}")),
                home_goals: Some("2".to_string()),
                away_goals: Some("0".to_string()),
                league: None,
            })
            .collect();
        let repo = MatchRepository::from_raw(&rows, &resolver);
        let elo = compute_elo(&repo, EloConfig::default());
        let porto = elo[&resolver.resolve("Porto")];
        let braga = elo[&resolver.resolve("Braga")];
        assert!(porto > 1500.0);
        assert!(braga < 1500.0);
        assert!((porto + braga - 3000.0).abs() < 1e-9);
    }
}
