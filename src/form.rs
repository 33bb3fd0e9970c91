use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::match_data::MatchRecord;
use crate::match_repository::MatchRepository;
use crate::team_identity::TeamIdentity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Venue {
    Home,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormResult {
    Win,
    Draw,
    Loss,
}

impl FormResult {
    pub fn from_goals(goals_for: u32, goals_against: u32) -> Self {
        match goals_for.cmp(&goals_against) {
            std::cmp::Ordering::Greater => FormResult::Win,
            std::cmp::Ordering::Equal => FormResult::Draw,
            std::cmp::Ordering::Less => FormResult::Loss,
        }
    }

    pub fn letter(self) -> char {
        match self {
            FormResult::Win => 'W',
            FormResult::Draw => 'D',
            FormResult::Loss => 'L',
        }
    }

    /// +1 / 0 / -1, the unit the expected-goals model weights by recency.
    pub fn points(self) -> f64 {
        match self {
            FormResult::Win => 1.0,
            FormResult::Draw => 0.0,
            FormResult::Loss => -1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormEntry {
    pub opponent: TeamIdentity,
    pub venue: Venue,
    pub goals_for: u32,
    pub goals_against: u32,
    pub result: FormResult,
    pub kickoff: NaiveDateTime,
}

impl FormEntry {
    /// `None` when the record is undated or the team did not play in it.
    pub fn from_record(team: &TeamIdentity, record: &MatchRecord) -> Option<Self> {
        let kickoff = record.kickoff?;
        let (venue, opponent, goals_for, goals_against) = if record.home == *team {
            (Venue::Home, &record.away, record.home_goals, record.away_goals)
        } else if record.away == *team {
            (Venue::Away, &record.home, record.away_goals, record.home_goals)
        } else {
            return None;
        };
        Some(Self {
            opponent: opponent.clone(),
            venue,
            goals_for,
            goals_against,
            result: FormResult::from_goals(goals_for, goals_against),
            kickoff,
        })
    }

    pub fn score_label(&self) -> String {
        format!("{}-{}", self.goals_for, self.goals_against)
    }
}

/// A past meeting seen from the first team's side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadToHeadEntry {
    pub home: TeamIdentity,
    pub away: TeamIdentity,
    pub home_goals: u32,
    pub away_goals: u32,
    pub result: FormResult,
    pub kickoff: NaiveDateTime,
}

impl HeadToHeadEntry {
    pub fn score_label(&self) -> String {
        format!("{}-{}", self.home_goals, self.away_goals)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalAverages {
    pub goals_for: f64,
    pub goals_against: f64,
    pub matches: usize,
}

impl GoalAverages {
    /// Neutral prior for a side with no recorded matches.
    pub const NEUTRAL: GoalAverages = GoalAverages {
        goals_for: 1.0,
        goals_against: 1.0,
        matches: 0,
    };
}

/// The team's last `n` dated matches, most recent first. Equal kickoffs keep the
/// order the records were loaded in.
pub fn recent_form(repo: &MatchRepository, team: &TeamIdentity, n: usize) -> Vec<FormEntry> {
    let mut entries: Vec<FormEntry> = repo
        .matches_for(team)
        .into_iter()
        .filter_map(|r| FormEntry::from_record(team, r))
        .collect();
    entries.sort_by(|a, b| b.kickoff.cmp(&a.kickoff));
    entries.truncate(n);
    entries
}

/// Goals for and against per game over the team's whole history, dated or not.
pub fn average_goals(repo: &MatchRepository, team: &TeamIdentity) -> GoalAverages {
    let matches = repo.matches_for(team);
    if matches.is_empty() {
        return GoalAverages::NEUTRAL;
    }
    let mut scored = 0u64;
    let mut conceded = 0u64;
    for r in &matches {
        if r.home == *team {
            scored += u64::from(r.home_goals);
            conceded += u64::from(r.away_goals);
        } else {
            scored += u64::from(r.away_goals);
            conceded += u64::from(r.home_goals);
        }
    }
    let n = matches.len() as f64;
    GoalAverages {
        goals_for: scored as f64 / n,
        goals_against: conceded as f64 / n,
        matches: matches.len(),
    }
}

pub fn head_to_head(
    repo: &MatchRepository,
    team: &TeamIdentity,
    opponent: &TeamIdentity,
    n: usize,
) -> Vec<HeadToHeadEntry> {
    let mut out: Vec<HeadToHeadEntry> = repo
        .matches_between(team, opponent)
        .into_iter()
        .filter_map(|r| {
            let kickoff = r.kickoff?;
            let (gf, ga) = if r.home == *team {
                (r.home_goals, r.away_goals)
            } else {
                (r.away_goals, r.home_goals)
            };
            Some(HeadToHeadEntry {
                home: r.home.clone(),
                away: r.away.clone(),
                home_goals: r.home_goals,
                away_goals: r.away_goals,
                result: FormResult::from_goals(gf, ga),
                kickoff,
            })
        })
        .collect();
    out.sort_by(|a, b| b.kickoff.cmp(&a.kickoff));
    out.truncate(n);
    out
}

pub fn form_string(entries: &[FormEntry]) -> String {
    entries.iter().map(|e| e.result.letter()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_data::RawMatchRow;
    use crate::team_identity::TeamResolver;

    fn raw(home: &str, away: &str, date: &str, hg: u32, ag: u32) -> RawMatchRow {
        RawMatchRow {
            home: home.to_string(),
            away: away.to_string(),
            kickoff: Some(date.to_string()),
            home_goals: Some(hg.to_string()),
            away_goals: Some(ag.to_string()),
            league: None,
        }
    }

    fn setup() -> (MatchRepository, TeamResolver) {
        let resolver = TeamResolver::new();
        let rows = vec![
            raw("Lyon", "Nice", "2024-01-01", 2, 0),
            raw("Nice", "Lyon", "2024-01-08", 1, 1),
            raw("Lens", "Lyon", "2024-01-15", 3, 1),
            raw("Lyon", "Metz", "2024-01-15", 4, 0),
            raw("Lyon", "Lens", "not-a-date", 0, 5),
        ];
        (MatchRepository::from_raw(&rows, &resolver), resolver)
    }

    #[test]
    fn recent_form_is_newest_first_with_stable_ties() {
        let (repo, r) = setup();
        let lyon = r.resolve("lyon");
        let form = recent_form(&repo, &lyon, 10);
        assert_eq!(form.len(), 4);
        assert_eq!(form[0].opponent.as_str(), "Lens");
        assert_eq!(form[0].venue, Venue::Away);
        assert_eq!(form[0].result, FormResult::Loss);
        assert_eq!(form[1].opponent.as_str(), "Metz");
        assert_eq!(form_string(&form), "LWDW");
        assert_eq!(form[0].score_label(), "1-3");

        assert_eq!(recent_form(&repo, &lyon, 2).len(), 2);
        assert!(recent_form(&repo, &lyon, 0).is_empty());
    }

    #[test]
    fn averages_include_undated_matches() {
        let (repo, r) = setup();
        let avg = average_goals(&repo, &r.resolve("Lyon"));
        assert_eq!(avg.matches, 5);
        assert!((avg.goals_for - 8.0 / 5.0).abs() < 1e-12);
        assert!((avg.goals_against - 9.0 / 5.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_team_gets_neutral_averages() {
        let (repo, r) = setup();
        assert_eq!(average_goals(&repo, &r.resolve("Brest")), GoalAverages::NEUTRAL);
    }

    #[test]
    fn head_to_head_uses_first_team_perspective() {
        let (repo, r) = setup();
        let h2h = head_to_head(&repo, &r.resolve("Nice"), &r.resolve("Lyon"), 5);
        assert_eq!(h2h.len(), 2);
        assert_eq!(h2h[0].result, FormResult::Draw);
        assert_eq!(h2h[1].result, FormResult::Loss);
        assert_eq!(h2h[1].score_label(), "2-0");
    }
}
