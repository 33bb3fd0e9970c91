use std::collections::HashMap;

use chrono::NaiveDateTime;
use tracing::info;

use crate::match_data::{MatchRecord, RawMatchRow};
use crate::team_identity::{TeamIdentity, TeamResolver};

/// Immutable, team-indexed store of historical matches.
///
/// Built once per dataset snapshot and only read afterwards, so it is shared across
/// threads behind an `Arc` without any locking.
#[derive(Debug, Clone, Default)]
pub struct MatchRepository {
    records: Vec<MatchRecord>,
    by_team: HashMap<TeamIdentity, Vec<usize>>,
}

impl MatchRepository {
    pub fn from_raw<'a, I>(rows: I, resolver: &TeamResolver) -> Self
    where
        I: IntoIterator<Item = &'a RawMatchRow>,
    {
        let records: Vec<MatchRecord> = rows
            .into_iter()
            .map(|raw| MatchRecord::from_raw(raw, resolver))
            .collect();
        let repo = Self::from_records(records);
        let undated = repo.records.iter().filter(|r| r.kickoff.is_none()).count();
        info!(
            matches = repo.len(),
            teams = repo.by_team.len(),
            undated,
            "built match repository"
        );
        repo
    }

    pub fn from_records(records: Vec<MatchRecord>) -> Self {
        let mut by_team: HashMap<TeamIdentity, Vec<usize>> = HashMap::new();
        for (idx, rec) in records.iter().enumerate() {
            by_team.entry(rec.home.clone()).or_default().push(idx);
            if rec.away != rec.home {
                by_team.entry(rec.away.clone()).or_default().push(idx);
            }
        }
        Self { records, by_team }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    /// Every identity that appears in the log, sorted.
    pub fn teams(&self) -> Vec<&TeamIdentity> {
        let mut teams: Vec<&TeamIdentity> = self.by_team.keys().collect();
        teams.sort();
        teams
    }

    pub fn contains_team(&self, team: &TeamIdentity) -> bool {
        self.by_team.contains_key(team)
    }

    /// All matches the team played, home or away, in insertion order.
    pub fn matches_for(&self, team: &TeamIdentity) -> Vec<&MatchRecord> {
        self.by_team
            .get(team)
            .map(|idxs| idxs.iter().map(|&i| &self.records[i]).collect())
            .unwrap_or_default()
    }

    /// Head-to-head meetings regardless of which side hosted.
    pub fn matches_between(&self, a: &TeamIdentity, b: &TeamIdentity) -> Vec<&MatchRecord> {
        self.matches_for(a)
            .into_iter()
            .filter(|r| (r.home == *a && r.away == *b) || (r.home == *b && r.away == *a))
            .collect()
    }

    /// Snapshot holding only dated matches that kicked off strictly before `cutoff`.
    pub fn before(&self, cutoff: NaiveDateTime) -> Self {
        let records = self
            .records
            .iter()
            .filter(|r| r.kickoff.is_some_and(|k| k < cutoff))
            .cloned()
            .collect();
        Self::from_records(records)
    }
}
