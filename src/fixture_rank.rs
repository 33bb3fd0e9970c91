use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::match_data::{RawFixtureRow, non_empty, parse_kickoff};
use crate::team_identity::{TeamIdentity, TeamResolver};

pub const DEFAULT_PER_LEAGUE_CAP: usize = 5;
/// League label for fixtures whose source row names none.
pub const UNLISTED_LEAGUE: &str = "Other";

pub fn default_league_priority() -> Vec<String> {
    ["EPL", "Championship", "La Liga", "Serie A", "Bundesliga", "Ligue 1"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingFixture {
    pub home: TeamIdentity,
    pub away: TeamIdentity,
    pub league: String,
    pub kickoff: NaiveDateTime,
}

impl UpcomingFixture {
    /// `None` for rows missing a team name or a readable kickoff; they cannot be
    /// ordered or predicted.
    pub fn from_raw(raw: &RawFixtureRow, resolver: &TeamResolver) -> Option<Self> {
        let home = resolver.resolve(&raw.home);
        let away = resolver.resolve(&raw.away);
        if home.is_empty() || away.is_empty() {
            debug!(home = %raw.home, away = %raw.away, "dropping fixture without both teams");
            return None;
        }
        let Some(kickoff) = raw.kickoff.as_deref().and_then(parse_kickoff) else {
            debug!(
                home = %home,
                away = %away,
                kickoff = raw.kickoff.as_deref().unwrap_or_default(),
                "dropping fixture with unreadable kickoff"
            );
            return None;
        };
        let league = non_empty(raw.league.as_deref()).unwrap_or_else(|| UNLISTED_LEAGUE.to_string());
        Some(Self {
            home,
            away,
            league,
            kickoff,
        })
    }
}

pub fn fixtures_from_raw(rows: &[RawFixtureRow], resolver: &TeamResolver) -> Vec<UpcomingFixture> {
    rows.iter()
        .filter_map(|r| UpcomingFixture::from_raw(r, resolver))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankConfig {
    pub league_priority: Vec<String>,
    pub per_league_cap: usize,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            league_priority: default_league_priority(),
            per_league_cap: DEFAULT_PER_LEAGUE_CAP,
        }
    }
}

/// Future fixtures (kickoff at or after `now`), grouped by league in priority order,
/// each group sorted by kickoff and cut to `per_league_cap`. Leagues missing from the
/// priority list follow in lexical order. Equal kickoffs keep their input order.
pub fn rank(
    fixtures: &[UpcomingFixture],
    league_priority: &[String],
    per_league_cap: usize,
    now: NaiveDateTime,
) -> Vec<UpcomingFixture> {
    let mut groups: HashMap<&str, Vec<&UpcomingFixture>> = HashMap::new();
    for f in fixtures.iter().filter(|f| f.kickoff >= now) {
        groups.entry(f.league.as_str()).or_default().push(f);
    }

    let mut unlisted: Vec<&str> = groups
        .keys()
        .copied()
        .filter(|league| !league_priority.iter().any(|p| p.as_str() == *league))
        .collect();
    unlisted.sort_unstable();

    let mut order: Vec<&str> = Vec::with_capacity(groups.len());
    for league in league_priority {
        if groups.contains_key(league.as_str()) && !order.contains(&league.as_str()) {
            order.push(league.as_str());
        }
    }
    order.extend(unlisted);

    let mut out = Vec::new();
    for league in order {
        let Some(mut group) = groups.remove(league) else {
            continue;
        };
        group.sort_by_key(|f| f.kickoff);
        out.extend(group.into_iter().take(per_league_cap).cloned());
    }
    out
}

pub fn rank_with(
    fixtures: &[UpcomingFixture],
    cfg: &RankConfig,
    now: NaiveDateTime,
) -> Vec<UpcomingFixture> {
    rank(fixtures, &cfg.league_priority, cfg.per_league_cap, now)
}

/// Splits an already ranked list back into consecutive league sections.
pub fn group_by_league<T, F>(items: Vec<T>, league_of: F) -> Vec<(String, Vec<T>)>
where
    F: Fn(&T) -> &str,
{
    let mut out: Vec<(String, Vec<T>)> = Vec::new();
    for item in items {
        let league = league_of(&item).to_string();
        match out.last_mut() {
            Some((name, group)) if *name == league => group.push(item),
            _ => out.push((league, vec![item])),
        }
    }
    out
}
