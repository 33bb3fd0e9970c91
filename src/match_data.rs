use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::outcome::Outcome;
use crate::team_identity::{TeamIdentity, TeamResolver};

/// One historical row exactly as the source delivered it, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMatchRow {
    pub home: String,
    pub away: String,
    pub kickoff: Option<String>,
    pub home_goals: Option<String>,
    pub away_goals: Option<String>,
    pub league: Option<String>,
}

/// One upcoming fixture as the source delivered it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFixtureRow {
    pub home: String,
    pub away: String,
    pub kickoff: Option<String>,
    pub league: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub home: TeamIdentity,
    pub away: TeamIdentity,
    /// `None` when the source date could not be parsed; such records never take part
    /// in recency ordering.
    pub kickoff: Option<NaiveDateTime>,
    pub home_goals: u32,
    pub away_goals: u32,
    pub league: Option<String>,
}

impl MatchRecord {
    /// One-time normalization pass: resolve both names, parse the kickoff and coerce
    /// goal cells. Bad cells become neutral values; the row itself is always kept.
    pub fn from_raw(raw: &RawMatchRow, resolver: &TeamResolver) -> Self {
        let kickoff = raw.kickoff.as_deref().and_then(parse_kickoff);
        if kickoff.is_none() {
            debug!(
                home = %raw.home,
                away = %raw.away,
                date = raw.kickoff.as_deref().unwrap_or_default(),
                "unparseable match date"
            );
        }
        Self {
            home: resolver.resolve(&raw.home),
            away: resolver.resolve(&raw.away),
            kickoff,
            home_goals: coerce_goals(raw.home_goals.as_deref()),
            away_goals: coerce_goals(raw.away_goals.as_deref()),
            league: non_empty(raw.league.as_deref()),
        }
    }

    pub fn involves(&self, team: &TeamIdentity) -> bool {
        self.home == *team || self.away == *team
    }

    pub fn outcome(&self) -> Outcome {
        Outcome::from_score(self.home_goals, self.away_goals)
    }

    pub fn total_goals(&self) -> u32 {
        self.home_goals + self.away_goals
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M",
];

// Two-digit years first: "%Y" would happily read "24" as the year 24.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%y", "%d/%m/%Y"];

/// Parses the kickoff formats seen in match logs. Date-only values land on midnight.
pub fn parse_kickoff(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(naive);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Missing, non-numeric or negative goal cells read as zero. Float cells ("2.0")
/// are truncated.
pub fn coerce_goals(raw: Option<&str>) -> u32 {
    let Some(s) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return 0;
    };
    if let Ok(n) = s.parse::<u32>() {
        return n;
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => v.trunc().min(u32::MAX as f64) as u32,
        _ => {
            debug!(value = s, "non-numeric goal cell coerced to 0");
            0
        }
    }
}

pub(crate) fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("nan"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_kickoff_accepts_date_only() {
        let dt = parse_kickoff("2024-08-17").unwrap();
        assert_eq!(dt.to_string(), "2024-08-17 00:00:00");
        let dt = parse_kickoff("17/08/2024 15:00").unwrap();
        assert_eq!(dt.to_string(), "2024-08-17 15:00:00");
        assert!(parse_kickoff("2024-08-17T12:30:00Z").is_some());
        assert!(parse_kickoff("not a date").is_none());
        assert!(parse_kickoff("  ").is_none());
    }

    #[test]
    fn coerce_goals_defaults_to_zero() {
        assert_eq!(coerce_goals(Some("3")), 3);
        assert_eq!(coerce_goals(Some(" 2.0 ")), 2);
        assert_eq!(coerce_goals(Some("abc")), 0);
        assert_eq!(coerce_goals(Some("-1")), 0);
        assert_eq!(coerce_goals(None), 0);
    }

    #[test]
    fn from_raw_keeps_malformed_rows() {
        let raw = RawMatchRow {
            home: "arsenal".to_string(),
            away: "chelsea".to_string(),
            kickoff: Some("garbage".to_string()),
            home_goals: Some("x".to_string()),
            away_goals: Some("1".to_string()),
            league: Some(" ".to_string()),
        };
        let rec = MatchRecord::from_raw(&raw, &TeamResolver::new());
        assert_eq!(rec.home.as_str(), "Arsenal");
        assert!(rec.kickoff.is_none());
        assert_eq!((rec.home_goals, rec.away_goals), (0, 1));
        assert!(rec.league.is_none());
        assert_eq!(rec.outcome(), Outcome::Away);
    }
}
