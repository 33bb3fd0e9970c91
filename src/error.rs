use std::fmt;

use thiserror::Error;

use crate::team_identity::TeamIdentity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Home => f.write_str("home"),
            Side::Away => f.write_str("away"),
        }
    }
}

/// Caller-facing failures of a single prediction request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredictError {
    #[error("{side} team name is empty")]
    MissingTeam { side: Side },

    #[error("{team} cannot play itself")]
    SameTeam { team: TeamIdentity },
}
