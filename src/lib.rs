pub mod calibration;
pub mod config;
pub mod elo;
pub mod engine;
pub mod error;
pub mod expected_goals;
pub mod fixture_rank;
pub mod form;
pub mod logging;
pub mod match_data;
pub mod match_repository;
pub mod match_source;
pub mod outcome;
pub mod priors;
pub mod sqlite_source;
pub mod team_identity;

pub use config::{DataPaths, EngineConfig};
pub use engine::PredictionEngine;
pub use error::PredictError;
pub use outcome::Prediction;
pub use team_identity::{TeamIdentity, TeamResolver};
