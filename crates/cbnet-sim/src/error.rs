//! Simulation errors.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("controller failure: {0}")]
    Controller(#[from] cbnet_controller::Error),

    /// Messages were still in flight when the round limit ran out.
    #[error("simulation stalled at round {round} with {in_flight} messages undelivered")]
    Stalled { round: u64, in_flight: usize },

    #[error("timeline serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
