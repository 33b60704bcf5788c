//! Error types for the simulation engine

use thiserror::Error;

/// Errors that abort a game or a season run.
///
/// Degenerate weighted draws are not represented here: the sampler falls
/// back to a uniform pick among eligible candidates and never fails while
/// at least one candidate remains.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Configuration error for team {team}: {reason}")]
    Configuration { team: String, reason: String },

    #[error(
        "Team {team} has only {available} eligible players \
         (quarter {quarter}, possession {possession})"
    )]
    EligibilityExhaustion {
        team: String,
        available: usize,
        quarter: u8,
        possession: u32,
    },

    #[error("Invalid lineup for team {team}: {reason}")]
    InvalidLineup { team: String, reason: String },

    #[error("Invalid simulation config: {0}")]
    InvalidConfig(String),

    #[error("Unknown team id: {0}")]
    UnknownTeam(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    pub(crate) fn config(team: &str, reason: impl Into<String>) -> Self {
        SimError::Configuration {
            team: team.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SimError>;

#[cfg(feature = "python")]
impl From<SimError> for pyo3::PyErr {
    fn from(err: SimError) -> Self {
        match err {
            SimError::Io(e) => pyo3::exceptions::PyIOError::new_err(e.to_string()),
            other => pyo3::exceptions::PyValueError::new_err(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhaustion_message_names_team_quarter_possession() {
        let err = SimError::EligibilityExhaustion {
            team: "1986 Celtics".to_string(),
            available: 4,
            quarter: 4,
            possession: 187,
        };
        let msg = err.to_string();
        assert!(msg.contains("1986 Celtics"));
        assert!(msg.contains("quarter 4"));
        assert!(msg.contains("possession 187"));
    }
}
