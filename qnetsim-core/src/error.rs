//! Error types for the simulation engine

use thiserror::Error;

/// Top-level error type for simulation operations.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors detected by the sanity pass at `run()` start.
///
/// These are wiring and parameter mistakes: a station that needs a successor
/// but has none, a routing table with no positive rate, a missing sampler.
/// Domain outcomes that merely look like failures (blocked or cancelled
/// clients) are routed paths, never errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("station `{station}` has no `{slot}` successor wired")]
    MissingSuccessor {
        station: &'static str,
        slot: &'static str,
    },

    #[error("station `{station}` is missing required sampler `{sampler}`")]
    MissingSampler {
        station: &'static str,
        sampler: &'static str,
    },

    #[error("routing table of `{station}` has no exit with a positive rate")]
    NoPositiveRate { station: &'static str },

    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let e = ConfigError::MissingSuccessor {
            station: "Process",
            slot: "next",
        };
        assert_eq!(e.to_string(), "station `Process` has no `next` successor wired");

        let e: SimError = ConfigError::NoPositiveRate { station: "Decide" }.into();
        assert!(e.to_string().contains("Decide"));
    }
}
