//! Domain error types.

use crate::domain::universe::UniverseError;

/// Top-level error type for rotrader. Everything here is a startup-time
/// failure: once the loop is running, external failures degrade instead of
/// propagating.
#[derive(Debug, thiserror::Error)]
pub enum RotraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Universe(#[from] UniverseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&RotraderError> for std::process::ExitCode {
    fn from(err: &RotraderError) -> Self {
        let code: u8 = match err {
            RotraderError::Io(_) => 1,
            RotraderError::ConfigParse { .. }
            | RotraderError::ConfigMissing { .. }
            | RotraderError::ConfigInvalid { .. } => 2,
            RotraderError::Universe(_) => 3,
        };
        std::process::ExitCode::from(code)
    }
}
