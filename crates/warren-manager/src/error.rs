//! The manager's error surface.

use crate::config::ConfigError;
use std::error::Error;
use std::fmt;
use warren_assets::AssetError;
use warren_exec::ExecError;

/// Errors surfaced by [`Manager`](crate::Manager) construction and
/// operations.
#[derive(Debug)]
pub enum ManagerError {
    /// The configuration failed validation.
    Config(ConfigError),
    /// The collision-asset table could not be built.
    Asset(AssetError),
    /// A backend operation was rejected.
    Exec(ExecError),
}

impl fmt::Display for ManagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid configuration: {e}"),
            Self::Asset(e) => write!(f, "collision assets failed to load: {e}"),
            Self::Exec(e) => write!(f, "backend operation rejected: {e}"),
        }
    }
}

impl Error for ManagerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Asset(e) => Some(e),
            Self::Exec(e) => Some(e),
        }
    }
}

impl From<ConfigError> for ManagerError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<AssetError> for ManagerError {
    fn from(e: AssetError) -> Self {
        Self::Asset(e)
    }
}

impl From<ExecError> for ManagerError {
    fn from(e: ExecError) -> Self {
        Self::Exec(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_errors_keep_their_source() {
        let err = ManagerError::from(ConfigError::NoWorlds);
        assert!(err.source().is_some());
        assert!(err.to_string().contains("invalid configuration"));

        let err = ManagerError::from(ExecError::RolloutUnsupported);
        assert!(err.to_string().contains("rejected"));
    }
}
