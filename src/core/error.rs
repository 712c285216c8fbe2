use thiserror::Error;

use crate::core::types::{CorpsId, FrontId, PolityId};

#[derive(Error, Debug)]
pub enum FrontlineError {
    #[error("Corps not found: {0:?}")]
    CorpsNotFound(CorpsId),

    #[error("Front not found: {0:?}")]
    FrontNotFound(FrontId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid war declaration: {0}")]
    InvalidWar(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] crate::units::CatalogLoadError),

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FrontlineError>;

/// Recoverable rejection of a corps or front command
///
/// These never unwind simulation state; callers surface them through
/// [`CommandResult`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("target {0} is outside the front")]
    OutOfBounds(String),

    #[error("target {0} cannot be entered")]
    Impassable(String),

    #[error("not enough {unit} available: requested {requested}, have {available}")]
    InsufficientUnits {
        unit: String,
        requested: u32,
        available: u32,
    },

    #[error("corps limit reached ({0})")]
    CorpsCap(usize),

    #[error("cannot target a friendly {0}")]
    FriendlyTarget(&'static str),

    #[error("corps is busy ({0})")]
    Busy(&'static str),

    #[error("corps is routing")]
    Routing,

    #[error("unknown corps {0:?}")]
    UnknownCorps(CorpsId),

    #[error("unknown target")]
    UnknownTarget,

    #[error("no units in composition")]
    EmptyComposition,

    #[error("would leave the corps empty; disband it instead")]
    WouldEmpty,

    #[error("front is not active")]
    FrontClosed,

    #[error("{0:?} is not a belligerent on this front")]
    NotBelligerent(PolityId),

    #[error("corps already assigned to a front")]
    AlreadyAssigned,

    #[error("{0} is not under your control")]
    NotControlled(&'static str),
}

/// Successful command payload
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOk {
    pub message: String,
    pub estimated_days: Option<u32>,
}

impl CommandOk {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            estimated_days: None,
        }
    }

    pub fn with_eta(mut self, days: u32) -> Self {
        self.estimated_days = Some(days);
        self
    }
}

/// Feedback record for a corps command, shaped for UI consumption
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CommandResult {
    pub success: bool,
    pub message: Option<String>,
    pub error: Option<String>,
    pub estimated_days: Option<u32>,
}

impl From<std::result::Result<CommandOk, CommandError>> for CommandResult {
    fn from(result: std::result::Result<CommandOk, CommandError>) -> Self {
        match result {
            Ok(ok) => Self {
                success: true,
                message: Some(ok.message),
                error: None,
                estimated_days: ok.estimated_days,
            },
            Err(e) => Self {
                success: false,
                message: None,
                error: Some(e.to_string()),
                estimated_days: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_result_from_error() {
        let result: CommandResult = Err(CommandError::CorpsCap(8)).into();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("corps limit reached (8)"));
        assert!(result.estimated_days.is_none());
    }

    #[test]
    fn test_command_result_carries_eta() {
        let result: CommandResult = Ok(CommandOk::new("marching").with_eta(3)).into();
        assert!(result.success);
        assert_eq!(result.estimated_days, Some(3));
    }
}
