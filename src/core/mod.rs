pub mod config;
pub mod error;
pub mod types;

pub use config::RulesConfig;
pub use error::{CommandError, CommandOk, CommandResult, FrontlineError, Result};
