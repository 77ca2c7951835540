//! Failures of headless commands and how they are reported.

use crate::core::config::ConfigError;
use crate::core::dispatch::DispatchError;
use crate::utils::line_editor::LineEditorError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// The session gate turned the credential away.
    #[error("{0}")]
    Gate(String),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("credential prompt failed: {0}")]
    Prompt(#[from] LineEditorError),
    #[error("could not save image: {0}")]
    Save(std::io::Error),
    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),
    #[error("{hint}")]
    Usage {
        hint: &'static str,
        example: &'static str,
    },
}

impl CliError {
    pub fn print(&self) {
        match self {
            CliError::Usage { hint, example } => {
                eprintln!("⚠️  {hint}");
                eprintln!("Example: {example}");
            }
            other => eprintln!("❌ {other}"),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage { .. } => 2,
            _ => 1,
        }
    }
}
