//! Tracing subscriber setup.
//!
//! `HFDECK_LOG` takes an `EnvFilter` directive and overrides the per-target
//! default. Nothing installed here ever sees the credential; callers only log
//! its presence.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "HFDECK_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Append to a file, no ANSI colours. Safe alongside the full-screen UI.
    File(PathBuf),
    /// Warnings and errors on stderr, for headless commands.
    Stderr,
    /// No subscriber at all.
    Disabled,
}

impl LogTarget {
    fn default_directive(&self) -> &'static str {
        match self {
            LogTarget::File(_) => "hfdeck=info",
            LogTarget::Stderr | LogTarget::Disabled => "hfdeck=warn",
        }
    }
}

fn env_filter(target: &LogTarget) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(target.default_directive()))
}

pub fn init(target: &LogTarget) -> Result<(), Box<dyn std::error::Error>> {
    let installed = match target {
        LogTarget::Disabled => return Ok(()),
        LogTarget::Stderr => tracing_subscriber::fmt()
            .with_env_filter(env_filter(target))
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init(),
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| format!("cannot open log file {}: {err}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter(target))
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true)
                .try_init()
        }
    };
    installed.map_err(|err| -> Box<dyn std::error::Error> { err })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_logging_defaults_to_info() {
        let target = LogTarget::File(PathBuf::from("hfdeck.log"));
        assert_eq!(target.default_directive(), "hfdeck=info");
        assert_eq!(LogTarget::Stderr.default_directive(), "hfdeck=warn");
    }

    #[test]
    fn disabled_target_installs_nothing() {
        assert!(init(&LogTarget::Disabled).is_ok());
    }

    #[test]
    fn unopenable_log_file_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = LogTarget::File(dir.path().join("missing").join("hfdeck.log"));
        let err = init(&target).unwrap_err();
        assert!(err.to_string().starts_with("cannot open log file"), "{err}");
    }
}
