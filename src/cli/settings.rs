//! `hfdeck config` subcommands.

use std::path::Path;

use crate::cli::error::CliError;
use crate::cli::ConfigCommands;
use crate::core::config::data::path_display;
use crate::core::config::Config;

pub fn run_config_command(config: Config, command: ConfigCommands) -> Result<(), CliError> {
    let path = Config::config_path()?;
    for line in apply_config_command(config, command, &path)? {
        println!("{line}");
    }
    Ok(())
}

/// Applies `command` to the file at `path` and returns the lines to print.
pub fn apply_config_command(
    mut config: Config,
    command: ConfigCommands,
    path: &Path,
) -> Result<Vec<String>, CliError> {
    match command {
        ConfigCommands::Show => Ok(config.render_all()),
        ConfigCommands::Path => Ok(vec![path_display(path)]),
        ConfigCommands::Set { key, value } => {
            let value = value.join(" ");
            if value.trim().is_empty() {
                return Err(CliError::Usage {
                    hint: "To set a value, specify the key and the value:",
                    example: "hfdeck config set chat.history full-transcript",
                });
            }
            config.set_value(&key, &value)?;
            config.save_to_path(path)?;
            Ok(vec![format!("✅ Set {key} to: {}", config.get_value(&key)?)])
        }
        ConfigCommands::Unset { key } => {
            config.unset_value(&key)?;
            config.save_to_path(path)?;
            Ok(vec![format!(
                "✅ Unset {key} (now: {})",
                config.get_value(&key)?
            )])
        }
    }
}
