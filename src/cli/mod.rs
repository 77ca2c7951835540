//! Command-line interface parsing and handling
//!
//! With no subcommand the tabbed interface starts. The remaining subcommands
//! run one capability call headlessly or manage settings.

pub mod error;
pub mod run;
pub mod settings;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::error::CliError;
use crate::cli::run::{run_chat, run_image, run_transcribe, run_verify};
use crate::cli::settings::run_config_command;
use crate::core::config::Config;
use crate::core::gate::GatePolicy;
use crate::logging::{self, LogTarget};
use crate::ui::run_ui;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_DESCRIBE"),
    ", built ",
    env!("VERGEN_BUILD_DATE"),
    " for ",
    env!("VERGEN_CARGO_TARGET_TRIPLE"),
    ")"
);

#[derive(Parser)]
#[command(name = "hfdeck")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "Chat, text-to-image and speech-to-text against a hosted inference API")]
#[command(
    long_about = "hfdeck is a terminal client for a hosted inference API. Enter an access token \
once, then use the chat, text-to-image and audio-to-text tabs, or run a single call from the \
command line.\n\n\
Authentication:\n\
  The token is kept in memory for the session only and is never written to disk.\n\
  Headless commands read it from HF_TOKEN, or prompt for it.\n\n\
Controls:\n\
  Enter             Submit the token, or run the current tab\n\
  Tab/Shift+Tab     Switch tabs\n\
  Ctrl+L            Clear the current tab\n\
  F2                Show the last characters of the token\n\
  Ctrl+C            Quit the application"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Write diagnostic logs to the specified file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Verify the token with the account endpoint before unlocking
    #[arg(long, global = true)]
    pub verify: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the tabbed interface (default)
    Ui,
    /// Send one chat message and print the reply
    Chat {
        /// Message text (multiple words are joined with spaces)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        message: Vec<String>,
    },
    /// Generate an image from a prompt and save it
    Image {
        /// Image description (multiple words are joined with spaces)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
        /// Write the image to this path instead of the output directory
        #[arg(short = 'o', long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Transcribe an audio file
    Transcribe {
        /// Audio file to upload
        file: PathBuf,
    },
    /// Check the token against the account endpoint
    Verify,
    /// Show or change settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConfigCommands {
    /// Print every setting
    Show,
    /// Print the location of the configuration file
    Path,
    /// Set a configuration value
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set (multiple words are joined with spaces)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Restore a configuration value to its default
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

impl Args {
    fn log_target(&self) -> LogTarget {
        match (&self.log, &self.command) {
            (Some(path), _) => LogTarget::File(path.clone()),
            (None, None) | (None, Some(Commands::Ui)) => LogTarget::Disabled,
            (None, Some(_)) => LogTarget::Stderr,
        }
    }

    /// `--verify` upgrades the configured policy for this run only.
    fn gate_policy(&self, config: &Config) -> GatePolicy {
        if self.verify {
            GatePolicy::VerifyThenReveal
        } else {
            config.gate.policy
        }
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    logging::init(&args.log_target())?;

    if let Err(err) = dispatch_command(args).await {
        err.print();
        std::process::exit(err.exit_code());
    }
    Ok(())
}

async fn dispatch_command(args: Args) -> Result<(), CliError> {
    let config = Config::load()?;
    let policy = args.gate_policy(&config);

    match args.command.unwrap_or(Commands::Ui) {
        Commands::Ui => Ok(run_ui(config, policy).await?),
        Commands::Chat { message } => run_chat(&config, policy, message).await,
        Commands::Image { prompt, output } => run_image(&config, policy, prompt, output).await,
        Commands::Transcribe { file } => run_transcribe(&config, policy, &file).await,
        Commands::Verify => run_verify(&config).await,
        Commands::Config { command } => run_config_command(config, command),
    }
}
