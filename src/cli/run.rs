//! TUI-less capability commands
//!
//! Each command opens a session the same way the interface does: the token
//! goes through the session gate before any capability call is made.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cli::error::CliError;
use crate::core::audio::AudioClip;
use crate::core::chat::ChatHistory;
use crate::core::config::Config;
use crate::core::credential::Credential;
use crate::core::dispatch::{ChatPayload, Dispatcher};
use crate::core::gate::{GatePolicy, GateResult, SessionGate, TOKEN_VALIDATED};
use crate::core::image::{save_image, ImageDestination};
use crate::utils::line_editor::{prompt_line, LineEditor, MaskMode};

pub const TOKEN_ENV_VAR: &str = "HF_TOKEN";
const TOKEN_PROMPT: &str = "Access token (F2 shows last 4): ";

/// An unlocked session for one headless command.
pub struct HeadlessSession {
    pub dispatcher: Dispatcher,
    pub credential: Credential,
}

/// An unset or empty variable means "ask"; anything else is used verbatim.
fn credential_from_env_value(value: Option<String>) -> Option<Credential> {
    value
        .map(Credential::new)
        .filter(|credential| !credential.is_empty())
}

fn token_from_env() -> Option<Credential> {
    credential_from_env_value(std::env::var(TOKEN_ENV_VAR).ok())
}

fn read_token() -> Result<Credential, CliError> {
    if let Some(credential) = token_from_env() {
        debug!("using token from {TOKEN_ENV_VAR}");
        return Ok(credential);
    }
    let editor = LineEditor::new(MaskMode::RevealTail { tail_chars: 4 });
    let raw = prompt_line(TOKEN_PROMPT, editor)?;
    Ok(Credential::new(raw))
}

/// Runs `credential` through the gate under `policy`.
pub async fn unlock(
    dispatcher: Dispatcher,
    credential: Credential,
    policy: GatePolicy,
) -> Result<HeadlessSession, CliError> {
    let mut gate = SessionGate::new(policy);
    match gate.submit(credential, &dispatcher).await {
        GateResult::Revealed => {
            let credential = gate.credential().cloned().unwrap_or_default();
            Ok(HeadlessSession {
                dispatcher,
                credential,
            })
        }
        GateResult::Rejected(reason) => Err(CliError::Gate(reason)),
    }
}

async fn open_session(config: &Config, policy: GatePolicy) -> Result<HeadlessSession, CliError> {
    let credential = read_token()?;
    unlock(Dispatcher::from_config(config), credential, policy).await
}

fn joined(words: Vec<String>) -> String {
    words.join(" ").trim().to_string()
}

pub async fn run_chat(
    config: &Config,
    policy: GatePolicy,
    message: Vec<String>,
) -> Result<(), CliError> {
    let message = joined(message);
    if message.is_empty() {
        return Err(CliError::Usage {
            hint: "Provide a message to send.",
            example: "hfdeck chat What is the capital of France?",
        });
    }

    let session = open_session(config, policy).await?;
    let payload = ChatPayload {
        inputs: ChatHistory::new().build_inputs(config.chat.history, &message),
        parameters: config.generation_parameters(),
    };
    let reply = session.dispatcher.chat(&payload, &session.credential).await?;
    println!("{reply}");
    Ok(())
}

pub async fn run_image(
    config: &Config,
    policy: GatePolicy,
    prompt: Vec<String>,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let prompt = joined(prompt);
    if prompt.is_empty() {
        return Err(CliError::Usage {
            hint: "Provide a prompt describing the image.",
            example: "hfdeck image a lighthouse at dusk -o lighthouse.png",
        });
    }

    let session = open_session(config, policy).await?;
    let bytes = session
        .dispatcher
        .text_to_image(&prompt, &session.credential)
        .await?;

    let destination = match output {
        Some(path) => ImageDestination::File(path),
        None => ImageDestination::Directory(config.image_output_dir()),
    };
    let path = save_image(&bytes, &destination).map_err(CliError::Save)?;
    println!("{}", path.display());
    Ok(())
}

pub async fn run_transcribe(
    config: &Config,
    policy: GatePolicy,
    file: &Path,
) -> Result<(), CliError> {
    // Read the file first so a bad path never costs a token prompt.
    let audio = AudioClip::from_path(file).await?;
    let session = open_session(config, policy).await?;
    let text = session
        .dispatcher
        .transcribe(Some(&audio), &session.credential)
        .await?;
    println!("{text}");
    Ok(())
}

/// Always verifies, whatever the configured policy says.
pub async fn run_verify(config: &Config) -> Result<(), CliError> {
    let credential = read_token()?;
    let dispatcher = Dispatcher::from_config(config);
    let account = dispatcher.verify_credential(&credential).await?;
    match account.name {
        Some(name) => println!("✅ {TOKEN_VALIDATED} ({name})"),
        None => println!("✅ {TOKEN_VALIDATED}"),
    }
    Ok(())
}
