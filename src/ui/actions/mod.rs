//! Actions applied to [`AppState`] and the commands they emit.
//!
//! `apply_action` is pure with respect to the outside world: it mutates the
//! state and returns at most one [`AppCommand`] for the event loop to run.

use tokio::sync::mpsc;
use tracing::debug;

use crate::core::credential::Credential;
use crate::core::dispatch::{ChatPayload, DispatchError};
use crate::core::gate::{GateResult, GateStep};
use crate::ui::state::{AppState, Outcome, SavedImage, Tab};
use crate::utils::line_editor::{EditAction, EditOutcome};

#[derive(Debug)]
pub enum AppAction {
    EditToken(EditAction),
    SubmitToken,
    VerificationFinished {
        outcome: Result<(), DispatchError>,
    },
    SelectTab(Tab),
    NextTab,
    PreviousTab,
    EditInput(EditAction),
    SubmitActive,
    ClearActive,
    ChatReplied {
        epoch: u64,
        request_id: u64,
        result: Result<String, DispatchError>,
    },
    ImageFinished {
        epoch: u64,
        result: Result<SavedImage, DispatchError>,
    },
    TranscriptionFinished {
        epoch: u64,
        result: Result<String, DispatchError>,
    },
    Quit,
}

/// Work that leaves the state machine. Each command carries its own copy of
/// the credential.
#[derive(Debug, PartialEq)]
pub enum AppCommand {
    VerifyCredential(Credential),
    SendChat {
        epoch: u64,
        request_id: u64,
        payload: ChatPayload,
        credential: Credential,
    },
    GenerateImage {
        epoch: u64,
        prompt: String,
        credential: Credential,
    },
    Transcribe {
        epoch: u64,
        audio_path: String,
        credential: Credential,
    },
}

#[derive(Clone)]
pub struct AppActionDispatcher {
    tx: mpsc::UnboundedSender<AppAction>,
}

impl AppActionDispatcher {
    pub fn new(tx: mpsc::UnboundedSender<AppAction>) -> Self {
        Self { tx }
    }

    /// Sends are dropped once the loop has exited.
    pub fn dispatch(&self, action: AppAction) {
        let _ = self.tx.send(action);
    }
}

pub fn apply_actions(
    state: &mut AppState,
    actions: impl IntoIterator<Item = AppAction>,
) -> Vec<AppCommand> {
    actions
        .into_iter()
        .filter_map(|action| apply_action(state, action))
        .collect()
}

pub fn apply_action(state: &mut AppState, action: AppAction) -> Option<AppCommand> {
    match action {
        AppAction::Quit => {
            state.should_quit = true;
            None
        }
        AppAction::EditToken(edit) => handle_token_edit(state, edit),
        AppAction::SubmitToken => submit_token(state),
        AppAction::VerificationFinished { outcome } => {
            let result = state.gate.finish_verification(outcome);
            after_gate_decision(state, result);
            None
        }
        // Nothing past the gate reacts until it has opened.
        _ if !state.gate.is_revealed() => None,
        AppAction::SelectTab(tab) => {
            state.active = tab;
            None
        }
        AppAction::NextTab => {
            state.active = state.active.next();
            None
        }
        AppAction::PreviousTab => {
            state.active = state.active.previous();
            None
        }
        AppAction::EditInput(edit) => match state.active_input_mut().apply(edit) {
            EditOutcome::Submit(_) => submit_active(state),
            EditOutcome::Changed | EditOutcome::Unchanged | EditOutcome::Cancelled => None,
        },
        AppAction::SubmitActive => submit_active(state),
        AppAction::ClearActive => {
            let tab = state.active;
            state.clear_tab(tab);
            debug!(capability = %tab.capability(), "tab cleared");
            None
        }
        AppAction::ChatReplied {
            epoch,
            request_id,
            result,
        } => {
            if epoch != state.chat.epoch {
                debug!(request_id, "dropping chat reply for a cleared tab");
                return None;
            }
            let outcome = result.map_err(|err| err.to_string());
            state.chat.history.resolve(request_id, outcome);
            None
        }
        AppAction::ImageFinished { epoch, result } => {
            if epoch == state.image.epoch {
                state.image.output = Outcome::settle(result);
            }
            None
        }
        AppAction::TranscriptionFinished { epoch, result } => {
            if epoch == state.transcription.epoch {
                state.transcription.output = Outcome::settle(result);
            }
            None
        }
    }
}

fn handle_token_edit(state: &mut AppState, edit: EditAction) -> Option<AppCommand> {
    if state.gate.is_revealed() {
        return None;
    }
    match state.token.apply(edit) {
        EditOutcome::Submit(_) => submit_token(state),
        EditOutcome::Changed | EditOutcome::Unchanged | EditOutcome::Cancelled => None,
    }
}

fn submit_token(state: &mut AppState) -> Option<AppCommand> {
    let credential = Credential::new(state.token.text());
    match state.gate.begin(credential) {
        GateStep::Decided(result) => {
            after_gate_decision(state, result);
            None
        }
        GateStep::AwaitVerification(credential) => {
            state.status = state.gate.view().status.clone();
            Some(AppCommand::VerifyCredential(credential))
        }
    }
}

fn after_gate_decision(state: &mut AppState, result: GateResult) {
    state.status = state.gate.view().status.clone();
    if result == GateResult::Revealed {
        // The credential now lives in the gate only.
        state.token.clear();
    }
}

fn submit_active(state: &mut AppState) -> Option<AppCommand> {
    let credential = state.gate.credential()?.clone();
    state.status = None;

    match state.active {
        Tab::Chat => {
            let message = state.chat.input.text().trim().to_string();
            if message.is_empty() {
                return None;
            }
            state.chat.input.clear();
            let inputs = state
                .chat
                .history
                .build_inputs(state.settings.history_mode, &message);
            let request_id = state.next_request_id();
            state.chat.history.push_pending(request_id, message);
            Some(AppCommand::SendChat {
                epoch: state.chat.epoch,
                request_id,
                payload: ChatPayload {
                    inputs,
                    parameters: state.settings.parameters.clone(),
                },
                credential,
            })
        }
        Tab::Image => {
            let prompt = state.image.prompt.text().trim().to_string();
            if prompt.is_empty() || state.image.output.is_pending() {
                return None;
            }
            state.image.output = Outcome::Pending;
            Some(AppCommand::GenerateImage {
                epoch: state.image.epoch,
                prompt,
                credential,
            })
        }
        Tab::Transcription => {
            if state.transcription.output.is_pending() {
                return None;
            }
            state.transcription.output = Outcome::Pending;
            // An empty path is still sent on; the dispatcher reports the
            // missing audio without calling out.
            Some(AppCommand::Transcribe {
                epoch: state.transcription.epoch,
                audio_path: state.transcription.path.text().to_string(),
                credential,
            })
        }
    }
}
