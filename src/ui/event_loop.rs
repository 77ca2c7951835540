//! Event polling, dispatching, and UI rendering loop.
//!
//! Terminal input is read on a background task and forwarded over a channel.
//! The loop owns [`AppState`], turns key presses into [`AppAction`]s, hands
//! the resulting commands to the [`CommandExecutor`] and redraws after every
//! batch.

use std::time::Duration;

use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::core::config::Config;
use crate::core::dispatch::Dispatcher;
use crate::core::gate::GatePolicy;
use crate::ui::actions::{apply_actions, AppAction, AppActionDispatcher};
use crate::ui::executor::CommandExecutor;
use crate::ui::lifecycle::{restore_terminal, setup_terminal, AppTerminal};
use crate::ui::renderer::ui;
use crate::ui::state::{AppState, SessionSettings};
use crate::utils::line_editor::{key_to_edit_action, EditAction};

fn spawn_event_reader(event_tx: mpsc::UnboundedSender<Event>) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || loop {
        match event::poll(Duration::from_millis(50)) {
            Ok(true) => match event::read() {
                Ok(ev) => {
                    if event_tx.send(ev).is_err() {
                        break;
                    }
                }
                Err(err) => warn!(error = %err, "terminal read failed"),
            },
            Ok(false) => {
                if event_tx.is_closed() {
                    break;
                }
            }
            Err(err) => {
                warn!(error = %err, "terminal poll failed");
                break;
            }
        }
    })
}

/// Maps one terminal event to the action it stands for, given whether the
/// tabs are showing.
pub fn map_event(ev: &Event, state: &AppState) -> Option<AppAction> {
    let revealed = state.gate.is_revealed();
    match ev {
        Event::Key(key) if key.kind == KeyEventKind::Press => map_key(key, state, revealed),
        Event::Paste(text) => {
            let edit = EditAction::Paste(text.clone());
            Some(if revealed {
                AppAction::EditInput(edit)
            } else {
                AppAction::EditToken(edit)
            })
        }
        _ => None,
    }
}

fn map_key(key: &KeyEvent, state: &AppState, revealed: bool) -> Option<AppAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => return Some(AppAction::Quit),
        KeyCode::Tab if revealed => return Some(AppAction::NextTab),
        KeyCode::BackTab if revealed => return Some(AppAction::PreviousTab),
        KeyCode::Char('l') if ctrl && revealed => return Some(AppAction::ClearActive),
        KeyCode::Enter if revealed => return Some(AppAction::SubmitActive),
        KeyCode::Enter => return Some(AppAction::SubmitToken),
        KeyCode::Esc => return None,
        _ => {}
    }

    if revealed {
        key_to_edit_action(key, state.active_input().mask()).map(AppAction::EditInput)
    } else {
        key_to_edit_action(key, state.token.mask()).map(AppAction::EditToken)
    }
}

fn draw(terminal: &mut AppTerminal, state: &AppState) -> std::io::Result<()> {
    terminal.draw(|f| ui(f, state)).map(|_| ())
}

pub async fn run_ui(config: Config, policy: GatePolicy) -> std::io::Result<()> {
    let mut state = AppState::new(policy, SessionSettings::from_config(&config));

    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<AppAction>();
    let executor = CommandExecutor::new(
        Dispatcher::from_config(&config),
        state.settings.image_dir.clone(),
        AppActionDispatcher::new(action_tx),
    );

    let mut terminal = setup_terminal()?;
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let reader = spawn_event_reader(event_tx);
    info!(%policy, "interface started");

    let result = drive(&mut terminal, &mut state, &executor, &mut event_rx, &mut action_rx).await;

    drop(event_rx);
    let restored = restore_terminal(&mut terminal);
    let _ = reader.await;
    info!("interface closed");
    result.and(restored)
}

async fn drive(
    terminal: &mut AppTerminal,
    state: &mut AppState,
    executor: &CommandExecutor,
    event_rx: &mut mpsc::UnboundedReceiver<Event>,
    action_rx: &mut mpsc::UnboundedReceiver<AppAction>,
) -> std::io::Result<()> {
    draw(terminal, state)?;

    while !state.should_quit {
        let mut pending = Vec::new();
        tokio::select! {
            Some(ev) = event_rx.recv() => {
                pending.extend(map_event(&ev, state));
                while let Ok(ev) = event_rx.try_recv() {
                    pending.extend(map_event(&ev, state));
                }
            }
            Some(action) = action_rx.recv() => {
                pending.push(action);
                while let Ok(action) = action_rx.try_recv() {
                    pending.push(action);
                }
            }
            else => break,
        }

        for command in apply_actions(state, pending) {
            executor.spawn(command);
        }
        draw(terminal, state)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::GenerationParameters;
    use crate::core::chat::HistoryMode;
    use crate::ui::actions::apply_action;
    use crate::ui::state::Tab;
    use std::path::PathBuf;

    fn state() -> AppState {
        AppState::new(
            GatePolicy::SkipVerification,
            SessionSettings {
                history_mode: HistoryMode::LatestOnly,
                parameters: GenerationParameters {
                    max_new_tokens: 100,
                    temperature: 0.7,
                },
                image_dir: PathBuf::from("."),
            },
        )
    }

    fn press(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent::new(code, modifiers))
    }

    #[test]
    fn keys_feed_the_token_field_while_locked() {
        let state = state();
        assert!(matches!(
            map_event(&press(KeyCode::Char('h'), KeyModifiers::NONE), &state),
            Some(AppAction::EditToken(EditAction::Insert('h')))
        ));
        assert!(matches!(
            map_event(&press(KeyCode::F(2), KeyModifiers::NONE), &state),
            Some(AppAction::EditToken(EditAction::ToggleReveal))
        ));
        assert!(matches!(
            map_event(&press(KeyCode::Enter, KeyModifiers::NONE), &state),
            Some(AppAction::SubmitToken)
        ));
        assert!(map_event(&press(KeyCode::Tab, KeyModifiers::NONE), &state).is_none());
    }

    #[test]
    fn tab_keys_apply_once_revealed() {
        let mut state = state();
        apply_action(&mut state, AppAction::EditToken(EditAction::Insert('x')));
        apply_action(&mut state, AppAction::SubmitToken);

        assert!(matches!(
            map_event(&press(KeyCode::Tab, KeyModifiers::NONE), &state),
            Some(AppAction::NextTab)
        ));
        assert!(matches!(
            map_event(&press(KeyCode::BackTab, KeyModifiers::SHIFT), &state),
            Some(AppAction::PreviousTab)
        ));
        assert!(matches!(
            map_event(&press(KeyCode::Char('l'), KeyModifiers::CONTROL), &state),
            Some(AppAction::ClearActive)
        ));
        assert!(matches!(
            map_event(&press(KeyCode::Enter, KeyModifiers::NONE), &state),
            Some(AppAction::SubmitActive)
        ));
        assert!(matches!(
            map_event(&Event::Paste("a fox".into()), &state),
            Some(AppAction::EditInput(EditAction::Paste(_)))
        ));
        assert_eq!(state.active, Tab::Chat);
    }

    #[test]
    fn ctrl_c_quits_in_every_state() {
        let state = state();
        assert!(matches!(
            map_event(&press(KeyCode::Char('c'), KeyModifiers::CONTROL), &state),
            Some(AppAction::Quit)
        ));
    }
}
