//! Interface state owned by the event loop.
//!
//! Every tab keeps its own widgets and an epoch. Clearing a tab bumps the
//! epoch; results tagged with an older epoch are dropped when they arrive.

use std::path::PathBuf;

use crate::api::GenerationParameters;
use crate::core::chat::{ChatHistory, HistoryMode};
use crate::core::config::Config;
use crate::core::dispatch::{Capability, DispatchError};
use crate::core::gate::{GatePolicy, SessionGate};
use crate::core::image::ImageFormat;
use crate::utils::line_editor::{LineEditor, MaskMode};

pub const TOKEN_TAIL_CHARS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    Chat,
    Image,
    Transcription,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Chat, Tab::Image, Tab::Transcription];

    pub fn capability(self) -> Capability {
        match self {
            Tab::Chat => Capability::Chat,
            Tab::Image => Capability::TextToImage,
            Tab::Transcription => Capability::Transcription,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Tab::Chat => 0,
            Tab::Image => 1,
            Tab::Transcription => 2,
        }
    }

    pub fn next(self) -> Tab {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    pub fn previous(self) -> Tab {
        Tab::ALL[(self.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }

    pub fn input_title(self) -> &'static str {
        match self {
            Tab::Chat => "Message",
            Tab::Image => "Prompt",
            Tab::Transcription => "Audio file path",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedImage {
    pub path: PathBuf,
    pub bytes: usize,
    pub format: ImageFormat,
}

/// What a single-shot tab is showing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Outcome<T> {
    #[default]
    Empty,
    Pending,
    Ready(T),
    Failed(String),
}

impl<T> Outcome<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Outcome::Pending)
    }

    pub fn settle(result: Result<T, DispatchError>) -> Self {
        match result {
            Ok(value) => Outcome::Ready(value),
            Err(err) => Outcome::Failed(err.to_string()),
        }
    }
}

#[derive(Debug, Default)]
pub struct ChatTab {
    pub input: LineEditor,
    pub history: ChatHistory,
    pub epoch: u64,
}

#[derive(Debug, Default)]
pub struct ImageTab {
    pub prompt: LineEditor,
    pub output: Outcome<SavedImage>,
    pub epoch: u64,
}

#[derive(Debug, Default)]
pub struct TranscriptionTab {
    pub path: LineEditor,
    pub output: Outcome<String>,
    pub epoch: u64,
}

/// Settings the interface reads when building requests.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub history_mode: HistoryMode,
    pub parameters: GenerationParameters,
    pub image_dir: PathBuf,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            history_mode: config.chat.history,
            parameters: config.generation_parameters(),
            image_dir: config.image_output_dir(),
        }
    }
}

#[derive(Debug)]
pub struct AppState {
    pub gate: SessionGate,
    pub token: LineEditor,
    pub active: Tab,
    pub chat: ChatTab,
    pub image: ImageTab,
    pub transcription: TranscriptionTab,
    pub settings: SessionSettings,
    pub status: Option<String>,
    pub should_quit: bool,
    next_request_id: u64,
}

impl AppState {
    pub fn new(policy: GatePolicy, settings: SessionSettings) -> Self {
        Self {
            gate: SessionGate::new(policy),
            token: LineEditor::new(MaskMode::RevealTail {
                tail_chars: TOKEN_TAIL_CHARS,
            }),
            active: Tab::Chat,
            chat: ChatTab::default(),
            image: ImageTab::default(),
            transcription: TranscriptionTab::default(),
            settings,
            status: None,
            should_quit: false,
            next_request_id: 0,
        }
    }

    pub fn next_request_id(&mut self) -> u64 {
        self.next_request_id += 1;
        self.next_request_id
    }

    pub fn epoch(&self, tab: Tab) -> u64 {
        match tab {
            Tab::Chat => self.chat.epoch,
            Tab::Image => self.image.epoch,
            Tab::Transcription => self.transcription.epoch,
        }
    }

    /// The edit buffer that receives keys on the active tab.
    pub fn active_input(&self) -> &LineEditor {
        match self.active {
            Tab::Chat => &self.chat.input,
            Tab::Image => &self.image.prompt,
            Tab::Transcription => &self.transcription.path,
        }
    }

    pub fn active_input_mut(&mut self) -> &mut LineEditor {
        match self.active {
            Tab::Chat => &mut self.chat.input,
            Tab::Image => &mut self.image.prompt,
            Tab::Transcription => &mut self.transcription.path,
        }
    }

    /// Resets one tab's widgets. Other tabs and the session are untouched.
    pub fn clear_tab(&mut self, tab: Tab) {
        match tab {
            Tab::Chat => {
                let epoch = self.chat.epoch + 1;
                self.chat = ChatTab {
                    epoch,
                    ..ChatTab::default()
                };
            }
            Tab::Image => {
                let epoch = self.image.epoch + 1;
                self.image = ImageTab {
                    epoch,
                    ..ImageTab::default()
                };
            }
            Tab::Transcription => {
                let epoch = self.transcription.epoch + 1;
                self.transcription = TranscriptionTab {
                    epoch,
                    ..TranscriptionTab::default()
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabs_cycle_in_both_directions() {
        assert_eq!(Tab::Chat.next(), Tab::Image);
        assert_eq!(Tab::Transcription.next(), Tab::Chat);
        assert_eq!(Tab::Chat.previous(), Tab::Transcription);
        assert_eq!(Tab::Image.previous(), Tab::Chat);
    }

    #[test]
    fn tab_order_matches_capabilities() {
        let capabilities: Vec<_> = Tab::ALL.iter().map(|tab| tab.capability()).collect();
        assert_eq!(capabilities, Capability::ALL.to_vec());
    }

    #[test]
    fn outcome_keeps_dispatch_error_text() {
        let failed: Outcome<String> = Outcome::settle(Err(DispatchError::NoInputProvided));
        assert_eq!(failed, Outcome::Failed("No audio file provided".to_string()));
    }
}
