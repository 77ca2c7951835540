//! Conversation history shown in the chat tab.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the chat capability sends upstream.
///
/// The remote endpoint is stateless. `LatestOnly` sends just the newest
/// message, so earlier turns are display-only. `FullTranscript` folds the
/// answered turns into the prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HistoryMode {
    #[default]
    LatestOnly,
    FullTranscript,
}

impl HistoryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryMode::LatestOnly => "latest-only",
            HistoryMode::FullTranscript => "full-transcript",
        }
    }
}

impl fmt::Display for HistoryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latest-only" | "latest" => Ok(HistoryMode::LatestOnly),
            "full-transcript" | "full" => Ok(HistoryMode::FullTranscript),
            other => Err(format!(
                "unknown history mode '{other}' (expected latest-only or full-transcript)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnState {
    Pending,
    Answered(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub request_id: u64,
    pub user: String,
    pub state: TurnState,
}

impl ChatTurn {
    pub fn reply(&self) -> Option<&str> {
        match &self.state {
            TurnState::Answered(text) | TurnState::Failed(text) => Some(text),
            TurnState::Pending => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChatHistory {
    turns: Vec<ChatTurn>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.turns
            .iter()
            .filter(|turn| turn.state == TurnState::Pending)
            .count()
    }

    pub fn push_pending(&mut self, request_id: u64, user: String) {
        self.turns.push(ChatTurn {
            request_id,
            user,
            state: TurnState::Pending,
        });
    }

    /// Settles the turn opened for `request_id`. Returns false when the turn
    /// no longer exists, e.g. after a clear.
    pub fn resolve(&mut self, request_id: u64, outcome: Result<String, String>) -> bool {
        match self
            .turns
            .iter_mut()
            .find(|turn| turn.request_id == request_id)
        {
            Some(turn) => {
                turn.state = match outcome {
                    Ok(reply) => TurnState::Answered(reply),
                    Err(message) => TurnState::Failed(message),
                };
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Builds the `inputs` string for a new message.
    pub fn build_inputs(&self, mode: HistoryMode, message: &str) -> String {
        match mode {
            HistoryMode::LatestOnly => message.to_string(),
            HistoryMode::FullTranscript => {
                let mut transcript = String::new();
                for turn in &self.turns {
                    if let TurnState::Answered(reply) = &turn.state {
                        transcript.push_str("User: ");
                        transcript.push_str(&turn.user);
                        transcript.push_str("\nAssistant: ");
                        transcript.push_str(reply);
                        transcript.push('\n');
                    }
                }
                transcript.push_str("User: ");
                transcript.push_str(message);
                transcript.push_str("\nAssistant:");
                transcript
            }
        }
    }
}
