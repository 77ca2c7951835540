//! Single-line text editing shared by the interface fields and the headless
//! credential prompt.

use crate::utils::input::sanitize_text_input;
use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::io::{self, Write};
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

/// How the buffer is drawn. The stored text is never altered by masking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskMode {
    #[default]
    Plain,
    /// Every character drawn as `*`; the last `tail_chars` can be toggled
    /// visible.
    RevealTail { tail_chars: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditAction {
    Insert(char),
    Paste(String),
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
    KillToEnd,
    KillWord,
    KillLine,
    ToggleReveal,
    Submit,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Changed,
    Unchanged,
    Submit(String),
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum LineEditorError {
    #[error("terminal error: {0}")]
    Io(#[from] io::Error),
    #[error("Cancelled by user")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineEditor {
    text: String,
    /// Cursor position in chars, not bytes.
    cursor: usize,
    mask: MaskMode,
    reveal_tail: bool,
}

impl LineEditor {
    pub fn new(mask: MaskMode) -> Self {
        Self {
            mask,
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn mask(&self) -> MaskMode {
        self.mask
    }

    pub fn is_revealing(&self) -> bool {
        self.reveal_tail
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.cursor = self.text.chars().count();
        self.reveal_tail = false;
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
        self.reveal_tail = false;
    }

    /// Empties the buffer and hands back what it held.
    pub fn take(&mut self) -> String {
        let text = std::mem::take(&mut self.text);
        self.cursor = 0;
        self.reveal_tail = false;
        text
    }

    pub fn apply(&mut self, action: EditAction) -> EditOutcome {
        let changed = match action {
            EditAction::Insert(c) => {
                let at = self.byte_index(self.cursor);
                self.text.insert(at, c);
                self.cursor += 1;
                self.edited()
            }
            // Masked fields hold secrets; they take the clipboard as-is.
            EditAction::Paste(raw) if matches!(self.mask, MaskMode::RevealTail { .. }) => {
                if raw.is_empty() {
                    false
                } else {
                    let at = self.byte_index(self.cursor);
                    self.text.insert_str(at, &raw);
                    self.cursor += raw.chars().count();
                    self.edited()
                }
            }
            EditAction::Paste(raw) => {
                let sanitized = sanitize_text_input(&raw);
                let (line, submits) = match sanitized.split_once('\n') {
                    Some((line, _)) => (line, true),
                    None => (sanitized.as_str(), false),
                };
                if !line.is_empty() {
                    let at = self.byte_index(self.cursor);
                    self.text.insert_str(at, line);
                    self.cursor += line.chars().count();
                    self.reveal_tail = false;
                }
                if submits {
                    return EditOutcome::Submit(self.text.clone());
                }
                !line.is_empty()
            }
            EditAction::Backspace => {
                if self.cursor == 0 {
                    false
                } else {
                    let start = self.byte_index(self.cursor - 1);
                    let end = self.byte_index(self.cursor);
                    self.text.replace_range(start..end, "");
                    self.cursor -= 1;
                    self.edited()
                }
            }
            EditAction::Delete => {
                let start = self.byte_index(self.cursor);
                if start >= self.text.len() {
                    false
                } else {
                    let end = self.byte_index(self.cursor + 1);
                    self.text.replace_range(start..end, "");
                    self.edited()
                }
            }
            EditAction::Left => self.move_to(self.cursor.saturating_sub(1)),
            EditAction::Right => self.move_to((self.cursor + 1).min(self.len())),
            EditAction::Home => self.move_to(0),
            EditAction::End => self.move_to(self.len()),
            EditAction::KillToEnd => {
                let at = self.byte_index(self.cursor);
                if at >= self.text.len() {
                    false
                } else {
                    self.text.truncate(at);
                    self.edited()
                }
            }
            EditAction::KillWord => {
                if self.cursor == 0 {
                    false
                } else {
                    let chars: Vec<char> = self.text.chars().collect();
                    let mut start = self.cursor;
                    while start > 0 && chars[start - 1] == ' ' {
                        start -= 1;
                    }
                    while start > 0 && chars[start - 1] != ' ' {
                        start -= 1;
                    }
                    let (from, to) = (self.byte_index(start), self.byte_index(self.cursor));
                    self.text.replace_range(from..to, "");
                    self.cursor = start;
                    self.edited()
                }
            }
            EditAction::KillLine => {
                if self.text.is_empty() {
                    false
                } else {
                    self.clear();
                    true
                }
            }
            EditAction::ToggleReveal => match self.mask {
                MaskMode::RevealTail { .. } => {
                    self.reveal_tail = !self.reveal_tail;
                    true
                }
                MaskMode::Plain => false,
            },
            EditAction::Submit => return EditOutcome::Submit(self.text.clone()),
            EditAction::Cancel => return EditOutcome::Cancelled,
        };

        if changed {
            EditOutcome::Changed
        } else {
            EditOutcome::Unchanged
        }
    }

    /// What the user should see: the text itself, or its mask.
    pub fn display(&self) -> String {
        match self.mask {
            MaskMode::Plain => self.text.clone(),
            MaskMode::RevealTail { tail_chars } => {
                let len = self.len();
                if self.reveal_tail && len >= tail_chars {
                    let hidden = len - tail_chars;
                    let tail: String = self.text.chars().skip(hidden).collect();
                    format!("{}{tail}", "*".repeat(hidden))
                } else {
                    "*".repeat(len)
                }
            }
        }
    }

    /// Terminal columns between the start of the field and the cursor.
    pub fn cursor_column(&self) -> usize {
        let shown: String = self.display().chars().take(self.cursor).collect();
        UnicodeWidthStr::width(shown.as_str())
    }

    fn len(&self) -> usize {
        self.text.chars().count()
    }

    fn move_to(&mut self, cursor: usize) -> bool {
        let moved = cursor != self.cursor;
        self.cursor = cursor;
        moved
    }

    fn edited(&mut self) -> bool {
        self.reveal_tail = false;
        true
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_index)
            .map(|(idx, _)| idx)
            .unwrap_or(self.text.len())
    }
}

/// Maps a key press to an edit. Keys with application meaning (tab
/// switching, quit) are expected to be handled before this is consulted.
pub fn key_to_edit_action(key: &KeyEvent, mask: MaskMode) -> Option<EditAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Enter => Some(EditAction::Submit),
        KeyCode::Esc => Some(EditAction::Cancel),
        KeyCode::Backspace => Some(EditAction::Backspace),
        KeyCode::Delete => Some(EditAction::Delete),
        KeyCode::Left => Some(EditAction::Left),
        KeyCode::Right => Some(EditAction::Right),
        KeyCode::Home => Some(EditAction::Home),
        KeyCode::End => Some(EditAction::End),
        KeyCode::F(2) if matches!(mask, MaskMode::RevealTail { .. }) => {
            Some(EditAction::ToggleReveal)
        }
        KeyCode::Char(c) if ctrl => match c {
            'a' => Some(EditAction::Home),
            'e' => Some(EditAction::End),
            'k' => Some(EditAction::KillToEnd),
            'w' => Some(EditAction::KillWord),
            'u' => Some(EditAction::KillLine),
            'c' => Some(EditAction::Cancel),
            _ => None,
        },
        KeyCode::Char('\n') | KeyCode::Char('\r') => Some(EditAction::Submit),
        KeyCode::Char(c) => Some(EditAction::Insert(c)),
        _ => None,
    }
}

/// Reads one line from the terminal in raw mode, drawing it through `editor`'s
/// mask. Used for the credential prompt of headless commands.
pub fn prompt_line(prompt: &str, mut editor: LineEditor) -> Result<String, LineEditorError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    if let Err(err) = execute!(stdout, event::EnableBracketedPaste) {
        let _ = disable_raw_mode();
        return Err(err.into());
    }

    let result = read_until_submit(prompt, &mut editor);

    let restored = disable_raw_mode().and(execute!(stdout, event::DisableBracketedPaste));
    println!();
    let value = result?;
    restored?;
    Ok(value)
}

fn read_until_submit(prompt: &str, editor: &mut LineEditor) -> Result<String, LineEditorError> {
    redraw(prompt, editor)?;
    loop {
        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        let action = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                key_to_edit_action(&key, editor.mask())
            }
            Event::Paste(text) => Some(EditAction::Paste(text)),
            _ => None,
        };
        let Some(action) = action else { continue };
        match editor.apply(action) {
            EditOutcome::Changed => redraw(prompt, editor)?,
            EditOutcome::Unchanged => {}
            EditOutcome::Submit(value) => return Ok(value),
            EditOutcome::Cancelled => return Err(LineEditorError::Cancelled),
        }
    }
}

fn redraw(prompt: &str, editor: &LineEditor) -> io::Result<()> {
    let mut stdout = io::stdout();
    write!(stdout, "\r\x1b[K{prompt}{}", editor.display())?;
    let column = UnicodeWidthStr::width(prompt) + editor.cursor_column();
    if column > 0 {
        write!(stdout, "\r\x1b[{column}C")?;
    } else {
        write!(stdout, "\r")?;
    }
    stdout.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str, mask: MaskMode) -> LineEditor {
        let mut editor = LineEditor::new(mask);
        for c in text.chars() {
            editor.apply(EditAction::Insert(c));
        }
        editor
    }

    #[test]
    fn inserts_at_cursor() {
        let mut editor = typed("ac", MaskMode::Plain);
        editor.apply(EditAction::Left);
        assert_eq!(editor.apply(EditAction::Insert('b')), EditOutcome::Changed);
        assert_eq!(editor.text(), "abc");
        assert_eq!(editor.cursor(), 2);
    }

    #[test]
    fn boundary_moves_report_unchanged() {
        let mut editor = typed("x", MaskMode::Plain);
        assert_eq!(editor.apply(EditAction::Right), EditOutcome::Unchanged);
        editor.apply(EditAction::Home);
        assert_eq!(editor.apply(EditAction::Backspace), EditOutcome::Unchanged);
    }

    #[test]
    fn kill_word_stops_at_space() {
        let mut editor = typed("describe a fox", MaskMode::Plain);
        editor.apply(EditAction::KillWord);
        assert_eq!(editor.text(), "describe a ");
        editor.apply(EditAction::KillWord);
        assert_eq!(editor.text(), "describe ");
    }

    #[test]
    fn multibyte_text_edits_cleanly() {
        let mut editor = typed("héllo", MaskMode::Plain);
        editor.apply(EditAction::Home);
        editor.apply(EditAction::Right);
        editor.apply(EditAction::Delete);
        assert_eq!(editor.text(), "hllo");
    }

    #[test]
    fn paste_with_newline_submits_first_line() {
        let mut editor = LineEditor::new(MaskMode::Plain);
        let outcome = editor.apply(EditAction::Paste("hf_abc\r\nignored".to_string()));
        assert_eq!(outcome, EditOutcome::Submit("hf_abc".to_string()));
    }

    #[test]
    fn masked_paste_keeps_the_clipboard_verbatim() {
        let mut editor = LineEditor::new(MaskMode::RevealTail { tail_chars: 4 });
        let outcome = editor.apply(EditAction::Paste(" hf_a\tb ".to_string()));
        assert_eq!(outcome, EditOutcome::Changed);
        assert_eq!(editor.text(), " hf_a\tb ");
        assert_eq!(editor.cursor(), 8);
    }

    #[test]
    fn mask_reveals_only_the_tail_on_request() {
        let mut editor = typed("hf_secret1234", MaskMode::RevealTail { tail_chars: 4 });
        assert_eq!(editor.display(), "*************");
        editor.apply(EditAction::ToggleReveal);
        assert_eq!(editor.display(), "*********1234");
        editor.apply(EditAction::Insert('5'));
        assert!(!editor.is_revealing());
        assert_eq!(editor.text(), "hf_secret12345");
    }

    #[test]
    fn reveal_is_ignored_without_a_mask() {
        let mut editor = typed("plain", MaskMode::Plain);
        assert_eq!(editor.apply(EditAction::ToggleReveal), EditOutcome::Unchanged);
        let f2 = KeyEvent::new(KeyCode::F(2), KeyModifiers::NONE);
        assert_eq!(key_to_edit_action(&f2, MaskMode::Plain), None);
        assert_eq!(
            key_to_edit_action(&f2, MaskMode::RevealTail { tail_chars: 4 }),
            Some(EditAction::ToggleReveal)
        );
    }

    #[test]
    fn control_chords_map_to_edits() {
        let chord = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL);
        assert_eq!(key_to_edit_action(&chord('a'), MaskMode::Plain), Some(EditAction::Home));
        assert_eq!(key_to_edit_action(&chord('u'), MaskMode::Plain), Some(EditAction::KillLine));
        assert_eq!(key_to_edit_action(&chord('z'), MaskMode::Plain), None);
    }

    #[test]
    fn take_empties_the_buffer() {
        let mut editor = typed("prompt", MaskMode::Plain);
        assert_eq!(editor.take(), "prompt");
        assert!(editor.is_empty());
        assert_eq!(editor.cursor(), 0);
    }
}
