use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::core::chat::TurnState;
use crate::ui::state::{AppState, Outcome, Tab, TOKEN_TAIL_CHARS};
use crate::utils::line_editor::LineEditor;

const LOCKED_HELP: &str = "Enter to submit • F2 to show the last characters • Ctrl+C to quit";
const TABS_HELP: &str = "Enter to run • Tab/Shift+Tab to switch • Ctrl+L to clear • Ctrl+C to quit";

pub fn ui(f: &mut Frame, state: &AppState) {
    if state.gate.view().tabs_visible {
        render_tabs(f, state);
    } else {
        render_gate(f, state);
    }
}

fn render_gate(f: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    let intro = Paragraph::new(vec![
        Line::from(Span::styled(
            format!("hfdeck v{}", env!("CARGO_PKG_VERSION")),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from("Enter an access token to unlock chat, text-to-image and audio-to-text."),
    ]);
    f.render_widget(intro, chunks[0]);

    let view = state.gate.view();
    if view.credential_input_visible {
        let title = if state.token.is_revealing() {
            format!("Access token (last {TOKEN_TAIL_CHARS} shown)")
        } else {
            "Access token".to_string()
        };
        render_field(f, chunks[1], &title, &state.token, !state.gate.is_verifying());
    }

    if let Some(status) = &state.status {
        let style = if state.gate.is_verifying() {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::Red)
        };
        f.render_widget(
            Paragraph::new(status.as_str())
                .style(style)
                .wrap(Wrap { trim: true }),
            chunks[2],
        );
    }

    if view.submit_visible {
        f.render_widget(
            Paragraph::new(LOCKED_HELP).style(Style::default().fg(Color::DarkGray)),
            chunks[4],
        );
    }
}

fn render_tabs(f: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    let titles: Vec<Line> = Tab::ALL
        .iter()
        .map(|tab| Line::from(tab.capability().label()))
        .collect();
    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title("hfdeck"))
        .select(state.active.index())
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, chunks[0]);

    let body = match state.active {
        Tab::Chat => chat_lines(state),
        Tab::Image => outcome_lines(&state.image.output, "Generating image...", |saved| {
            vec![
                Line::from(format!("Saved to {}", saved.path.display())),
                Line::from(Span::styled(
                    format!("{} bytes, {}", saved.bytes, saved.format.extension()),
                    Style::default().fg(Color::DarkGray),
                )),
            ]
        }),
        Tab::Transcription => {
            outcome_lines(&state.transcription.output, "Transcribing...", |text| {
                text.lines().map(|line| Line::from(line.to_string())).collect()
            })
        }
    };
    render_body(f, chunks[1], body);

    let input = state.active_input();
    render_field(f, chunks[2], state.active.input_title(), input, true);

    let footer = state.status.as_deref().unwrap_or(TABS_HELP);
    f.render_widget(
        Paragraph::new(footer).style(Style::default().fg(Color::DarkGray)),
        chunks[3],
    );
}

fn chat_lines(state: &AppState) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for turn in state.chat.history.turns() {
        lines.push(Line::from(vec![
            Span::styled(
                "You: ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(turn.user.clone(), Style::default().fg(Color::Cyan)),
        ]));
        match &turn.state {
            TurnState::Pending => lines.push(Line::from(Span::styled(
                "...",
                Style::default().fg(Color::DarkGray),
            ))),
            TurnState::Answered(reply) => {
                lines.extend(reply.lines().map(|line| Line::from(line.to_string())));
            }
            TurnState::Failed(message) => lines.push(Line::from(Span::styled(
                message.clone(),
                Style::default().fg(Color::Red),
            ))),
        }
        lines.push(Line::from(""));
    }
    lines
}

fn outcome_lines<T>(
    outcome: &Outcome<T>,
    pending: &'static str,
    ready: impl Fn(&T) -> Vec<Line<'static>>,
) -> Vec<Line<'static>> {
    match outcome {
        Outcome::Empty => Vec::new(),
        Outcome::Pending => vec![Line::from(Span::styled(
            pending,
            Style::default().fg(Color::Yellow),
        ))],
        Outcome::Ready(value) => ready(value),
        Outcome::Failed(message) => vec![Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Red),
        ))],
    }
}

/// Keeps the newest lines in view.
fn render_body(f: &mut Frame, area: Rect, lines: Vec<Line<'static>>) {
    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    let total = wrapped_height(&lines, inner_width);
    let scroll = total.saturating_sub(inner_height);

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL))
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(paragraph, area);
}

pub(crate) fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    if width == 0 {
        return 0;
    }
    let width = usize::from(width);
    let rows: usize = lines
        .iter()
        .map(|line| {
            let line_width: usize = line
                .spans
                .iter()
                .map(|span| UnicodeWidthStr::width(span.content.as_ref()))
                .sum();
            line_width.div_ceil(width).max(1)
        })
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

fn render_field(f: &mut Frame, area: Rect, title: &str, editor: &LineEditor, focused: bool) {
    let inner_width = usize::from(area.width.saturating_sub(2));
    let column = editor.cursor_column();
    let offset = column.saturating_sub(inner_width.saturating_sub(1));

    let style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let field = Paragraph::new(editor.display())
        .style(style)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .scroll((0, u16::try_from(offset).unwrap_or(u16::MAX)));
    f.render_widget(field, area);

    if focused {
        let x = area.x + 1 + u16::try_from(column - offset).unwrap_or(0);
        f.set_cursor_position((x, area.y + 1));
    }
}
