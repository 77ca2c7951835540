//! Cleaning of pasted or typed text before it reaches an edit buffer.

/// Drops control characters that would corrupt the terminal. Tabs become four
/// spaces and carriage returns become newlines, so CRLF pastes still end the
/// line.
pub fn sanitize_text_input(text: &str) -> String {
    let mut sanitized = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\t' => sanitized.push_str("    "),
            '\r' | '\n' => sanitized.push('\n'),
            c if c.is_control() => {}
            c => sanitized.push(c),
        }
    }
    sanitized
}
