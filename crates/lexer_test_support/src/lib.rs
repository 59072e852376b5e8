//! Helpers shared by the lexer integration tests, benches and fuzz targets.

use std::fmt::Write;
use std::sync::Arc;

use lexer::{Lexer, LexerError, Token};

pub mod fixtures;
pub mod providers;
pub mod word;

/// Escape control characters, quotes and backslashes so a token's text fits
/// on one line.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ch if ch < ' ' => {
                let _ = write!(&mut out, "\\u{{{:02X}}}", ch as u32);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// One-line form used by golden files: `grammar:KIND "text"`.
pub fn format_token(buffer: &str, token: &Token) -> String {
    format!("{} \"{}\"", token.kind, escape_text(token.text(buffer)))
}

/// Drain `lexer` from its current token and format every token.
pub fn token_lines<L: Lexer + ?Sized>(lexer: &mut L) -> Result<Vec<String>, LexerError> {
    let buffer = Arc::clone(lexer.buffer());
    let mut lines = Vec::new();
    while let Some(token) = lexer.token() {
        lines.push(format_token(&buffer, &token));
        lexer.advance()?;
    }
    Ok(lines)
}

/// Start `lexer` over all of `input` in state 0 and format its tokens.
pub fn lex_lines<L: Lexer + ?Sized>(
    lexer: &mut L,
    input: &str,
) -> Result<Vec<String>, LexerError> {
    let buffer: Arc<str> = Arc::from(input);
    lexer.start(Arc::clone(&buffer), 0, buffer.len(), 0)?;
    token_lines(lexer)
}

/// Human-readable report of the first difference between two line lists,
/// with two lines of context on either side.
pub fn diff_lines(expected: &[String], actual: &[String]) -> String {
    const MISSING: &str = "<missing>";
    let total = expected.len().max(actual.len());
    let line = |lines: &[String], at: usize| {
        lines.get(at).map_or(MISSING, String::as_str).to_string()
    };
    let mut out = String::new();
    match (0..total).find(|&at| line(expected, at) != line(actual, at)) {
        Some(first) => {
            let from = first.saturating_sub(2);
            let to = (first + 3).min(total);
            let _ = writeln!(&mut out, "first mismatch at line {}:", first + 1);
            for at in from..to {
                let marker = if at == first { ">" } else { " " };
                let _ = writeln!(
                    &mut out,
                    "{marker} {:>4}  expected: {}",
                    at + 1,
                    line(expected, at)
                );
                let _ = writeln!(
                    &mut out,
                    "{marker} {:>4}    actual: {}",
                    at + 1,
                    line(actual, at)
                );
            }
        }
        None => {
            let _ = writeln!(&mut out, "no mismatching line");
        }
    }
    let _ = writeln!(
        &mut out,
        "expected {} lines, actual {} lines",
        expected.len(),
        actual.len()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_quotes_and_controls() {
        assert_eq!(escape_text("a\"b\\\n\u{1}"), "a\\\"b\\\\\\n\\u{01}");
    }

    #[test]
    fn diff_points_at_first_mismatch() {
        let expected = vec!["a".to_string(), "b".to_string()];
        let actual = vec!["a".to_string(), "c".to_string(), "d".to_string()];
        let report = diff_lines(&expected, &actual);
        assert!(report.contains("first mismatch at line 2"), "{report}");
        assert!(report.contains("expected: <missing>"), "{report}");
        assert!(report.ends_with("expected 2 lines, actual 3 lines\n"), "{report}");
    }
}
