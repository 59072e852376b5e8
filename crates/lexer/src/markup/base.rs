//! Markup base lexer.
//!
//! Each state handler looks at the bytes from the cursor to the scan end and
//! either emits one token or hands the same bytes to another state. Handlers
//! never look further than one byte past the token they emit.

use std::sync::Arc;

use memchr::memchr;

use super::scan::{
    COMMENT_START, char_len, comment_len, is_name_byte, name_len, whitespace_len,
};
use super::{
    ATTR_NAME, ATTR_QUOTE, ATTR_VALUE, BAD_CHARACTER, COMMENT, EMPTY_TAG_END, END_TAG_START, EQ,
    MarkupState, TAG_END, TAG_NAME, TAG_START, TEXT, WHITESPACE,
};
use crate::error::LexerError;
use crate::lexer::{BaseLexer, Lexer, StructuralRole, check_range};
use crate::token::{Span, Token, TokenKind};

enum Step {
    Emit {
        kind: TokenKind,
        len: usize,
        next: MarkupState,
    },
    /// Re-dispatch the same bytes in another state.
    Reconsume(MarkupState),
}

fn emit(kind: TokenKind, len: usize, next: MarkupState) -> Step {
    Step::Emit { kind, len, next }
}

/// HTML-like base lexer. States are listed in the [module docs](super).
pub struct MarkupLexer {
    buffer: Arc<str>,
    end: usize,
    token: Option<Token>,
    /// State at the start of `token`.
    token_state: MarkupState,
    /// State after `token`.
    state: MarkupState,
}

impl Default for MarkupLexer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupLexer {
    pub fn new() -> Self {
        Self {
            buffer: Arc::from(""),
            end: 0,
            token: None,
            token_state: MarkupState::Data,
            state: MarkupState::Data,
        }
    }

    fn lex_at(&mut self, pos: usize) {
        self.token_state = self.state;
        if pos >= self.end {
            self.token = None;
            return;
        }
        let bytes = &self.buffer.as_bytes()[pos..self.end];
        let mut state = self.state;
        let (kind, len, next) = loop {
            match step(state, bytes) {
                Step::Emit { kind, len, next } => break (kind, len, next),
                Step::Reconsume(other) => {
                    debug_assert_ne!(other, state, "reconsume must change state");
                    state = other;
                }
            }
        };
        debug_assert!(len > 0 && len <= bytes.len());
        #[cfg(any(test, feature = "debug-stats"))]
        if next != self.state {
            log::trace!(
                target: "lexer.markup",
                "state {:?} -> {:?} @{}",
                self.state,
                next,
                pos + len
            );
        }
        self.state = next;
        self.token = Some(Token::new(kind, Span::new(pos, pos + len)));
    }
}

fn step(state: MarkupState, bytes: &[u8]) -> Step {
    match state {
        MarkupState::Data => step_data(bytes),
        MarkupState::TagName => step_tag_name(bytes),
        MarkupState::InTag => step_in_tag(bytes),
        MarkupState::AfterAttrName => step_after_attr_name(bytes),
        MarkupState::BeforeAttrValue => step_before_attr_value(bytes),
        MarkupState::DoubleQuoted => step_quoted(bytes, b'"', MarkupState::DoubleQuoted),
        MarkupState::SingleQuoted => step_quoted(bytes, b'\'', MarkupState::SingleQuoted),
    }
}

fn step_data(bytes: &[u8]) -> Step {
    if bytes.starts_with(COMMENT_START) {
        return emit(COMMENT, comment_len(bytes), MarkupState::Data);
    }
    if bytes[0] == b'<' {
        match bytes.get(1) {
            Some(b'/') if bytes.get(2).is_some_and(u8::is_ascii_alphabetic) => {
                return emit(END_TAG_START, 2, MarkupState::TagName);
            }
            Some(next) if next.is_ascii_alphabetic() => {
                return emit(TAG_START, 1, MarkupState::TagName);
            }
            // Not a tag opener: the `<` is text.
            _ => {}
        }
    }
    let len = 1 + memchr(b'<', &bytes[1..]).unwrap_or(bytes.len() - 1);
    emit(TEXT, len, MarkupState::Data)
}

fn step_tag_name(bytes: &[u8]) -> Step {
    match name_len(bytes) {
        0 => Step::Reconsume(MarkupState::InTag),
        len => emit(TAG_NAME, len, MarkupState::InTag),
    }
}

fn step_in_tag(bytes: &[u8]) -> Step {
    let first = bytes[0];
    if first.is_ascii_whitespace() {
        return emit(WHITESPACE, whitespace_len(bytes), MarkupState::InTag);
    }
    if first == b'>' {
        return emit(TAG_END, 1, MarkupState::Data);
    }
    if bytes.starts_with(b"/>") {
        return emit(EMPTY_TAG_END, 2, MarkupState::Data);
    }
    if is_name_byte(first) {
        return emit(ATTR_NAME, name_len(bytes), MarkupState::AfterAttrName);
    }
    let len = char_len(first).min(bytes.len());
    emit(BAD_CHARACTER, len, MarkupState::InTag)
}

fn step_after_attr_name(bytes: &[u8]) -> Step {
    match bytes[0] {
        b if b.is_ascii_whitespace() => {
            emit(WHITESPACE, whitespace_len(bytes), MarkupState::AfterAttrName)
        }
        b'=' => emit(EQ, 1, MarkupState::BeforeAttrValue),
        _ => Step::Reconsume(MarkupState::InTag),
    }
}

fn step_before_attr_value(bytes: &[u8]) -> Step {
    match bytes[0] {
        b if b.is_ascii_whitespace() => emit(
            WHITESPACE,
            whitespace_len(bytes),
            MarkupState::BeforeAttrValue,
        ),
        b'"' => emit(ATTR_QUOTE, 1, MarkupState::DoubleQuoted),
        b'\'' => emit(ATTR_QUOTE, 1, MarkupState::SingleQuoted),
        b'>' => Step::Reconsume(MarkupState::InTag),
        _ => {
            let len = bytes
                .iter()
                .position(|b| b.is_ascii_whitespace() || *b == b'>')
                .unwrap_or(bytes.len());
            emit(ATTR_VALUE, len, MarkupState::InTag)
        }
    }
}

fn step_quoted(bytes: &[u8], quote: u8, state: MarkupState) -> Step {
    if bytes[0] == quote {
        return emit(ATTR_QUOTE, 1, MarkupState::InTag);
    }
    let len = memchr(quote, bytes).unwrap_or(bytes.len());
    emit(ATTR_VALUE, len, state)
}

impl Lexer for MarkupLexer {
    fn start(
        &mut self,
        buffer: Arc<str>,
        start: usize,
        end: usize,
        state: u32,
    ) -> Result<(), LexerError> {
        check_range(&buffer, start, end)?;
        let state = MarkupState::from_raw(state).ok_or(LexerError::UnknownBaseState { state })?;
        self.buffer = buffer;
        self.end = end;
        self.state = state;
        self.lex_at(start);
        Ok(())
    }

    fn advance(&mut self) -> Result<(), LexerError> {
        if let Some(token) = self.token {
            self.lex_at(token.span.end);
        }
        Ok(())
    }

    fn token(&self) -> Option<Token> {
        self.token
    }

    fn state(&self) -> u32 {
        self.token_state.raw()
    }

    fn buffer(&self) -> &Arc<str> {
        &self.buffer
    }

    fn buffer_end(&self) -> usize {
        self.end
    }
}

impl BaseLexer for MarkupLexer {
    fn structural_role(&self, kind: TokenKind) -> StructuralRole {
        if kind == TAG_NAME {
            StructuralRole::TagName
        } else if kind == TAG_END || kind == EMPTY_TAG_END {
            StructuralRole::TagEnd
        } else {
            StructuralRole::Other
        }
    }
}
