//! Token stream contract shared by base, secondary and layered lexers.
//!
//! A lexer is driven as `start -> {read token -> advance}*`. After `start`
//! the first token (if any) is already current; `token()` returns `None`
//! once the scan range is exhausted. `state()` always describes the state at
//! the *start* of the current token, so `start(buffer, token_start, end,
//! state())` re-produces the current token and everything after it whenever
//! that state is restartable.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::LexerError;
use crate::token::{Token, TokenKind};

/// Lexer trait object used for secondary (embedded) lexers.
pub type BoxedLexer = Box<dyn Lexer + Send>;

pub trait Lexer {
    /// Begin scanning `buffer[start..end]` in `state`. Arguments are
    /// validated before anything changes, so an error leaves the lexer as it
    /// was.
    fn start(
        &mut self,
        buffer: Arc<str>,
        start: usize,
        end: usize,
        state: u32,
    ) -> Result<(), LexerError>;

    /// Move to the next token. A no-op once the scan range is exhausted.
    fn advance(&mut self) -> Result<(), LexerError>;

    /// Current token, `None` at end of the scan range.
    fn token(&self) -> Option<Token>;

    /// State at the start of the current token (or at the scan end).
    fn state(&self) -> u32;

    /// Buffer given to the last `start`.
    fn buffer(&self) -> &Arc<str>;

    /// End offset given to the last `start`.
    fn buffer_end(&self) -> usize;

    fn token_kind(&self) -> Option<TokenKind> {
        self.token().map(|token| token.kind)
    }

    fn token_start(&self) -> usize {
        self.token().map_or(self.buffer_end(), |token| token.span.start)
    }

    fn token_end(&self) -> usize {
        self.token().map_or(self.buffer_end(), |token| token.span.end)
    }

    /// Whether `state` alone is enough to resume scanning at the offset it
    /// was observed at.
    fn is_restartable_state(&self, _state: u32) -> bool {
        true
    }

    /// Number of bytes past a token's end the lexer may inspect while
    /// deciding that token.
    fn lookahead(&self) -> usize {
        1
    }

    /// Capture the lexer's own position. Lexers whose packed state is not
    /// always restartable attach a deep snapshot with
    /// [`LexerPosition::with_detail`] and override `restore_position`.
    fn position(&self) -> LexerPosition {
        LexerPosition::new(
            Arc::clone(self.buffer()),
            self.buffer_end(),
            self.token_start(),
            self.state(),
        )
    }

    /// Return to a position captured by [`Lexer::position`]. On error the
    /// lexer is left as it was.
    fn restore_position(&mut self, position: &LexerPosition) -> Result<(), LexerError> {
        position.restart(self)
    }
}

/// Role a base token plays in tag structure. The layered lexer derives its
/// within-tag flag from these.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StructuralRole {
    /// Name token directly after a tag opener (`<name`, `</name`).
    TagName,
    /// Token that terminates a tag (`>`, `/>`).
    TagEnd,
    Other,
}

/// The primary grammar of a layered lexer.
pub trait BaseLexer: Lexer {
    fn structural_role(&self, kind: TokenKind) -> StructuralRole;
}

/// Opaque point-in-time position of a single lexer.
///
/// The flat part (offset and packed state) is enough for lexers that can
/// restart anywhere. Layered lexers add a detail value holding their full
/// snapshot, which their `restore_position` prefers over restarting.
#[derive(Clone)]
pub struct LexerPosition {
    buffer: Arc<str>,
    end: usize,
    offset: usize,
    state: u32,
    detail: Option<Arc<dyn Any + Send + Sync>>,
}

impl LexerPosition {
    pub fn new(buffer: Arc<str>, end: usize, offset: usize, state: u32) -> Self {
        Self {
            buffer,
            end,
            offset,
            state,
            detail: None,
        }
    }

    pub fn with_detail<T: Any + Send + Sync>(mut self, detail: T) -> Self {
        self.detail = Some(Arc::new(detail));
        self
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn state(&self) -> u32 {
        self.state
    }

    pub fn detail<T: Any>(&self) -> Option<&T> {
        self.detail.as_ref()?.downcast_ref::<T>()
    }

    /// Restart `lexer` from the flat part of the position.
    pub fn restart<L: Lexer + ?Sized>(&self, lexer: &mut L) -> Result<(), LexerError> {
        lexer.start(Arc::clone(&self.buffer), self.offset, self.end, self.state)
    }
}

impl fmt::Debug for LexerPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LexerPosition")
            .field("end", &self.end)
            .field("offset", &self.offset)
            .field("state", &format_args!("{:#x}", self.state))
            .field("has_detail", &self.detail.is_some())
            .finish()
    }
}

/// Reject ranges that do not fit `buffer` or split a character.
pub fn check_range(buffer: &str, start: usize, end: usize) -> Result<(), LexerError> {
    if start > end || end > buffer.len() {
        return Err(LexerError::InvalidRange {
            start,
            end,
            len: buffer.len(),
        });
    }
    check_char_boundary(buffer, start)?;
    check_char_boundary(buffer, end)
}

/// Reject offsets inside a multi-byte character.
pub fn check_char_boundary(buffer: &str, offset: usize) -> Result<(), LexerError> {
    if !buffer.is_char_boundary(offset) {
        return Err(LexerError::SplitCharacter { offset });
    }
    Ok(())
}

/// Drain `lexer` from its current token to the end of its range.
pub fn collect_tokens<L: Lexer + ?Sized>(lexer: &mut L) -> Result<Vec<(Token, u32)>, LexerError> {
    let mut out = Vec::new();
    while let Some(token) = lexer.token() {
        out.push((token, lexer.state()));
        lexer.advance()?;
    }
    Ok(out)
}
