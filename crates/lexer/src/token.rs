//! Token model shared by base, secondary and layered lexers.

use std::fmt;

/// Byte span into the lexer's input buffer.
///
/// Invariant: both ends sit on UTF-8 character boundaries of the buffer the
/// span was produced from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start must be <= end");
        Self { start, end }
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    pub fn len(self) -> usize {
        self.end - self.start
    }

    /// Shift both ends by `delta` bytes.
    pub fn shifted(self, delta: isize) -> Self {
        Self::new(
            self.start.wrapping_add_signed(delta),
            self.end.wrapping_add_signed(delta),
        )
    }
}

/// Token kind drawn from one grammar's kind set.
///
/// Kinds from different grammars never compare equal, even when their names
/// match.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenKind {
    grammar: &'static str,
    name: &'static str,
}

impl TokenKind {
    pub const fn new(grammar: &'static str, name: &'static str) -> Self {
        Self { grammar, name }
    }

    pub fn grammar(self) -> &'static str {
        self.grammar
    }

    pub fn name(self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.grammar, self.name)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A lexed token: kind plus half-open byte range.
///
/// Tokens are values; the layered lexers hand out a fresh copy per
/// `advance()` and never keep references into caller memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        debug_assert!(!span.is_empty(), "tokens must cover at least one byte");
        Self { kind, span }
    }

    /// Resolve the token text against the buffer it was lexed from.
    pub fn text(self, buffer: &str) -> &str {
        &buffer[self.span.start..self.span.end]
    }
}
