//! The two façades over the negotiation engine.
//!
//! - [`TokenizingLexer`] reports every embedment as one coarse token; this is
//!   the stream a structural parser consumes.
//! - [`HighlightingLexer`] runs the embedment's secondary lexer over the
//!   claimed range and reports its tokens instead, while the tokens outside
//!   embedments are identical to the tokenizing stream.

mod highlighting;
mod tokenizing;

pub use highlighting::{HighlightingConfig, HighlightingLexer, HighlightingSnapshot};
pub use tokenizing::TokenizingLexer;

#[cfg(test)]
mod tests;
