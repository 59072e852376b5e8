//! Restartable layered lexer for markup with embedded languages.
//!
//! A [`BaseLexer`] tokenizes the host grammar. Embedding providers watch its
//! token stream and claim regions (script bodies, event handler values) that
//! belong to another grammar. Two layered lexers sit on top:
//!
//! - [`TokenizingLexer`] reports each claimed region as one token.
//! - [`HighlightingLexer`] runs a secondary lexer over each region.
//!
//! Every token carries a packed `u32` state. Where that state is restartable,
//! `start(buffer, token_start, end, state)` reproduces the rest of the stream,
//! which is what [`TokenCache`] relies on to re-lex only around an edit.
//! Where it is not, a [`PositionSnapshot`] still captures everything needed to
//! resume.

pub mod embedding;
pub mod incremental;
pub mod markup;

mod engine;
mod error;
mod lexer;
mod overlay;
mod snapshot;
mod state;
mod token;

pub use crate::embedding::{
    DEFAULT_MAX_NESTING_DEPTH, EmbeddingConfig, EmbeddingProvider, Embedment, ProviderId,
    ProviderRegistry, ProviderRegistryBuilder, ProviderState, SecondaryLexerFactory, TokenContext,
};
pub use crate::engine::EngineStats;
pub use crate::error::LexerError;
pub use crate::incremental::{LexedToken, RelexReport, TextEdit, TokenCache};
pub use crate::lexer::{
    BaseLexer, BoxedLexer, Lexer, LexerPosition, StructuralRole, check_char_boundary, check_range,
    collect_tokens,
};
pub use crate::overlay::{
    HighlightingConfig, HighlightingLexer, HighlightingSnapshot, TokenizingLexer,
};
pub use crate::snapshot::PositionSnapshot;
pub use crate::state::{BASE_STATE_BITS, MAX_BASE_STATE, PACKED_STATE_BITS, PackedState};
pub use crate::token::{Span, Token, TokenKind};
