//! Embedding providers and the embedments they claim.
//!
//! A provider watches the base token stream and may claim the region that
//! starts at the current token for another grammar. Claims are negotiated by
//! [`ProviderRegistry`] in registration order: the first claim wins and every
//! other provider is told to drop whatever it had prepared.

mod nesting;
mod registry;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::lexer::BoxedLexer;
use crate::token::{Span, TokenKind};

pub use nesting::{DEFAULT_MAX_NESTING_DEPTH, EmbeddingConfig};
pub use registry::{ProviderId, ProviderRegistry, ProviderRegistryBuilder};
pub(crate) use registry::Claim;

/// View of the current base token handed to providers.
#[derive(Clone, Copy, Debug)]
pub struct TokenContext<'a> {
    pub kind: TokenKind,
    pub span: Span,
    /// Base lexer state at the start of this token.
    pub base_state: u32,
    /// Within-tag flag after this token was taken into account.
    pub within_tag: bool,
    /// Whole input buffer; providers may scan forward from `span.start`.
    pub buffer: &'a str,
    /// End of the scan range. Claims must not extend past it.
    pub scan_end: usize,
}

impl<'a> TokenContext<'a> {
    pub fn text(&self) -> &'a str {
        &self.buffer[self.span.start..self.span.end]
    }

    /// Input from the token start to the scan end.
    pub fn rest(&self) -> &'a str {
        &self.buffer[self.span.start..self.scan_end]
    }
}

/// Creates secondary lexers for highlighting embedded regions.
pub trait SecondaryLexerFactory: Send + Sync {
    /// Build a lexer for a region one nesting level below the caller.
    /// `config` is already the nested configuration.
    fn create(&self, config: EmbeddingConfig) -> BoxedLexer;

    /// State the secondary lexer starts the region in.
    fn initial_state(&self) -> u32 {
        0
    }
}

/// A claimed sub-range of the input.
#[derive(Clone)]
pub struct Embedment {
    range: Span,
    kind: TokenKind,
    factory: Option<Arc<dyn SecondaryLexerFactory>>,
    resume_base_state: u32,
}

impl Embedment {
    pub fn new(range: Span, kind: TokenKind, resume_base_state: u32) -> Self {
        Self {
            range,
            kind,
            factory: None,
            resume_base_state,
        }
    }

    /// Attach the secondary lexer used for this region in highlighting mode.
    pub fn with_factory(mut self, factory: Arc<dyn SecondaryLexerFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn range(&self) -> Span {
        self.range
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn factory(&self) -> Option<&Arc<dyn SecondaryLexerFactory>> {
        self.factory.as_ref()
    }

    /// Base lexer state to continue from at `range().end`.
    pub fn resume_base_state(&self) -> u32 {
        self.resume_base_state
    }
}

impl fmt::Debug for Embedment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Embedment")
            .field("range", &self.range)
            .field("kind", &self.kind)
            .field("has_factory", &self.factory.is_some())
            .field("resume_base_state", &self.resume_base_state)
            .finish()
    }
}

/// Opaque state a provider hands out for snapshots.
#[derive(Clone)]
pub enum ProviderState {
    /// State the provider can re-install through `restore_state`.
    Restorable(Arc<dyn Any + Send + Sync>),
    /// The provider depends on something a snapshot cannot capture.
    NotRestorable,
}

impl ProviderState {
    pub fn restorable<T: Any + Send + Sync>(value: T) -> Self {
        Self::Restorable(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Restorable(value) => value.downcast_ref::<T>(),
            Self::NotRestorable => None,
        }
    }

    pub fn is_restorable(&self) -> bool {
        matches!(self, Self::Restorable(_))
    }
}

impl fmt::Debug for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Restorable(_) => f.write_str("Restorable(..)"),
            Self::NotRestorable => f.write_str("NotRestorable"),
        }
    }
}

/// Pluggable detector of embedded regions.
///
/// Providers are created once per lexer and never recreated; the engine is
/// the only caller that mutates them. They must be snapshot-safe: after
/// `restore_state(s)` the provider behaves exactly as it did when `s` was
/// taken, and `restore_state(None)` is a cold start that is correct at any
/// offset where `state()` would have returned `None`.
pub trait EmbeddingProvider {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Observe the current base token and optionally claim the region that
    /// starts at it. Called once per base token.
    fn try_claim(&mut self, token: &TokenContext<'_>) -> Option<Embedment>;

    /// Another provider claimed the current token: drop any claim prepared
    /// for it. Tracking of earlier tokens is kept.
    fn clear_embedment(&mut self);

    /// Extra state not representable in the base state, `None` when cold.
    fn state(&self) -> Option<ProviderState>;

    /// Cheap form of `state().is_some()`, queried once per token.
    fn holds_state(&self) -> bool {
        self.state().is_some()
    }

    fn restore_state(&mut self, state: Option<&ProviderState>);

    /// Bytes past a claimed range's end the provider may inspect.
    fn lookahead(&self) -> usize {
        0
    }
}
