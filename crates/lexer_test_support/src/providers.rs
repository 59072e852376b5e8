//! Scripted embedding providers for exercising negotiation.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lexer::{Embedment, EmbeddingProvider, ProviderState, Span, TokenContext, TokenKind};

/// Claims fixed ranges `(start, len)` whenever a base token starts at
/// `start`. Counts how often it was told to drop a claim.
pub struct ScriptedProvider {
    name: &'static str,
    kind: TokenKind,
    claims: Vec<(usize, usize)>,
    clears: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub fn new(name: &'static str, kind: TokenKind) -> Self {
        Self {
            name,
            kind,
            claims: Vec::new(),
            clears: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn claim(mut self, start: usize, len: usize) -> Self {
        self.claims.push((start, len));
        self
    }

    /// Shared clear counter; stays readable after the provider moved into a
    /// registry.
    pub fn clear_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.clears)
    }
}

impl EmbeddingProvider for ScriptedProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn try_claim(&mut self, token: &TokenContext<'_>) -> Option<Embedment> {
        let start = token.span.start;
        self.claims
            .iter()
            .find(|(at, _)| *at == start)
            .map(|&(at, len)| {
                let end = (at + len).min(token.scan_end);
                Embedment::new(Span::new(at, end), self.kind, 0)
            })
    }

    fn clear_embedment(&mut self) {
        self.clears.fetch_add(1, Ordering::Relaxed);
    }

    fn state(&self) -> Option<ProviderState> {
        None
    }

    fn restore_state(&mut self, _state: Option<&ProviderState>) {}
}

/// Provider whose state, once it has seen a token, cannot be captured.
#[derive(Debug, Default)]
pub struct OpaqueProvider {
    seen: bool,
}

impl EmbeddingProvider for OpaqueProvider {
    fn name(&self) -> &str {
        "opaque"
    }

    fn try_claim(&mut self, _token: &TokenContext<'_>) -> Option<Embedment> {
        self.seen = true;
        None
    }

    fn clear_embedment(&mut self) {}

    fn state(&self) -> Option<ProviderState> {
        self.seen.then_some(ProviderState::NotRestorable)
    }

    fn restore_state(&mut self, state: Option<&ProviderState>) {
        self.seen = state.is_some();
    }
}
