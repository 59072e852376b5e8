//! Structural tokenization over the negotiation engine.

use std::sync::Arc;

use crate::embedding::{Embedment, ProviderRegistry};
use crate::engine::{Engine, EngineStats};
use crate::error::LexerError;
use crate::lexer::{BaseLexer, Lexer, LexerPosition};
use crate::snapshot::PositionSnapshot;
use crate::state::PackedState;
use crate::token::Token;

/// Layered lexer that folds each embedded region into a single token of the
/// embedment's target kind.
pub struct TokenizingLexer<B> {
    engine: Engine<B>,
}

impl<B: BaseLexer> TokenizingLexer<B> {
    pub fn new(base: B, registry: ProviderRegistry) -> Self {
        Self {
            engine: Engine::new(base, registry),
        }
    }

    pub fn snapshot(&self) -> PositionSnapshot {
        self.engine.snapshot()
    }

    /// Return to `snapshot`; the current token and everything after it are
    /// reproduced exactly. The snapshot stays usable afterwards.
    pub fn restore(&mut self, snapshot: &PositionSnapshot) -> Result<(), LexerError> {
        self.engine.restore(snapshot)
    }

    /// Embedment reported as the current token, if any.
    pub fn active_embedment(&self) -> Option<&Embedment> {
        self.engine.active_embedment()
    }

    pub fn base(&self) -> &B {
        self.engine.base()
    }

    pub fn registry(&self) -> &ProviderRegistry {
        self.engine.registry()
    }

    pub fn stats(&self) -> EngineStats {
        self.engine.stats()
    }
}

impl<B: BaseLexer> Lexer for TokenizingLexer<B> {
    fn start(
        &mut self,
        buffer: Arc<str>,
        start: usize,
        end: usize,
        state: u32,
    ) -> Result<(), LexerError> {
        self.engine.start(buffer, start, end, state)
    }

    fn advance(&mut self) -> Result<(), LexerError> {
        self.engine.advance()
    }

    fn token(&self) -> Option<Token> {
        self.engine.token()
    }

    fn state(&self) -> u32 {
        self.engine.state()
    }

    fn buffer(&self) -> &Arc<str> {
        self.engine.buffer()
    }

    fn buffer_end(&self) -> usize {
        self.engine.end()
    }

    fn is_restartable_state(&self, state: u32) -> bool {
        PackedState::is_restartable_raw(state)
    }

    fn lookahead(&self) -> usize {
        self.engine.lookahead()
    }

    fn position(&self) -> LexerPosition {
        LexerPosition::new(
            Arc::clone(self.buffer()),
            self.buffer_end(),
            self.token_start(),
            self.state(),
        )
        .with_detail(self.snapshot())
    }

    fn restore_position(&mut self, position: &LexerPosition) -> Result<(), LexerError> {
        match position.detail::<PositionSnapshot>() {
            Some(snapshot) => self.restore(snapshot),
            None => position.restart(self),
        }
    }
}
