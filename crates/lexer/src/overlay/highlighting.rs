//! Highlighting overlay: fine-grained tokens inside embedments.

use std::fmt;
use std::sync::Arc;

use crate::embedding::{Embedment, ProviderRegistry, SecondaryLexerFactory};
use crate::engine::{Engine, EngineStats};
use crate::error::LexerError;
use crate::lexer::{BaseLexer, BoxedLexer, Lexer, LexerPosition};
use crate::snapshot::PositionSnapshot;
use crate::state::{PACKED_STATE_BITS, PackedState};
use crate::token::Token;

/// Configuration for [`HighlightingLexer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HighlightingConfig {
    /// Bit of `state()` set while a secondary lexer is active. Must lie
    /// above the packed state fields.
    pub embedded_state_bit: u32,
}

impl Default for HighlightingConfig {
    fn default() -> Self {
        Self {
            embedded_state_bit: PACKED_STATE_BITS,
        }
    }
}

impl HighlightingConfig {
    fn mask(self) -> u32 {
        1 << self.embedded_state_bit
    }

    fn validate(self) -> Result<Self, LexerError> {
        if !(PACKED_STATE_BITS..u32::BITS).contains(&self.embedded_state_bit) {
            return Err(LexerError::InvalidStateBit {
                bit: self.embedded_state_bit,
            });
        }
        Ok(self)
    }
}

/// Layered lexer that reports the secondary lexer's tokens for embedments
/// that carry a factory. Embedments without one are reported coarsely, as
/// in [`TokenizingLexer`](super::TokenizingLexer).
///
/// While a secondary lexer is active `state()` has the configured embedded
/// bit set; such states are never restartable, since the secondary lexer's
/// own state is not part of the integer.
pub struct HighlightingLexer<B> {
    engine: Engine<B>,
    config: HighlightingConfig,
    secondary: Option<ActiveSecondary>,
}

struct ActiveSecondary {
    factory: Arc<dyn SecondaryLexerFactory>,
    lexer: BoxedLexer,
}

impl<B: BaseLexer> HighlightingLexer<B> {
    pub fn new(
        base: B,
        registry: ProviderRegistry,
        config: HighlightingConfig,
    ) -> Result<Self, LexerError> {
        Ok(Self {
            engine: Engine::new(base, registry),
            config: config.validate()?,
            secondary: None,
        })
    }

    pub fn config(&self) -> HighlightingConfig {
        self.config
    }

    /// Whether the current token comes from a secondary lexer.
    pub fn in_embedded_lexer(&self) -> bool {
        self.secondary.is_some()
    }

    /// Embedment covering the current token, if any.
    pub fn active_embedment(&self) -> Option<&Embedment> {
        self.engine.active_embedment()
    }

    /// Outer token: the coarse embedment token while inside an embedment,
    /// otherwise the current token. Callers that only care about structure
    /// see the same boundaries as the tokenizing lexer.
    pub fn outer_token(&self) -> Option<Token> {
        self.engine.token()
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

    pub fn snapshot(&self) -> HighlightingSnapshot {
        HighlightingSnapshot {
            engine: self.engine.snapshot(),
            secondary: self.secondary.as_ref().map(|active| SecondarySnapshot {
                factory: Arc::clone(&active.factory),
                position: active.lexer.position(),
            }),
        }
    }

    /// Return to `snapshot`. The secondary lexer is rebuilt before anything
    /// else changes, so a failed restore leaves this lexer as it was.
    pub fn restore(&mut self, snapshot: &HighlightingSnapshot) -> Result<(), LexerError> {
        let secondary = match &snapshot.secondary {
            Some(saved) => {
                let mut lexer = saved.factory.create(self.engine.config().nested());
                lexer.restore_position(&saved.position)?;
                Some(ActiveSecondary {
                    factory: Arc::clone(&saved.factory),
                    lexer,
                })
            }
            None => None,
        };
        self.engine.restore(&snapshot.engine)?;
        self.secondary = secondary;
        Ok(())
    }

    /// Spin up the secondary lexer if the engine just reported an embedment
    /// that has one.
    fn enter_embedment(&mut self) -> Result<(), LexerError> {
        let Some(embedment) = self.engine.active_embedment() else {
            return Ok(());
        };
        let Some(factory) = embedment.factory().cloned() else {
            return Ok(());
        };
        let range = embedment.range();
        let mut lexer = factory.create(self.engine.config().nested());
        lexer.start(
            Arc::clone(self.engine.buffer()),
            range.start,
            range.end,
            factory.initial_state(),
        )?;
        if lexer.token().is_none() {
            log::debug!(
                target: "lexer.highlight",
                "secondary lexer produced no tokens for {range:?}; reporting the embedment as one token"
            );
            return Ok(());
        }
        #[cfg(any(test, feature = "debug-stats"))]
        log::trace!(target: "lexer.highlight", "enter secondary lexer over {range:?}");
        self.secondary = Some(ActiveSecondary { factory, lexer });
        Ok(())
    }
}

impl<B: BaseLexer> Lexer for HighlightingLexer<B> {
    fn start(
        &mut self,
        buffer: Arc<str>,
        start: usize,
        end: usize,
        state: u32,
    ) -> Result<(), LexerError> {
        if state & self.config.mask() != 0 {
            return Err(LexerError::NonRestartableState { state });
        }
        self.engine.start(buffer, start, end, state)?;
        self.secondary = None;
        self.enter_embedment()
    }

    fn advance(&mut self) -> Result<(), LexerError> {
        if let Some(active) = self.secondary.as_mut() {
            active.lexer.advance()?;
            if let Some(token) = active.lexer.token() {
                debug_assert!(
                    self.engine
                        .token()
                        .is_some_and(|outer| token.span.end <= outer.span.end),
                    "secondary token {token:?} escapes its embedment"
                );
                return Ok(());
            }
            #[cfg(any(test, feature = "debug-stats"))]
            log::trace!(target: "lexer.highlight", "secondary lexer exhausted");
            self.secondary = None;
        }
        self.engine.advance()?;
        self.enter_embedment()
    }

    fn token(&self) -> Option<Token> {
        match &self.secondary {
            Some(active) => active.lexer.token(),
            None => self.engine.token(),
        }
    }

    fn state(&self) -> u32 {
        let state = self.engine.state();
        if self.secondary.is_some() {
            state | self.config.mask()
        } else {
            state
        }
    }

    fn buffer(&self) -> &Arc<str> {
        self.engine.buffer()
    }

    fn buffer_end(&self) -> usize {
        self.engine.end()
    }

    fn is_restartable_state(&self, state: u32) -> bool {
        state & self.config.mask() == 0 && PackedState::is_restartable_raw(state)
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
        match position.detail::<HighlightingSnapshot>() {
            Some(snapshot) => self.restore(snapshot),
            None => position.restart(self),
        }
    }
}

/// Snapshot of a [`HighlightingLexer`]: the engine snapshot plus, inside an
/// embedment, the secondary lexer's own position.
#[derive(Clone, Debug)]
pub struct HighlightingSnapshot {
    engine: PositionSnapshot,
    secondary: Option<SecondarySnapshot>,
}

impl HighlightingSnapshot {
    pub fn engine(&self) -> &PositionSnapshot {
        &self.engine
    }

    pub fn in_embedded_lexer(&self) -> bool {
        self.secondary.is_some()
    }
}

#[derive(Clone)]
struct SecondarySnapshot {
    factory: Arc<dyn SecondaryLexerFactory>,
    position: LexerPosition,
}

impl fmt::Debug for SecondarySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecondarySnapshot")
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}
