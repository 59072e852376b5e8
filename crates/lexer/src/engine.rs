//! Embedding negotiation engine shared by the tokenizing and highlighting
//! lexers.
//!
//! Invariants:
//! - Tokens are reported in strictly increasing, non-overlapping order; an
//!   embedment always starts at the start of the base token it replaces.
//! - The packed state of a token is taken before providers observe it, so a
//!   provider that starts tracking at a token makes the *following* offsets
//!   non-restartable, never the one it saw.
//! - At most one embedment is active: the one reported as current token.

use std::sync::Arc;

use crate::embedding::{Claim, EmbeddingConfig, Embedment, ProviderRegistry, TokenContext};
use crate::error::LexerError;
use crate::lexer::{BaseLexer, StructuralRole, check_range};
use crate::snapshot::PositionSnapshot;
use crate::state::PackedState;
use crate::token::Token;

/// Engine instrumentation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Tokens reported by the engine (coarse embedment tokens count once).
    pub tokens: u64,
    pub embedments: u64,
    /// Base lexer restarts past an embedment.
    pub resumes: u64,
    /// Successful `start` calls.
    pub restarts: u64,
    pub restores: u64,
}

pub(crate) struct Engine<B> {
    base: B,
    registry: ProviderRegistry,
    buffer: Arc<str>,
    end: usize,
    within_tag: bool,
    active: Option<Claim>,
    token: Option<Token>,
    token_state: PackedState,
    stats: EngineStats,
}

impl<B: BaseLexer> Engine<B> {
    pub(crate) fn new(base: B, registry: ProviderRegistry) -> Self {
        Self {
            base,
            registry,
            buffer: Arc::from(""),
            end: 0,
            within_tag: false,
            active: None,
            token: None,
            token_state: PackedState::INITIAL,
            stats: EngineStats::default(),
        }
    }

    /// Restart at a checkpoint. Only restartable states are accepted: a bare
    /// integer cannot bring back provider opaque state.
    pub(crate) fn start(
        &mut self,
        buffer: Arc<str>,
        start: usize,
        end: usize,
        state: u32,
    ) -> Result<(), LexerError> {
        check_range(&buffer, start, end)?;
        let packed = PackedState::unpack(state)?;
        if !packed.is_restartable() {
            return Err(LexerError::NonRestartableState { state });
        }
        self.base
            .start(Arc::clone(&buffer), start, end, packed.base_state())?;
        self.buffer = buffer;
        self.end = end;
        self.within_tag = packed.within_tag();
        self.active = None;
        self.registry.cold_start();
        self.stats.restarts = self.stats.restarts.saturating_add(1);
        #[cfg(any(test, feature = "debug-stats"))]
        log::trace!(
            target: "lexer.engine",
            "start {start}..{end} state={state:#x} within_tag={}",
            self.within_tag
        );
        self.sync_token()
    }

    pub(crate) fn advance(&mut self) -> Result<(), LexerError> {
        if let Some(claim) = self.active.take() {
            let range = claim.embedment.range();
            #[cfg(any(test, feature = "debug-stats"))]
            log::trace!(
                target: "lexer.engine",
                "resume base at {} state={} after {:?}",
                range.end,
                claim.embedment.resume_base_state(),
                claim.provider
            );
            self.base.start(
                Arc::clone(&self.buffer),
                range.end,
                self.end,
                claim.embedment.resume_base_state(),
            )?;
            self.stats.resumes = self.stats.resumes.saturating_add(1);
        } else if self.token.is_some() {
            self.base.advance()?;
        } else {
            return Ok(());
        }
        self.sync_token()
    }

    /// Pick up the base lexer's current token and negotiate a claim for it.
    fn sync_token(&mut self) -> Result<(), LexerError> {
        let base_state = self.base.state();
        self.token_state =
            PackedState::new(base_state, self.within_tag, self.registry.holds_state())?;
        let Some(base_token) = self.base.token() else {
            self.token = None;
            return Ok(());
        };

        let within_tag = match self.base.structural_role(base_token.kind) {
            StructuralRole::TagName => true,
            StructuralRole::TagEnd => false,
            StructuralRole::Other => self.within_tag,
        };
        let context = TokenContext {
            kind: base_token.kind,
            span: base_token.span,
            base_state,
            within_tag,
            buffer: &self.buffer,
            scan_end: self.end,
        };
        match self.registry.negotiate(&context)? {
            Some(claim) => {
                #[cfg(any(test, feature = "debug-stats"))]
                log::trace!(
                    target: "lexer.engine",
                    "{:?} claims {:?} as {:?}",
                    claim.provider,
                    claim.embedment.range(),
                    claim.embedment.kind()
                );
                self.token = Some(Token::new(
                    claim.embedment.kind(),
                    claim.embedment.range(),
                ));
                self.active = Some(claim);
                self.stats.embedments = self.stats.embedments.saturating_add(1);
            }
            None => {
                self.within_tag = within_tag;
                self.token = Some(base_token);
            }
        }
        self.stats.tokens = self.stats.tokens.saturating_add(1);
        Ok(())
    }

    pub(crate) fn snapshot(&self) -> PositionSnapshot {
        PositionSnapshot {
            buffer: Arc::clone(&self.buffer),
            end: self.end,
            offset: self.token_start(),
            state: self.token_state,
            base: self.base.position(),
            providers: self.registry.states(),
            within_tag: self.within_tag,
            active: self.active.clone(),
            token: self.token,
        }
    }

    pub(crate) fn restore(&mut self, snapshot: &PositionSnapshot) -> Result<(), LexerError> {
        self.registry.check_states(&snapshot.providers)?;
        self.base.restore_position(&snapshot.base)?;
        self.registry.install_states(&snapshot.providers);
        self.buffer = Arc::clone(&snapshot.buffer);
        self.end = snapshot.end;
        self.within_tag = snapshot.within_tag;
        self.active = snapshot.active.clone();
        self.token = snapshot.token;
        self.token_state = snapshot.state;
        self.stats.restores = self.stats.restores.saturating_add(1);
        #[cfg(any(test, feature = "debug-stats"))]
        log::trace!(
            target: "lexer.engine",
            "restored offset={} state={:#x}",
            snapshot.offset,
            snapshot.state.pack()
        );
        Ok(())
    }

    pub(crate) fn token(&self) -> Option<Token> {
        self.token
    }

    pub(crate) fn token_start(&self) -> usize {
        self.token.map_or(self.end, |token| token.span.start)
    }

    pub(crate) fn state(&self) -> u32 {
        self.token_state.pack()
    }

    pub(crate) fn active_embedment(&self) -> Option<&Embedment> {
        self.active.as_ref().map(|claim| &claim.embedment)
    }

    pub(crate) fn buffer(&self) -> &Arc<str> {
        &self.buffer
    }

    pub(crate) fn end(&self) -> usize {
        self.end
    }

    pub(crate) fn lookahead(&self) -> usize {
        self.base.lookahead().max(self.registry.lookahead())
    }

    pub(crate) fn config(&self) -> EmbeddingConfig {
        self.registry.config()
    }

    pub(crate) fn base(&self) -> &B {
        &self.base
    }

    pub(crate) fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub(crate) fn stats(&self) -> EngineStats {
        self.stats
    }
}
