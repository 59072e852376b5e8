//! Deep point-in-time view of a layered lexer.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::embedding::{Claim, Embedment, ProviderId, ProviderState};
use crate::lexer::LexerPosition;
use crate::state::PackedState;
use crate::token::Token;

/// Everything needed to resume a layered lexer exactly where it was.
///
/// Snapshots are immutable and can be restored any number of times. Unlike
/// the packed state integer they carry provider opaque state, so they are
/// valid even where the packed state is not restartable; they are never
/// meant to outlive the buffer they were taken on.
#[derive(Clone, Debug)]
pub struct PositionSnapshot {
    pub(crate) buffer: Arc<str>,
    pub(crate) end: usize,
    pub(crate) offset: usize,
    pub(crate) state: PackedState,
    pub(crate) base: LexerPosition,
    pub(crate) providers: BTreeMap<ProviderId, ProviderState>,
    pub(crate) within_tag: bool,
    pub(crate) active: Option<Claim>,
    pub(crate) token: Option<Token>,
}

impl PositionSnapshot {
    /// Start offset of the token that was current (scan end at EOF).
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Packed state at that offset.
    pub fn state(&self) -> u32 {
        self.state.pack()
    }

    pub fn packed_state(&self) -> PackedState {
        self.state
    }

    pub fn token(&self) -> Option<Token> {
        self.token
    }

    pub fn base_position(&self) -> &LexerPosition {
        &self.base
    }

    /// Providers that held opaque state, keyed by identity.
    pub fn provider_states(&self) -> &BTreeMap<ProviderId, ProviderState> {
        &self.providers
    }

    pub fn active_embedment(&self) -> Option<&Embedment> {
        self.active.as_ref().map(|claim| &claim.embedment)
    }

    /// False when some provider reported state it cannot restore; such a
    /// snapshot is rejected by `restore`.
    pub fn is_restorable(&self) -> bool {
        self.providers.values().all(ProviderState::is_restorable)
    }
}
