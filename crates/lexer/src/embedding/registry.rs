//! Ordered provider registry and claim negotiation.

use std::collections::BTreeMap;

use super::{EmbeddingConfig, EmbeddingProvider, Embedment, ProviderState, TokenContext};
use crate::error::LexerError;

/// Identity of a registered provider. Ids follow registration order, so a
/// lower id means higher priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderId(usize);

impl ProviderId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Winning claim for the current token.
#[derive(Clone, Debug)]
pub(crate) struct Claim {
    pub(crate) provider: ProviderId,
    pub(crate) embedment: Embedment,
}

type BoxedProvider = Box<dyn EmbeddingProvider + Send>;

/// Providers in fixed priority order.
pub struct ProviderRegistry {
    config: EmbeddingConfig,
    providers: Vec<BoxedProvider>,
}

impl ProviderRegistry {
    pub fn builder(config: EmbeddingConfig) -> ProviderRegistryBuilder {
        ProviderRegistryBuilder {
            config,
            providers: Vec::new(),
        }
    }

    /// Registry without providers: the layered lexer reports base tokens only.
    pub fn empty(config: EmbeddingConfig) -> Self {
        Self {
            config,
            providers: Vec::new(),
        }
    }

    pub fn config(&self) -> EmbeddingConfig {
        self.config
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ProviderId> + '_ {
        (0..self.providers.len()).map(ProviderId)
    }

    pub fn name(&self, id: ProviderId) -> Option<&str> {
        self.providers.get(id.0).map(|provider| provider.name())
    }

    pub(crate) fn holds_state(&self) -> bool {
        self.providers.iter().any(|provider| provider.holds_state())
    }

    pub(crate) fn lookahead(&self) -> usize {
        self.providers
            .iter()
            .map(|provider| provider.lookahead())
            .max()
            .unwrap_or(0)
    }

    /// Offer `token` to every provider; the first claim wins and all other
    /// providers drop theirs.
    pub(crate) fn negotiate(
        &mut self,
        token: &TokenContext<'_>,
    ) -> Result<Option<Claim>, LexerError> {
        let mut winner: Option<Claim> = None;
        for (index, provider) in self.providers.iter_mut().enumerate() {
            let claim = provider.try_claim(token);
            if winner.is_none()
                && let Some(embedment) = claim
            {
                winner = Some(Claim {
                    provider: ProviderId(index),
                    embedment,
                });
            }
        }
        let Some(claim) = winner else {
            return Ok(None);
        };
        for (index, provider) in self.providers.iter_mut().enumerate() {
            if index != claim.provider.0 {
                provider.clear_embedment();
            }
        }
        self.check_claim(&claim, token)?;
        Ok(Some(claim))
    }

    fn check_claim(&self, claim: &Claim, token: &TokenContext<'_>) -> Result<(), LexerError> {
        let range = claim.embedment.range();
        let provider = || {
            self.name(claim.provider)
                .unwrap_or("<unregistered>")
                .to_string()
        };
        if range.is_empty() {
            return Err(LexerError::EmptyEmbedment {
                provider: provider(),
                offset: range.start,
            });
        }
        if range.start != token.span.start {
            return Err(LexerError::MisalignedEmbedment {
                provider: provider(),
                start: range.start,
                end: range.end,
                token_start: token.span.start,
            });
        }
        if range.end > token.scan_end {
            return Err(LexerError::EmbedmentOutOfBounds {
                provider: provider(),
                start: range.start,
                end: range.end,
                limit: token.scan_end,
            });
        }
        Ok(())
    }

    /// Opaque state of every provider that currently holds some.
    pub(crate) fn states(&self) -> BTreeMap<ProviderId, ProviderState> {
        self.providers
            .iter()
            .enumerate()
            .filter_map(|(index, provider)| provider.state().map(|state| (ProviderId(index), state)))
            .collect()
    }

    /// Re-install snapshot state. Validates the whole map before touching
    /// any provider, so a failed restore leaves the registry unchanged.
    pub(crate) fn restore_states(
        &mut self,
        states: &BTreeMap<ProviderId, ProviderState>,
    ) -> Result<(), LexerError> {
        self.check_states(states)?;
        self.install_states(states);
        Ok(())
    }

    /// Whether `states` can be installed: every id is registered and every
    /// state is restorable.
    pub(crate) fn check_states(
        &self,
        states: &BTreeMap<ProviderId, ProviderState>,
    ) -> Result<(), LexerError> {
        for (id, state) in states {
            let Some(provider) = self.providers.get(id.0) else {
                return Err(LexerError::ForeignSnapshot {
                    id: id.0,
                    registered: self.providers.len(),
                });
            };
            if !state.is_restorable() {
                return Err(LexerError::UnrestorableProvider {
                    provider: provider.name().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Install states already accepted by [`Self::check_states`]; providers
    /// missing from the map start cold.
    pub(crate) fn install_states(&mut self, states: &BTreeMap<ProviderId, ProviderState>) {
        for (index, provider) in self.providers.iter_mut().enumerate() {
            provider.restore_state(states.get(&ProviderId(index)));
        }
    }

    /// Drop all opaque state: every provider starts cold.
    pub(crate) fn cold_start(&mut self) {
        for provider in &mut self.providers {
            provider.restore_state(None);
        }
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("config", &self.config)
            .field(
                "providers",
                &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Collects providers; the registration order becomes the priority order.
pub struct ProviderRegistryBuilder {
    config: EmbeddingConfig,
    providers: Vec<BoxedProvider>,
}

impl ProviderRegistryBuilder {
    pub fn provider(mut self, provider: impl EmbeddingProvider + Send + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn build(self) -> ProviderRegistry {
        if !self.config.layering_enabled() && !self.providers.is_empty() {
            log::debug!(
                target: "lexer.embedding",
                "embedding disabled at depth {} (max {}); dropping {} provider(s)",
                self.config.depth(),
                self.config.max_depth(),
                self.providers.len()
            );
            return ProviderRegistry::empty(self.config);
        }
        ProviderRegistry {
            config: self.config,
            providers: self.providers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Span, TokenKind};

    const TEXT: TokenKind = TokenKind::new("test", "TEXT");
    const EMBED: TokenKind = TokenKind::new("test", "EMBED");

    /// Claims `len` bytes at `at`; records clears.
    struct Fixed {
        name: &'static str,
        at: usize,
        len: usize,
        cleared: usize,
        seen: usize,
    }

    impl Fixed {
        fn new(name: &'static str, at: usize, len: usize) -> Self {
            Self {
                name,
                at,
                len,
                cleared: 0,
                seen: 0,
            }
        }
    }

    impl EmbeddingProvider for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn try_claim(&mut self, token: &TokenContext<'_>) -> Option<Embedment> {
            self.seen += 1;
            (token.span.start == self.at).then(|| {
                Embedment::new(Span::new(self.at, self.at + self.len), EMBED, 0)
            })
        }

        fn clear_embedment(&mut self) {
            self.cleared += 1;
        }

        fn state(&self) -> Option<ProviderState> {
            (self.seen > 0).then(|| ProviderState::restorable(self.seen))
        }

        fn restore_state(&mut self, state: Option<&ProviderState>) {
            self.seen = state
                .and_then(|s| s.downcast_ref::<usize>())
                .copied()
                .unwrap_or(0);
        }
    }

    fn context(buffer: &str, start: usize, end: usize) -> TokenContext<'_> {
        TokenContext {
            kind: TEXT,
            span: Span::new(start, end),
            base_state: 0,
            within_tag: false,
            buffer,
            scan_end: buffer.len(),
        }
    }

    #[test]
    fn first_registered_claim_wins() {
        let mut registry = ProviderRegistry::builder(EmbeddingConfig::default())
            .provider(Fixed::new("p1", 0, 3))
            .provider(Fixed::new("p2", 0, 5))
            .build();
        let buffer = "abcdefgh";
        let claim = registry
            .negotiate(&context(buffer, 0, 1))
            .unwrap()
            .expect("p1 claims offset 0");
        assert_eq!(claim.provider, ProviderId(0));
        assert_eq!(claim.embedment.range(), Span::new(0, 3));
    }

    #[test]
    fn unclaimed_token_keeps_provider_tracking() {
        let mut registry = ProviderRegistry::builder(EmbeddingConfig::default())
            .provider(Fixed::new("p1", 4, 1))
            .build();
        assert!(registry.negotiate(&context("abcdef", 0, 1)).unwrap().is_none());
        assert!(registry.holds_state());
    }

    #[test]
    fn empty_claim_is_a_contract_violation() {
        let mut registry = ProviderRegistry::builder(EmbeddingConfig::default())
            .provider(Fixed::new("empty", 0, 0))
            .build();
        let err = registry.negotiate(&context("abc", 0, 1)).unwrap_err();
        assert_eq!(
            err,
            LexerError::EmptyEmbedment {
                provider: "empty".to_string(),
                offset: 0,
            }
        );
    }

    #[test]
    fn claim_past_scan_end_is_rejected() {
        let mut registry = ProviderRegistry::builder(EmbeddingConfig::default())
            .provider(Fixed::new("long", 0, 10))
            .build();
        assert!(matches!(
            registry.negotiate(&context("abc", 0, 1)),
            Err(LexerError::EmbedmentOutOfBounds { limit: 3, .. })
        ));
    }

    #[test]
    fn restore_rejects_unrestorable_state_without_side_effects() {
        let mut registry = ProviderRegistry::builder(EmbeddingConfig::default())
            .provider(Fixed::new("p1", 9, 1))
            .build();
        registry.negotiate(&context("abc", 0, 1)).unwrap();
        let mut states = BTreeMap::new();
        states.insert(ProviderId(0), ProviderState::NotRestorable);
        assert!(matches!(
            registry.restore_states(&states),
            Err(LexerError::UnrestorableProvider { .. })
        ));
        assert!(registry.holds_state(), "failed restore must not cold-start");

        states.clear();
        states.insert(ProviderId(3), ProviderState::restorable(1usize));
        assert_eq!(
            registry.restore_states(&states),
            Err(LexerError::ForeignSnapshot {
                id: 3,
                registered: 1
            })
        );
    }

    #[test]
    fn builder_drops_providers_past_max_depth() {
        let registry = ProviderRegistry::builder(EmbeddingConfig::disabled())
            .provider(Fixed::new("p1", 0, 1))
            .build();
        assert!(registry.is_empty());
    }
}
