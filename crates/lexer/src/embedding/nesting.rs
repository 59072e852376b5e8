//! Nesting limit for layered lexers.

/// Depth at which registries stop layering further embeddings.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 4;

/// Embedding configuration threaded through registry construction and
/// secondary lexer factories.
///
/// Each embedded lexer is built with [`EmbeddingConfig::nested`], so a
/// document that embeds markup inside script inside markup ends up with
/// empty registries once `max_depth` is reached instead of creating lexers
/// without bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmbeddingConfig {
    depth: usize,
    max_depth: usize,
}

impl EmbeddingConfig {
    pub fn new(max_depth: usize) -> Self {
        Self {
            depth: 0,
            max_depth,
        }
    }

    /// Configuration that never layers embeddings.
    pub fn disabled() -> Self {
        Self::new(0)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn layering_enabled(&self) -> bool {
        self.depth < self.max_depth
    }

    /// Configuration for a lexer embedded one level deeper.
    pub fn nested(&self) -> Self {
        Self {
            depth: self.depth.saturating_add(1),
            max_depth: self.max_depth,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NESTING_DEPTH)
    }
}
