//! Incremental re-lexing over a token cache.
//!
//! After an edit, tokens that end at least `lookahead` bytes before the edit
//! are kept. Lexing restarts at the nearest earlier token whose state is
//! restartable and stops as soon as a fresh token lines up with an old one
//! past the edit: same shifted start, same restartable state. From there on
//! the old tokens are reused, shifted by the edit's length delta.

use std::sync::Arc;

use crate::error::LexerError;
use crate::lexer::{Lexer, check_char_boundary};
use crate::token::Token;

/// Replacement of `removed` bytes at `offset` by `inserted` bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextEdit {
    pub offset: usize,
    pub removed: usize,
    pub inserted: usize,
}

impl TextEdit {
    pub fn new(offset: usize, removed: usize, inserted: usize) -> Self {
        Self {
            offset,
            removed,
            inserted,
        }
    }

    pub fn insert(offset: usize, len: usize) -> Self {
        Self::new(offset, 0, len)
    }

    pub fn delete(offset: usize, len: usize) -> Self {
        Self::new(offset, len, 0)
    }

    /// Change of the buffer length.
    pub fn delta(&self) -> isize {
        self.inserted as isize - self.removed as isize
    }
}

/// A cached token and the lexer state at its start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LexedToken {
    pub token: Token,
    pub state: u32,
}

/// What one [`TokenCache::apply_edit`] call did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RelexReport {
    /// Offset lexing restarted at, in the new buffer.
    pub restart_offset: usize,
    /// Tokens produced by the lexer.
    pub relexed: usize,
    /// Old tokens reused after resynchronising.
    pub reused: usize,
}

/// Token stream of one buffer, kept current across edits.
pub struct TokenCache<L> {
    lexer: L,
    buffer: Arc<str>,
    tokens: Vec<LexedToken>,
}

impl<L: Lexer> TokenCache<L> {
    /// Lex all of `buffer` from the initial state.
    pub fn build(mut lexer: L, buffer: Arc<str>) -> Result<Self, LexerError> {
        lexer.start(Arc::clone(&buffer), 0, buffer.len(), 0)?;
        let mut tokens = Vec::new();
        while let Some(token) = lexer.token() {
            tokens.push(LexedToken {
                token,
                state: lexer.state(),
            });
            lexer.advance()?;
        }
        log::debug!(
            target: "lexer.incremental",
            "built cache: {} tokens over {} bytes",
            tokens.len(),
            buffer.len()
        );
        Ok(Self {
            lexer,
            buffer,
            tokens,
        })
    }

    pub fn tokens(&self) -> &[LexedToken] {
        &self.tokens
    }

    pub fn buffer(&self) -> &Arc<str> {
        &self.buffer
    }

    pub fn lexer(&self) -> &L {
        &self.lexer
    }

    pub fn into_tokens(self) -> Vec<LexedToken> {
        self.tokens
    }

    /// Bring the cache up to date with `buffer`, which is the old buffer
    /// with `edit` applied. On error the cache is left unchanged.
    pub fn apply_edit(
        &mut self,
        buffer: Arc<str>,
        edit: TextEdit,
    ) -> Result<RelexReport, LexerError> {
        self.check_edit(&buffer, edit)?;

        let lookahead = self.lexer.lookahead();
        let first_affected = self
            .tokens
            .partition_point(|cached| cached.token.span.end + lookahead <= edit.offset);
        let candidates = &self.tokens[..(first_affected + 1).min(self.tokens.len())];
        let keep = candidates.iter().rposition(|cached| {
            cached.token.span.start <= edit.offset && self.lexer.is_restartable_state(cached.state)
        });
        let (keep, restart_offset, restart_state) = match keep {
            Some(index) => (
                index,
                self.tokens[index].token.span.start,
                self.tokens[index].state,
            ),
            None => (0, 0, 0),
        };

        self.lexer
            .start(Arc::clone(&buffer), restart_offset, buffer.len(), restart_state)?;

        let edit_end = edit.offset + edit.inserted;
        let mut old = keep;
        let mut sync = None;
        let mut fresh = Vec::new();
        while let Some(token) = self.lexer.token() {
            let state = self.lexer.state();
            if token.span.start >= edit_end && self.lexer.is_restartable_state(state) {
                let old_start = token.span.start - edit.inserted + edit.removed;
                while old < self.tokens.len() && self.tokens[old].token.span.start < old_start {
                    old += 1;
                }
                if let Some(cached) = self.tokens.get(old)
                    && cached.token.span.start == old_start
                    && cached.state == state
                {
                    sync = Some(old);
                    break;
                }
            }
            fresh.push(LexedToken { token, state });
            self.lexer.advance()?;
        }

        let delta = edit.delta();
        let reused: Vec<LexedToken> = match sync {
            Some(from) => self.tokens[from..]
                .iter()
                .map(|cached| LexedToken {
                    token: Token::new(cached.token.kind, cached.token.span.shifted(delta)),
                    state: cached.state,
                })
                .collect(),
            None => Vec::new(),
        };
        let report = RelexReport {
            restart_offset,
            relexed: fresh.len(),
            reused: reused.len(),
        };
        self.tokens.truncate(keep);
        self.tokens.extend(fresh);
        self.tokens.extend(reused);
        self.buffer = buffer;
        log::debug!(
            target: "lexer.incremental",
            "edit {edit:?}: restart at {} relexed {} reused {}",
            report.restart_offset,
            report.relexed,
            report.reused
        );
        Ok(report)
    }

    fn check_edit(&self, buffer: &str, edit: TextEdit) -> Result<(), LexerError> {
        let old_len = self.buffer.len();
        let removed_end = edit
            .offset
            .checked_add(edit.removed)
            .filter(|&end| end <= old_len)
            .ok_or(LexerError::InvalidRange {
                start: edit.offset,
                end: edit.offset.saturating_add(edit.removed),
                len: old_len,
            })?;
        let inserted_end = edit.offset.saturating_add(edit.inserted);
        if (old_len - edit.removed).checked_add(edit.inserted) != Some(buffer.len()) {
            return Err(LexerError::InvalidRange {
                start: edit.offset,
                end: inserted_end,
                len: buffer.len(),
            });
        }
        check_char_boundary(&self.buffer, edit.offset)?;
        check_char_boundary(&self.buffer, removed_end)?;
        check_char_boundary(buffer, edit.offset)?;
        check_char_boundary(buffer, inserted_end)
    }
}
