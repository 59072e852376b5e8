//! Packed lexer state codec.
//!
//! Layout of the packed `u32` (bit 0 is least significant):
//!
//! ```text
//!  31          18 17  16 15                 0
//! +--------------+---+---+-------------------+
//! |   reserved   | P | T |    base state     |
//! +--------------+---+---+-------------------+
//! ```
//!
//! - base state: 16 bits owned by the base lexer.
//! - `T`: a tag-name token was seen and its terminator was not yet.
//! - `P`: at least one embedding provider holds opaque state. A value with
//!   `P` set cannot be used to restart scanning.
//!
//! Reserved bits must be zero. Highlighting places its own flag in that range
//! and strips it before decoding (see `HighlightingConfig`).

use crate::error::LexerError;

/// Width of the base lexer's state field.
pub const BASE_STATE_BITS: u32 = 16;
/// Largest base state that fits the packed layout.
pub const MAX_BASE_STATE: u32 = (1 << BASE_STATE_BITS) - 1;
/// Number of low bits used by the packed layout; everything above is reserved.
pub const PACKED_STATE_BITS: u32 = BASE_STATE_BITS + 2;

const WITHIN_TAG_BIT: u32 = 1 << BASE_STATE_BITS;
const PROVIDER_STATE_BIT: u32 = 1 << (BASE_STATE_BITS + 1);
const KNOWN_BITS: u32 = (1 << PACKED_STATE_BITS) - 1;

/// Decoded form of the packed state integer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PackedState {
    base_state: u32,
    within_tag: bool,
    provider_holds_state: bool,
}

impl PackedState {
    /// Initial state of a fresh scan: base state 0, outside tags, cold providers.
    pub const INITIAL: PackedState = PackedState {
        base_state: 0,
        within_tag: false,
        provider_holds_state: false,
    };

    pub fn new(
        base_state: u32,
        within_tag: bool,
        provider_holds_state: bool,
    ) -> Result<Self, LexerError> {
        if base_state > MAX_BASE_STATE {
            return Err(LexerError::BaseStateOverflow {
                state: base_state,
                bits: BASE_STATE_BITS,
            });
        }
        Ok(Self {
            base_state,
            within_tag,
            provider_holds_state,
        })
    }

    pub fn pack(self) -> u32 {
        let mut raw = self.base_state;
        if self.within_tag {
            raw |= WITHIN_TAG_BIT;
        }
        if self.provider_holds_state {
            raw |= PROVIDER_STATE_BIT;
        }
        raw
    }

    pub fn unpack(raw: u32) -> Result<Self, LexerError> {
        if raw & !KNOWN_BITS != 0 {
            return Err(LexerError::StateOutOfRange { state: raw });
        }
        Ok(Self {
            base_state: raw & MAX_BASE_STATE,
            within_tag: raw & WITHIN_TAG_BIT != 0,
            provider_holds_state: raw & PROVIDER_STATE_BIT != 0,
        })
    }

    pub fn base_state(self) -> u32 {
        self.base_state
    }

    pub fn within_tag(self) -> bool {
        self.within_tag
    }

    pub fn provider_holds_state(self) -> bool {
        self.provider_holds_state
    }

    /// A state is restartable when the integer alone reproduces the scan,
    /// i.e. no provider held opaque state when it was taken.
    pub fn is_restartable(self) -> bool {
        !self.provider_holds_state
    }

    /// Restartability check on a raw integer. Values that do not decode are
    /// never restartable.
    pub fn is_restartable_raw(raw: u32) -> bool {
        Self::unpack(raw).is_ok_and(Self::is_restartable)
    }
}
