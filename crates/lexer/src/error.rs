//! Contract violations reported by the lexers.

/// Errors returned when a caller or an embedding provider breaks the lexer
/// contract. None of these are used for normal control flow: "no embedment"
/// is `None`, end of input is a `None` token.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LexerError {
    #[error("base state {state:#x} does not fit the {bits}-bit base state field")]
    BaseStateOverflow { state: u32, bits: u32 },

    #[error("packed state {state:#x} has bits set outside the known fields")]
    StateOutOfRange { state: u32 },

    #[error("state {state:#x} is not restartable; resume from an earlier checkpoint")]
    NonRestartableState { state: u32 },

    #[error("base lexer does not recognise state {state}")]
    UnknownBaseState { state: u32 },

    #[error("invalid scan range {start}..{end} for a buffer of {len} bytes")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("offset {offset} splits a UTF-8 character")]
    SplitCharacter { offset: usize },

    #[error("provider `{provider}` claimed an empty range at offset {offset}")]
    EmptyEmbedment { provider: String, offset: usize },

    #[error(
        "provider `{provider}` claimed {start}..{end} but the current token starts at {token_start}"
    )]
    MisalignedEmbedment {
        provider: String,
        start: usize,
        end: usize,
        token_start: usize,
    },

    #[error("provider `{provider}` claimed {start}..{end} past the scan end {limit}")]
    EmbedmentOutOfBounds {
        provider: String,
        start: usize,
        end: usize,
        limit: usize,
    },

    #[error("provider `{provider}` holds state that cannot be restored from a snapshot")]
    UnrestorableProvider { provider: String },

    #[error("snapshot references provider #{id} but only {registered} providers are registered")]
    ForeignSnapshot { id: usize, registered: usize },

    #[error("embedded state bit {bit} overlaps the packed state fields or exceeds bit 31")]
    InvalidStateBit { bit: u32 },
}
