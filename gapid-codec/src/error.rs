use crate::vle::VleError;

/// Errors produced while decoding a stream.
///
/// `ShortRead`, `MalformedEncoding`, and the sid-lookup errors are all fatal for the stream they
/// occur in: once one of these is returned, the reader's interning state is no longer trusted and
/// the stream must be discarded.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("unexpected end of input")]
    ShortRead,

    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),

    #[error("unknown entity sid {0}")]
    UnknownEntitySid(u32),

    #[error("unknown object sid {0}")]
    UnknownObjectSid(u32),

    #[error("record would exceed the configured per-record size cap of {cap} bytes")]
    PayloadTooLarge { cap: usize },

    #[error("invalid utf-8 in string field")]
    InvalidUtf8,
}

impl From<VleError> for CodecError {
    fn from(_: VleError) -> Self {
        CodecError::ShortRead
    }
}
