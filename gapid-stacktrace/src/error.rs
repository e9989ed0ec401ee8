use thiserror::Error;

#[derive(Debug, Error)]
pub enum StacktraceError {
    #[error("unexpected end of crunched stacktrace bitstream")]
    ShortRead,
    #[error("unknown crunch compressor tag {0}")]
    UnknownCompressor(u8),
}
