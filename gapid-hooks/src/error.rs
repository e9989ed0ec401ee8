use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum HookError {
    #[error("could not read the original prologue bytes for {0:?}")]
    PrologueUnreadable(Box<str>),
    #[error("no trampoline builder is available for this target architecture")]
    UnsupportedArchitecture,
    #[error("failed to parse symbol table: {0}")]
    Malformed(Box<str>),
}
