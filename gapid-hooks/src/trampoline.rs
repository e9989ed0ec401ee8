//! Building a trampoline: a small generated stub that replays a hooked function's original
//! prologue bytes and then jumps back into the original function just past that prologue. The
//! encoding is architecture-specific, so it lives behind [`TrampolineBuilder`] — one
//! implementation per target, chosen at [`crate::installer::HookInstaller`] construction time.

use crate::error::HookError;

/// A generated stub plus the address execution resumes at once the stub has replayed the
/// original prologue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trampoline {
    pub code: Vec<u8>,
    pub resume_address: u64,
}

pub trait TrampolineBuilder {
    /// Emits a trampoline that replays `prologue` (the bytes about to be overwritten at the
    /// hook site) and then jumps to `resume_address`.
    fn build(&self, prologue: &[u8], resume_address: u64) -> Result<Trampoline, HookError>;
}

/// Emits `prologue` verbatim followed by a `movabs rax, resume_address; jmp rax` sequence
/// (`48 B8 <imm64>` then `FF E0`), the standard absolute-jump-through-register idiom used when
/// the resume address can't be reached with a relative `jmp`.
pub struct X86_64TrampolineBuilder;

impl TrampolineBuilder for X86_64TrampolineBuilder {
    fn build(&self, prologue: &[u8], resume_address: u64) -> Result<Trampoline, HookError> {
        let mut code = Vec::with_capacity(prologue.len() + 12);
        code.extend_from_slice(prologue);
        code.push(0x48);
        code.push(0xB8);
        code.extend_from_slice(&resume_address.to_le_bytes());
        code.push(0xFF);
        code.push(0xE0);
        Ok(Trampoline { code, resume_address })
    }
}

/// The fallback for targets with no generator: always reports the architecture as unsupported
/// rather than silently emitting a no-op stub.
pub struct Unsupported;

impl TrampolineBuilder for Unsupported {
    fn build(&self, _prologue: &[u8], _resume_address: u64) -> Result<Trampoline, HookError> {
        Err(HookError::UnsupportedArchitecture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x86_64_trampoline_appends_movabs_jmp_after_prologue() {
        let prologue = vec![0x55, 0x48, 0x89, 0xE5];
        let trampoline = X86_64TrampolineBuilder.build(&prologue, 0xdead_beef_0000).unwrap();
        assert_eq!(&trampoline.code[..4], &prologue[..]);
        assert_eq!(trampoline.code[4], 0x48);
        assert_eq!(trampoline.code[5], 0xB8);
        assert_eq!(&trampoline.code[6..14], &0xdead_beef_0000u64.to_le_bytes());
        assert_eq!(&trampoline.code[14..16], &[0xFF, 0xE0]);
        assert_eq!(trampoline.resume_address, 0xdead_beef_0000);
    }

    #[test]
    fn unsupported_always_errors() {
        assert!(matches!(Unsupported.build(&[], 0), Err(HookError::UnsupportedArchitecture)));
    }
}
