//! Resolving and intercepting a batch of symbols, tolerating per-symbol failure.

use crate::error::HookError;
use crate::module::Module;
use crate::symbols::SymbolSource;
use crate::trampoline::{Trampoline, TrampolineBuilder};

/// Number of bytes overwritten at the hook site by the redirect jump, and so the minimum
/// prologue length a trampoline must replay before resuming the original function.
const PATCH_LEN: usize = 14;

pub struct HookSpec {
    pub symbol: Box<str>,
    pub replacement: u64,
}

#[derive(Debug)]
pub enum InstallOutcome {
    Installed { symbol: Box<str>, trampoline: Trampoline },
    Unavailable { symbol: Box<str> },
    Failed { symbol: Box<str>, error: HookError },
}

/// Locates and intercepts symbols across a fixed set of loaded [`Module`]s.
///
/// Lookup tries, in order: a privileged internal module's `<prefix>_<name>` shadow symbol, then
/// each of `candidate_libraries` in turn. A symbol found in neither is marked unavailable rather
/// than hooked against a null address.
pub struct HookInstaller<'a> {
    modules: Vec<Module>,
    candidate_libraries: Vec<Box<str>>,
    internal_prefix: Option<Box<str>>,
    symbols: &'a dyn SymbolSource,
    trampoline_builder: &'a dyn TrampolineBuilder,
    errors: Vec<(Box<str>, HookError)>,
}

impl<'a> HookInstaller<'a> {
    pub fn new(
        modules: Vec<Module>,
        candidate_libraries: Vec<Box<str>>,
        internal_prefix: Option<Box<str>>,
        symbols: &'a dyn SymbolSource,
        trampoline_builder: &'a dyn TrampolineBuilder,
    ) -> Self {
        Self {
            modules,
            candidate_libraries,
            internal_prefix,
            symbols,
            trampoline_builder,
            errors: Vec::new(),
        }
    }

    /// Errors collected across every `install` call so far.
    pub fn errors(&self) -> &[(Box<str>, HookError)] {
        &self.errors
    }

    pub fn install(
        &mut self,
        hooks: &[HookSpec],
        mut on_error: Option<&mut dyn FnMut(&str, &HookError)>,
    ) -> Vec<InstallOutcome> {
        hooks.iter().map(|hook| self.install_one(hook, on_error.as_deref_mut())).collect()
    }

    fn resolve(&self, symbol: &str) -> Option<(Module, u64)> {
        if let Some(prefix) = &self.internal_prefix {
            if let Some(module) = self.modules.iter().find(|m| m.is_internal) {
                let prefixed = format!("{prefix}_{symbol}");
                if let Some(addr) = self.symbols.resolve(module, &prefixed) {
                    return Some((module.clone(), addr));
                }
            }
        }
        for name in &self.candidate_libraries {
            if let Some(module) = self.modules.iter().find(|m| m.name == *name) {
                if let Some(addr) = self.symbols.resolve(module, symbol) {
                    return Some((module.clone(), addr));
                }
            }
        }
        None
    }

    fn record_error(
        &mut self,
        symbol: &str,
        error: HookError,
        on_error: Option<&mut dyn FnMut(&str, &HookError)>,
    ) {
        tracing::warn!(symbol, error = %error, "hook installation failed for symbol");
        if let Some(cb) = on_error {
            cb(symbol, &error);
        }
        self.errors.push((Box::from(symbol), error));
    }

    fn install_one(
        &mut self,
        hook: &HookSpec,
        on_error: Option<&mut dyn FnMut(&str, &HookError)>,
    ) -> InstallOutcome {
        let Some((module, address)) = self.resolve(&hook.symbol) else {
            tracing::debug!(symbol = %hook.symbol, "symbol unavailable in any candidate library");
            return InstallOutcome::Unavailable { symbol: hook.symbol.clone() };
        };

        let prologue = match self.symbols.read_bytes(&module, address, PATCH_LEN) {
            Some(bytes) => bytes,
            None => {
                let error = HookError::PrologueUnreadable(hook.symbol.clone());
                self.record_error(&hook.symbol, error.clone(), on_error);
                return InstallOutcome::Failed { symbol: hook.symbol.clone(), error };
            }
        };

        match self.trampoline_builder.build(&prologue, address + PATCH_LEN as u64) {
            Ok(trampoline) => InstallOutcome::Installed { symbol: hook.symbol.clone(), trampoline },
            Err(error) => {
                self.record_error(&hook.symbol, error.clone(), on_error);
                InstallOutcome::Failed { symbol: hook.symbol.clone(), error }
            }
        }
    }
}
