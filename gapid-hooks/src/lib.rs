pub mod error;
pub mod installer;
pub mod module;
pub mod symbols;
pub mod trampoline;

pub use error::HookError;
pub use installer::{HookInstaller, HookSpec, InstallOutcome};
pub use module::{Module, Symbol};
pub use symbols::{ObjectSymbolSource, StaticSymbolSource, SymbolSource};
pub use trampoline::{Trampoline, TrampolineBuilder, Unsupported, X86_64TrampolineBuilder};
