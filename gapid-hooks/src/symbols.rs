//! Looking up addresses and raw bytes within a loaded [`Module`], behind a trait so
//! [`crate::installer::HookInstaller`] is testable without a real process image.

use crate::error::HookError;
use crate::module::Module;

pub trait SymbolSource {
    /// Resolves `symbol` within `module`, returning its absolute address if exported.
    fn resolve(&self, module: &Module, symbol: &str) -> Option<u64>;

    /// Reads `len` bytes starting at `address` within `module`, used to capture the original
    /// prologue before a [`crate::trampoline::TrampolineBuilder`] overwrites it.
    fn read_bytes(&self, module: &Module, address: u64, len: usize) -> Option<Vec<u8>>;
}

/// Parses an in-memory module image with the `object` crate's unified ELF/Mach-O/PE reader.
pub struct ObjectSymbolSource<'a> {
    image: &'a [u8],
}

impl<'a> ObjectSymbolSource<'a> {
    pub fn new(image: &'a [u8]) -> Self {
        Self { image }
    }

    fn parse(&self) -> Result<object::File<'a>, HookError> {
        object::File::parse(self.image).map_err(|e| HookError::Malformed(e.to_string().into_boxed_str()))
    }
}

impl SymbolSource for ObjectSymbolSource<'_> {
    fn resolve(&self, _module: &Module, symbol: &str) -> Option<u64> {
        use object::{Object, ObjectSymbol};

        let file = self.parse().ok()?;
        file.symbols().find(|s| s.name().ok() == Some(symbol)).map(|s| s.address())
    }

    fn read_bytes(&self, _module: &Module, address: u64, len: usize) -> Option<Vec<u8>> {
        use object::{Object, ObjectSection};

        let file = self.parse().ok()?;
        file.sections().find_map(|section| {
            let start = section.address();
            let data = section.data().ok()?;
            if address < start || address + len as u64 > start + data.len() as u64 {
                return None;
            }
            let offset = (address - start) as usize;
            Some(data[offset..offset + len].to_vec())
        })
    }
}

/// An in-memory stand-in for tests and for platforms with no real dynamic-linker integration:
/// a fixed map of `(module name, symbol name) -> address` plus raw bytes at each address.
#[derive(Default)]
pub struct StaticSymbolSource {
    symbols: std::collections::HashMap<(Box<str>, Box<str>), u64>,
    bytes: std::collections::HashMap<(Box<str>, u64), Vec<u8>>,
}

impl StaticSymbolSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbol(mut self, module: &str, symbol: &str, address: u64) -> Self {
        self.symbols.insert((module.into(), symbol.into()), address);
        self
    }

    pub fn with_bytes(mut self, module: &str, address: u64, bytes: Vec<u8>) -> Self {
        self.bytes.insert((module.into(), address), bytes);
        self
    }
}

impl SymbolSource for StaticSymbolSource {
    fn resolve(&self, module: &Module, symbol: &str) -> Option<u64> {
        self.symbols.get(&(module.name.clone(), Box::from(symbol))).copied()
    }

    fn read_bytes(&self, module: &Module, address: u64, len: usize) -> Option<Vec<u8>> {
        self.bytes.get(&(module.name.clone(), address)).map(|b| b.iter().take(len).copied().collect())
    }
}
