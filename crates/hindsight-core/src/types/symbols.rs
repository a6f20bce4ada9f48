//! Native symbol and source location types.

use std::fmt;

use serde::Serialize;

/// Mangling scheme a native symbol was recognised by.
///
/// Node binaries mix all three: V8 and node internals are C++, libuv and
/// libc are C, and native addons may be Rust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SymbolLanguage
{
    /// `_R` (v0) or legacy `_ZN...17h<hash>E` mangling.
    Rust,
    /// Itanium `_Z` mangling.
    Cpp,
    /// No mangling.
    C,
}

impl fmt::Display for SymbolLanguage
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(match self {
            SymbolLanguage::Rust => "rust",
            SymbolLanguage::Cpp => "c++",
            SymbolLanguage::C => "c",
        })
    }
}

/// The function a native frame's pc falls in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolName
{
    raw: String,
    demangled: Option<String>,
    language: SymbolLanguage,
}

impl SymbolName
{
    #[must_use]
    pub fn new(raw: String, demangled: Option<String>, language: SymbolLanguage) -> Self
    {
        Self {
            raw,
            demangled,
            language,
        }
    }

    /// Linkage name as it appears in the symbol table.
    #[must_use]
    pub fn raw(&self) -> &str
    {
        &self.raw
    }

    #[must_use]
    pub fn demangled(&self) -> Option<&str>
    {
        self.demangled.as_deref()
    }

    /// What backtraces print: the demangled name when there is one.
    #[must_use]
    pub fn display_name(&self) -> &str
    {
        self.demangled().unwrap_or(&self.raw)
    }

    #[must_use]
    pub fn language(&self) -> SymbolLanguage
    {
        self.language
    }
}

impl fmt::Display for SymbolName
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.display_name())
    }
}

/// DWARF line-table position of a native pc.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation
{
    pub file: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl fmt::Display for SourceLocation
{
    /// `file:line:column`; a missing line or column prints as 0.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let line = self.line.unwrap_or(0);
        let column = self.column.unwrap_or(0);
        write!(f, "{}:{line}:{column}", self.file)
    }
}
