//! # Executable Images
//!
//! The companion executable of a core dump. It answers three questions:
//!
//! - what value a `v8dbg_*` layout constant has (the values are baked into
//!   the binary's data sections, so no process memory is needed);
//! - which native function contains an address;
//! - which `file:line:column` an address maps to, when DWARF is present.
//!
//! Addresses taken by [`Executable::symbolize`] are *file* addresses; the
//! caller removes the load bias first.

use std::borrow::Cow;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use addr2line::Context;
use gimli::{Dwarf, EndianArcSlice, RunTimeEndian, SectionId};
use object::{Object, ObjectSection, ObjectSegment, ObjectSymbol, SectionKind, SymbolKind};
use once_cell::sync::OnceCell;
use rustc_demangle::try_demangle;
use tracing::{debug, warn};

use crate::error::{HindsightError, HindsightResult};
use crate::layout::ConstantSource;
use crate::types::{Address, Architecture, SourceLocation, SymbolLanguage, SymbolName};

type OwnedReader = EndianArcSlice<RunTimeEndian>;

/// Prefix of the layout constants V8 exports for postmortem debuggers.
const CONSTANT_PREFIX: &str = "v8dbg_";

const DWARF_SECTIONS: &[(SectionId, &str)] = &[
    (SectionId::DebugAbbrev, ".debug_abbrev"),
    (SectionId::DebugAddr, ".debug_addr"),
    (SectionId::DebugInfo, ".debug_info"),
    (SectionId::DebugLine, ".debug_line"),
    (SectionId::DebugLineStr, ".debug_line_str"),
    (SectionId::DebugRanges, ".debug_ranges"),
    (SectionId::DebugRngLists, ".debug_rnglists"),
    (SectionId::DebugStr, ".debug_str"),
    (SectionId::DebugStrOffsets, ".debug_str_offsets"),
    (SectionId::DebugLoc, ".debug_loc"),
    (SectionId::DebugLocLists, ".debug_loclists"),
];

/// A function symbol from the symbol table.
#[derive(Debug, Clone)]
struct FunctionSymbol
{
    address: u64,
    size: u64,
    name: String,
}

/// What a file address resolves to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Symbolication
{
    pub symbol: Option<SymbolName>,
    pub location: Option<SourceLocation>,
}

/// A parsed executable image.
pub struct Executable
{
    path: PathBuf,
    id: u64,
    architecture: Architecture,
    endian: RunTimeEndian,
    base: u64,
    constants: HashMap<String, i64>,
    functions: Vec<FunctionSymbol>,
    debug_sections: HashMap<SectionId, Arc<[u8]>>,
    context: OnceCell<Option<Context<OwnedReader>>>,
}

impl std::fmt::Debug for Executable
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("Executable")
            .field("path", &self.path)
            .field("architecture", &self.architecture)
            .field("constants", &self.constants.len())
            .field("functions", &self.functions.len())
            .finish_non_exhaustive()
    }
}

impl Executable
{
    /// Read and parse the executable at `path`.
    pub fn open(path: impl AsRef<Path>) -> HindsightResult<Self>
    {
        let path = path.as_ref();
        let data = fs::read(path)?;
        Self::parse(path, &data)
    }

    /// Parse executable bytes.
    pub fn parse(path: impl Into<PathBuf>, data: &[u8]) -> HindsightResult<Self>
    {
        let path = path.into();
        let file = object::File::parse(data)
            .map_err(|err| HindsightError::TargetFormat(format!("failed to parse {}: {err}", path.display())))?;

        let endian = if file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };
        let architecture = match file.architecture() {
            object::Architecture::Aarch64 => Architecture::Arm64,
            object::Architecture::X86_64 => Architecture::X86_64,
            _ => Architecture::Unknown("unknown"),
        };
        let base = file.segments().map(|segment| segment.address()).min().unwrap_or(0);

        let mut constants = HashMap::new();
        let mut functions = Vec::new();
        for symbol in file.symbols().chain(file.dynamic_symbols()) {
            let Ok(name) = symbol.name() else {
                continue;
            };
            if name.starts_with(CONSTANT_PREFIX) {
                if let Some(value) = constant_value(&file, &symbol, endian) {
                    constants.insert(name.to_string(), value);
                }
            } else if symbol.kind() == SymbolKind::Text && symbol.is_definition() && !name.is_empty() {
                functions.push(FunctionSymbol {
                    address: symbol.address(),
                    size: symbol.size(),
                    name: name.to_string(),
                });
            }
        }
        functions.sort_by_key(|function| function.address);
        functions.dedup_by_key(|function| function.address);

        let mut debug_sections = HashMap::new();
        for (id, name) in DWARF_SECTIONS {
            if let Some(section) = file.section_by_name(name) {
                let bytes = section
                    .uncompressed_data()
                    .map_err(|err| HindsightError::TargetFormat(format!("failed to read {name}: {err}")))?;
                let bytes: Arc<[u8]> = match bytes {
                    Cow::Borrowed(bytes) => Arc::from(bytes),
                    Cow::Owned(vec) => vec.into(),
                };
                debug_sections.insert(*id, bytes);
            }
        }

        debug!(
            executable = %path.display(),
            %architecture,
            constants = constants.len(),
            functions = functions.len(),
            dwarf = !debug_sections.is_empty(),
            "parsed executable"
        );

        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        data.len().hash(&mut hasher);

        Ok(Self {
            id: hasher.finish(),
            path,
            architecture,
            endian,
            base,
            constants,
            functions,
            debug_sections,
            context: OnceCell::new(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path
    {
        &self.path
    }

    #[must_use]
    pub fn architecture(&self) -> Architecture
    {
        self.architecture
    }

    /// Lowest virtual address of any segment; the load bias is measured
    /// against it.
    #[must_use]
    pub fn base(&self) -> u64
    {
        self.base
    }

    /// Number of `v8dbg_*` constants found.
    #[must_use]
    pub fn constant_count(&self) -> usize
    {
        self.constants.len()
    }

    fn section_reader(&self, id: SectionId) -> OwnedReader
    {
        let data = self
            .debug_sections
            .get(&id)
            .cloned()
            .unwrap_or_else(|| Arc::<[u8]>::from(Vec::new()));
        EndianArcSlice::new(data, self.endian)
    }

    fn line_context(&self) -> Option<&Context<OwnedReader>>
    {
        self.context
            .get_or_init(|| {
                if !self.debug_sections.contains_key(&SectionId::DebugInfo) {
                    return None;
                }
                let dwarf = Dwarf::load(|section| Ok::<_, gimli::Error>(self.section_reader(section)));
                match dwarf.and_then(Context::from_dwarf) {
                    Ok(context) => Some(context),
                    Err(error) => {
                        warn!(executable = %self.path.display(), %error, "unusable DWARF, locations disabled");
                        None
                    }
                }
            })
            .as_ref()
    }

    /// The symbol-table function containing `address`.
    fn function_at(&self, address: u64) -> Option<&FunctionSymbol>
    {
        let index = self.functions.partition_point(|function| function.address <= address);
        let candidate = self.functions.get(index.checked_sub(1)?)?;
        let inside = candidate.size == 0 || address - candidate.address < candidate.size;
        inside.then_some(candidate)
    }

    /// Resolve a file address to a function name and source location.
    #[must_use]
    pub fn symbolize(&self, address: Address) -> Symbolication
    {
        let mut resolved = Symbolication::default();

        if let Some(context) = self.line_context() {
            if let Ok(mut frames) = context.find_frames(address.value()).skip_all_loads() {
                while let Ok(Some(frame)) = frames.next() {
                    if resolved.symbol.is_none() {
                        resolved.symbol = frame
                            .function
                            .as_ref()
                            .and_then(|function| function.raw_name().ok())
                            .map(|raw| make_symbol_name(raw.to_string()));
                    }
                    if resolved.location.is_none() {
                        resolved.location = frame.location.and_then(|location| {
                            location.file.map(|file| SourceLocation {
                                file: file.to_string(),
                                line: location.line,
                                column: location.column,
                            })
                        });
                    }
                }
            }
        }

        if resolved.symbol.is_none() {
            resolved.symbol = self
                .function_at(address.value())
                .map(|function| make_symbol_name(function.name.clone()));
        }
        resolved
    }
}

impl ConstantSource for Executable
{
    fn resolve_constant(&self, name: &str) -> Option<i64>
    {
        self.constants.get(name).copied()
    }

    fn target_id(&self) -> u64
    {
        self.id
    }
}

/// Read the integer a `v8dbg_*` symbol points at.
///
/// Zero-initialised constants live in `.bss`, which has no file data.
fn constant_value<'data>(
    file: &object::File<'data>,
    symbol: &object::Symbol<'data, '_>,
    endian: RunTimeEndian,
) -> Option<i64>
{
    let section = file.section_by_index(symbol.section_index()?).ok()?;
    if section.kind() == SectionKind::UninitializedData {
        return Some(0);
    }

    let width = match symbol.size() {
        8 => 8,
        _ => 4,
    };
    let bytes = section.data_range(symbol.address(), width).ok()??;
    let little = endian == RunTimeEndian::Little;
    Some(if width == 8 {
        let raw: [u8; 8] = bytes.try_into().ok()?;
        if little {
            i64::from_le_bytes(raw)
        } else {
            i64::from_be_bytes(raw)
        }
    } else {
        let raw: [u8; 4] = bytes.try_into().ok()?;
        i64::from(if little {
            i32::from_le_bytes(raw)
        } else {
            i32::from_be_bytes(raw)
        })
    })
}

/// Build a [`SymbolName`] from a raw linkage name.
///
/// Only Rust manglings are demangled; C++ names are kept raw and tagged.
pub(crate) fn make_symbol_name(raw: String) -> SymbolName
{
    let language = if raw.starts_with("_R") || has_legacy_rust_hash(&raw) {
        SymbolLanguage::Rust
    } else if raw.starts_with("_Z") {
        SymbolLanguage::Cpp
    } else {
        SymbolLanguage::C
    };
    let demangled = match language {
        SymbolLanguage::Rust => try_demangle(&raw).ok().map(|name| format!("{name:#}")),
        _ => None,
    };
    SymbolName::new(raw, demangled, language)
}

/// Legacy Rust symbols end in `17h` plus a 16-digit hex hash and `E`.
fn has_legacy_rust_hash(raw: &str) -> bool
{
    raw.starts_with("_ZN")
        && raw.rsplit_once("17h").is_some_and(|(_, tail)| {
            tail.len() == 17 && tail.ends_with('E') && tail[..16].bytes().all(|byte| byte.is_ascii_hexdigit())
        })
}

#[cfg(test)]
mod tests
{
    use object::write::{self, StandardSection};
    use object::{BinaryFormat, Endianness, SymbolFlags, SymbolScope};

    use super::*;

    fn add_symbol(
        object: &mut write::Object<'_>,
        name: &str,
        section: write::SectionId,
        value: u64,
        size: u64,
        kind: SymbolKind,
    )
    {
        object.add_symbol(write::Symbol {
            name: name.as_bytes().to_vec(),
            value,
            size,
            kind,
            scope: SymbolScope::Dynamic,
            weak: false,
            section: write::SymbolSection::Section(section),
            flags: SymbolFlags::None,
        });
    }

    fn sample() -> Vec<u8>
    {
        let mut object = write::Object::new(BinaryFormat::Elf, object::Architecture::X86_64, Endianness::Little);

        let data = object.section_id(StandardSection::Data);
        let tag = object.append_section_data(data, &1i32.to_le_bytes(), 4);
        add_symbol(&mut object, "v8dbg_HeapObjectTag", data, tag, 4, SymbolKind::Data);
        let negative = object.append_section_data(data, &(-8i32).to_le_bytes(), 4);
        add_symbol(&mut object, "v8dbg_off_fp_context", data, negative, 4, SymbolKind::Data);

        let bss = object.section_id(StandardSection::UninitializedData);
        let zero = object.append_section_bss(bss, 4, 4);
        add_symbol(&mut object, "v8dbg_SmiTag", bss, zero, 4, SymbolKind::Data);

        let text = object.section_id(StandardSection::Text);
        let first = object.append_section_data(text, &[0xc3; 32], 16);
        add_symbol(&mut object, "_ZN2v88internal4Heap7CollectEv", text, first, 16, SymbolKind::Text);
        add_symbol(&mut object, "uv_run", text, first + 16, 16, SymbolKind::Text);

        object.write().unwrap()
    }

    #[test]
    fn test_resolves_constants()
    {
        let executable = Executable::parse("node", &sample()).unwrap();
        assert_eq!(executable.resolve_constant("v8dbg_HeapObjectTag"), Some(1));
        assert_eq!(executable.resolve_constant("v8dbg_off_fp_context"), Some(-8));
        assert_eq!(executable.resolve_constant("v8dbg_SmiTag"), Some(0));
        assert_eq!(executable.resolve_constant("v8dbg_Missing"), None);
        assert_eq!(executable.constant_count(), 3);
        assert_eq!(executable.architecture(), Architecture::X86_64);
    }

    #[test]
    fn test_symbolize_from_symbol_table()
    {
        let executable = Executable::parse("node", &sample()).unwrap();

        let heap = executable.symbolize(Address::new(4)).symbol.unwrap();
        assert_eq!(heap.raw(), "_ZN2v88internal4Heap7CollectEv");
        assert_eq!(heap.language(), SymbolLanguage::Cpp);

        let resolved = executable.symbolize(Address::new(20));
        assert_eq!(resolved.symbol.unwrap().display_name(), "uv_run");
        assert_eq!(resolved.location, None);
        assert!(executable.symbolize(Address::new(0x1000)).symbol.is_none());
    }

    #[test]
    fn test_target_id_tracks_path()
    {
        let bytes = sample();
        let a = Executable::parse("a/node", &bytes).unwrap();
        let b = Executable::parse("b/node", &bytes).unwrap();
        assert_ne!(a.target_id(), b.target_id());
        assert_eq!(a.target_id(), Executable::parse("a/node", &bytes).unwrap().target_id());
    }

    #[test]
    fn test_symbol_languages()
    {
        let rust = make_symbol_name("_ZN4core3fmt5write17h0123456789abcdefE".to_string());
        assert_eq!(rust.language(), SymbolLanguage::Rust);
        assert_eq!(rust.display_name(), "core::fmt::write");

        let cpp = make_symbol_name("_ZN2v88internal7Isolate5ThrowEv".to_string());
        assert_eq!(cpp.language(), SymbolLanguage::Cpp);
        assert_eq!(cpp.demangled(), None);

        assert_eq!(make_symbol_name("main".to_string()).language(), SymbolLanguage::C);
    }
}
