//! # Targets
//!
//! Where decoded memory, layout constants and threads come from.
//!
//! The inspector only talks to three narrow traits:
//!
//! - [`MemoryAccess`] for bytes and words,
//! - [`ConstantSource`] for `v8dbg_*` layout constants,
//! - [`ThreadSource`] for threads and their raw native frames.
//!
//! [`CoreTarget`] implements all three for a Linux core dump paired with the
//! executable that produced it. Tests implement them with the mocks in
//! [`crate::mock`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use hindsight_core::inspect::Inspector;
//! use hindsight_core::layout::Layout;
//! use hindsight_core::target::CoreTarget;
//!
//! let target = CoreTarget::open("core.1234", "/usr/bin/node")?;
//! let layout = Arc::new(Layout::load(&target));
//! let inspector = Inspector::new(&target, &target, layout);
//! for thread in inspector.threads()? {
//!     println!("thread {} ({})", thread.index, thread.id);
//! }
//! # Ok::<(), hindsight_core::HindsightError>(())
//! ```

mod elf;
mod image;
mod walk;

use std::path::Path;

use tracing::debug;

pub use elf::{ElfCore, Mapping};
pub use image::{Executable, Symbolication};
pub use walk::{walk_frame_pointers, MAX_FRAMES};

use crate::error::{HindsightError, HindsightResult};
use crate::layout::ConstantSource;
use crate::memory::MemoryAccess;
use crate::types::{Address, NativeFrame, ThreadInfo};

/// Threads of the captured process and their physical frames.
pub trait ThreadSource
{
    /// All threads, in the order `native_frames` indexes them.
    fn threads(&self) -> HindsightResult<Vec<ThreadInfo>>;

    /// Raw frames of thread `thread`, innermost first.
    ///
    /// Frames inside file-backed modules carry their module path and, when
    /// the target can resolve it, a native symbol and source location.
    fn native_frames(&self, thread: usize) -> HindsightResult<Vec<NativeFrame>>;
}

/// A core dump together with its executable.
#[derive(Debug)]
pub struct CoreTarget
{
    core: ElfCore,
    executable: Executable,
    load_bias: Option<u64>,
}

impl CoreTarget
{
    /// Open a core file and the executable that produced it.
    pub fn open(core: impl AsRef<Path>, executable: impl AsRef<Path>) -> HindsightResult<Self>
    {
        Ok(Self::new(ElfCore::open(core)?, Executable::open(executable)?))
    }

    /// Pair an already parsed core and executable.
    #[must_use]
    pub fn new(core: ElfCore, executable: Executable) -> Self
    {
        let name = executable.path().file_name();
        let load_bias = core
            .mappings()
            .iter()
            .filter(|mapping| name.is_some() && Path::new(&mapping.path).file_name() == name)
            .min_by_key(|mapping| mapping.offset)
            .map(|mapping| mapping.start.value().wrapping_sub(executable.base()));

        if load_bias.is_none() {
            debug!(executable = %executable.path().display(), "executable not mapped in core, native symbols disabled");
        }
        Self {
            core,
            executable,
            load_bias,
        }
    }

    #[must_use]
    pub fn core(&self) -> &ElfCore
    {
        &self.core
    }

    #[must_use]
    pub fn executable(&self) -> &Executable
    {
        &self.executable
    }

    /// Attach module, symbol and location to a walked frame.
    fn annotate(&self, frame: &mut NativeFrame)
    {
        let Some(mapping) = self.core.mapping_for(frame.pc) else {
            return;
        };
        frame.module = Some(mapping.path.clone());

        let Some(bias) = self.load_bias else {
            return;
        };
        if Path::new(&mapping.path).file_name() != self.executable.path().file_name() {
            return;
        }
        // Caller frames hold return addresses; step back into the call.
        let pc = if frame.index == 0 {
            frame.pc.value()
        } else {
            frame.pc.value().saturating_sub(1)
        };
        let resolved = self.executable.symbolize(Address::new(pc.wrapping_sub(bias)));
        frame.symbol = resolved.symbol;
        frame.location = resolved.location;
    }
}

impl MemoryAccess for CoreTarget
{
    fn read_bytes(&self, address: Address, len: usize) -> HindsightResult<Vec<u8>>
    {
        self.core.read_bytes(address, len)
    }

    fn read_unsigned(&self, address: Address, width: usize) -> HindsightResult<u64>
    {
        self.core.read_unsigned(address, width)
    }

    fn generation(&self) -> u64
    {
        self.core.generation()
    }
}

impl ConstantSource for CoreTarget
{
    fn resolve_constant(&self, name: &str) -> Option<i64>
    {
        self.executable.resolve_constant(name)
    }

    fn target_id(&self) -> u64
    {
        self.executable.target_id()
    }
}

impl ThreadSource for CoreTarget
{
    fn threads(&self) -> HindsightResult<Vec<ThreadInfo>>
    {
        Ok(self.core.threads().to_vec())
    }

    fn native_frames(&self, thread: usize) -> HindsightResult<Vec<NativeFrame>>
    {
        let info = self
            .core
            .threads()
            .get(thread)
            .ok_or_else(|| HindsightError::InvalidArgument(format!("no thread at index {thread}")))?;

        let mut frames = walk_frame_pointers(&self.core, &info.registers);
        for frame in &mut frames {
            self.annotate(frame);
        }
        Ok(frames)
    }
}

#[cfg(test)]
mod tests
{
    use object::write::{self, StandardSection};
    use object::{BinaryFormat, Endianness, SymbolFlags, SymbolKind, SymbolScope};

    use super::elf::fixture::CoreImage;
    use super::*;

    fn executable() -> Executable
    {
        let mut image = write::Object::new(BinaryFormat::Elf, object::Architecture::X86_64, Endianness::Little);
        let text = image.section_id(StandardSection::Text);
        let offset = image.append_section_data(text, &[0x90; 64], 16);
        image.add_symbol(write::Symbol {
            name: b"uv_run".to_vec(),
            value: offset,
            size: 64,
            kind: SymbolKind::Text,
            scope: SymbolScope::Dynamic,
            weak: false,
            section: write::SymbolSection::Section(text),
            flags: SymbolFlags::None,
        });
        Executable::parse("/usr/bin/node", &image.write().unwrap()).unwrap()
    }

    /// One thread: a native frame in `node`, then a frame outside any
    /// mapping (JIT code), then the end of the chain.
    fn target() -> CoreTarget
    {
        let mut stack = vec![0u8; 0x40];
        stack[0x10..0x18].copy_from_slice(&0x7ff0_0030u64.to_le_bytes());
        stack[0x18..0x20].copy_from_slice(&0x3a00_1234u64.to_le_bytes());
        let bytes = CoreImage::new(object::elf::EM_X86_64)
            .thread(100, 11, 0x40_0010, 0x7ff0_0000, 0x7ff0_0010)
            .files(&[(0x40_0000, 0x40_1000, 0, "/usr/bin/node")])
            .load(0x7ff0_0000, &stack, 0x40)
            .build();
        CoreTarget::new(ElfCore::parse("core", bytes).unwrap(), executable())
    }

    #[test]
    fn test_native_frames_are_annotated()
    {
        let target = target();
        let frames = target.native_frames(0).unwrap();
        assert_eq!(frames.len(), 2);

        assert!(frames[0].is_native());
        assert_eq!(frames[0].module.as_deref(), Some("/usr/bin/node"));
        assert_eq!(frames[0].symbol.as_ref().map(|symbol| symbol.display_name()), Some("uv_run"));

        assert!(!frames[1].is_native());
        assert_eq!(frames[1].pc, Address::new(0x3a00_1234));
        assert_eq!(frames[1].fp, Address::new(0x7ff0_0030));
    }

    #[test]
    fn test_collaborators_delegate()
    {
        let target = target();
        assert_eq!(target.threads().unwrap()[0].stop_signal, Some(11));
        assert_eq!(target.read_pointer(Address::new(0x7ff0_0010)).unwrap(), 0x7ff0_0030);
        assert_eq!(target.generation(), target.core().generation());
        assert_eq!(target.target_id(), target.executable().target_id());
        assert!(matches!(target.native_frames(3), Err(HindsightError::InvalidArgument(_))));
    }
}
