//! # ELF Core Files
//!
//! Reads a Linux ELF core dump into the three things the inspector needs:
//!
//! - the captured memory, from `PT_LOAD` segments;
//! - the threads and their registers, from `NT_PRSTATUS` notes;
//! - the file-backed mappings, from the `NT_FILE` note.
//!
//! The file is read into memory once. Segments whose `p_filesz` is smaller
//! than `p_memsz` were not captured past `p_filesz` (the kernel's coredump
//! filter) and reads there fail like reads outside every segment.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use object::elf;
use object::read::elf::{FileHeader, ProgramHeader};
use object::Endianness;
use tracing::{debug, trace};

use crate::error::{HindsightError, HindsightResult};
use crate::memory::{decode_unsigned, MemoryAccess, MAX_READ_BYTES};
use crate::types::{Address, Architecture, Registers, ThreadId, ThreadInfo};

/// Offset of `pr_cursig` in `struct elf_prstatus`.
const PRSTATUS_CURSIG: usize = 12;
/// Offset of `pr_pid` in `struct elf_prstatus`.
const PRSTATUS_PID: usize = 32;
/// Offset of `pr_reg` in `struct elf_prstatus`.
const PRSTATUS_REGS: usize = 112;

/// Every opened core gets its own memory generation.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// A file-backed mapping listed in the `NT_FILE` note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping
{
    pub start: Address,
    pub end: Address,
    /// Offset into the file, in bytes.
    pub offset: u64,
    pub path: String,
}

impl Mapping
{
    #[must_use]
    pub fn contains(&self, address: Address) -> bool
    {
        address >= self.start && address < self.end
    }
}

#[derive(Debug, Clone, Copy)]
struct Segment
{
    vaddr: u64,
    offset: u64,
    filesz: u64,
}

impl Segment
{
    /// Whether `address` lies in the captured part of the segment.
    fn captures(&self, address: u64) -> bool
    {
        address >= self.vaddr && address - self.vaddr < self.filesz
    }
}

/// A parsed core dump.
pub struct ElfCore
{
    path: PathBuf,
    data: Vec<u8>,
    architecture: Architecture,
    segments: Vec<Segment>,
    threads: Vec<ThreadInfo>,
    mappings: Vec<Mapping>,
    generation: u64,
}

impl std::fmt::Debug for ElfCore
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("ElfCore")
            .field("path", &self.path)
            .field("architecture", &self.architecture)
            .field("segments", &self.segments.len())
            .field("threads", &self.threads.len())
            .field("mappings", &self.mappings.len())
            .finish_non_exhaustive()
    }
}

impl ElfCore
{
    /// Read and parse the core file at `path`.
    pub fn open(path: impl AsRef<Path>) -> HindsightResult<Self>
    {
        let path = path.as_ref();
        let data = fs::read(path)?;
        Self::parse(path, data)
    }

    /// Parse core file bytes. `path` is only used for diagnostics.
    pub fn parse(path: impl Into<PathBuf>, data: Vec<u8>) -> HindsightResult<Self>
    {
        let path = path.into();
        let malformed = |message: String| HindsightError::TargetFormat(format!("{}: {message}", path.display()));

        let header = elf::FileHeader64::<Endianness>::parse(&*data).map_err(|err| malformed(err.to_string()))?;
        let endian = header.endian().map_err(|err| malformed(err.to_string()))?;
        if header.e_type(endian) != elf::ET_CORE {
            return Err(malformed("not a core file".to_string()));
        }
        let architecture = match header.e_machine(endian) {
            elf::EM_X86_64 => Architecture::X86_64,
            elf::EM_AARCH64 => Architecture::Arm64,
            other => return Err(malformed(format!("unsupported machine {other}"))),
        };

        let mut segments = Vec::new();
        let mut threads = Vec::new();
        let mut mappings = Vec::new();
        let headers = header
            .program_headers(endian, &*data)
            .map_err(|err| malformed(err.to_string()))?;
        for program in headers {
            match program.p_type(endian) {
                elf::PT_LOAD => segments.push(Segment {
                    vaddr: program.p_vaddr(endian),
                    offset: program.p_offset(endian),
                    filesz: program.p_filesz(endian),
                }),
                elf::PT_NOTE => {
                    let Some(mut notes) = program.notes(endian, &*data).map_err(|err| malformed(err.to_string()))?
                    else {
                        continue;
                    };
                    while let Some(note) = notes.next().map_err(|err| malformed(err.to_string()))? {
                        if note.name() != b"CORE" {
                            continue;
                        }
                        match note.n_type(endian) {
                            elf::NT_PRSTATUS => {
                                let index = threads.len();
                                threads.push(parse_prstatus(index, architecture, note.desc()).map_err(malformed)?);
                            }
                            elf::NT_FILE => mappings = parse_file_note(note.desc()).map_err(malformed)?,
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }

        debug!(
            core = %path.display(),
            %architecture,
            segments = segments.len(),
            threads = threads.len(),
            mappings = mappings.len(),
            "parsed core file"
        );

        Ok(Self {
            path,
            data,
            architecture,
            segments,
            threads,
            mappings,
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
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

    /// Threads in note order.
    #[must_use]
    pub fn threads(&self) -> &[ThreadInfo]
    {
        &self.threads
    }

    #[must_use]
    pub fn mappings(&self) -> &[Mapping]
    {
        &self.mappings
    }

    /// The file-backed mapping containing `address`, if any.
    #[must_use]
    pub fn mapping_for(&self, address: Address) -> Option<&Mapping>
    {
        self.mappings.iter().find(|mapping| mapping.contains(address))
    }

    /// Captured bytes for `[address, address + len)` inside one segment.
    fn segment_bytes(&self, address: u64, len: u64) -> Option<&[u8]>
    {
        let segment = self.segments.iter().find(|segment| segment.captures(address))?;
        let relative = address - segment.vaddr;
        if relative.checked_add(len)? > segment.filesz {
            return None;
        }
        let start = usize::try_from(segment.offset.checked_add(relative)?).ok()?;
        let end = start.checked_add(usize::try_from(len).ok()?)?;
        self.data.get(start..end)
    }

    /// Captured length available at `address` without leaving its segment.
    fn available(&self, address: u64) -> Option<u64>
    {
        let segment = self.segments.iter().find(|segment| segment.captures(address))?;
        Some(segment.filesz - (address - segment.vaddr))
    }
}

impl MemoryAccess for ElfCore
{
    fn read_bytes(&self, address: Address, len: usize) -> HindsightResult<Vec<u8>>
    {
        if len > MAX_READ_BYTES {
            return Err(HindsightError::read(address, len));
        }

        let mut out = Vec::with_capacity(len);
        let mut cursor = address.value();
        let mut remaining = len as u64;
        while remaining > 0 {
            let chunk = self
                .available(cursor)
                .map(|available| available.min(remaining))
                .and_then(|chunk| self.segment_bytes(cursor, chunk))
                .ok_or_else(|| {
                    trace!(%address, len, "read outside captured memory");
                    HindsightError::read(address, len)
                })?;
            out.extend_from_slice(chunk);
            cursor += chunk.len() as u64;
            remaining -= chunk.len() as u64;
        }
        Ok(out)
    }

    fn read_unsigned(&self, address: Address, width: usize) -> HindsightResult<u64>
    {
        let bytes = self.read_bytes(address, width)?;
        decode_unsigned(address, &bytes)
    }

    fn generation(&self) -> u64
    {
        self.generation
    }
}

fn le_u64(bytes: &[u8], offset: usize) -> Option<u64>
{
    let slice = bytes.get(offset..offset + 8)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(slice);
    Some(u64::from_le_bytes(buf))
}

fn le_u32(bytes: &[u8], offset: usize) -> Option<u32>
{
    let slice = bytes.get(offset..offset + 4)?;
    let mut buf = [0u8; 4];
    buf.copy_from_slice(slice);
    Some(u32::from_le_bytes(buf))
}

fn le_u16(bytes: &[u8], offset: usize) -> Option<u16>
{
    let slice = bytes.get(offset..offset + 2)?;
    Some(u16::from_le_bytes([slice[0], slice[1]]))
}

/// Decode one `NT_PRSTATUS` descriptor.
fn parse_prstatus(index: usize, architecture: Architecture, desc: &[u8]) -> Result<ThreadInfo, String>
{
    let truncated = || format!("truncated NT_PRSTATUS note for thread {index}");
    let register = |slot: usize| le_u64(desc, PRSTATUS_REGS + slot * 8).ok_or_else(truncated);

    // user_regs_struct: rbp is slot 4, rip 16, rsp 19 on x86-64;
    // x29 is slot 29, sp 31, pc 32 on aarch64.
    let (pc, sp, fp) = match architecture {
        Architecture::X86_64 => (register(16)?, register(19)?, register(4)?),
        Architecture::Arm64 => (register(32)?, register(31)?, register(29)?),
        Architecture::Unknown(name) => return Err(format!("no register layout for {name}")),
    };
    let tid = le_u32(desc, PRSTATUS_PID).ok_or_else(truncated)?;
    let signal = le_u16(desc, PRSTATUS_CURSIG).ok_or_else(truncated)?;

    let registers = Registers::new(architecture, Address::new(pc), Address::new(sp), Address::new(fp));
    Ok(ThreadInfo {
        index,
        id: ThreadId::from(u64::from(tid)),
        stop_signal: (signal != 0).then_some(u32::from(signal)),
        pc: registers.pc,
        registers,
    })
}

/// Decode the `NT_FILE` descriptor: a count and page size, `count` triples of
/// (start, end, page offset), then `count` NUL-terminated paths.
fn parse_file_note(desc: &[u8]) -> Result<Vec<Mapping>, String>
{
    let truncated = || "truncated NT_FILE note".to_string();
    let count = usize::try_from(le_u64(desc, 0).ok_or_else(truncated)?).map_err(|_| truncated())?;
    let page_size = le_u64(desc, 8).ok_or_else(truncated)?;

    let names_start = count
        .checked_mul(24)
        .and_then(|size| size.checked_add(16))
        .ok_or_else(truncated)?;
    let mut names = desc.get(names_start..).ok_or_else(truncated)?.split(|byte| *byte == 0);

    (0..count)
        .map(|i| {
            let entry = 16 + i * 24;
            let start = le_u64(desc, entry).ok_or_else(truncated)?;
            let end = le_u64(desc, entry + 8).ok_or_else(truncated)?;
            let pages = le_u64(desc, entry + 16).ok_or_else(truncated)?;
            let name = names.next().ok_or_else(truncated)?;
            Ok(Mapping {
                start: Address::new(start),
                end: Address::new(end),
                offset: pages.saturating_mul(page_size),
                path: String::from_utf8_lossy(name).into_owned(),
            })
        })
        .collect()
}

/// Synthetic core files for tests.
#[cfg(test)]
pub(crate) mod fixture
{
    use super::*;

    pub struct CoreImage
    {
        machine: u16,
        notes: Vec<u8>,
        loads: Vec<(u64, Vec<u8>, u64)>,
    }

    impl CoreImage
    {
        pub fn new(machine: u16) -> Self
        {
            Self {
                machine,
                notes: Vec::new(),
                loads: Vec::new(),
            }
        }

        fn note(&mut self, n_type: u32, desc: &[u8])
        {
            self.notes.extend_from_slice(&5u32.to_le_bytes());
            self.notes.extend_from_slice(&(desc.len() as u32).to_le_bytes());
            self.notes.extend_from_slice(&n_type.to_le_bytes());
            self.notes.extend_from_slice(b"CORE\0\0\0\0");
            self.notes.extend_from_slice(desc);
            while self.notes.len() % 4 != 0 {
                self.notes.push(0);
            }
        }

        /// A thread with x86-64 register slots pc/sp/fp filled in.
        pub fn thread(&mut self, tid: u32, signal: u16, pc: u64, sp: u64, fp: u64) -> &mut Self
        {
            let mut desc = vec![0u8; 392];
            desc[PRSTATUS_CURSIG..PRSTATUS_CURSIG + 2].copy_from_slice(&signal.to_le_bytes());
            desc[PRSTATUS_PID..PRSTATUS_PID + 4].copy_from_slice(&tid.to_le_bytes());
            let slots: [(usize, u64); 3] = if self.machine == elf::EM_AARCH64 {
                [(32, pc), (31, sp), (29, fp)]
            } else {
                [(16, pc), (19, sp), (4, fp)]
            };
            for (slot, value) in slots {
                let at = PRSTATUS_REGS + slot * 8;
                desc[at..at + 8].copy_from_slice(&value.to_le_bytes());
            }
            self.note(elf::NT_PRSTATUS, &desc);
            self
        }

        pub fn files(&mut self, files: &[(u64, u64, u64, &str)]) -> &mut Self
        {
            let mut desc = Vec::new();
            desc.extend_from_slice(&(files.len() as u64).to_le_bytes());
            desc.extend_from_slice(&0x1000u64.to_le_bytes());
            for (start, end, pages, _) in files {
                for value in [start, end, pages] {
                    desc.extend_from_slice(&value.to_le_bytes());
                }
            }
            for (.., path) in files {
                desc.extend_from_slice(path.as_bytes());
                desc.push(0);
            }
            self.note(elf::NT_FILE, &desc);
            self
        }

        /// A loadable segment at `vaddr` whose memory size is `memsz`.
        pub fn load(&mut self, vaddr: u64, bytes: &[u8], memsz: u64) -> &mut Self
        {
            self.loads.push((vaddr, bytes.to_vec(), memsz));
            self
        }

        pub fn build(&self) -> Vec<u8>
        {
            let phnum = 1 + self.loads.len();
            let mut offset = 64 + 56 * phnum;
            let mut out = vec![0u8; 64];
            out[..4].copy_from_slice(b"\x7fELF");
            out[4] = 2;
            out[5] = 1;
            out[6] = 1;
            out[16..18].copy_from_slice(&elf::ET_CORE.to_le_bytes());
            out[18..20].copy_from_slice(&self.machine.to_le_bytes());
            out[20..24].copy_from_slice(&1u32.to_le_bytes());
            out[32..40].copy_from_slice(&64u64.to_le_bytes());
            out[52..54].copy_from_slice(&64u16.to_le_bytes());
            out[54..56].copy_from_slice(&56u16.to_le_bytes());
            out[56..58].copy_from_slice(&(phnum as u16).to_le_bytes());

            let mut program = |p_type: u32, offset: usize, vaddr: u64, filesz: usize, memsz: u64, align: u64| {
                let mut header = Vec::with_capacity(56);
                header.extend_from_slice(&p_type.to_le_bytes());
                header.extend_from_slice(&4u32.to_le_bytes());
                header.extend_from_slice(&(offset as u64).to_le_bytes());
                header.extend_from_slice(&vaddr.to_le_bytes());
                header.extend_from_slice(&vaddr.to_le_bytes());
                header.extend_from_slice(&(filesz as u64).to_le_bytes());
                header.extend_from_slice(&memsz.to_le_bytes());
                header.extend_from_slice(&align.to_le_bytes());
                out.extend_from_slice(&header);
            };

            program(elf::PT_NOTE, offset, 0, self.notes.len(), 0, 4);
            offset += self.notes.len();
            for (vaddr, bytes, memsz) in &self.loads {
                program(elf::PT_LOAD, offset, *vaddr, bytes.len(), *memsz, 0x1000);
                offset += bytes.len();
            }

            out.extend_from_slice(&self.notes);
            for (_, bytes, _) in &self.loads {
                out.extend_from_slice(bytes);
            }
            out
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::fixture::CoreImage;
    use super::*;

    fn sample() -> ElfCore
    {
        let mut stack = vec![0u8; 0x40];
        stack[..8].copy_from_slice(&0x1122_3344_5566_7788u64.to_le_bytes());
        let bytes = CoreImage::new(elf::EM_X86_64)
            .thread(4242, 11, 0x40_1000, 0x7ff0_0000, 0x7ff0_0010)
            .thread(4243, 0, 0x40_2000, 0x7fe0_0000, 0x7fe0_0010)
            .files(&[(0x40_0000, 0x40_5000, 0, "/usr/bin/node")])
            .load(0x7ff0_0000, &stack, 0x80)
            .load(0x7ff0_0040, &[0xaa; 0x10], 0x10)
            .build();
        ElfCore::parse("sample.core", bytes).unwrap()
    }

    #[test]
    fn test_threads_from_prstatus()
    {
        let core = sample();
        assert_eq!(core.architecture(), Architecture::X86_64);
        let threads = core.threads();
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].id, ThreadId::from(4242));
        assert_eq!(threads[0].stop_signal, Some(11));
        assert_eq!(threads[0].registers.fp, Address::new(0x7ff0_0010));
        assert_eq!(threads[1].index, 1);
        assert_eq!(threads[1].stop_signal, None);
        assert_eq!(threads[1].pc, Address::new(0x40_2000));
    }

    #[test]
    fn test_arm64_register_slots()
    {
        let bytes = CoreImage::new(elf::EM_AARCH64)
            .thread(7, 6, 0xaaaa_0000, 0xffff_0000, 0xffff_0040)
            .build();
        let core = ElfCore::parse("arm.core", bytes).unwrap();
        let registers = core.threads()[0].registers;
        assert_eq!(registers.pc, Address::new(0xaaaa_0000));
        assert_eq!(registers.sp, Address::new(0xffff_0000));
        assert_eq!(registers.fp, Address::new(0xffff_0040));
        assert_eq!(registers.architecture(), Architecture::Arm64);
    }

    #[test]
    fn test_file_mappings()
    {
        let core = sample();
        let mapping = core.mapping_for(Address::new(0x40_1234)).unwrap();
        assert_eq!(mapping.path, "/usr/bin/node");
        assert_eq!(mapping.offset, 0);
        assert!(core.mapping_for(Address::new(0x7ff0_0000)).is_none());
    }

    #[test]
    fn test_reads_inside_and_across_segments()
    {
        let core = sample();
        assert_eq!(core.read_pointer(Address::new(0x7ff0_0000)).unwrap(), 0x1122_3344_5566_7788);
        assert_eq!(core.read_unsigned(Address::new(0x7ff0_0000), 1).unwrap(), 0x88);

        let spanning = core.read_bytes(Address::new(0x7ff0_003c), 8).unwrap();
        assert_eq!(spanning, vec![0, 0, 0, 0, 0xaa, 0xaa, 0xaa, 0xaa]);
    }

    #[test]
    fn test_uncaptured_reads_fail()
    {
        let core = sample();
        // The first segment has memsz 0x80 but only 0x40 bytes in the file;
        // the second segment covers 0x40..0x50 of that range.
        assert!(core.read_bytes(Address::new(0x7ff0_0050), 8).is_err());
        assert!(matches!(
            core.read_pointer(Address::new(0x1000)),
            Err(HindsightError::MemoryRead { length: 8, .. })
        ));
    }

    #[test]
    fn test_rejects_non_core()
    {
        let mut bytes = CoreImage::new(elf::EM_X86_64).build();
        bytes[16..18].copy_from_slice(&elf::ET_EXEC.to_le_bytes());
        assert!(matches!(ElfCore::parse("a.out", bytes), Err(HindsightError::TargetFormat(_))));
        assert!(matches!(
            ElfCore::parse("junk", vec![0u8; 12]),
            Err(HindsightError::TargetFormat(_))
        ));
    }

    #[test]
    fn test_generations_differ()
    {
        assert_ne!(sample().generation(), sample().generation());
    }
}
