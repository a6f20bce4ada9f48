//! Frame-pointer stack walking.
//!
//! Both supported architectures keep the same frame record at the frame
//! pointer: the caller's frame pointer at `[fp]` and the return address at
//! `[fp + 8]`. A walk therefore needs nothing but memory reads.

use tracing::trace;

use crate::memory::MemoryAccess;
use crate::types::{Address, NativeFrame, Registers};

/// Most frames a single walk produces.
pub const MAX_FRAMES: usize = 512;

/// Walk the frame-pointer chain starting at `registers`.
///
/// Frame 0 is the registers' (pc, fp). The walk stops on a null frame
/// pointer, a frame pointer that does not grow toward the stack base, a
/// failed read, or after [`MAX_FRAMES`] frames.
#[must_use]
pub fn walk_frame_pointers(memory: &dyn MemoryAccess, registers: &Registers) -> Vec<NativeFrame>
{
    let mut frames = vec![NativeFrame::bare(0, registers.pc, registers.fp)];
    let mut fp = registers.fp;

    while frames.len() < MAX_FRAMES && !fp.is_null() {
        let Some(return_slot) = fp.checked_add(8) else {
            break;
        };
        let (saved_fp, return_address) = match (memory.read_pointer(fp), memory.read_pointer(return_slot)) {
            (Ok(saved_fp), Ok(return_address)) => (Address::new(saved_fp), Address::new(return_address)),
            (Err(error), _) | (_, Err(error)) => {
                trace!(%fp, %error, "frame walk stopped on unreadable frame record");
                break;
            }
        };
        if saved_fp.is_null() || saved_fp <= fp || return_address.is_null() {
            break;
        }

        frames.push(NativeFrame::bare(frames.len(), return_address, saved_fp));
        fp = saved_fp;
    }

    trace!(frames = frames.len(), "frame walk finished");
    frames
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::mock::MockMemory;
    use crate::types::Architecture;

    fn registers(pc: u64, fp: u64) -> Registers
    {
        Registers::new(Architecture::X86_64, Address::new(pc), Address::new(fp - 0x40), Address::new(fp))
    }

    #[test]
    fn test_walk_follows_chain()
    {
        let mut memory = MockMemory::new();
        memory.write_u64(Address::new(0x7000), 0x7100);
        memory.write_u64(Address::new(0x7008), 0x40_1000);
        memory.write_u64(Address::new(0x7100), 0);
        memory.write_u64(Address::new(0x7108), 0x40_2000);

        let frames = walk_frame_pointers(&memory, &registers(0x40_0500, 0x7000));
        let pcs: Vec<u64> = frames.iter().map(|frame| frame.pc.value()).collect();
        assert_eq!(pcs, vec![0x40_0500, 0x40_1000]);
        assert_eq!(frames[1].fp, Address::new(0x7100));
        assert_eq!(frames[1].index, 1);
    }

    #[test]
    fn test_walk_stops_on_non_increasing_fp()
    {
        let mut memory = MockMemory::new();
        memory.write_u64(Address::new(0x7000), 0x6f00);
        memory.write_u64(Address::new(0x7008), 0x40_1000);

        let frames = walk_frame_pointers(&memory, &registers(0x40_0500, 0x7000));
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_walk_stops_on_unreadable_record()
    {
        let memory = MockMemory::new();
        let frames = walk_frame_pointers(&memory, &registers(0x40_0500, 0x7000));
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_walk_is_capped()
    {
        let mut memory = MockMemory::new();
        for i in 0..(MAX_FRAMES as u64 + 10) {
            let fp = 0x10_0000 + i * 0x20;
            memory.write_u64(Address::new(fp), fp + 0x20);
            memory.write_u64(Address::new(fp + 8), 0x40_0000 + i);
        }

        let frames = walk_frame_pointers(&memory, &registers(0x40_0500, 0x10_0000));
        assert_eq!(frames.len(), MAX_FRAMES);
    }
}
