//! Register snapshot types.

use super::{Address, Architecture};

/// The subset of a thread's registers a postmortem stack walk needs
///
/// Core dumps carry the full general-purpose set in their `NT_PRSTATUS`
/// notes; we keep the three registers the frame-pointer walk consumes plus the
/// architecture they were decoded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers
{
    /// Program Counter (PC) - address of the next instruction to execute
    pub pc: Address,
    /// Stack Pointer (SP) - address of the top of the stack
    pub sp: Address,
    /// Frame Pointer (FP) - `rbp` on x86-64, `x29` on arm64
    pub fp: Address,
    architecture: Architecture,
}

impl Registers
{
    /// Create a register snapshot for the given architecture.
    #[must_use]
    pub const fn new(architecture: Architecture, pc: Address, sp: Address, fp: Address) -> Self
    {
        Self {
            pc,
            sp,
            fp,
            architecture,
        }
    }

    /// Architecture these registers were decoded for.
    #[must_use]
    pub const fn architecture(&self) -> Architecture
    {
        self.architecture
    }
}

impl Default for Registers
{
    fn default() -> Self
    {
        Self::new(Architecture::X86_64, Address::ZERO, Address::ZERO, Address::ZERO)
    }
}
