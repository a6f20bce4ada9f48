//! Thread and architecture types.

use std::fmt;

use serde::Serialize;

use super::{Address, Registers};

/// Thread identifier as recorded by the kernel (the Linux TID).
///
/// ## Example
///
/// ```rust
/// use hindsight_core::types::ThreadId;
///
/// let thread = ThreadId::from(12345);
/// assert_eq!(thread.raw(), 12345);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ThreadId(pub u64);

impl ThreadId
{
    /// Get the raw `u64` representation of the thread identifier
    #[must_use]
    pub fn raw(&self) -> u64
    {
        self.0
    }
}

impl From<u64> for ThreadId
{
    fn from(value: u64) -> Self
    {
        ThreadId(value)
    }
}

impl fmt::Display for ThreadId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

/// CPU architecture of the captured process
///
/// Only the two architectures whose core-note register layouts we decode are
/// named; anything else is carried through as `Unknown` and rejected when a
/// thread's registers are requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Architecture
{
    /// 64-bit ARM
    Arm64,
    /// 64-bit x86 (Intel/AMD)
    X86_64,
    /// Any other architecture (or unknown)
    Unknown(&'static str),
}

impl Architecture
{
    /// Size of a pointer in bytes for this architecture.
    #[must_use]
    pub const fn pointer_size_bytes(self) -> u8
    {
        match self {
            Architecture::Arm64 | Architecture::X86_64 | Architecture::Unknown(_) => 8,
        }
    }
}

impl fmt::Display for Architecture
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Architecture::Arm64 => write!(f, "arm64"),
            Architecture::X86_64 => write!(f, "x86_64"),
            Architecture::Unknown(name) => write!(f, "{name}"),
        }
    }
}

/// One thread captured in the target, as listed by `threads`.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadInfo
{
    /// Position in the target's thread list (what `backtrace --thread` takes).
    pub index: usize,
    /// Kernel thread id.
    pub id: ThreadId,
    /// Signal that stopped the thread, if the core recorded one.
    pub stop_signal: Option<u32>,
    /// Program counter at capture time.
    pub pc: Address,
    /// Registers needed to start a frame-pointer walk.
    #[serde(skip)]
    pub registers: Registers,
}
