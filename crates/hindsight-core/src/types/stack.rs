//! Native stack frame types.

use serde::Serialize;

use super::symbols::{SourceLocation, SymbolName};
use super::Address;

/// Identity of a frame query, used as the frame cache key.
///
/// The memory generation is part of the key so a frame decoded against one
/// core is never served for another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameKey
{
    /// Index into the target's thread list.
    pub thread: usize,
    /// Index into that thread's walked stack (0 = innermost).
    pub frame: usize,
    /// Memory generation the frame was read from.
    pub generation: u64,
}

/// A physical frame as produced by the native stack walk.
///
/// This is what the thread collaborator hands to the frame decoder: the raw
/// frame pointer and program counter, plus whatever native symbol information
/// the target could attach. Managed frames carry no symbol.
#[derive(Debug, Clone, Serialize)]
pub struct NativeFrame
{
    /// Ordered index within the thread's stack.
    pub index: usize,
    /// Program counter corresponding to this frame.
    pub pc: Address,
    /// Frame pointer snapshot.
    pub fp: Address,
    /// Best-effort native symbol for the frame.
    pub symbol: Option<SymbolName>,
    /// Path of the module that maps `pc`, when it is file backed.
    pub module: Option<String>,
    /// Best-effort source location.
    pub location: Option<SourceLocation>,
}

impl NativeFrame
{
    /// A frame with no native metadata attached.
    #[must_use]
    pub fn bare(index: usize, pc: Address, fp: Address) -> Self
    {
        Self {
            index,
            pc,
            fp,
            symbol: None,
            module: None,
            location: None,
        }
    }

    /// Native frames are the ones that live inside a file-backed module.
    #[must_use]
    pub fn is_native(&self) -> bool
    {
        self.symbol.is_some() || self.module.is_some()
    }
}
