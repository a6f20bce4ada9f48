//! # Types
//!
//! Target-agnostic types used throughout the inspector.
//!
//! These types describe what a postmortem target looks like (addresses,
//! threads, raw native frames, symbols) without committing to how the
//! target was captured.

pub mod address;
pub mod process;
pub mod registers;
pub mod stack;
pub mod symbols;

// Re-export all public types
pub use address::Address;
pub use process::{Architecture, ThreadId, ThreadInfo};
pub use registers::Registers;
pub use stack::{FrameKey, NativeFrame};
pub use symbols::{SourceLocation, SymbolLanguage, SymbolName};
