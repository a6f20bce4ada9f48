//! # Error Types
//!
//! General error handling for the decoder.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use thiserror::Error;

use crate::types::Address;

/// Main error type for inspection operations
///
/// Every decode path returns this error explicitly. A failure anywhere below an
/// object aborts that object's decode; partially decoded results are never
/// handed back.
///
/// ## Error Categories
///
/// 1. **Memory errors**: MemoryRead
/// 2. **Layout errors**: LayoutUnavailable, UnrecognizedLayout
/// 3. **Input errors**: InvalidAddressFormat, InvalidArgument
/// 4. **Target errors**: TargetFormat, Io
#[derive(Error, Debug)]
pub enum HindsightError
{
    /// A read against the target failed
    ///
    /// This happens when:
    /// - The address is not backed by any segment of the core
    /// - The segment exists but the core was truncated before it
    /// - The mock or live collaborator refused the read
    #[error("Failed to read {length} bytes at {address}")]
    MemoryRead
    {
        /// First byte of the failed read
        address: Address,
        /// Requested length in bytes
        length: usize,
    },

    /// A layout constant was not resolved for this runtime build
    ///
    /// The string is the constant's symbolic name, so users can tell which
    /// field their node build does not export.
    #[error("Layout constant unavailable: {0}")]
    LayoutUnavailable(&'static str),

    /// The read succeeded but the decoded shape is not one we understand
    ///
    /// Examples:
    /// - An unknown frame marker
    /// - A descriptor field index outside the object
    /// - A string representation tag that matches no known variant
    #[error("Unrecognized layout: {0}")]
    UnrecognizedLayout(String),

    /// Caller supplied an address that is not a hexadecimal pointer
    ///
    /// Rejected before any memory access is attempted.
    #[error("Invalid address format: {0}")]
    InvalidAddressFormat(String),

    /// Invalid argument passed to an engine function
    ///
    /// Examples:
    /// - Thread index out of range
    /// - Frame index past the end of the walked stack
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The core file or executable could not be parsed
    #[error("Unsupported target file: {0}")]
    TargetFormat(String),

    /// I/O error (for file operations, etc.)
    ///
    /// Used for errors when reading core files, executables or export targets.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HindsightError
{
    /// Shorthand for the memory read failure variant.
    pub(crate) fn read(address: Address, length: usize) -> Self
    {
        HindsightError::MemoryRead { address, length }
    }

    /// Shorthand for the unrecognized layout variant.
    pub(crate) fn layout(message: impl Into<String>) -> Self
    {
        HindsightError::UnrecognizedLayout(message.into())
    }
}

/// Convenience type alias for `Result<T, HindsightError>`
///
/// ```rust
/// use hindsight_core::error::HindsightResult;
/// fn foo() -> HindsightResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type HindsightResult<T> = std::result::Result<T, HindsightError>;
