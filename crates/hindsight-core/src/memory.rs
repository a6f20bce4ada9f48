//! # Memory Access
//!
//! The narrow read interface the decoder needs from its debugger, and the
//! typed adapter every heap view reads through.
//!
//! ## Collaborator contract
//!
//! [`MemoryAccess`] is implemented by whatever owns the captured process: the
//! ELF core reader in [`crate::target`], a live debugger, or the mock used in
//! tests. Every read can fail; failures carry the address and length that
//! could not be read and are never replaced with defaults.
//!
//! ## Two-byte strings
//!
//! V8 stores non-Latin-1 strings as UTF-16 code units. [`utf16_to_string`]
//! decodes them properly (surrogate pairs become one scalar value, a leading
//! byte-order mark is dropped, unpaired surrogates become U+FFFD).
//! [`utf16_passthrough`] keeps only the low byte of each unit; it exists for
//! source-position arithmetic, which counts one column per code unit.

use tracing::trace;
use widestring::U16Str;

use crate::error::{HindsightError, HindsightResult};
use crate::types::Address;

/// Upper bound for a single string or byte-range read.
///
/// A corrupt length word would otherwise ask the target for gigabytes.
pub const MAX_READ_BYTES: usize = 64 * 1024 * 1024;

const BYTE_ORDER_MARK: u16 = 0xfeff;

/// Minimal memory accessor required for heap decoding.
pub trait MemoryAccess
{
    /// Read `len` raw bytes starting at `address`.
    fn read_bytes(&self, address: Address, len: usize) -> HindsightResult<Vec<u8>>;

    /// Read an unsigned little-endian integer of `width` bytes (1, 2, 4 or 8).
    fn read_unsigned(&self, address: Address, width: usize) -> HindsightResult<u64>;

    /// Read a pointer-sized word.
    fn read_pointer(&self, address: Address) -> HindsightResult<u64>
    {
        self.read_unsigned(address, 8)
    }

    /// Read an IEEE-754 double, reinterpreting the bits of an 8-byte read.
    fn read_double(&self, address: Address) -> HindsightResult<f64>
    {
        self.read_unsigned(address, 8).map(f64::from_bits)
    }

    /// Identity of the memory image being read.
    ///
    /// Changes whenever the collaborator starts serving a different process
    /// image; caches keyed on decoded memory are dropped when it does.
    fn generation(&self) -> u64
    {
        0
    }
}

/// Decode little-endian bytes into an unsigned integer of `bytes.len()` width.
///
/// Shared by collaborators that serve `read_unsigned` from a byte buffer.
pub fn decode_unsigned(address: Address, bytes: &[u8]) -> HindsightResult<u64>
{
    match bytes.len() {
        1 | 2 | 4 | 8 => {
            let mut buf = [0u8; 8];
            buf[..bytes.len()].copy_from_slice(bytes);
            Ok(u64::from_le_bytes(buf))
        }
        other => Err(HindsightError::read(address, other)),
    }
}

/// Typed reads on top of a [`MemoryAccess`] collaborator.
#[derive(Clone, Copy)]
pub struct Memory<'a>
{
    source: &'a dyn MemoryAccess,
}

impl<'a> Memory<'a>
{
    /// Wrap a collaborator.
    #[must_use]
    pub fn new(source: &'a dyn MemoryAccess) -> Self
    {
        Self { source }
    }

    /// Pointer-sized word at `address`.
    pub fn pointer(&self, address: Address) -> HindsightResult<u64>
    {
        self.source.read_pointer(address)
    }

    /// Unsigned integer of `width` bytes at `address`.
    pub fn unsigned(&self, address: Address, width: usize) -> HindsightResult<u64>
    {
        self.source.read_unsigned(address, width)
    }

    /// One byte at `address`.
    pub fn u8(&self, address: Address) -> HindsightResult<u8>
    {
        self.unsigned(address, 1).map(|v| (v & 0xff) as u8)
    }

    /// Two bytes at `address`.
    pub fn u16(&self, address: Address) -> HindsightResult<u16>
    {
        self.unsigned(address, 2).map(|v| (v & 0xffff) as u16)
    }

    /// Four bytes at `address`.
    pub fn u32(&self, address: Address) -> HindsightResult<u32>
    {
        self.unsigned(address, 4).map(|v| (v & 0xffff_ffff) as u32)
    }

    /// Double at `address`.
    pub fn double(&self, address: Address) -> HindsightResult<f64>
    {
        self.source.read_double(address)
    }

    /// `len` raw bytes at `address`. Zero-length reads never reach the collaborator.
    pub fn bytes(&self, address: Address, len: usize) -> HindsightResult<Vec<u8>>
    {
        if len == 0 {
            return Ok(Vec::new());
        }
        if len > MAX_READ_BYTES {
            return Err(HindsightError::layout(format!("refusing {len}-byte read at {address}")));
        }
        trace!(%address, len, "read bytes");
        self.source.read_bytes(address, len)
    }

    /// A one-byte (Latin-1) string of `len` characters.
    pub fn one_byte_string(&self, address: Address, len: usize) -> HindsightResult<String>
    {
        let bytes = self.bytes(address, len)?;
        Ok(bytes.into_iter().map(char::from).collect())
    }

    /// The raw code units of a two-byte string of `len` characters.
    pub fn two_byte_units(&self, address: Address, len: usize) -> HindsightResult<Vec<u16>>
    {
        let byte_len = len
            .checked_mul(2)
            .ok_or_else(|| HindsightError::layout(format!("two-byte string length {len} overflows")))?;
        let bytes = self.bytes(address, byte_len)?;
        Ok(bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect())
    }

    /// Generation of the underlying collaborator.
    #[must_use]
    pub fn generation(&self) -> u64
    {
        self.source.generation()
    }
}

/// Decode UTF-16 code units into text.
///
/// A leading byte-order mark is skipped. Surrogate pairs combine into a single
/// scalar value.
///
/// An unpaired surrogate becomes U+FFFD. Encoding the lone unit on its own as
/// a three-byte sequence (WTF-8) is not valid UTF-8 and cannot live in a
/// `String`, so callers that need the raw unit must read the code units
/// themselves.
#[must_use]
pub fn utf16_to_string(units: &[u16]) -> String
{
    let units = match units.first() {
        Some(&BYTE_ORDER_MARK) => &units[1..],
        _ => units,
    };
    U16Str::from_slice(units).to_string_lossy()
}

/// Keep the low byte of every code unit, one character per unit.
///
/// Lossy for anything outside Latin-1, but column arithmetic on the result
/// matches code-unit positions exactly.
#[must_use]
pub fn utf16_passthrough(units: &[u16]) -> String
{
    units.iter().map(|&unit| char::from((unit & 0xff) as u8)).collect()
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn units(s: &str) -> Vec<u16>
    {
        s.encode_utf16().collect()
    }

    #[test]
    fn test_surrogate_pair_becomes_four_bytes()
    {
        let decoded = utf16_to_string(&units("a😀b"));
        assert_eq!(decoded, "a😀b");
        assert_eq!(decoded.len(), 6);
    }

    #[test]
    fn test_byte_order_mark_is_skipped()
    {
        let mut raw = vec![0xfeff];
        raw.extend(units("hi"));
        assert_eq!(utf16_to_string(&raw), "hi");
    }

    #[test]
    fn test_unpaired_surrogate_does_not_panic()
    {
        let decoded = utf16_to_string(&[0x61, 0xd83d, 0x62]);
        assert_eq!(decoded, "a\u{fffd}b");
    }

    #[test]
    fn test_lone_surrogates_each_become_one_replacement()
    {
        assert_eq!(utf16_to_string(&[0xdc00]), "\u{fffd}");
        assert_eq!(utf16_to_string(&[0xd800, 0xd800, 0x41]), "\u{fffd}\u{fffd}A");
        assert_eq!(utf16_to_string(&[BYTE_ORDER_MARK, 0xdfff]).len(), 3);
    }

    #[test]
    fn test_passthrough_keeps_one_char_per_unit()
    {
        let raw = units("x\u{4e2d}y");
        let lossy = utf16_passthrough(&raw);
        assert_eq!(lossy.chars().count(), raw.len());
        assert!(lossy.starts_with('x'));
        assert!(lossy.ends_with('y'));
    }

    #[test]
    fn test_decode_unsigned_widths()
    {
        let addr = Address::new(0x10);
        assert_eq!(decode_unsigned(addr, &[0x34, 0x12]).unwrap(), 0x1234);
        assert_eq!(decode_unsigned(addr, &[1, 0, 0, 0, 0, 0, 0, 0x80]).unwrap(), 0x8000_0000_0000_0001);
        assert!(decode_unsigned(addr, &[1, 2, 3]).is_err());
    }
}
