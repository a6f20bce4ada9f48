//! Memory address type.

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::HindsightError;

/// Strongly typed memory address
///
/// This wrapper around `u64` provides type safety when working with target
/// addresses. It prevents accidentally mixing addresses with other `u64` values
/// (like lengths, tagged words, or slot indices).
///
/// Addresses print and serialise as zero-padded hexadecimal (`0x%016x`), the
/// same form users paste back into `inspect`.
///
/// ## Example
///
/// ```rust
/// use hindsight_core::types::Address;
///
/// let addr = Address::from(0x1000);
/// let next_addr = addr + 0x100; // Add offset
/// assert_eq!(next_addr.value(), 0x1100);
/// assert_eq!("0x1100".parse::<Address>().unwrap(), next_addr);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u64);

impl Address
{
    /// The null address (0x0)
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value
    ///
    /// This is equivalent to `Address::from(value)` but can be used in const contexts.
    #[must_use]
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    #[must_use]
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Returns `true` for the null address.
    #[must_use]
    pub const fn is_null(self) -> bool
    {
        self.0 == 0
    }

    /// Add an offset to this address, checking for overflow
    ///
    /// ## Example
    ///
    /// ```rust
    /// use hindsight_core::types::Address;
    ///
    /// let addr = Address::from(0x1000);
    /// assert_eq!(addr.checked_add(0x100), Some(Address::from(0x1100)));
    /// assert_eq!(addr.checked_add(u64::MAX), None); // Overflow
    /// ```
    #[must_use]
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// Subtract an offset from this address, checking for underflow
    #[must_use]
    pub fn checked_sub(self, offset: u64) -> Option<Self>
    {
        self.0.checked_sub(offset).map(Address)
    }

    /// Apply a signed byte offset, wrapping like pointer arithmetic in the target.
    ///
    /// Layout offsets are signed (frame slots sit below the frame pointer), so
    /// most field addresses are computed through this helper.
    #[must_use]
    pub fn offset(self, delta: i64) -> Self
    {
        Address(self.0.wrapping_add_signed(delta))
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:016x}", self.0)
    }
}

impl FromStr for Address
{
    type Err = HindsightError;

    /// Parse a hexadecimal pointer, with or without the `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.is_empty() || digits.len() > 16 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(HindsightError::InvalidAddressFormat(s.to_string()));
        }

        u64::from_str_radix(digits, 16)
            .map(Address)
            .map_err(|_| HindsightError::InvalidAddressFormat(s.to_string()))
    }
}

impl Serialize for Address
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Address
{
    type Output = Address;

    fn sub(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_sub(rhs))
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_parse_with_and_without_prefix()
    {
        assert_eq!("0x1000".parse::<Address>().unwrap(), Address::new(0x1000));
        assert_eq!("1000".parse::<Address>().unwrap(), Address::new(0x1000));
        assert_eq!("0XdeadBEEF".parse::<Address>().unwrap(), Address::new(0xdead_beef));
    }

    #[test]
    fn test_parse_rejects_garbage()
    {
        for input in ["", "0x", "xyz", "0x12g4", "0x11112222333344445", "-12"] {
            let err = input.parse::<Address>().unwrap_err();
            assert!(matches!(err, HindsightError::InvalidAddressFormat(_)), "{input}");
        }
    }

    #[test]
    fn test_signed_offset()
    {
        let fp = Address::new(0x7ff0_0000);
        assert_eq!(fp.offset(-16), Address::new(0x7fef_fff0));
        assert_eq!(fp.offset(8), Address::new(0x7ff0_0008));
    }

    #[test]
    fn test_display_is_zero_padded()
    {
        assert_eq!(Address::new(0x1001).to_string(), "0x0000000000001001");
    }
}
