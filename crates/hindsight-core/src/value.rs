//! # Tagged Values
//!
//! Every word the decoder reads from a slot is either a small integer stored
//! inline or a tagged pointer to a heap object. [`Value::classify`] decides
//! which using the tag constants of the loaded [`Layout`]; there is no third
//! state.
//!
//! ## Frame markers
//!
//! On 64-bit builds a Smi keeps its payload in the upper half of the word.
//! Frame-type markers are sometimes stored in the compact 32-bit form
//! instead (payload shifted by one), and [`Value::from_frame_marker`] widens
//! those before classifying so both encodings compare equal.

use once_cell::unsync::OnceCell;

use crate::layout::Layout;
use crate::types::Address;

/// A classified tagged word.
#[derive(Debug, Clone)]
pub enum Value
{
    /// Small integer stored inline.
    Smi(Smi),
    /// Tagged pointer to a heap object.
    Heap(HeapObject),
}

impl Value
{
    /// Classify a raw word.
    #[must_use]
    pub fn classify(raw: u64, layout: &Layout) -> Self
    {
        if Smi::check(raw, layout) {
            Value::Smi(Smi::decode(raw, layout))
        } else {
            Value::Heap(HeapObject::new(Address::new(raw)))
        }
    }

    /// Classify a frame marker, widening the compact Smi encoding first.
    #[must_use]
    pub fn from_frame_marker(raw: u64, layout: &Layout) -> Self
    {
        Self::classify(normalize_frame_marker(raw, layout), layout)
    }

    /// The word as it was read.
    #[must_use]
    pub fn raw(&self) -> u64
    {
        match self {
            Value::Smi(smi) => smi.raw,
            Value::Heap(object) => object.raw().value(),
        }
    }

    /// Heap object payload, if this is a pointer.
    #[must_use]
    pub fn as_heap(&self) -> Option<&HeapObject>
    {
        match self {
            Value::Heap(object) => Some(object),
            Value::Smi(_) => None,
        }
    }

    /// Small-integer payload, if this is a Smi.
    #[must_use]
    pub fn as_smi(&self) -> Option<i64>
    {
        match self {
            Value::Smi(smi) => Some(smi.value),
            Value::Heap(_) => None,
        }
    }
}

/// Widen a compact 32-bit Smi marker to the full-width encoding.
#[must_use]
pub fn normalize_frame_marker(raw: u64, layout: &Layout) -> u64
{
    if layout.smi.shift_size.matches(31) && Smi::check(raw, layout) && raw < (1 << 31) {
        raw << 31
    } else {
        raw
    }
}

/// A decoded small integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Smi
{
    raw: u64,
    value: i64,
}

impl Smi
{
    fn shift(layout: &Layout) -> u32
    {
        let tag_bits = u64::try_from(layout.smi.tag_mask.raw()).map_or(1, u64::count_ones);
        let shift_size = u32::try_from(layout.smi.shift_size.raw()).unwrap_or(0);
        (shift_size + tag_bits).min(63)
    }

    /// Whether `raw` carries the Smi tag.
    #[must_use]
    pub fn check(raw: u64, layout: &Layout) -> bool
    {
        let mask = layout.smi.tag_mask.raw() as u64;
        let tag = layout.smi.tag.raw() as u64;
        raw & mask == tag
    }

    /// Decode a Smi-tagged word (arithmetic shift keeps the sign).
    #[must_use]
    pub fn decode(raw: u64, layout: &Layout) -> Self
    {
        Self {
            raw,
            value: (raw as i64) >> Self::shift(layout),
        }
    }

    /// Encode `value` as a full-width Smi.
    #[must_use]
    pub fn encode(value: i64, layout: &Layout) -> u64
    {
        ((value << Self::shift(layout)) as u64) | layout.smi.tag.raw() as u64
    }

    /// The integer payload.
    #[must_use]
    pub const fn value(self) -> i64
    {
        self.value
    }

    /// The word as it was read.
    #[must_use]
    pub const fn raw(self) -> u64
    {
        self.raw
    }
}

/// A tagged heap pointer, with its map word cached after the first read.
#[derive(Debug, Clone)]
pub struct HeapObject
{
    raw: Address,
    map: OnceCell<u64>,
}

impl HeapObject
{
    /// Wrap a tagged pointer.
    #[must_use]
    pub fn new(raw: Address) -> Self
    {
        Self {
            raw,
            map: OnceCell::new(),
        }
    }

    /// The tagged pointer, as users see and paste it.
    #[must_use]
    pub const fn raw(&self) -> Address
    {
        self.raw
    }

    /// Address of the byte at `offset` from the object's untagged start.
    #[must_use]
    pub fn field(&self, offset: i64, layout: &Layout) -> Address
    {
        self.raw.offset(offset - layout.heap_object.tag.raw())
    }

    /// Cached map word, if it has been read.
    pub(crate) fn map_cell(&self) -> &OnceCell<u64>
    {
        &self.map
    }
}

impl PartialEq for HeapObject
{
    fn eq(&self, other: &Self) -> bool
    {
        self.raw == other.raw
    }
}

impl Eq for HeapObject {}

#[cfg(test)]
mod tests
{
    use proptest::prelude::*;

    use super::*;
    use crate::mock::standard_layout;

    #[test]
    fn test_classify_pointer()
    {
        let layout = standard_layout();
        let value = Value::classify(0x1001, &layout);
        let object = value.as_heap().unwrap();
        assert_eq!(object.raw(), Address::new(0x1001));
        assert_eq!(object.field(8, &layout), Address::new(0x1008));
    }

    #[test]
    fn test_negative_smi()
    {
        let layout = standard_layout();
        let raw = Smi::encode(-42, &layout);
        assert_eq!(Value::classify(raw, &layout).as_smi(), Some(-42));
    }

    #[test]
    fn test_compact_marker_widens()
    {
        let layout = standard_layout();
        let full = Smi::encode(3, &layout);
        let compact = 3u64 << 1;
        assert_eq!(normalize_frame_marker(compact, &layout), full);
        assert_eq!(normalize_frame_marker(full, &layout), full);
        assert_eq!(Value::from_frame_marker(compact, &layout).as_smi(), Some(3));
    }

    proptest! {
        #[test]
        fn classify_is_total(raw: u64)
        {
            let layout = standard_layout();
            let value = Value::classify(raw, &layout);
            prop_assert_eq!(value.as_smi().is_some(), value.as_heap().is_none());
            prop_assert_eq!(value.raw(), raw);
        }

        #[test]
        fn smi_round_trip(v in i32::MIN as i64..=i32::MAX as i64)
        {
            let layout = standard_layout();
            let raw = Smi::encode(v, &layout);
            prop_assert_eq!(Value::classify(raw, &layout).as_smi(), Some(v));
        }
    }
}
