//! Descriptor arrays and name dictionaries: where property names live.
//!
//! A fast-mode object's map owns a descriptor array of `(key, value,
//! details)` triples. The details word says where the property's value is
//! stored. Dictionary-mode objects keep a hash table of `(key, value,
//! details)` entries in their properties slot instead, with unused entries
//! holding the hole or undefined as key.

use super::{FixedArray, Heap};
use crate::error::{HindsightError, HindsightResult};
use crate::inspect::{Decoder, InspectOptions, NodeKind, Page, Property, PropertyValue, Window};
use crate::value::Value;

heap_view!(
    /// The descriptors of a map.
    DescriptorArray
);

/// Where a descriptor's value is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldStorage
{
    /// In a field of the object. `index` is the field index minus the map's
    /// in-object property count: negative indexes count back from the end of
    /// the object, others index the out-of-object properties array.
    Field
    {
        index: i64,
        double: bool,
    },
    /// In the descriptor's own value slot.
    Descriptor,
    /// Neither (accessor pairs and other kinds not decoded yet).
    Unsupported,
}

/// One decoded descriptor.
#[derive(Debug, Clone)]
pub struct DescriptorEntry
{
    pub key: Value,
    pub details: i64,
    pub storage: FieldStorage,
}

impl DescriptorArray
{
    fn slot(&self, heap: &Heap<'_>, index: usize, part: i64) -> HindsightResult<Value>
    {
        let layout = &heap.layout().descriptor_array;
        let slot = layout.first_index.get()? + index as i64 * layout.entry_size.get()? + part;
        let slot = usize::try_from(slot).map_err(|_| HindsightError::layout(format!("descriptor slot {slot}")))?;
        FixedArray::new(self.0.clone()).get(heap, slot)
    }

    /// Number of descriptors the array has room for.
    pub fn length(&self, heap: &Heap<'_>) -> HindsightResult<usize>
    {
        let layout = &heap.layout().descriptor_array;
        let slots = FixedArray::new(self.0.clone()).length(heap)? as i64;
        let entries = (slots - layout.first_index.get()?) / layout.entry_size.get()?.max(1);
        Ok(usize::try_from(entries).unwrap_or(0))
    }

    pub fn key(&self, heap: &Heap<'_>, index: usize) -> HindsightResult<Value>
    {
        self.slot(heap, index, heap.layout().descriptor_array.key_slot.get()?)
    }

    /// The descriptor's own value slot.
    pub fn value(&self, heap: &Heap<'_>, index: usize) -> HindsightResult<Value>
    {
        self.slot(heap, index, heap.layout().descriptor_array.value_slot.get()?)
    }

    pub fn details(&self, heap: &Heap<'_>, index: usize) -> HindsightResult<i64>
    {
        match self.slot(heap, index, heap.layout().descriptor_array.details_slot.get()?)? {
            Value::Smi(details) => Ok(details.value()),
            Value::Heap(object) => Err(HindsightError::layout(format!(
                "descriptor {index} details is a heap pointer {}",
                object.raw()
            ))),
        }
    }

    /// Key, details and storage of descriptor `index`.
    pub fn entry(&self, heap: &Heap<'_>, index: usize, in_object_count: i64) -> HindsightResult<DescriptorEntry>
    {
        let details = self.details(heap, index)?;
        Ok(DescriptorEntry {
            key: self.key(heap, index)?,
            details,
            storage: storage(heap, details, in_object_count)?,
        })
    }

    pub fn decode(&self, cx: &Decoder<'_>, options: &InspectOptions) -> HindsightResult<NodeKind>
    {
        let heap = cx.heap();
        let length = self.length(&heap)?;
        if !options.detailed {
            return Ok(NodeKind::DescriptorArray { length, entries: None });
        }

        let window = Window::new(options.current, options.limit, length);
        let child = options.child();
        let mut entries = Vec::with_capacity(window.len());
        for index in window.range() {
            let entry = self.entry(&heap, index, 0)?;
            let value = match entry.storage {
                FieldStorage::Descriptor => PropertyValue::Node(Box::new(cx.value(&self.value(&heap, index)?, &child)?)),
                FieldStorage::Field { index, .. } => PropertyValue::Field { field_index: index },
                FieldStorage::Unsupported => PropertyValue::Unsupported { details: entry.details },
            };
            entries.push(Property {
                key: key_text(&heap, &entry.key)?,
                value,
            });
        }
        Ok(NodeKind::DescriptorArray {
            length,
            entries: Some(Page::new(entries, window)),
        })
    }
}

fn bits(details: i64, mask: i64, shift: i64) -> i64
{
    (details & mask) >> shift
}

/// Classify a details word under whichever encoding this build exports.
fn storage(heap: &Heap<'_>, details: i64, in_object_count: i64) -> HindsightResult<FieldStorage>
{
    let layout = &heap.layout().descriptor_array;

    let (is_field, is_descriptor) = if layout.location_mask.is_available() {
        let location = bits(details, layout.location_mask.get()?, layout.location_shift.get()?);
        (
            layout.location_field.matches(location),
            layout.location_descriptor.matches(location),
        )
    } else {
        let kind = details & layout.type_mask.get()?;
        (
            layout.type_field.matches(kind),
            layout.type_const_field.matches(kind) || layout.type_constant.matches(kind),
        )
    };

    if is_descriptor {
        return Ok(FieldStorage::Descriptor);
    }
    if !is_field {
        return Ok(FieldStorage::Unsupported);
    }

    let index = bits(details, layout.index_mask.get()?, layout.index_shift.get()?);
    let representation = bits(
        details,
        layout.representation_mask.get()?,
        layout.representation_shift.get()?,
    );
    Ok(FieldStorage::Field {
        index: index - in_object_count,
        double: layout.representation_double.matches(representation),
    })
}

/// Text of a property key: strings as-is, small integers in decimal, anything
/// else (symbols) as `<non-string>`.
pub(crate) fn key_text(heap: &Heap<'_>, key: &Value) -> HindsightResult<String>
{
    match key {
        Value::Smi(smi) => Ok(smi.value().to_string()),
        Value::Heap(object) if heap.is_string(key)? => {
            super::JsString::new(object.clone()).text(heap, super::StringText::Unicode)
        }
        Value::Heap(_) => Ok("<non-string>".to_string()),
    }
}

heap_view!(
    /// The hash table behind a dictionary-mode object.
    NameDictionary
);

impl NameDictionary
{
    fn first_entry(heap: &Heap<'_>) -> HindsightResult<i64>
    {
        heap.layout()
            .name_dictionary
            .first_entry()
            .ok_or(HindsightError::LayoutUnavailable("class_NameDictionaryShape__prefix_size__int"))
    }

    /// Number of entries the table has room for (live or not).
    pub fn capacity(&self, heap: &Heap<'_>) -> HindsightResult<usize>
    {
        let slots = FixedArray::new(self.0.clone()).length(heap)? as i64;
        let entry_size = heap.layout().name_dictionary.entry_size.get()?.max(1);
        Ok(usize::try_from((slots - Self::first_entry(heap)?) / entry_size).unwrap_or(0))
    }

    fn slot(&self, heap: &Heap<'_>, entry: usize, part: i64) -> HindsightResult<Value>
    {
        let entry_size = heap.layout().name_dictionary.entry_size.get()?;
        let slot = Self::first_entry(heap)? + entry as i64 * entry_size + part;
        let slot = usize::try_from(slot).map_err(|_| HindsightError::layout(format!("dictionary slot {slot}")))?;
        FixedArray::new(self.0.clone()).get(heap, slot)
    }

    pub fn key(&self, heap: &Heap<'_>, entry: usize) -> HindsightResult<Value>
    {
        self.slot(heap, entry, 0)
    }

    pub fn value(&self, heap: &Heap<'_>, entry: usize) -> HindsightResult<Value>
    {
        self.slot(heap, entry, 1)
    }

    /// Live `(key, value)` pairs whose position among live entries falls in
    /// `window`. Dead entries (hole or undefined keys) are skipped and not
    /// counted. Passing `None` returns every live entry.
    pub fn entries(&self, heap: &Heap<'_>, window: Option<Window>) -> HindsightResult<Vec<(Value, Value)>>
    {
        let mut live = 0;
        let mut out = Vec::new();
        for entry in 0..self.capacity(heap)? {
            let key = self.key(heap, entry)?;
            if heap.is_hole_or_undefined(&key)? {
                continue;
            }
            let wanted = window.is_none_or(|window| window.range().contains(&live));
            live += 1;
            if wanted {
                out.push((key, self.value(heap, entry)?));
            }
            if window.is_some_and(|window| live >= window.end()) {
                break;
            }
        }
        Ok(out)
    }

    /// Number of live entries.
    pub fn live_count(&self, heap: &Heap<'_>) -> HindsightResult<usize>
    {
        let mut live = 0;
        for entry in 0..self.capacity(heap)? {
            if !heap.is_hole_or_undefined(&self.key(heap, entry)?)? {
                live += 1;
            }
        }
        Ok(live)
    }

    pub fn decode(&self, cx: &Decoder<'_>, options: &InspectOptions) -> HindsightResult<NodeKind>
    {
        let heap = cx.heap();
        let capacity = self.capacity(&heap)?;
        if !options.detailed {
            return Ok(NodeKind::NameDictionary { capacity, entries: None });
        }

        let window = Window::new(options.current, options.limit, self.live_count(&heap)?);
        let child = options.child();
        let entries = self
            .entries(&heap, Some(window))?
            .into_iter()
            .map(|(key, value)| {
                Ok(Property {
                    key: key_text(&heap, &key)?,
                    value: PropertyValue::Node(Box::new(cx.value(&value, &child)?)),
                })
            })
            .collect::<HindsightResult<Vec<_>>>()?;
        Ok(NodeKind::NameDictionary {
            capacity,
            entries: Some(Page::new(entries, window)),
        })
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::layout::Layout;
    use crate::mock::{details, HeapBuilder, MockConstants};
    use crate::value::HeapObject;

    #[test]
    fn test_location_encoding()
    {
        let builder = HeapBuilder::new();
        let memory = crate::mock::MockMemory::new();
        let heap = Heap::new(&memory, builder.layout());

        assert_eq!(
            storage(&heap, details::field(3), 2).unwrap(),
            FieldStorage::Field { index: 1, double: false }
        );
        assert_eq!(
            storage(&heap, details::double_field(0), 2).unwrap(),
            FieldStorage::Field { index: -2, double: true }
        );
        assert_eq!(storage(&heap, details::descriptor(), 0).unwrap(), FieldStorage::Descriptor);
    }

    #[test]
    fn test_type_encoding()
    {
        let layout = Layout::load(
            &MockConstants::standard()
                .without("prop_location_mask")
                .with("prop_type_mask", 0x3)
                .with("prop_type_field", 0)
                .with("prop_type_const_field", 2)
                .with("prop_type_constant", 1),
        );
        let memory = crate::mock::MockMemory::new();
        let heap = Heap::new(&memory, &layout);

        assert_eq!(
            storage(&heap, details::field(1), 0).unwrap(),
            FieldStorage::Field { index: 1, double: false }
        );
        assert_eq!(storage(&heap, 1, 0).unwrap(), FieldStorage::Descriptor);
        assert_eq!(storage(&heap, 2, 0).unwrap(), FieldStorage::Descriptor);
        assert_eq!(storage(&heap, 3, 0).unwrap(), FieldStorage::Unsupported);
    }

    #[test]
    fn test_dictionary_skips_dead_entries()
    {
        let mut builder = HeapBuilder::new();
        let hole = builder.the_hole();
        let undefined = builder.undefined();
        let a = builder.one_byte_string("a");
        let b = builder.one_byte_string("b");
        let zero = builder.smi(0);
        let mut slots = vec![zero; 5];
        for (key, value) in [(a, 1), (hole, 0), (undefined, 0), (b, 2)] {
            slots.push(key.value());
            slots.push(builder.smi(value));
            slots.push(zero);
        }
        let dictionary = builder.fixed_array(&slots);
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let heap = Heap::new(&memory, &layout);

        let dictionary = NameDictionary::new(HeapObject::new(dictionary));
        assert_eq!(dictionary.capacity(&heap).unwrap(), 4);
        assert_eq!(dictionary.live_count(&heap).unwrap(), 2);
        let second = dictionary.entries(&heap, Some(Window::new(1, 1, 2))).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].1.as_smi(), Some(2));
    }
}
