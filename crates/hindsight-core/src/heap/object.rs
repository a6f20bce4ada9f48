//! # JS Objects
//!
//! An object's contents span three storage domains, listed in this order:
//!
//! 1. **elements**: indexed slots in the elements backing store
//! 2. **properties**: named slots, found through the map's descriptors (fast
//!    mode) or the properties dictionary (dictionary mode)
//! 3. **internal fields**: embedder words between the header and the
//!    in-object properties
//!
//! A caller's `current`/`limit` window runs over the concatenation and each
//! domain receives its intersection with the window.

use super::descriptors::key_text;
use super::{FieldStorage, FixedArray, Heap, Map, NameDictionary};
use crate::error::{HindsightError, HindsightResult};
use crate::inspect::{Decoder, InspectOptions, NodeKind, ObjectNode, Page, Property, PropertyValue, Window};
use crate::types::Address;
use crate::value::{HeapObject, Value};

heap_view!(
    /// An ordinary JS object (also the base of errors and regexps).
    JsObject
);

/// A named property and where its value came from.
#[derive(Debug, Clone)]
pub struct PropertyEntry
{
    pub key: Value,
    pub value: PropertySlot,
}

/// A property value as stored.
#[derive(Debug, Clone)]
pub enum PropertySlot
{
    Value(Value),
    /// Unboxed double field.
    Double(f64),
    /// Descriptor kind that is not decoded; carries the details word.
    Unsupported(i64),
}

impl JsObject
{
    pub fn map(&self, heap: &Heap<'_>) -> HindsightResult<Map>
    {
        heap.map(&self.0)
    }

    /// The elements backing store.
    pub fn elements(&self, heap: &Heap<'_>) -> HindsightResult<FixedArray>
    {
        Ok(FixedArray::new(heap.heap_value(&self.0, heap.layout().js_object.elements)?))
    }

    /// Out-of-object properties. The slot holds a hash instead when the
    /// object has none.
    fn properties_array(&self, heap: &Heap<'_>) -> HindsightResult<Option<HeapObject>>
    {
        let value = heap.value(&self.0, heap.layout().js_object.properties)?;
        Ok(value.as_heap().cloned())
    }

    fn dictionary(&self, heap: &Heap<'_>) -> HindsightResult<NameDictionary>
    {
        self.properties_array(heap)?
            .map(NameDictionary::new)
            .ok_or_else(|| HindsightError::layout(format!("dictionary object {} has no properties", self.0.raw())))
    }

    pub fn elements_length(&self, heap: &Heap<'_>) -> HindsightResult<usize>
    {
        self.elements(heap)?.length(heap)
    }

    /// Number of named properties: own descriptors in fast mode, live
    /// entries in dictionary mode.
    pub fn properties_length(&self, heap: &Heap<'_>) -> HindsightResult<usize>
    {
        let map = self.map(heap)?;
        if map.is_dictionary(heap)? {
            self.dictionary(heap)?.live_count(heap)
        } else {
            map.own_descriptors(heap)
        }
    }

    /// Number of embedder fields. Only ordinary object types have them.
    pub fn internal_fields_length(&self, heap: &Heap<'_>) -> HindsightResult<usize>
    {
        let map = self.map(heap)?;
        if !heap.layout().types.is_plain_object(map.instance_type(heap)?) {
            return Ok(0);
        }
        let instance_size = map.instance_size(heap)?;
        if instance_size == 0 {
            return Ok(0);
        }
        let pointer_size = heap.pointer_size() as i64;
        let end = instance_size - map.in_object_properties(heap)? * pointer_size;
        let start = heap.layout().js_object.internal_fields.get()?;
        Ok(usize::try_from((end - start) / pointer_size).unwrap_or(0))
    }

    /// Raw words of the internal fields in `window`.
    pub fn internal_fields(&self, heap: &Heap<'_>, window: Window) -> HindsightResult<Vec<Address>>
    {
        let start = heap.layout().js_object.internal_fields;
        window
            .range()
            .map(|index| {
                let offset = start.get()? + (index * heap.pointer_size()) as i64;
                Ok(Address::new(heap.memory().pointer(self.0.field(offset, heap.layout()))?))
            })
            .collect()
    }

    /// Named properties whose position falls in `window` (all of them when `None`).
    pub fn properties(&self, heap: &Heap<'_>, window: Option<Window>) -> HindsightResult<Vec<PropertyEntry>>
    {
        let map = self.map(heap)?;
        map.check_in_object_region(heap)?;
        if map.is_dictionary(heap)? {
            let entries = self.dictionary(heap)?.entries(heap, window)?;
            return Ok(entries
                .into_iter()
                .map(|(key, value)| PropertyEntry {
                    key,
                    value: PropertySlot::Value(value),
                })
                .collect());
        }

        let Some(descriptors) = map.descriptors(heap)? else {
            return Ok(Vec::new());
        };
        let count = map.own_descriptors(heap)?;
        let range = window.map_or(0..count, |window| window.range());
        let in_object = map.in_object_properties(heap)?;
        let instance_size = map.instance_size(heap)?;
        let backing = self.properties_array(heap)?;

        range
            .map(|index| {
                let entry = descriptors.entry(heap, index, in_object)?;
                let value = match entry.storage {
                    FieldStorage::Descriptor => PropertySlot::Value(descriptors.value(heap, index)?),
                    FieldStorage::Unsupported => PropertySlot::Unsupported(entry.details),
                    FieldStorage::Field { index, double } => {
                        self.field(heap, index, double, instance_size, backing.as_ref())?
                    }
                };
                Ok(PropertyEntry { key: entry.key, value })
            })
            .collect()
    }

    fn field(
        &self,
        heap: &Heap<'_>,
        index: i64,
        double: bool,
        instance_size: i64,
        backing: Option<&HeapObject>,
    ) -> HindsightResult<PropertySlot>
    {
        let pointer_size = heap.pointer_size() as i64;
        let (object, offset) = if index < 0 {
            let offset = instance_size + index * pointer_size;
            let header = heap.layout().js_object.internal_fields.get()?;
            if offset < header || offset >= instance_size {
                return Err(HindsightError::layout(format!(
                    "in-object field at {offset} outside {header}..{instance_size} of {}",
                    self.0.raw()
                )));
            }
            (&self.0, offset)
        } else {
            let backing = backing.ok_or_else(|| {
                HindsightError::layout(format!("field {index} of {} has no properties array", self.0.raw()))
            })?;
            let length = FixedArray::new(backing.clone()).length(heap)? as i64;
            if index >= length {
                return Err(HindsightError::layout(format!(
                    "field {index} outside properties array of length {length}"
                )));
            }
            (backing, heap.layout().fixed_array.data.get()? + index * pointer_size)
        };

        if double {
            Ok(PropertySlot::Double(heap.double(object, offset)?))
        } else {
            Ok(PropertySlot::Value(heap.value_at(object.field(offset, heap.layout()))?))
        }
    }

    /// Keys in `Object.keys` order: element indexes that are not holes, then
    /// names of properties stored in fields or dictionary entries.
    pub fn keys(&self, heap: &Heap<'_>) -> HindsightResult<Vec<String>>
    {
        let map = self.map(heap)?;
        map.check_in_object_region(heap)?;
        let mut keys = Vec::new();
        let elements = self.elements(heap)?;
        for index in 0..elements.length(heap)? {
            if !super::array::is_hole(heap, &elements.get(heap, index)?)? {
                keys.push(index.to_string());
            }
        }

        if map.is_dictionary(heap)? {
            for (key, _) in self.dictionary(heap)?.entries(heap, None)? {
                keys.push(key_text(heap, &key)?);
            }
        } else if let Some(descriptors) = map.descriptors(heap)? {
            for index in 0..map.own_descriptors(heap)? {
                let entry = descriptors.entry(heap, index, 0)?;
                if matches!(entry.storage, FieldStorage::Field { .. }) {
                    keys.push(key_text(heap, &entry.key)?);
                }
            }
        }
        Ok(keys)
    }

    /// The value of the property named `name` (`<non-string>` matches symbol keys).
    pub fn property(&self, heap: &Heap<'_>, name: &str) -> HindsightResult<Option<PropertySlot>>
    {
        for entry in self.properties(heap, None)? {
            if key_text(heap, &entry.key)? == name {
                return Ok(Some(entry.value));
            }
        }
        Ok(None)
    }

    /// Decode the object body shared by objects, errors and regexps.
    pub fn decode_body(&self, cx: &Decoder<'_>, options: &InspectOptions) -> HindsightResult<ObjectNode>
    {
        let heap = cx.heap();
        let map = self.map(&heap)?;
        map.check_in_object_region(&heap)?;
        let constructor = map.constructor_name(&heap)?;
        let elements_length = self.elements_length(&heap)?;
        let properties_length = self.properties_length(&heap)?;
        let fields_length = self.internal_fields_length(&heap)?;

        let mut node = ObjectNode {
            constructor,
            elements_length,
            properties_length,
            fields_length,
            ..ObjectNode::default()
        };
        if !options.detailed {
            return Ok(node);
        }

        let total = elements_length + properties_length + fields_length;
        let window = Window::new(options.current, options.limit, total);
        let child = options.child();

        if let Some(part) = window.split(0, elements_length) {
            node.elements = Some(Page::new(self.elements(&heap)?.elements(cx, part, options)?, part));
        }
        if let Some(part) = window.split(elements_length, properties_length) {
            let properties = self
                .properties(&heap, Some(part))?
                .into_iter()
                .map(|entry| {
                    let value = match entry.value {
                        PropertySlot::Value(value) => PropertyValue::Node(Box::new(cx.value(&value, &child)?)),
                        PropertySlot::Double(double) => PropertyValue::Double { double },
                        PropertySlot::Unsupported(details) => PropertyValue::Unsupported { details },
                    };
                    Ok(Property {
                        key: key_text(&heap, &entry.key)?,
                        value,
                    })
                })
                .collect::<HindsightResult<Vec<_>>>()?;
            node.properties = Some(Page::new(properties, part));
        }
        if let Some(part) = window.split(elements_length + properties_length, fields_length) {
            node.internal_fields = Some(Page::new(self.internal_fields(&heap, part)?, part));
        }

        node.next = window.end();
        node.has_more = window.has_more();
        Ok(node)
    }

    pub fn decode(&self, cx: &Decoder<'_>, options: &InspectOptions) -> HindsightResult<NodeKind>
    {
        Ok(NodeKind::PlainObject(self.decode_body(cx, options)?))
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::mock::{details, types, HeapBuilder};

    #[test]
    fn test_three_domain_window()
    {
        let mut builder = HeapBuilder::new();
        let one = builder.smi(1);
        let two = builder.smi(2);
        let object = builder.object(&[("a", one), ("b", two)]);
        let elements = [builder.smi(7), builder.smi(8)];
        let backing = builder.fixed_array(&elements);
        builder.set_word(object, 16, backing.value());
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let cx = Decoder::new(Heap::new(&memory, &layout));

        let options = InspectOptions {
            detailed: true,
            current: 1,
            limit: 2,
            ..InspectOptions::default()
        };
        let node = JsObject::new(HeapObject::new(object)).decode_body(&cx, &options).unwrap();
        assert_eq!(node.elements_length, 2);
        assert_eq!(node.properties_length, 2);
        let elements = node.elements.unwrap();
        assert_eq!(elements.items.len(), 1);
        assert_eq!(elements.items[0].index, 1);
        let properties = node.properties.unwrap();
        assert_eq!(properties.items.len(), 1);
        assert_eq!(properties.items[0].key, "a");
        assert!(node.internal_fields.is_none());
        assert_eq!(node.next, 3);
        assert!(node.has_more);
    }

    #[test]
    fn test_out_of_object_and_double_fields()
    {
        let mut builder = HeapBuilder::new();
        let x = builder.one_byte_string("x");
        let y = builder.one_byte_string("y");
        let zero = builder.smi(0);
        let descriptors = builder.descriptors(&[(x, details::field(0), zero), (y, details::double_field(1), zero)]);
        let map = builder.object_map(types::JS_OBJECT, 0, Some((descriptors, 2)), None);
        let object = builder.alloc(24);
        builder.init_object(object, map);
        let nine = builder.smi(9);
        let backing = builder.fixed_array(&[nine, 2.5f64.to_bits()]);
        builder.set_word(object, 8, backing.value());
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let heap = Heap::new(&memory, &layout);

        let object = JsObject::new(HeapObject::new(object));
        let entries = object.properties(&heap, None).unwrap();
        assert!(matches!(entries[0].value, PropertySlot::Value(Value::Smi(_))));
        assert!(matches!(entries[1].value, PropertySlot::Double(d) if d == 2.5));
        assert_eq!(object.keys(&heap).unwrap(), vec!["x".to_string(), "y".to_string()]);
        assert!(object.property(&heap, "z").unwrap().is_none());
    }

    #[test]
    fn test_field_outside_backing_fails_closed()
    {
        let mut builder = HeapBuilder::new();
        let x = builder.one_byte_string("x");
        let zero = builder.smi(0);
        let descriptors = builder.descriptors(&[(x, details::field(4), zero)]);
        let map = builder.object_map(types::JS_OBJECT, 0, Some((descriptors, 1)), None);
        let object = builder.alloc(24);
        builder.init_object(object, map);
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let heap = Heap::new(&memory, &layout);

        let err = JsObject::new(HeapObject::new(object)).properties(&heap, None).unwrap_err();
        assert!(format!("{err}").contains("outside properties array"));
    }

    #[test]
    fn test_map_smaller_than_header_fails_closed()
    {
        let mut builder = HeapBuilder::new();
        let a = builder.one_byte_string("a");
        let zero = builder.smi(0);
        let descriptors = builder.descriptors(&[(a, details::field(0), zero)]);
        let map = builder.object_map(types::JS_OBJECT, 1, Some((descriptors, 1)), None);
        // Instance size of one word with one in-object slot: that slot would
        // land on the object's own map word.
        builder.set_bytes(map, 8, &[1, 0]);
        let object = builder.alloc(32);
        builder.init_object(object, map);
        let one = builder.smi(1);
        builder.set_word(object, 24, one);
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let heap = Heap::new(&memory, &layout);
        let cx = Decoder::new(heap);

        let object = JsObject::new(HeapObject::new(object));
        let options = InspectOptions {
            detailed: true,
            ..InspectOptions::default()
        };
        assert!(matches!(
            object.decode_body(&cx, &options),
            Err(HindsightError::UnrecognizedLayout(_))
        ));
        assert!(object.decode_body(&cx, &InspectOptions::default()).is_err());
        assert!(object.properties(&heap, None).is_err());
        assert!(object.keys(&heap).is_err());
    }
}
