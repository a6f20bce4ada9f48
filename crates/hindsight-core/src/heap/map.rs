//! Hidden classes.

use super::{DescriptorArray, Heap, JsFunction};
use crate::error::{HindsightError, HindsightResult};
use crate::inspect::{Decoder, InspectOptions, MapNode, NodeKind};
use crate::value::Value;

/// Back-pointer chains are short; this only guards against corrupt cycles.
const MAX_BACK_POINTERS: usize = 64;

heap_view!(
    /// The map of a heap object.
    Map
);

impl Map
{
    /// Instance type, from the dedicated field or the low byte of the
    /// packed attributes on older builds.
    pub fn instance_type(&self, heap: &Heap<'_>) -> HindsightResult<i64>
    {
        let layout = &heap.layout().map;
        if layout.instance_type.is_available() {
            heap.int(&self.0, layout.instance_type)
        } else {
            Ok(heap.int(&self.0, layout.instance_attributes)? & 0xff)
        }
    }

    pub fn bit_field3(&self, heap: &Heap<'_>) -> HindsightResult<i64>
    {
        heap.int(&self.0, heap.layout().map.bit_field3)
    }

    /// Number of descriptors owned by this map.
    pub fn own_descriptors(&self, heap: &Heap<'_>) -> HindsightResult<usize>
    {
        let layout = &heap.layout().map;
        let mask = layout.own_descriptors_mask.get()?;
        let shift = layout.own_descriptors_shift.get()?;
        let count = (self.bit_field3(heap)? & mask) >> shift;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Whether objects with this map keep properties in a dictionary.
    pub fn is_dictionary(&self, heap: &Heap<'_>) -> HindsightResult<bool>
    {
        let shift = heap.layout().map.dictionary_map_shift.get()?;
        Ok((self.bit_field3(heap)? >> shift) & 1 == 1)
    }

    /// Instance size in bytes.
    pub fn instance_size(&self, heap: &Heap<'_>) -> HindsightResult<i64>
    {
        let words = heap.int(&self.0, heap.layout().map.instance_size)?;
        Ok(words * heap.pointer_size() as i64)
    }

    /// Number of properties stored inside the object itself.
    pub fn in_object_properties(&self, heap: &Heap<'_>) -> HindsightResult<i64>
    {
        let layout = &heap.layout().map;
        let value = heap.int(&self.0, layout.in_object_properties)?;
        if layout.in_object_is_start {
            let words = heap.int(&self.0, layout.instance_size)?;
            Ok(words - value)
        } else {
            Ok(value)
        }
    }

    /// Check that the in-object property region fits between the object
    /// header and the end of the instance.
    ///
    /// Builds that export neither count skip the check; reading a field then
    /// fails on the missing constant instead.
    pub fn check_in_object_region(&self, heap: &Heap<'_>) -> HindsightResult<()>
    {
        let layout = heap.layout();
        if !layout.map.in_object_properties.is_available()
            || !layout.map.instance_size.is_available()
            || !layout.js_object.internal_fields.is_available()
        {
            return Ok(());
        }
        let header = layout.js_object.internal_fields.get()?;
        let instance_size = self.instance_size(heap)?;
        let in_object = self.in_object_properties(heap)?;
        if in_object < 0 || (in_object > 0 && in_object * heap.pointer_size() as i64 > instance_size - header) {
            return Err(HindsightError::layout(format!(
                "map {} declares {in_object} in-object properties in a {instance_size}-byte instance",
                self.0.raw()
            )));
        }
        Ok(())
    }

    /// The descriptor array; maps without own descriptors may hold a Smi instead.
    pub fn descriptors(&self, heap: &Heap<'_>) -> HindsightResult<Option<DescriptorArray>>
    {
        let value = heap.value(&self.0, heap.layout().map.descriptors)?;
        Ok(value.as_heap().cloned().map(DescriptorArray::new))
    }

    /// The constructor, following back pointers through transition maps.
    pub fn constructor(&self, heap: &Heap<'_>) -> HindsightResult<Value>
    {
        let map_type = heap.layout().types.map;
        let offset = heap.layout().map.constructor;
        let mut current = heap.value(&self.0, offset)?;
        for _ in 0..MAX_BACK_POINTERS {
            if !heap.is_type(&current, map_type)? {
                break;
            }
            let Some(object) = current.as_heap() else {
                break;
            };
            current = heap.value(object, offset)?;
        }
        Ok(current)
    }

    /// Name of the constructor function, when there is one.
    pub fn constructor_name(&self, heap: &Heap<'_>) -> HindsightResult<Option<String>>
    {
        let constructor = self.constructor(heap)?;
        if !heap.is_type(&constructor, heap.layout().types.js_function)? {
            return Ok(None);
        }
        match constructor.as_heap() {
            Some(object) => JsFunction::new(object.clone()).name(heap).map(Some),
            None => Ok(None),
        }
    }

    pub fn decode(&self, cx: &Decoder<'_>, options: &InspectOptions) -> HindsightResult<NodeKind>
    {
        let heap = cx.heap();
        let dictionary = self.is_dictionary(&heap)?;
        let in_object_properties = if heap.layout().map.in_object_properties.is_available() {
            Some(self.in_object_properties(&heap)?)
        } else {
            None
        };
        let descriptors = self.descriptors(&heap)?;
        let expanded = match &descriptors {
            Some(array) if options.detailed && !dictionary => Some(Box::new(cx.object(array.object(), &options.child())?)),
            _ => None,
        };

        Ok(NodeKind::Map(MapNode {
            own_descriptors: self.own_descriptors(&heap)?,
            dictionary,
            in_object_properties,
            instance_size: self.instance_size(&heap)?,
            descriptors_address: descriptors.as_ref().map(DescriptorArray::address),
            descriptors: expanded,
        }))
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::inspect::InspectOptions;
    use crate::mock::{types, HeapBuilder};
    use crate::types::Address;
    use crate::value::HeapObject;

    #[test]
    fn test_object_map_counts()
    {
        let mut builder = HeapBuilder::new();
        let one = builder.smi(1);
        let two = builder.smi(2);
        let object = builder.object(&[("a", one), ("b", two)]);
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let heap = Heap::new(&memory, &layout);

        let map = heap.map(&HeapObject::new(object)).unwrap();
        assert_eq!(map.instance_type(&heap).unwrap(), types::JS_OBJECT);
        assert_eq!(map.own_descriptors(&heap).unwrap(), 2);
        assert_eq!(map.in_object_properties(&heap).unwrap(), 2);
        assert_eq!(map.instance_size(&heap).unwrap(), 40);
        assert!(!map.is_dictionary(&heap).unwrap());
        assert_eq!(map.constructor_name(&heap).unwrap(), None);
    }

    #[test]
    fn test_constructor_follows_back_pointer()
    {
        let mut builder = HeapBuilder::new();
        let info = builder.shared_info("Point", None, 0, 0);
        let function = builder.function(info, None);
        let root = builder.object_map(types::JS_OBJECT, 0, None, Some(function));
        let transition = builder.object_map(types::JS_OBJECT, 0, None, Some(root));
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let heap = Heap::new(&memory, &layout);

        let map = Map::new(HeapObject::new(transition));
        assert_eq!(map.constructor_name(&heap).unwrap().as_deref(), Some("Point"));
    }

    #[test]
    fn test_in_object_region_must_fit_instance()
    {
        let mut builder = HeapBuilder::new();
        let fits = builder.object_map(types::JS_OBJECT, 2, None, None);
        let overflowing = builder.object_map(types::JS_OBJECT, 1, None, None);
        // One word of instance, no room for the header, one in-object slot.
        builder.set_bytes(overflowing, 8, &[1, 0]);
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let heap = Heap::new(&memory, &layout);

        assert!(Map::new(HeapObject::new(fits)).check_in_object_region(&heap).is_ok());
        let err = Map::new(HeapObject::new(overflowing))
            .check_in_object_region(&heap)
            .unwrap_err();
        assert!(matches!(err, HindsightError::UnrecognizedLayout(_)), "{err}");
    }

    #[test]
    fn test_unreadable_in_object_count_fails()
    {
        let mut builder = HeapBuilder::new();
        let map = builder.object_map(types::JS_OBJECT, 1, None, None);
        builder.memory_mut().poison(Address::new(map.value() - 1 + 9), 1);
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let cx = Decoder::new(Heap::new(&memory, &layout));

        let result = Map::new(HeapObject::new(map)).decode(&cx, &InspectOptions::default());
        assert!(matches!(result, Err(HindsightError::MemoryRead { .. })));
    }
}
