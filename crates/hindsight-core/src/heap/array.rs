//! Fixed arrays and JS arrays.

use super::{Heap, Oddball, OddballKind};
use crate::error::{HindsightError, HindsightResult};
use crate::inspect::{Decoder, Element, InspectOptions, NodeKind, Page, Window};
use crate::value::Value;

heap_view!(
    /// A length-prefixed run of tagged slots.
    FixedArray
);

impl FixedArray
{
    pub fn length(&self, heap: &Heap<'_>) -> HindsightResult<usize>
    {
        let length = heap.int(&self.0, heap.layout().fixed_array.length)?;
        Ok(usize::try_from(length).unwrap_or(0))
    }

    /// Slot `index`, or a layout error when `index` is not below
    /// [`FixedArray::length`].
    pub fn get(&self, heap: &Heap<'_>, index: usize) -> HindsightResult<Value>
    {
        let length = self.length(heap)?;
        if index >= length {
            return Err(HindsightError::layout(format!(
                "slot {index} outside array of length {length} at {}",
                self.0.raw()
            )));
        }
        heap.slot(&self.0, heap.layout().fixed_array.data, index)
    }

    /// Decode the slots of `window` (relative to this array) as elements,
    /// numbering them from `window.start()`.
    pub fn elements(&self, cx: &Decoder<'_>, window: Window, options: &InspectOptions) -> HindsightResult<Vec<Element>>
    {
        let heap = cx.heap();
        let child = options.child();
        window
            .range()
            .map(|index| {
                let value = self.get(&heap, index)?;
                let value = if is_hole(&heap, &value)? {
                    None
                } else {
                    Some(Box::new(cx.value(&value, &child)?))
                };
                Ok(Element { index, value })
            })
            .collect()
    }

    pub fn decode(&self, cx: &Decoder<'_>, options: &InspectOptions) -> HindsightResult<NodeKind>
    {
        let length = self.length(&cx.heap())?;
        let elements = if options.detailed {
            let window = Window::new(options.current, options.limit, length);
            Some(Page::new(self.elements(cx, window, options)?, window))
        } else {
            None
        };
        Ok(NodeKind::FixedArray { length, elements })
    }
}

/// Whether `value` is the hole oddball.
pub(crate) fn is_hole(heap: &Heap<'_>, value: &Value) -> HindsightResult<bool>
{
    if !heap.is_type(value, heap.layout().types.oddball)? {
        return Ok(false);
    }
    match value.as_heap() {
        Some(object) => Ok(Oddball::new(object.clone()).kind(heap)? == OddballKind::TheHole),
        None => Ok(false),
    }
}

heap_view!(
    /// A JS array: an object whose elements are indexed by `length`.
    JsArray
);

impl JsArray
{
    pub fn length(&self, heap: &Heap<'_>) -> HindsightResult<usize>
    {
        let length = heap.int(&self.0, heap.layout().js_array.length)?;
        Ok(usize::try_from(length).unwrap_or(0))
    }

    /// The elements backing store.
    pub fn backing(&self, heap: &Heap<'_>) -> HindsightResult<FixedArray>
    {
        Ok(FixedArray::new(heap.heap_value(&self.0, heap.layout().js_object.elements)?))
    }

    /// Element `index`, read through the backing store.
    pub fn get(&self, heap: &Heap<'_>, index: usize) -> HindsightResult<Value>
    {
        self.backing(heap)?.get(heap, index)
    }

    pub fn decode(&self, cx: &Decoder<'_>, options: &InspectOptions) -> HindsightResult<NodeKind>
    {
        let heap = cx.heap();
        let length = self.length(&heap)?;
        let elements = if options.detailed {
            let backing = self.backing(&heap)?;
            let stored = length.min(backing.length(&heap)?);
            let window = Window::new(options.current, options.limit, stored);
            Some(Page::new(backing.elements(cx, window, options)?, window))
        } else {
            None
        };
        Ok(NodeKind::Array { length, elements })
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::inspect::InspectOptions;
    use crate::mock::HeapBuilder;
    use crate::value::HeapObject;

    #[test]
    fn test_array_window_and_holes()
    {
        let mut builder = HeapBuilder::new();
        let hole = builder.the_hole();
        let values = [builder.smi(10), hole.value(), builder.smi(30), builder.smi(40)];
        let array = builder.js_array(&values);
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let heap = Heap::new(&memory, &layout);
        let cx = Decoder::new(heap);

        let options = InspectOptions {
            detailed: true,
            current: 1,
            limit: 2,
            ..InspectOptions::default()
        };
        let kind = JsArray::new(HeapObject::new(array)).decode(&cx, &options).unwrap();
        let NodeKind::Array { length, elements } = kind else {
            panic!("expected array");
        };
        assert_eq!(length, 4);
        let page = elements.unwrap();
        assert_eq!(page.returned_count, 2);
        assert_eq!(page.items[0].index, 1);
        assert!(page.items[0].value.is_none());
        assert_eq!(page.items[1].value.as_ref().unwrap().to_string(), "<Smi: 30>");
        assert!(page.has_more);
        assert_eq!(page.remaining_count, 1);
        assert_eq!(page.next, 3);
    }

    #[test]
    fn test_get_past_length_fails()
    {
        let mut builder = HeapBuilder::new();
        let values = [builder.smi(1), builder.smi(2)];
        let array = builder.fixed_array(&values);
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let heap = Heap::new(&memory, &layout);

        let array = FixedArray::new(HeapObject::new(array));
        assert_eq!(array.get(&heap, 1).unwrap().as_smi(), Some(2));
        assert!(matches!(array.get(&heap, 2), Err(HindsightError::UnrecognizedLayout(_))));
        assert!(array.get(&heap, usize::MAX).is_err());
    }
}
