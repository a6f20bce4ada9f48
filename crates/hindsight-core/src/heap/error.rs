//! # Error Objects
//!
//! An error is an ordinary object plus a captured stack trace. The trace sits
//! under a private symbol, which has no name postmortem, so it is found by
//! shape: the first symbol-keyed property holding a JS array.
//!
//! Two array conventions exist:
//!
//! - newer builds: element 0 is the frame count `n`, frames use 5 slots, and
//!   the array has `5n + 1` elements;
//! - older builds: element 0 is zero and frames use 4 slots.
//!
//! The function of frame `i` lives at element `2 + i * stride`. An array that
//! matches neither convention is logged and skipped.

use tracing::warn;

use super::object::PropertySlot;
use super::{Heap, JsArray, JsObject};
use crate::error::{HindsightError, HindsightResult};
use crate::inspect::{Decoder, InspectOptions, NodeKind};
use crate::value::{HeapObject, Value};

/// Key text of symbol-keyed properties.
const SYMBOL_KEY: &str = "<non-string>";

heap_view!(
    /// A JS error object.
    JsError
);

/// The captured stack array of an error, with its detected convention.
#[derive(Debug, Clone)]
pub struct CapturedStack
{
    array: JsArray,
    frames: usize,
    stride: usize,
}

impl CapturedStack
{
    /// Detect the convention of `array`.
    fn detect(heap: &Heap<'_>, array: JsArray) -> HindsightResult<Self>
    {
        let length = array.length(heap)? as i64;
        let first = array.get(heap, 0)?;
        let count = first
            .as_smi()
            .ok_or_else(|| HindsightError::layout("first stack element is not a Smi"))?;

        if count * 5 + 1 == length {
            return Ok(Self {
                array,
                frames: usize::try_from(count).unwrap_or(0),
                stride: 5,
            });
        }
        if count != 0 || length < 1 || (length - 1) % 4 != 0 {
            return Err(HindsightError::layout(format!(
                "array does not look like a stack: count {count}, length {length}"
            )));
        }
        Ok(Self {
            array,
            frames: usize::try_from((length - 1) / 4).unwrap_or(0),
            stride: 4,
        })
    }

    #[must_use]
    pub fn frames(&self) -> usize
    {
        self.frames
    }

    /// Slots per frame (4 or 5).
    #[must_use]
    pub fn stride(&self) -> usize
    {
        self.stride
    }

    /// The function slot of frame `index`.
    pub fn function(&self, heap: &Heap<'_>, index: usize) -> HindsightResult<Value>
    {
        self.array.get(heap, 2 + index * self.stride)
    }
}

/// Find the captured stack of `object`, if it has a recognizable one.
#[must_use]
pub fn locate_captured_stack(heap: &Heap<'_>, object: &JsObject) -> Option<CapturedStack>
{
    let result = (|| -> HindsightResult<Option<CapturedStack>> {
        let Some(PropertySlot::Value(candidate)) = object.property(heap, SYMBOL_KEY)? else {
            return Ok(None);
        };
        if !heap.is_type(&candidate, heap.layout().types.js_array)? {
            return Err(HindsightError::layout("symbol property is not an array"));
        }
        let Some(array) = candidate.as_heap() else {
            return Ok(None);
        };
        CapturedStack::detect(heap, JsArray::new(array.clone())).map(Some)
    })();

    match result {
        Ok(stack) => stack,
        Err(error) => {
            warn!(object = %object.address(), %error, "no usable error stack");
            None
        }
    }
}

/// Shape check for builds without an error type id: an ordinary object whose
/// constructor is named like an error.
pub(crate) fn looks_like_error(heap: &Heap<'_>, object: &HeapObject) -> bool
{
    heap.map(object)
        .and_then(|map| map.constructor_name(heap))
        .ok()
        .flatten()
        .is_some_and(|name| name.ends_with("Error"))
}

impl JsError
{
    fn as_object(&self) -> JsObject
    {
        JsObject::new(self.0.clone())
    }

    /// Summaries of each stack frame's function.
    pub fn stack(&self, cx: &Decoder<'_>) -> HindsightResult<Option<Vec<String>>>
    {
        let heap = cx.heap();
        let Some(stack) = locate_captured_stack(&heap, &self.as_object()) else {
            return Ok(None);
        };
        let summary = InspectOptions::default();
        (0..stack.frames())
            .map(|index| {
                let function = stack.function(&heap, index)?;
                Ok(cx.value(&function, &summary)?.to_string())
            })
            .collect::<HindsightResult<Vec<_>>>()
            .map(Some)
    }

    pub fn decode(&self, cx: &Decoder<'_>, options: &InspectOptions) -> HindsightResult<NodeKind>
    {
        let object = self.as_object().decode_body(cx, options)?;
        let stack = if options.detailed { self.stack(cx)? } else { None };
        Ok(NodeKind::Error { object, stack })
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::mock::{details, types, HeapBuilder};
    use crate::types::Address;

    fn error_with_stack(builder: &mut HeapBuilder, stack: &[u64]) -> Address
    {
        let array = builder.js_array(stack);
        error_with_array(builder, array)
    }

    fn error_with_array(builder: &mut HeapBuilder, array: Address) -> Address
    {
        let message = builder.one_byte_string("message");
        let symbol = builder.symbol(None);
        let zero = builder.smi(0);
        let descriptors = builder.descriptors(&[(message, details::field(0), zero), (symbol, details::field(1), zero)]);
        let map = builder.object_map(types::JS_ERROR, 2, Some((descriptors, 2)), None);
        let error = builder.alloc(40);
        builder.init_object(error, map);
        let text = builder.one_byte_string("boom");
        builder.set_word(error, 24, text.value());
        builder.set_word(error, 32, array.value());
        error
    }

    #[test]
    fn test_five_slot_frames()
    {
        let mut builder = HeapBuilder::new();
        let info = builder.shared_info("handler", None, 0, 0);
        let function = builder.function(info, None);
        let zero = builder.smi(0);
        let count = builder.smi(1);
        let error = error_with_stack(&mut builder, &[count, zero, function.value(), zero, zero, zero]);
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let heap = Heap::new(&memory, &layout);
        let cx = Decoder::new(heap);

        let object = JsObject::new(HeapObject::new(error));
        let stack = locate_captured_stack(&heap, &object).unwrap();
        assert_eq!((stack.frames(), stack.stride()), (1, 5));
        let frames = JsError::new(HeapObject::new(error)).stack(&cx).unwrap().unwrap();
        assert_eq!(frames, vec!["<function: handler at [native code]>".to_string()]);
    }

    #[test]
    fn test_four_slot_frames()
    {
        let mut builder = HeapBuilder::new();
        let zero = builder.smi(0);
        let error = error_with_stack(&mut builder, &[zero; 9]);
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let heap = Heap::new(&memory, &layout);

        let stack = locate_captured_stack(&heap, &JsObject::new(HeapObject::new(error))).unwrap();
        assert_eq!((stack.frames(), stack.stride()), (2, 4));
    }

    #[test]
    fn test_unrecognized_stack_is_skipped()
    {
        let mut builder = HeapBuilder::new();
        let three = builder.smi(3);
        let zero = builder.smi(0);
        let error = error_with_stack(&mut builder, &[three, zero, zero]);
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let heap = Heap::new(&memory, &layout);
        let cx = Decoder::new(heap);

        assert!(locate_captured_stack(&heap, &JsObject::new(HeapObject::new(error))).is_none());
        let options = InspectOptions {
            detailed: true,
            ..InspectOptions::default()
        };
        let node = cx.object(&HeapObject::new(error), &options).unwrap();
        let text = node.to_string();
        assert!(text.starts_with("<Error: no constructor"), "{text}");
        assert!(!text.contains("error stack"), "{text}");
    }

    #[test]
    fn test_frame_count_past_backing_fails()
    {
        let mut builder = HeapBuilder::new();
        let info = builder.shared_info("handler", None, 0, 0);
        let function = builder.function(info, None);
        let zero = builder.smi(0);
        let count = builder.smi(2);
        let array = builder.js_array(&[count, zero, function.value(), zero, zero, zero]);
        // Claims two five-slot frames while the backing store holds one.
        let length = builder.smi(11);
        builder.set_word(array, 24, length);
        let error = error_with_array(&mut builder, array);
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let heap = Heap::new(&memory, &layout);
        let cx = Decoder::new(heap);

        let stack = locate_captured_stack(&heap, &JsObject::new(HeapObject::new(error))).unwrap();
        assert_eq!((stack.frames(), stack.stride()), (2, 5));
        assert!(stack.function(&heap, 0).is_ok());
        assert!(matches!(
            stack.function(&heap, 1),
            Err(HindsightError::UnrecognizedLayout(_))
        ));
        assert!(JsError::new(HeapObject::new(error)).stack(&cx).is_err());
    }
}
