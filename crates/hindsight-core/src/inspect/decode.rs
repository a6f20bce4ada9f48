//! Recursive decoding of values into result trees.

use std::cell::RefCell;

use smallvec::SmallVec;

use super::{InspectOptions, NodeKind, ResultNode};
use crate::error::HindsightResult;
use crate::heap::{Heap, HeapView};
use crate::types::Address;
use crate::value::{HeapObject, Value};

/// Decodes values against one heap, tracking the objects currently being
/// expanded so a cycle collapses to a summary.
pub struct Decoder<'a>
{
    heap: Heap<'a>,
    ancestors: RefCell<SmallVec<[Address; 8]>>,
}

impl<'a> Decoder<'a>
{
    #[must_use]
    pub fn new(heap: Heap<'a>) -> Self
    {
        Self {
            heap,
            ancestors: RefCell::new(SmallVec::new()),
        }
    }

    #[must_use]
    pub fn heap(&self) -> Heap<'a>
    {
        self.heap
    }

    /// Decode a tagged value.
    pub fn value(&self, value: &Value, options: &InspectOptions) -> HindsightResult<ResultNode>
    {
        match value {
            Value::Smi(smi) => Ok(ResultNode::new(
                Address::new(smi.raw()),
                NodeKind::SmallInt {
                    value: smi.value().to_string(),
                },
            )),
            Value::Heap(object) => self.object(object, options),
        }
    }

    /// Decode a heap object. Any failing read fails the whole node.
    pub fn object(&self, object: &HeapObject, options: &InspectOptions) -> HindsightResult<ResultNode>
    {
        let address = object.raw();
        let summary;
        let options = if self.ancestors.borrow().contains(&address) {
            summary = options.summary();
            &summary
        } else {
            options
        };

        let view = self.heap.view(object.clone())?;
        self.ancestors.borrow_mut().push(address);
        let kind = self.dispatch(&view, options);
        self.ancestors.borrow_mut().pop();

        let map = if options.include_map_address {
            Some(self.heap.map(object)?.address())
        } else {
            None
        };
        Ok(ResultNode::new(address, kind?).with_map(map))
    }

    fn dispatch(&self, view: &HeapView, options: &InspectOptions) -> HindsightResult<NodeKind>
    {
        match view {
            HeapView::Global(_) => Ok(NodeKind::Global),
            HeapView::GlobalProxy(_) => Ok(NodeKind::GlobalProxy),
            HeapView::Code(_) => Ok(NodeKind::Code),
            HeapView::Map(map) => map.decode(self, options),
            HeapView::Context(context) => context.decode(self, options),
            HeapView::Error(error) => error.decode(self, options),
            HeapView::Object(object) => object.decode(self, options),
            HeapView::Number(number) => number.decode(self, options),
            HeapView::Array(array) => array.decode(self, options),
            HeapView::Oddball(oddball) => oddball.decode(self, options),
            HeapView::Function(function) => function.decode(self, options),
            HeapView::RegExp(regexp) => regexp.decode(self, options),
            HeapView::String(string) => string.decode(self, options),
            HeapView::FixedArray(array) => array.decode(self, options),
            HeapView::ArrayBuffer(buffer) => buffer.decode(self, options),
            HeapView::ArrayBufferView(view) => view.decode(self, options),
            HeapView::Date(date) => date.decode(self, options),
            HeapView::SharedInfo(info) => info.decode(self, options),
            HeapView::Script(script) => script.decode(self, options),
            HeapView::Symbol(symbol) => symbol.decode(self, options),
            HeapView::ScopeInfo(scope) => scope.decode(self, options),
            HeapView::DescriptorArray(array) => array.decode(self, options),
            HeapView::NameDictionary(dictionary) => dictionary.decode(self, options),
            HeapView::Unknown { type_id, .. } => Ok(NodeKind::Unknown { type_id: *type_id }),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::mock::HeapBuilder;

    #[test]
    fn test_self_reference_collapses_to_summary()
    {
        let mut builder = HeapBuilder::new();
        let zero = builder.smi(0);
        let object = builder.object(&[("self", zero)]);
        builder.set_word(object, 24, object.value());
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let cx = Decoder::new(Heap::new(&memory, &layout));

        let options = InspectOptions {
            detailed: true,
            depth: 4,
            ..InspectOptions::default()
        };
        let node = cx.object(&HeapObject::new(object), &options).unwrap();
        let text = node.to_string();
        assert!(text.contains(&format!(".self={object}:<Object: no constructor>")), "{text}");
    }

    #[test]
    fn test_map_address_prefix()
    {
        let mut builder = HeapBuilder::new();
        let number = builder.heap_number(2.0);
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let cx = Decoder::new(Heap::new(&memory, &layout));

        let options = InspectOptions {
            include_map_address: true,
            ..InspectOptions::default()
        };
        let node = cx.object(&HeapObject::new(number), &options).unwrap();
        let map = node.map_address.unwrap();
        assert_eq!(node.to_string(), format!("{number}(map={map}):<Number: 2.000000>"));
    }
}
