//! # Heap Views
//!
//! Typed views over raw heap objects. A view is a thin wrapper around a
//! [`HeapObject`]; all reads go through a [`Heap`], which pairs the target's
//! memory with its [`Layout`].
//!
//! ## Dispatch
//!
//! [`Heap::view`] reads the object's map, takes the instance type and picks
//! the view. Checks run in a fixed order because several type-id ranges
//! overlap (contexts and errors are both ordinary objects to a naive check):
//!
//! 1. global object, global proxy, code, map
//! 2. context range
//! 3. error (type id, or a shape heuristic on builds without one)
//! 4. plain object
//! 5. heap number, array, oddball, function, regexp
//! 6. string range
//! 7. fixed array, array buffer, typed array, date
//! 8. shared function info, script, symbol, scope info, descriptor array,
//!    name dictionary
//!
//! Anything else is [`HeapView::Unknown`], which still decodes (to a node
//! carrying the type id).

/// Declares a view type: a newtype around [`HeapObject`].
macro_rules! heap_view {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(crate::value::HeapObject);

        impl $name
        {
            #[must_use]
            pub fn new(object: crate::value::HeapObject) -> Self
            {
                Self(object)
            }

            /// The underlying heap object.
            #[must_use]
            pub fn object(&self) -> &crate::value::HeapObject
            {
                &self.0
            }

            /// The tagged pointer.
            #[must_use]
            pub fn address(&self) -> crate::types::Address
            {
                self.0.raw()
            }
        }
    };
}

mod array;
mod buffer;
mod context;
mod descriptors;
mod error;
mod function;
mod map;
mod object;
mod primitive;
mod string;

pub use array::{FixedArray, JsArray};
pub use buffer::{ArrayBuffer, ArrayBufferView};
pub use context::{Context, ScopeInfo};
pub use descriptors::{DescriptorArray, DescriptorEntry, FieldStorage, NameDictionary};
pub use error::{locate_captured_stack, CapturedStack, JsError};
pub use function::{JsFunction, Script, SharedFunctionInfo};
pub use map::Map;
pub use object::{JsObject, PropertyEntry, PropertySlot};
pub use primitive::{HeapNumber, JsDate, JsRegExp, Oddball, OddballKind, Symbol};
pub use string::{JsString, StringText};

use tracing::trace;

use crate::error::{HindsightError, HindsightResult};
use crate::layout::{Constant, Field, Layout, Repr};
use crate::memory::{Memory, MemoryAccess};
use crate::types::Address;
use crate::value::{HeapObject, Smi, Value};

/// Memory plus layout: everything a view needs to read itself.
#[derive(Clone, Copy)]
pub struct Heap<'a>
{
    memory: Memory<'a>,
    layout: &'a Layout,
}

impl<'a> Heap<'a>
{
    #[must_use]
    pub fn new(memory: &'a dyn MemoryAccess, layout: &'a Layout) -> Self
    {
        Self {
            memory: Memory::new(memory),
            layout,
        }
    }

    #[must_use]
    pub fn layout(&self) -> &'a Layout
    {
        self.layout
    }

    #[must_use]
    pub fn memory(&self) -> Memory<'a>
    {
        self.memory
    }

    #[must_use]
    pub fn pointer_size(&self) -> usize
    {
        self.layout.pointer_size()
    }

    /// Classify a raw word.
    #[must_use]
    pub fn classify(&self, raw: u64) -> Value
    {
        Value::classify(raw, self.layout)
    }

    /// Read a word at an absolute address and classify it.
    pub fn value_at(&self, address: Address) -> HindsightResult<Value>
    {
        Ok(self.classify(self.memory.pointer(address)?))
    }

    /// The tagged slot at `offset` in `object`.
    pub fn value(&self, object: &HeapObject, offset: Constant) -> HindsightResult<Value>
    {
        self.value_at(object.field(offset.get()?, self.layout))
    }

    /// The tagged slot at `offset` in `object`, which must hold a heap pointer.
    pub fn heap_value(&self, object: &HeapObject, offset: Constant) -> HindsightResult<HeapObject>
    {
        match self.value(object, offset)? {
            Value::Heap(child) => Ok(child),
            Value::Smi(_) => Err(HindsightError::layout(format!(
                "{} of {} is not a heap object",
                offset.name(),
                object.raw()
            ))),
        }
    }

    /// The raw word at `offset` in `object`.
    pub fn word(&self, object: &HeapObject, offset: Constant) -> HindsightResult<u64>
    {
        self.memory.pointer(object.field(offset.get()?, self.layout))
    }

    /// Tagged slot `index` counting from `base` in `object`.
    pub fn slot(&self, object: &HeapObject, base: Constant, index: usize) -> HindsightResult<Value>
    {
        let offset = base.get()? + (index * self.pointer_size()) as i64;
        self.value_at(object.field(offset, self.layout))
    }

    /// An integer field, read according to its representation.
    pub fn int(&self, object: &HeapObject, field: Field) -> HindsightResult<i64>
    {
        let address = object.field(field.offset.get()?, self.layout);
        let value = match field.repr {
            Repr::Tagged | Repr::Smi => {
                let raw = self.memory.pointer(address)?;
                if !Smi::check(raw, self.layout) {
                    return Err(HindsightError::layout(format!(
                        "{} of {} is not a small integer",
                        field.offset.name(),
                        object.raw()
                    )));
                }
                Smi::decode(raw, self.layout).value()
            }
            Repr::Int32 => i64::from(self.memory.u32(address)? as i32),
            Repr::Uint16 => i64::from(self.memory.u16(address)?),
            Repr::Uint8 => i64::from(self.memory.u8(address)?),
            Repr::Word => self.memory.pointer(address)? as i64,
        };
        Ok(value)
    }

    /// A raw double at `offset` bytes into `object`.
    pub fn double(&self, object: &HeapObject, offset: i64) -> HindsightResult<f64>
    {
        self.memory.double(object.field(offset, self.layout))
    }

    /// The object's map (the word is read once and cached on the object).
    pub fn map(&self, object: &HeapObject) -> HindsightResult<Map>
    {
        let offset = self.layout.heap_object.map.get()?;
        let word = *object
            .map_cell()
            .get_or_try_init(|| self.memory.pointer(object.field(offset, self.layout)))?;
        Ok(Map::new(HeapObject::new(Address::new(word))))
    }

    /// The object's instance type.
    pub fn type_id(&self, object: &HeapObject) -> HindsightResult<i64>
    {
        self.map(object)?.instance_type(self)
    }

    /// Whether `value` is a heap object of the type named by `type_id`.
    pub fn is_type(&self, value: &Value, type_id: Constant) -> HindsightResult<bool>
    {
        match value.as_heap() {
            Some(object) if type_id.is_available() => Ok(type_id.matches(self.type_id(object)?)),
            _ => Ok(false),
        }
    }

    /// Whether `value` is a string.
    pub fn is_string(&self, value: &Value) -> HindsightResult<bool>
    {
        match value.as_heap() {
            Some(object) => Ok(self.layout.types.is_string(self.type_id(object)?)),
            None => Ok(false),
        }
    }

    /// Whether `value` is the hole or undefined oddball.
    pub fn is_hole_or_undefined(&self, value: &Value) -> HindsightResult<bool>
    {
        if !self.is_type(value, self.layout.types.oddball)? {
            return Ok(false);
        }
        let Some(object) = value.as_heap() else {
            return Ok(false);
        };
        let kind = Oddball::new(object.clone()).kind(self)?;
        Ok(matches!(kind, OddballKind::TheHole | OddballKind::Undefined))
    }

    /// Pick the view for `object`.
    pub fn view(&self, object: HeapObject) -> HindsightResult<HeapView>
    {
        let type_id = self.type_id(&object)?;
        let types = &self.layout.types;
        trace!(object = %object.raw(), type_id, "dispatch");

        let view = if types.global_object.matches(type_id) {
            HeapView::Global(object)
        } else if types.global_proxy.matches(type_id) {
            HeapView::GlobalProxy(object)
        } else if types.code.matches(type_id) {
            HeapView::Code(object)
        } else if types.map.matches(type_id) {
            HeapView::Map(Map::new(object))
        } else if types.is_context(type_id) {
            HeapView::Context(Context::new(object))
        } else if self.is_error(&object, type_id) {
            HeapView::Error(JsError::new(object))
        } else if types.is_plain_object(type_id) {
            HeapView::Object(JsObject::new(object))
        } else if types.heap_number.matches(type_id) {
            HeapView::Number(HeapNumber::new(object))
        } else if types.js_array.matches(type_id) {
            HeapView::Array(JsArray::new(object))
        } else if types.oddball.matches(type_id) {
            HeapView::Oddball(Oddball::new(object))
        } else if types.js_function.matches(type_id) {
            HeapView::Function(JsFunction::new(object))
        } else if types.js_regexp.matches(type_id) {
            if self.layout.regexp.source.is_available() {
                HeapView::RegExp(JsRegExp::new(object))
            } else {
                HeapView::Object(JsObject::new(object))
            }
        } else if types.is_string(type_id) {
            HeapView::String(JsString::new(object))
        } else if types.fixed_array.matches(type_id) {
            HeapView::FixedArray(FixedArray::new(object))
        } else if types.js_array_buffer.matches(type_id) {
            HeapView::ArrayBuffer(ArrayBuffer::new(object))
        } else if types.js_typed_array.matches(type_id) {
            HeapView::ArrayBufferView(ArrayBufferView::new(object))
        } else if types.js_date.matches(type_id) {
            HeapView::Date(JsDate::new(object))
        } else if types.shared_function_info.matches(type_id) {
            HeapView::SharedInfo(SharedFunctionInfo::new(object))
        } else if types.script.matches(type_id) {
            HeapView::Script(Script::new(object))
        } else if types.symbol.matches(type_id) {
            HeapView::Symbol(Symbol::new(object))
        } else if types.scope_info.matches(type_id) {
            HeapView::ScopeInfo(ScopeInfo::new(object))
        } else if types.descriptor_array.matches(type_id) {
            HeapView::DescriptorArray(DescriptorArray::new(object))
        } else if types.name_dictionary.matches(type_id) {
            HeapView::NameDictionary(NameDictionary::new(object))
        } else {
            HeapView::Unknown { object, type_id }
        };
        Ok(view)
    }

    fn is_error(&self, object: &HeapObject, type_id: i64) -> bool
    {
        let types = &self.layout.types;
        if types.js_error.is_available() {
            return types.js_error.matches(type_id);
        }
        types.js_object.matches(type_id) && error::looks_like_error(self, object)
    }
}

/// A heap object paired with the view its type selects.
#[derive(Debug, Clone)]
pub enum HeapView
{
    Global(HeapObject),
    GlobalProxy(HeapObject),
    Code(HeapObject),
    Map(Map),
    Context(Context),
    Error(JsError),
    Object(JsObject),
    Number(HeapNumber),
    Array(JsArray),
    Oddball(Oddball),
    Function(JsFunction),
    RegExp(JsRegExp),
    String(JsString),
    FixedArray(FixedArray),
    ArrayBuffer(ArrayBuffer),
    ArrayBufferView(ArrayBufferView),
    Date(JsDate),
    SharedInfo(SharedFunctionInfo),
    Script(Script),
    Symbol(Symbol),
    ScopeInfo(ScopeInfo),
    DescriptorArray(DescriptorArray),
    NameDictionary(NameDictionary),
    Unknown
    {
        object: HeapObject,
        type_id: i64,
    },
}

impl HeapView
{
    /// Short kind name used by `type_name`.
    #[must_use]
    pub fn kind_name(&self) -> &'static str
    {
        match self {
            HeapView::Global(_) => "Global",
            HeapView::GlobalProxy(_) => "GlobalProxy",
            HeapView::Code(_) => "Code",
            HeapView::Map(_) => "Map",
            HeapView::Context(_) => "Context",
            HeapView::Error(_) => "Error",
            HeapView::Object(_) => "Object",
            HeapView::Number(_) => "Number",
            HeapView::Array(_) => "Array",
            HeapView::Oddball(_) => "Oddball",
            HeapView::Function(_) => "Function",
            HeapView::RegExp(_) => "RegExp",
            HeapView::String(_) => "String",
            HeapView::FixedArray(_) => "FixedArray",
            HeapView::ArrayBuffer(_) => "ArrayBuffer",
            HeapView::ArrayBufferView(_) => "ArrayBufferView",
            HeapView::Date(_) => "Date",
            HeapView::SharedInfo(_) => "SharedFunctionInfo",
            HeapView::Script(_) => "Script",
            HeapView::Symbol(_) => "Symbol",
            HeapView::ScopeInfo(_) => "ScopeInfo",
            HeapView::DescriptorArray(_) => "DescriptorArray",
            HeapView::NameDictionary(_) => "NameDictionary",
            HeapView::Unknown { .. } => "Unknown",
        }
    }
}


#[cfg(test)]
mod tests
{
    use super::*;
    use crate::mock::{types, HeapBuilder, MockConstants};

    #[test]
    fn test_dispatch_follows_type_ids()
    {
        let mut builder = HeapBuilder::new();
        let number = builder.heap_number(1.5);
        let string = builder.one_byte_string("hi");
        let object = builder.object(&[]);
        let unknown_map = builder.map(types::UNKNOWN);
        let unknown = builder.alloc(16);
        builder.set_map(unknown, unknown_map);
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let heap = Heap::new(&memory, &layout);

        let view = |address: Address| heap.view(HeapObject::new(address)).unwrap().kind_name();
        assert_eq!(view(number), "Number");
        assert_eq!(view(string), "String");
        assert_eq!(view(object), "Object");
        match heap.view(HeapObject::new(unknown)).unwrap() {
            HeapView::Unknown { type_id, .. } => assert_eq!(type_id, types::UNKNOWN),
            other => panic!("expected Unknown, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_regexp_without_source_is_object()
    {
        let layout = Layout::load(&MockConstants::standard().without("class_JSRegExp__source__Object"));
        let mut builder = HeapBuilder::new();
        let map = builder.map(types::JS_REGEXP);
        let regexp = builder.alloc(40);
        builder.init_object(regexp, map);
        let memory = builder.finish();
        let heap = Heap::new(&memory, &layout);
        assert_eq!(heap.view(HeapObject::new(regexp)).unwrap().kind_name(), "Object");
    }

    #[test]
    fn test_map_word_is_cached()
    {
        let mut builder = HeapBuilder::new();
        let number = builder.heap_number(2.0);
        let layout = builder.layout().clone();
        let mut memory = builder.finish();
        let object = HeapObject::new(number);
        let first = Heap::new(&memory, &layout).type_id(&object).unwrap();
        memory.poison(number.offset(-1), 8);
        let second = Heap::new(&memory, &layout).type_id(&object).unwrap();
        assert_eq!(first, second);
    }
}
