//! Boxed numbers, oddballs, dates, symbols and regexps.

use tracing::debug;

use super::{Heap, JsObject, JsString, StringText};
use crate::error::HindsightResult;
use crate::inspect::{Decoder, InspectOptions, NodeKind};
use crate::value::Value;

/// `%f` at top level, two decimals inside a parent.
pub(crate) fn number_text(value: f64, nested: bool) -> String
{
    if nested {
        format!("{value:.2}")
    } else {
        format!("{value:.6}")
    }
}

heap_view!(
    /// A boxed double.
    HeapNumber
);

impl HeapNumber
{
    pub fn value(&self, heap: &Heap<'_>) -> HindsightResult<f64>
    {
        heap.double(&self.0, heap.layout().heap_number.value.get()?)
    }

    pub fn decode(&self, cx: &Decoder<'_>, options: &InspectOptions) -> HindsightResult<NodeKind>
    {
        let value = self.value(&cx.heap())?;
        Ok(NodeKind::Number {
            value,
            text: number_text(value, options.nested),
        })
    }
}

/// Which singleton an oddball is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OddballKind
{
    Exception,
    False,
    True,
    Undefined,
    Null,
    TheHole,
    Uninitialized,
    Other(i64),
}

impl OddballKind
{
    /// Text shown between angle brackets.
    #[must_use]
    pub const fn label(self) -> &'static str
    {
        match self {
            OddballKind::Exception => "exception",
            OddballKind::False => "false",
            OddballKind::True => "true",
            OddballKind::Undefined => "undefined",
            OddballKind::Null => "null",
            OddballKind::TheHole => "hole",
            OddballKind::Uninitialized => "uninitialized",
            OddballKind::Other(_) => "Oddball",
        }
    }
}

heap_view!(
    /// One of the runtime's sentinel singletons.
    Oddball
);

impl Oddball
{
    pub fn kind(&self, heap: &Heap<'_>) -> HindsightResult<OddballKind>
    {
        let layout = &heap.layout().oddball;
        let kind = heap.int(&self.0, layout.kind)?;
        let table = [
            (layout.exception, OddballKind::Exception),
            (layout.false_, OddballKind::False),
            (layout.true_, OddballKind::True),
            (layout.undefined, OddballKind::Undefined),
            (layout.null, OddballKind::Null),
            (layout.the_hole, OddballKind::TheHole),
            (layout.uninitialized, OddballKind::Uninitialized),
        ];
        Ok(table
            .into_iter()
            .find(|(constant, _)| constant.matches(kind))
            .map_or(OddballKind::Other(kind), |(_, oddball)| oddball))
    }

    pub fn decode(&self, cx: &Decoder<'_>, _options: &InspectOptions) -> HindsightResult<NodeKind>
    {
        Ok(NodeKind::Oddball {
            value: self.kind(&cx.heap())?.label().to_string(),
        })
    }
}

heap_view!(
    /// A `Date`; its time value is a Smi or a heap number.
    JsDate
);

impl JsDate
{
    /// The time value as text; empty when the slot holds neither form.
    pub fn value_text(&self, heap: &Heap<'_>) -> HindsightResult<String>
    {
        let value = heap.value(&self.0, heap.layout().date.value)?;
        match &value {
            Value::Smi(smi) => Ok(smi.value().to_string()),
            Value::Heap(object) if heap.is_type(&value, heap.layout().types.heap_number)? => {
                Ok(number_text(HeapNumber::new(object.clone()).value(heap)?, false))
            }
            Value::Heap(object) => {
                debug!(date = %self.0.raw(), value = %object.raw(), "date value is not a number");
                Ok(String::new())
            }
        }
    }

    pub fn decode(&self, cx: &Decoder<'_>, _options: &InspectOptions) -> HindsightResult<NodeKind>
    {
        Ok(NodeKind::Date {
            value: self.value_text(&cx.heap())?,
        })
    }
}

heap_view!(
    /// A symbol and its optional description.
    Symbol
);

impl Symbol
{
    /// The description, or `None` for `Symbol()`.
    pub fn description(&self, heap: &Heap<'_>) -> HindsightResult<Option<String>>
    {
        let name = heap.value(&self.0, heap.layout().symbol.name)?;
        if !heap.is_string(&name)? {
            return Ok(None);
        }
        match name.as_heap() {
            Some(object) => JsString::new(object.clone()).text(heap, StringText::Unicode).map(Some),
            None => Ok(None),
        }
    }

    pub fn decode(&self, cx: &Decoder<'_>, _options: &InspectOptions) -> HindsightResult<NodeKind>
    {
        Ok(NodeKind::Symbol {
            description: self.description(&cx.heap())?.unwrap_or_default(),
        })
    }
}

heap_view!(
    /// A regular expression object.
    JsRegExp
);

impl JsRegExp
{
    pub fn source(&self, heap: &Heap<'_>) -> HindsightResult<String>
    {
        let source = JsString::new(heap.heap_value(&self.0, heap.layout().regexp.source)?);
        source.text(heap, StringText::Unicode)
    }

    pub fn decode(&self, cx: &Decoder<'_>, options: &InspectOptions) -> HindsightResult<NodeKind>
    {
        let source = self.source(&cx.heap())?;
        let object = if options.detailed {
            Some(JsObject::new(self.0.clone()).decode_body(cx, options)?)
        } else {
            None
        };
        Ok(NodeKind::RegExp { source, object })
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::mock::{oddballs, HeapBuilder};
    use crate::value::HeapObject;

    #[test]
    fn test_number_text()
    {
        assert_eq!(number_text(1.5, false), "1.500000");
        assert_eq!(number_text(1.5, true), "1.50");
    }

    #[test]
    fn test_oddball_kinds()
    {
        let mut builder = HeapBuilder::new();
        let null = builder.oddball(oddballs::NULL);
        let hole = builder.the_hole();
        let odd = builder.oddball(42);
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let heap = Heap::new(&memory, &layout);

        let kind = |address| Oddball::new(HeapObject::new(address)).kind(&heap).unwrap();
        assert_eq!(kind(null), OddballKind::Null);
        assert_eq!(kind(hole), OddballKind::TheHole);
        assert_eq!(kind(odd), OddballKind::Other(42));
        assert_eq!(kind(odd).label(), "Oddball");
    }

    #[test]
    fn test_date_and_symbol()
    {
        let mut builder = HeapBuilder::new();
        let date = builder.date(1_700_000_000_000.0);
        let symbol = builder.symbol(Some("tag"));
        let bare = builder.symbol(None);
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let heap = Heap::new(&memory, &layout);

        let date = JsDate::new(HeapObject::new(date));
        assert_eq!(date.value_text(&heap).unwrap(), "1700000000000.000000");
        assert_eq!(
            Symbol::new(HeapObject::new(symbol)).description(&heap).unwrap().as_deref(),
            Some("tag")
        );
        assert_eq!(Symbol::new(HeapObject::new(bare)).description(&heap).unwrap(), None);
    }
}
