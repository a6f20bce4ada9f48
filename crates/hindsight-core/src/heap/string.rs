//! # Strings
//!
//! Strings carry a two-level tag in their instance type: the representation
//! (sequential, cons, sliced, external, thin) and the encoding (one or two
//! bytes per code unit). Indirect representations are resolved before any
//! text is produced.
//!
//! Resolution works on UTF-16 code units with an explicit work stack, so a
//! long chain of cons strings cannot exhaust the native stack. Each stack
//! entry carries the code-unit range still wanted from that string, which is
//! how sliced strings and cons halves are cut down without reading the parts
//! outside the range.

use super::Heap;
use crate::error::{HindsightError, HindsightResult};
use crate::inspect::{Decoder, InspectOptions, NodeKind, StringNode};
use crate::memory::{utf16_passthrough, utf16_to_string, MAX_READ_BYTES};
use crate::value::HeapObject;

/// Placeholder for character data that lives outside the heap.
const EXTERNAL: &str = "(external)";

heap_view!(
    /// A string of any representation.
    JsString
);

/// How code units become text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringText
{
    /// Full Unicode decoding; surrogate pairs combine.
    Unicode,
    /// One character per code unit (low byte only). Positions in the result
    /// match code-unit offsets, which source line arithmetic relies on.
    Passthrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Representation
{
    Sequential,
    Cons,
    Sliced,
    External,
    Thin,
}

struct Segment
{
    object: HeapObject,
    start: usize,
    end: Option<usize>,
}

impl JsString
{
    /// Length in UTF-16 code units.
    pub fn length(&self, heap: &Heap<'_>) -> HindsightResult<usize>
    {
        let length = heap.int(&self.0, heap.layout().string.length)?;
        usize::try_from(length).map_err(|_| HindsightError::layout(format!("negative string length {length}")))
    }

    fn representation(heap: &Heap<'_>, type_id: i64) -> HindsightResult<Representation>
    {
        let layout = &heap.layout().string;
        let tag = type_id & layout.representation_mask.get()?;
        let representation = if layout.seq_tag.matches(tag) {
            Representation::Sequential
        } else if layout.cons_tag.matches(tag) {
            Representation::Cons
        } else if layout.sliced_tag.matches(tag) {
            Representation::Sliced
        } else if layout.external_tag.matches(tag) {
            Representation::External
        } else if layout.thin_tag.matches(tag) {
            Representation::Thin
        } else {
            return Err(HindsightError::layout(format!("unknown string representation {tag:#x}")));
        };
        Ok(representation)
    }

    fn is_one_byte(heap: &Heap<'_>, type_id: i64) -> HindsightResult<bool>
    {
        let layout = &heap.layout().string;
        Ok(type_id & layout.encoding_mask.get()? == layout.one_byte_tag.get()?)
    }

    /// Resolve the whole string to UTF-16 code units.
    pub fn code_units(&self, heap: &Heap<'_>) -> HindsightResult<Vec<u16>>
    {
        let layout = &heap.layout().string;
        let limit = MAX_READ_BYTES / 2;
        let mut units = Vec::new();
        let mut stack = vec![Segment {
            object: self.0.clone(),
            start: 0,
            end: None,
        }];

        while let Some(segment) = stack.pop() {
            let string = JsString::new(segment.object);
            let length = string.length(heap)?;
            let end = segment.end.unwrap_or(length).min(length);
            let start = segment.start.min(end);
            let type_id = heap.type_id(string.object())?;

            match Self::representation(heap, type_id)? {
                Representation::Sequential => {
                    let count = end - start;
                    if Self::is_one_byte(heap, type_id)? {
                        let chars = string.0.field(layout.one_byte_chars.get()?, heap.layout());
                        let bytes = heap.memory().bytes(chars.offset(start as i64), count)?;
                        units.extend(bytes.into_iter().map(u16::from));
                    } else {
                        let chars = string.0.field(layout.two_byte_chars.get()?, heap.layout());
                        units.extend(heap.memory().two_byte_units(chars.offset(2 * start as i64), count)?);
                    }
                }
                Representation::Cons => {
                    let first = heap.heap_value(string.object(), layout.cons_first)?;
                    let second = heap.heap_value(string.object(), layout.cons_second)?;
                    let split = JsString::new(first.clone()).length(heap)?;
                    if end > split {
                        stack.push(Segment {
                            object: second,
                            start: start.saturating_sub(split),
                            end: Some(end - split),
                        });
                    }
                    if start < split {
                        stack.push(Segment {
                            object: first,
                            start,
                            end: Some(end.min(split)),
                        });
                    }
                }
                Representation::Sliced => {
                    let parent = heap.heap_value(string.object(), layout.sliced_parent)?;
                    let offset = usize::try_from(heap.int(string.object(), layout.sliced_offset)?).unwrap_or(0);
                    stack.push(Segment {
                        object: parent,
                        start: offset + start,
                        end: Some(offset + end),
                    });
                }
                Representation::Thin => {
                    let actual = heap.heap_value(string.object(), layout.thin_actual)?;
                    stack.push(Segment {
                        object: actual,
                        start,
                        end: Some(end),
                    });
                }
                Representation::External => units.extend(EXTERNAL.encode_utf16()),
            }

            if units.len() > limit {
                return Err(HindsightError::layout(format!("string at {} is too large", self.0.raw())));
            }
        }

        Ok(units)
    }

    /// The string's text.
    pub fn text(&self, heap: &Heap<'_>, mode: StringText) -> HindsightResult<String>
    {
        let units = self.code_units(heap)?;
        Ok(match mode {
            StringText::Unicode => utf16_to_string(&units),
            StringText::Passthrough => utf16_passthrough(&units),
        })
    }

    pub fn decode(&self, cx: &Decoder<'_>, options: &InspectOptions) -> HindsightResult<NodeKind>
    {
        let text = self.text(&cx.heap(), StringText::Unicode)?;
        Ok(NodeKind::String(display(&text, options)))
    }
}

/// Cut `text` for display: a byte window when a limit is given, otherwise a
/// character cap.
///
/// Window edges never split a character: the start moves forward to the next
/// boundary and the end extends over continuation bytes.
#[must_use]
pub fn display(text: &str, options: &InspectOptions) -> StringNode
{
    let length = text.len();

    if options.limit != 0 {
        if options.current >= length {
            return StringNode {
                value: String::new(),
                length,
                next: Some(length),
                has_more: false,
            };
        }
        let mut start = options.current;
        while !text.is_char_boundary(start) {
            start += 1;
        }
        let mut end = start.saturating_add(options.limit).min(length);
        while !text.is_char_boundary(end) {
            end += 1;
        }
        let has_more = end < length;
        let mut value = text[start..end].to_string();
        if has_more {
            value.push_str("...");
        }
        return StringNode {
            value,
            length,
            next: Some(end),
            has_more,
        };
    }

    match text.char_indices().nth(options.max_text_length) {
        Some((cut, _)) => StringNode {
            value: format!("{}...", &text[..cut]),
            length,
            next: None,
            has_more: true,
        },
        None => StringNode {
            value: text.to_string(),
            length,
            next: None,
            has_more: false,
        },
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::mock::{types, HeapBuilder};
    use crate::types::Address;

    fn window(current: usize, limit: usize) -> InspectOptions
    {
        InspectOptions {
            current,
            limit,
            ..InspectOptions::default()
        }
    }

    fn text_of(builder: HeapBuilder, string: Address) -> String
    {
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let heap = Heap::new(&memory, &layout);
        JsString::new(HeapObject::new(string)).text(&heap, StringText::Unicode).unwrap()
    }

    #[test]
    fn test_window_extends_over_multibyte_character()
    {
        let node = display("a😀b", &window(1, 1));
        assert_eq!(node.value, "😀...");
        assert_eq!(node.next, Some(5));
        assert!(node.has_more);
    }

    #[test]
    fn test_window_start_moves_to_boundary()
    {
        let node = display("a😀b", &window(2, 1));
        assert_eq!(node.value, "b");
        assert_eq!(node.next, Some(6));
        assert!(!node.has_more);
    }

    #[test]
    fn test_window_past_end_is_empty()
    {
        let node = display("abc", &window(3, 1));
        assert_eq!(node.value, "");
        assert_eq!(node.next, Some(3));
        let empty = display("", &window(0, 4));
        assert_eq!(empty.value, "");
    }

    #[test]
    fn test_truncation_counts_characters()
    {
        let options = InspectOptions {
            max_text_length: 2,
            ..InspectOptions::default()
        };
        assert_eq!(display("😀😀😀", &options).value, "😀😀...");
        assert_eq!(display("ab", &options).value, "ab");
    }

    #[test]
    fn test_two_byte_surrogate_pair()
    {
        let mut builder = HeapBuilder::new();
        let string = builder.two_byte_string("a😀b");
        assert_eq!(text_of(builder, string), "a😀b");
    }

    #[test]
    fn test_cons_and_sliced_resolve()
    {
        let mut builder = HeapBuilder::new();
        let first = builder.one_byte_string("hello ");
        let second = builder.one_byte_string("world");
        let cons = builder.cons_string(first, second, 11);
        let sliced = builder.sliced_string(cons, 4, 4);
        assert_eq!(text_of(builder, sliced), "o wo");
    }

    #[test]
    fn test_deep_cons_chain_is_iterative()
    {
        let mut builder = HeapBuilder::new();
        let piece = builder.one_byte_string("x");
        let mut string = piece;
        for depth in 1..5_000 {
            string = builder.cons_string(string, piece, depth + 1);
        }
        assert_eq!(text_of(builder, string).len(), 5_000);
    }

    #[test]
    fn test_external_placeholder()
    {
        let mut builder = HeapBuilder::new();
        let map = builder.map(types::ONE_BYTE_EXTERNAL);
        let string = builder.alloc(16);
        builder.set_map(string, map);
        builder.set_bytes(string, 12, &3u32.to_le_bytes());
        assert_eq!(text_of(builder, string), "(external)");
    }
}
