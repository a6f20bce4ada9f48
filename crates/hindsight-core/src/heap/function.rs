//! # Functions and Scripts
//!
//! A [`JsFunction`] points at a [`SharedFunctionInfo`], which holds the name
//! and the source span, and through it at the [`Script`] the function was
//! compiled from.
//!
//! Source positions are offsets in UTF-16 code units. Line and column are
//! computed over passthrough text, which keeps one character per code unit.

use tracing::warn;

use super::{Heap, JsString, ScopeInfo, StringText};
use crate::error::HindsightResult;
use crate::inspect::{Decoder, FunctionNode, InspectOptions, NodeKind};
use crate::memory::utf16_to_string;
use crate::value::Value;

const ANONYMOUS: &str = "(anonymous)";
const NATIVE_CODE: &str = "[native code]";
const NO_SOURCE: &str = "[no source]";

heap_view!(
    /// A JS closure.
    JsFunction
);

impl JsFunction
{
    pub fn shared(&self, heap: &Heap<'_>) -> HindsightResult<SharedFunctionInfo>
    {
        Ok(SharedFunctionInfo::new(heap.heap_value(&self.0, heap.layout().js_function.shared)?))
    }

    /// The closure's context slot (a context, or a Smi in some builds' builtins).
    pub fn context(&self, heap: &Heap<'_>) -> HindsightResult<Value>
    {
        heap.value(&self.0, heap.layout().js_function.context)
    }

    /// Display name; see [`SharedFunctionInfo::proper_name`].
    pub fn name(&self, heap: &Heap<'_>) -> HindsightResult<String>
    {
        self.shared(heap)?.proper_name(heap)
    }

    /// `script:line:column`, or a placeholder for native functions.
    pub fn location(&self, heap: &Heap<'_>) -> HindsightResult<String>
    {
        self.shared(heap)?.postfix(heap)
    }

    /// The function's source text, when its script has any.
    pub fn source(&self, heap: &Heap<'_>) -> HindsightResult<Option<String>>
    {
        let shared = self.shared(heap)?;
        let Some(script) = shared.script(heap)? else {
            return Ok(None);
        };
        let Some(source) = script.source(heap)? else {
            return Ok(None);
        };
        let units = source.code_units(heap)?;
        let end = usize::try_from(shared.end_position(heap)?).unwrap_or(0).min(units.len());
        let start = usize::try_from(shared.start_position(heap)?).unwrap_or(0).min(end);
        Ok(Some(utf16_to_string(&units[start..end])))
    }

    pub fn decode(&self, cx: &Decoder<'_>, options: &InspectOptions) -> HindsightResult<NodeKind>
    {
        let heap = cx.heap();
        let function_name = self.name(&heap)?;
        let location = self.location(&heap)?;

        let mut node = FunctionNode {
            function_name,
            location,
            context: None,
            source: None,
        };
        if !options.detailed {
            return Ok(NodeKind::Function(node));
        }

        let context = self.context(&heap)?;
        if context.as_heap().is_some() {
            let context_options = InspectOptions {
                detailed: true,
                ..options.child()
            };
            node.context = Some(Box::new(cx.value(&context, &context_options)?));
        }
        if options.include_source_text {
            node.source = self
                .source(&heap)?
                .map(|source| format!("function {}{source}", node.function_name));
        }
        Ok(NodeKind::Function(node))
    }
}

heap_view!(
    /// Per-function metadata shared by every closure of the function.
    SharedFunctionInfo
);

impl SharedFunctionInfo
{
    fn text_of(heap: &Heap<'_>, value: &Value) -> HindsightResult<Option<String>>
    {
        if !heap.is_string(value)? {
            return Ok(None);
        }
        match value.as_heap() {
            Some(object) => JsString::new(object.clone()).text(heap, StringText::Unicode).map(Some),
            None => Ok(None),
        }
    }

    /// The declared name. Builds that fold the name into the scope info
    /// store either a string or a scope info in that slot.
    pub fn declared_name(&self, heap: &Heap<'_>) -> HindsightResult<String>
    {
        let layout = &heap.layout().shared_info;
        if layout.name.is_available() {
            let name = heap.value(&self.0, layout.name)?;
            return Ok(Self::text_of(heap, &name)?.unwrap_or_default());
        }
        let slot = heap.value(&self.0, layout.name_or_scope_info)?;
        if heap.is_type(&slot, heap.layout().types.scope_info)? {
            if let Some(object) = slot.as_heap() {
                return Ok(ScopeInfo::new(object.clone()).function_name(heap)?.unwrap_or_default());
            }
        }
        Ok(Self::text_of(heap, &slot)?.unwrap_or_default())
    }

    /// Declared name, else the inferred name, else `(anonymous)`.
    pub fn proper_name(&self, heap: &Heap<'_>) -> HindsightResult<String>
    {
        let name = self.declared_name(heap)?;
        if !name.is_empty() {
            return Ok(name);
        }
        let inferred_offset = heap.layout().shared_info.inferred_name;
        if inferred_offset.is_available() {
            let inferred = heap.value(&self.0, inferred_offset)?;
            if !heap.is_hole_or_undefined(&inferred)? {
                if let Some(text) = Self::text_of(heap, &inferred)?.filter(|text| !text.is_empty()) {
                    return Ok(text);
                }
            }
        }
        Ok(ANONYMOUS.to_string())
    }

    /// The originating script; `None` for functions created natively.
    pub fn script(&self, heap: &Heap<'_>) -> HindsightResult<Option<Script>>
    {
        let value = heap.value(&self.0, heap.layout().shared_info.script)?;
        if !heap.is_type(&value, heap.layout().types.script)? {
            return Ok(None);
        }
        Ok(value.as_heap().cloned().map(Script::new))
    }

    /// Start of the function in its script, in code units.
    pub fn start_position(&self, heap: &Heap<'_>) -> HindsightResult<i64>
    {
        let layout = &heap.layout().shared_info;
        let packed = heap.int(&self.0, layout.start_position)?;
        Ok(packed >> layout.start_position_shift.get()?)
    }

    pub fn end_position(&self, heap: &Heap<'_>) -> HindsightResult<i64>
    {
        heap.int(&self.0, heap.layout().shared_info.end_position)
    }

    /// Declared parameter count.
    pub fn parameter_count(&self, heap: &Heap<'_>) -> HindsightResult<i64>
    {
        heap.int(&self.0, heap.layout().shared_info.parameter_count)
    }

    /// `script:line:column` with a 1-based line and 0-based column.
    pub fn postfix(&self, heap: &Heap<'_>) -> HindsightResult<String>
    {
        let Some(script) = self.script(heap)? else {
            return Ok(NATIVE_CODE.to_string());
        };
        let mut name = script.name(heap)?;
        if name.is_empty() {
            name = NATIVE_CODE.to_string();
        }
        let start = self.start_position(heap)?;
        match script.line_column(heap, start)? {
            Some((line, column)) => Ok(format!("{name}:{}:{column}", line + 1)),
            None => {
                warn!(script = %script.address(), "script has no source text");
                Ok(format!("{name} {NO_SOURCE}"))
            }
        }
    }

    pub fn decode(&self, cx: &Decoder<'_>, _options: &InspectOptions) -> HindsightResult<NodeKind>
    {
        let heap = cx.heap();
        Ok(NodeKind::SharedFunctionInfo {
            function_name: self.proper_name(&heap)?,
            location: self.postfix(&heap)?,
        })
    }
}

heap_view!(
    /// A compiled script and its source.
    Script
);

impl Script
{
    /// Script name (usually a path or URL); empty when it has none.
    pub fn name(&self, heap: &Heap<'_>) -> HindsightResult<String>
    {
        let name = heap.value(&self.0, heap.layout().script.name)?;
        Ok(SharedFunctionInfo::text_of(heap, &name)?.unwrap_or_default())
    }

    pub fn line_offset(&self, heap: &Heap<'_>) -> HindsightResult<i64>
    {
        heap.int(&self.0, heap.layout().script.line_offset)
    }

    /// The source string, if the script kept one.
    pub fn source(&self, heap: &Heap<'_>) -> HindsightResult<Option<JsString>>
    {
        let source = heap.value(&self.0, heap.layout().script.source)?;
        if !heap.is_string(&source)? {
            return Ok(None);
        }
        Ok(source.as_heap().cloned().map(JsString::new))
    }

    fn passthrough(&self, heap: &Heap<'_>) -> HindsightResult<Option<Vec<char>>>
    {
        match self.source(heap)? {
            Some(source) => Ok(Some(source.text(heap, StringText::Passthrough)?.chars().collect())),
            None => Ok(None),
        }
    }

    /// Zero-based line and column of code-unit offset `position`. A `\r\n`
    /// pair ends one line. `None` when there is no source.
    pub fn line_column(&self, heap: &Heap<'_>, position: i64) -> HindsightResult<Option<(i64, i64)>>
    {
        let Some(source) = self.passthrough(heap)? else {
            return Ok(None);
        };
        Ok(Some(line_column(&source, usize::try_from(position).unwrap_or(0))))
    }

    /// Up to `limit` source lines starting at zero-based line `start`.
    pub fn lines(&self, heap: &Heap<'_>, start: usize, limit: usize) -> HindsightResult<Vec<String>>
    {
        let Some(source) = self.passthrough(heap)? else {
            return Ok(Vec::new());
        };
        Ok(split_lines(&source).into_iter().skip(start).take(limit).collect())
    }

    pub fn decode(&self, cx: &Decoder<'_>, _options: &InspectOptions) -> HindsightResult<NodeKind>
    {
        let heap = cx.heap();
        let source_length = match self.source(&heap)? {
            Some(source) => source.length(&heap)?,
            None => 0,
        };
        Ok(NodeKind::Script {
            script_name: self.name(&heap)?,
            line_offset: self.line_offset(&heap)?,
            source_length,
        })
    }
}

fn line_column(source: &[char], position: usize) -> (i64, i64)
{
    let limit = position.min(source.len());
    let (mut line, mut column) = (0, 0);
    let mut index = 0;
    while index < limit {
        if source[index] == '\r' && source.get(index + 1) == Some(&'\n') && index + 1 < limit {
            index += 1;
        }
        if matches!(source[index], '\n' | '\r') {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }
        index += 1;
    }
    (line, column)
}

fn split_lines(source: &[char]) -> Vec<String>
{
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut index = 0;
    while index < source.len() {
        match source[index] {
            '\r' if source.get(index + 1) == Some(&'\n') => {
                lines.push(std::mem::take(&mut current));
                index += 1;
            }
            '\n' | '\r' => lines.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
        index += 1;
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::mock::HeapBuilder;
    use crate::value::HeapObject;

    #[test]
    fn test_line_column_counts_crlf_once()
    {
        let source: Vec<char> = "a\r\nbc\rd\nef".chars().collect();
        assert_eq!(line_column(&source, 0), (0, 0));
        assert_eq!(line_column(&source, 4), (1, 1));
        assert_eq!(line_column(&source, 7), (2, 1));
        assert_eq!(line_column(&source, 10), (3, 2));
        assert_eq!(line_column(&source, 100), (3, 2));
    }

    #[test]
    fn test_split_lines()
    {
        let source: Vec<char> = "one\r\ntwo\nthree".chars().collect();
        assert_eq!(split_lines(&source), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_function_name_and_location()
    {
        let mut builder = HeapBuilder::new();
        let script = builder.script("/app/index.js", "let x;\nfunction run(a) { return a; }\n", 0);
        let info = builder.shared_info("run", Some(script), 19, 36);
        let function = builder.function(info, None);
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let heap = Heap::new(&memory, &layout);

        let function = JsFunction::new(HeapObject::new(function));
        assert_eq!(function.name(&heap).unwrap(), "run");
        assert_eq!(function.location(&heap).unwrap(), "/app/index.js:2:12");
        assert_eq!(function.source(&heap).unwrap().as_deref(), Some("(a) { return a; }"));
    }

    #[test]
    fn test_anonymous_native_function()
    {
        let mut builder = HeapBuilder::new();
        let info = builder.shared_info("", None, 0, 0);
        let function = builder.function(info, None);
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let heap = Heap::new(&memory, &layout);

        let function = JsFunction::new(HeapObject::new(function));
        assert_eq!(function.name(&heap).unwrap(), "(anonymous)");
        assert_eq!(function.location(&heap).unwrap(), "[native code]");
        assert_eq!(function.source(&heap).unwrap(), None);
    }

    #[test]
    fn test_script_without_source_degrades()
    {
        let mut builder = HeapBuilder::new();
        let script = builder.script("gen.js", "", 0);
        let undefined = builder.undefined();
        builder.set_word(script, 24, undefined.value());
        let info = builder.shared_info("f", Some(script), 3, 9);
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let heap = Heap::new(&memory, &layout);

        let info = SharedFunctionInfo::new(HeapObject::new(info));
        assert_eq!(info.postfix(&heap).unwrap(), "gen.js [no source]");
        let script = info.script(&heap).unwrap().unwrap();
        assert!(script.lines(&heap, 0, 10).unwrap().is_empty());
    }
}
