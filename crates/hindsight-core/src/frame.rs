//! # Stack Frames
//!
//! Decoding of managed frames found by the native stack walk.
//!
//! A frame is classified by a fixed decision tree over three slots below its
//! frame pointer:
//!
//! 1. the context slot holding the adaptor marker ends the decode;
//! 2. a marker slot holding one of the fixed frame-type markers ends it with
//!    that marker's state (an unknown marker is an error);
//! 3. otherwise the function slot is resolved: code objects and non-functions
//!    end it, and a JS function yields its name, location, receiver and
//!    arguments.
//!
//! Markers are compared after [`Value::from_frame_marker`], so compact and
//! full-width Smi encodings of the same marker are the same state.

use std::fmt;

use serde::Serialize;
use tracing::trace;

use crate::error::{HindsightError, HindsightResult};
use crate::heap::JsFunction;
use crate::inspect::{Decoder, InspectOptions, ResultNode};
use crate::layout::Constant;
use crate::types::{Address, NativeFrame};
use crate::value::Value;

/// A managed frame, identified by its frame pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsFrame
{
    fp: Address,
}

/// Terminal state of the frame decision tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameState
{
    Adaptor,
    Entry,
    EntryConstruct,
    Exit,
    Internal,
    Construct,
    Stub,
    /// The function slot holds a code object.
    InternalCode,
    /// The function slot holds something other than a JS function.
    NonFunction,
    Function(ResolvedFunction),
}

/// A frame executing a JS function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedFunction
{
    pub function: Address,
    pub name: String,
    /// `script:line:column` of the function.
    pub location: String,
    pub receiver: ResultNode,
    pub arguments: Vec<ResultNode>,
}

impl ResolvedFunction
{
    /// `name(this=..., args) at location fn=0x...`
    #[must_use]
    pub fn debug_line(&self) -> String
    {
        let mut args = format!("this={}", self.receiver.render_nested());
        for argument in &self.arguments {
            args.push_str(", ");
            args.push_str(&argument.render_nested());
        }
        format!("{}({args}) at {} fn={}", self.name, self.location, self.function)
    }
}

impl FrameState
{
    /// Short label: the bracketed state name, or the function name.
    #[must_use]
    pub fn label(&self) -> &str
    {
        match self {
            FrameState::Adaptor => "<adaptor>",
            FrameState::Entry => "<entry>",
            FrameState::EntryConstruct => "<entry_construct>",
            FrameState::Exit => "<exit>",
            FrameState::Internal => "<internal>",
            FrameState::Construct => "<constructor>",
            FrameState::Stub => "<stub>",
            FrameState::InternalCode => "<internal code>",
            FrameState::NonFunction => "<non-function>",
            FrameState::Function(function) => &function.name,
        }
    }
}

impl fmt::Display for FrameState
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            FrameState::Function(function) => f.write_str(&function.debug_line()),
            other => f.write_str(other.label()),
        }
    }
}

impl JsFrame
{
    #[must_use]
    pub const fn new(fp: Address) -> Self
    {
        Self { fp }
    }

    #[must_use]
    pub const fn fp(&self) -> Address
    {
        self.fp
    }

    fn slot(&self, offset: Constant) -> HindsightResult<Address>
    {
        Ok(self.fp.offset(offset.get()?))
    }

    fn marker(&self, cx: &Decoder<'_>, offset: Constant) -> HindsightResult<Value>
    {
        let heap = cx.heap();
        let raw = heap.memory().pointer(self.slot(offset)?)?;
        Ok(Value::from_frame_marker(raw, heap.layout()))
    }

    /// Run the decision tree for this frame.
    pub fn decode(&self, cx: &Decoder<'_>) -> HindsightResult<FrameState>
    {
        let heap = cx.heap();
        let layout = &heap.layout().frame;

        let context = self.marker(cx, layout.context)?;
        if context.as_smi().is_some_and(|value| layout.adaptor.matches(value)) {
            trace!(fp = %self.fp, "adaptor frame");
            return Ok(FrameState::Adaptor);
        }

        if let Some(value) = self.marker(cx, layout.marker)?.as_smi() {
            let fixed = [
                (layout.entry, FrameState::Entry),
                (layout.entry_construct, FrameState::EntryConstruct),
                (layout.exit, FrameState::Exit),
                (layout.internal, FrameState::Internal),
                (layout.construct, FrameState::Construct),
                (layout.stub, FrameState::Stub),
            ];
            if let Some((_, state)) = fixed.into_iter().find(|(marker, _)| marker.matches(value)) {
                trace!(fp = %self.fp, state = state.label(), "marker frame");
                return Ok(state);
            }
            if !layout.javascript.matches(value) && !layout.optimized.matches(value) {
                return Err(HindsightError::layout(format!("unknown frame marker {value}")));
            }
        }

        let function = heap.value_at(self.slot(layout.function)?)?;
        let Some(object) = function.as_heap() else {
            return Ok(FrameState::NonFunction);
        };
        let type_id = heap.type_id(object)?;
        let types = &heap.layout().types;
        if types.code.matches(type_id) {
            return Ok(FrameState::InternalCode);
        }
        if !types.js_function.matches(type_id) {
            return Ok(FrameState::NonFunction);
        }

        let function = JsFunction::new(object.clone());
        let shared = function.shared(&heap)?;
        let count = usize::try_from(shared.parameter_count(&heap)?).unwrap_or(0);
        let summary = InspectOptions::default();
        let args = self.slot(layout.args)?;
        let pointer = heap.pointer_size() as i64;

        let receiver = heap.value_at(args.offset(count as i64 * pointer))?;
        let receiver = cx.value(&receiver, &summary)?;
        // Parameters sit below the receiver, last one first.
        let arguments = (0..count)
            .map(|index| {
                let slot = args.offset((count - index - 1) as i64 * pointer);
                cx.value(&heap.value_at(slot)?, &summary)
            })
            .collect::<HindsightResult<Vec<_>>>()?;

        Ok(FrameState::Function(ResolvedFunction {
            function: function.address(),
            name: shared.proper_name(&heap)?,
            location: shared.postfix(&heap)?,
            receiver,
            arguments,
        }))
    }
}

/// Whether a frame was symbolized natively or decoded as a managed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind
{
    Native,
    Js,
}

/// One entry of a backtrace, as returned by `decode_frame`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSummary
{
    pub frame_index: usize,
    #[serde(rename = "type")]
    pub kind: FrameKind,
    /// `Native`, `JavaScript`, `Unknown` (a bracketed state) or `???`.
    pub name: String,
    pub function: String,
    pub pc: Address,
    pub fp: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compile_unit: Option<String>,
    /// The receiver of a JS frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ResultNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<ResultNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub func_addr: Option<Address>,
}

impl FrameSummary
{
    /// Summary of a frame the native walk symbolized.
    #[must_use]
    pub fn native(frame: &NativeFrame) -> Self
    {
        Self {
            frame_index: frame.index,
            kind: FrameKind::Native,
            name: "Native".to_string(),
            function: frame
                .symbol
                .as_ref()
                .map_or_else(String::new, |symbol| symbol.display_name().to_string()),
            pc: frame.pc,
            fp: frame.fp,
            module: frame.module.clone(),
            compile_unit: frame.location.as_ref().map(ToString::to_string),
            context: None,
            arguments: None,
            line: None,
            func_addr: None,
        }
    }

    /// Summary of a managed frame from its decode outcome. A failed decode
    /// still yields an entry, named `???`.
    #[must_use]
    pub fn managed(frame: &NativeFrame, state: HindsightResult<FrameState>) -> Self
    {
        let mut summary = Self {
            frame_index: frame.index,
            kind: FrameKind::Js,
            name: "???".to_string(),
            function: "???".to_string(),
            pc: frame.pc,
            fp: frame.fp,
            module: None,
            compile_unit: None,
            context: None,
            arguments: None,
            line: None,
            func_addr: None,
        };
        match state {
            Ok(FrameState::Function(function)) => {
                summary.name = "JavaScript".to_string();
                summary.function = function.name;
                summary.line = Some(function.location);
                summary.func_addr = Some(function.function);
                summary.context = Some(function.receiver);
                summary.arguments = Some(function.arguments);
            }
            Ok(state) => {
                summary.name = "Unknown".to_string();
                summary.function = state.label().to_string();
            }
            Err(error) => {
                trace!(fp = %frame.fp, %error, "undecodable frame");
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::heap::Heap;
    use crate::mock::{frames, HeapBuilder};

    const FP: u64 = 0x7000_0000;

    #[test]
    fn test_exit_marker_encodings_agree()
    {
        let mut builder = HeapBuilder::new();
        let full = builder.smi(frames::EXIT);
        let layout = builder.layout().clone();
        let mut memory = builder.finish();

        let fp = Address::new(FP);
        memory.write_u64(fp.offset(-8), (frames::EXIT as u64) << 1);
        let compact = JsFrame::new(fp).decode(&Decoder::new(Heap::new(&memory, &layout))).unwrap();
        memory.write_u64(fp.offset(-8), full);
        let wide = JsFrame::new(fp).decode(&Decoder::new(Heap::new(&memory, &layout))).unwrap();

        assert_eq!(compact, FrameState::Exit);
        assert_eq!(compact, wide);
    }

    #[test]
    fn test_adaptor_and_unknown_markers()
    {
        let mut builder = HeapBuilder::new();
        let adaptor = builder.smi(frames::ADAPTOR);
        let bogus = builder.smi(77);
        let layout = builder.layout().clone();
        let mut memory = builder.finish();
        let fp = Address::new(FP);

        memory.write_u64(fp.offset(-8), adaptor);
        let state = JsFrame::new(fp).decode(&Decoder::new(Heap::new(&memory, &layout))).unwrap();
        assert_eq!(state.label(), "<adaptor>");

        memory.write_u64(fp.offset(-8), bogus);
        let err = JsFrame::new(fp)
            .decode(&Decoder::new(Heap::new(&memory, &layout)))
            .unwrap_err();
        assert!(format!("{err}").contains("unknown frame marker 77"));
    }

    #[test]
    fn test_resolved_function_frame()
    {
        let mut builder = HeapBuilder::new();
        let script = builder.script("/app/math.js", "function add(a, b) {}", 0);
        let info = builder.shared_info("add", Some(script), 12, 21);
        builder.set_bytes(info, 48, &2u16.to_le_bytes());
        let function = builder.function(info, None);
        let receiver = builder.object(&[]);
        let first = builder.smi(1);
        let second = builder.smi(2);
        let fp = Address::new(FP);
        let stack = builder.memory_mut();
        // A heap pointer in the context slot: an ordinary JS frame.
        stack.write_u64(fp.offset(-8), receiver.value());
        stack.write_u64(fp.offset(-16), function.value());
        stack.write_u64(fp.offset(16), second);
        stack.write_u64(fp.offset(24), first);
        stack.write_u64(fp.offset(32), receiver.value());
        let layout = builder.layout().clone();
        let memory = builder.finish();

        let state = JsFrame::new(fp).decode(&Decoder::new(Heap::new(&memory, &layout))).unwrap();
        let FrameState::Function(resolved) = &state else {
            panic!("expected a function frame, got {state}");
        };
        assert_eq!(resolved.name, "add");
        assert_eq!(resolved.location, "/app/math.js:1:12");
        assert_eq!(resolved.arguments[0].to_string(), "<Smi: 1>");
        assert_eq!(resolved.arguments[1].to_string(), "<Smi: 2>");
        assert!(state.to_string().starts_with(&format!("add(this={receiver}:<Object: no constructor>, <Smi: 1>, <Smi: 2>) at")));

        let summary = FrameSummary::managed(&NativeFrame::bare(3, Address::new(0x10), fp), Ok(state));
        assert_eq!(summary.name, "JavaScript");
        assert_eq!(summary.line.as_deref(), Some("/app/math.js:1:12"));
    }

    #[test]
    fn test_code_object_is_internal_code()
    {
        let mut builder = HeapBuilder::new();
        let code_map = builder.map(crate::mock::types::CODE);
        let code = builder.alloc(32);
        builder.set_map(code, code_map);
        let context = builder.object(&[]);
        let fp = Address::new(FP);
        builder.memory_mut().write_u64(fp.offset(-8), context.value());
        builder.memory_mut().write_u64(fp.offset(-16), code.value());
        let layout = builder.layout().clone();
        let memory = builder.finish();

        let state = JsFrame::new(fp).decode(&Decoder::new(Heap::new(&memory, &layout))).unwrap();
        assert_eq!(state, FrameState::InternalCode);
        let summary = FrameSummary::managed(&NativeFrame::bare(0, Address::new(0x10), fp), Ok(state));
        assert_eq!((summary.name.as_str(), summary.function.as_str()), ("Unknown", "<internal code>"));
    }

    #[test]
    fn test_failed_decode_is_question_marks()
    {
        let frame = NativeFrame::bare(1, Address::new(0x10), Address::new(FP));
        let summary = FrameSummary::managed(&frame, Err(HindsightError::read(Address::new(FP), 8)));
        assert_eq!((summary.name.as_str(), summary.function.as_str()), ("???", "???"));
    }
}
