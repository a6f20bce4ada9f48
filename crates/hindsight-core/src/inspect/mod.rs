//! # Inspection Engine
//!
//! [`Inspector`] is the entry point for callers: it turns an address into a
//! [`ResultNode`] (or its text), names the type at an address, lists object
//! keys, exports full strings and decodes stack frames.
//!
//! ## Caching
//!
//! Results are memoised per `(address, options)` and frame summaries per
//! [`FrameKey`]. Both caches belong to one engine and are dropped together
//! whenever the memory collaborator reports a new generation, so a result
//! read from one process image is never served for another.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use hindsight_core::inspect::{InspectOptions, Inspector};
//! use hindsight_core::mock::{HeapBuilder, MockThreads};
//!
//! let mut builder = HeapBuilder::new();
//! let one = builder.smi(1);
//! let object = builder.object(&[("a", one)]);
//! let layout = Arc::new(builder.layout().clone());
//! let memory = builder.finish();
//! let threads = MockThreads::new();
//!
//! let inspector = Inspector::new(&memory, &threads, layout);
//! let options = InspectOptions {
//!     detailed: true,
//!     ..InspectOptions::default()
//! };
//! let text = inspector.describe(object, &options).unwrap();
//! assert!(text.contains(".a=<Smi: 1>"));
//! ```

mod decode;
mod options;
mod page;
mod result;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::Arc;

pub use decode::Decoder;
pub use options::InspectOptions;
pub use page::{Page, Window};
pub use result::{
    BufferNode, ContextNode, Element, FunctionNode, InspectReport, MapNode, NodeKind, ObjectNode, Property,
    PropertyValue, ResultNode, ScopeInfoNode, StringNode,
};
use tracing::{debug, trace};

use crate::error::{HindsightError, HindsightResult};
use crate::frame::{FrameSummary, JsFrame};
use crate::heap::{Heap, HeapView, JsObject, JsString, StringText};
use crate::layout::Layout;
use crate::memory::MemoryAccess;
use crate::target::ThreadSource;
use crate::types::{Address, FrameKey, NativeFrame, ThreadInfo};

/// Message of the user-facing failure object.
const INVALID_VALUE: &str = "Invalid value";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct InspectKey
{
    address: Address,
    options: InspectOptions,
}

/// Decodes heap objects and frames of one target.
pub struct Inspector<'t>
{
    memory: &'t dyn MemoryAccess,
    threads: &'t dyn ThreadSource,
    layout: Arc<Layout>,
    generation: Cell<u64>,
    results: RefCell<HashMap<InspectKey, ResultNode>>,
    frames: RefCell<HashMap<FrameKey, FrameSummary>>,
}

impl<'t> Inspector<'t>
{
    #[must_use]
    pub fn new(memory: &'t dyn MemoryAccess, threads: &'t dyn ThreadSource, layout: Arc<Layout>) -> Self
    {
        Self {
            generation: Cell::new(memory.generation()),
            memory,
            threads,
            layout,
            results: RefCell::new(HashMap::new()),
            frames: RefCell::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn layout(&self) -> &Layout
    {
        &self.layout
    }

    fn heap(&self) -> Heap<'_>
    {
        Heap::new(self.memory, &self.layout)
    }

    /// Drop both caches.
    pub fn invalidate(&self)
    {
        let results = std::mem::take(&mut *self.results.borrow_mut()).len();
        let frames = std::mem::take(&mut *self.frames.borrow_mut()).len();
        debug!(results, frames, "dropped inspection caches");
    }

    /// Invalidate when the memory generation moved since the last call.
    fn sync(&self)
    {
        let current = self.memory.generation();
        if current != self.generation.get() {
            debug!(from = self.generation.get(), to = current, "memory generation changed");
            self.generation.set(current);
            self.invalidate();
        }
    }

    /// Decode the value at `address` (a tagged word: Smi or heap pointer).
    pub fn inspect(&self, address: Address, options: &InspectOptions) -> HindsightResult<ResultNode>
    {
        self.sync();
        let key = InspectKey {
            address,
            options: options.clone(),
        };
        if let Some(node) = self.results.borrow().get(&key) {
            trace!(%address, "inspect cache hit");
            return Ok(node.clone());
        }

        let heap = self.heap();
        let node = Decoder::new(heap).value(&heap.classify(address.value()), options)?;
        self.results.borrow_mut().insert(key, node.clone());
        Ok(node)
    }

    /// [`Inspector::inspect`] for a user-typed hexadecimal address.
    pub fn inspect_str(&self, address: &str, options: &InspectOptions) -> HindsightResult<ResultNode>
    {
        self.inspect(address.parse()?, options)
    }

    /// Text form of [`Inspector::inspect`]; rendered from the same node.
    pub fn describe(&self, address: Address, options: &InspectOptions) -> HindsightResult<String>
    {
        Ok(self.inspect(address, options)?.to_string())
    }

    /// Inspect, turning any failure into the `{error, address}` object.
    #[must_use]
    pub fn report(&self, address: Address, options: &InspectOptions) -> InspectReport
    {
        match self.inspect(address, options) {
            Ok(result) => InspectReport::Ok { result },
            Err(error) => {
                debug!(%address, %error, "inspect failed");
                InspectReport::Failed {
                    error: INVALID_VALUE.to_string(),
                    address,
                }
            }
        }
    }

    /// Short type name: `(Smi)`, `(Array)`, ..., or the constructor name of
    /// an ordinary object.
    pub fn type_name(&self, address: Address) -> HindsightResult<String>
    {
        self.sync();
        let heap = self.heap();
        let value = heap.classify(address.value());
        let Some(object) = value.as_heap() else {
            return Ok("(Smi)".to_string());
        };
        let name = match heap.view(object.clone())? {
            HeapView::Map(_) => "(Map)",
            HeapView::Object(_) | HeapView::Error(_) | HeapView::Global(_) | HeapView::GlobalProxy(_) => {
                let constructor = heap.map(object)?.constructor_name(&heap)?;
                return Ok(constructor.unwrap_or_else(|| "(Object)".to_string()));
            }
            HeapView::Number(_) => "(HeapNumber)",
            HeapView::Array(_) => "(Array)",
            HeapView::Oddball(_) => "(Oddball)",
            HeapView::Function(_) => "(Function)",
            HeapView::RegExp(_) => "(RegExp)",
            HeapView::String(_) => "(String)",
            HeapView::FixedArray(_) => "(FixedArray)",
            HeapView::ArrayBuffer(_) => "(ArrayBuffer)",
            HeapView::ArrayBufferView(_) => "(ArrayBufferView)",
            HeapView::Date(_) => "(Date)",
            HeapView::Context(_) => "(Context)",
            HeapView::Unknown { type_id, .. } => return Ok(format!("unknown: {type_id}")),
            other => return Ok(format!("({})", other.kind_name())),
        };
        Ok(name.to_string())
    }

    /// Own property keys of the JS object at `address`.
    pub fn keys(&self, address: Address) -> HindsightResult<Vec<String>>
    {
        self.sync();
        let heap = self.heap();
        let object = heap
            .classify(address.value())
            .as_heap()
            .cloned()
            .ok_or_else(|| HindsightError::InvalidArgument(format!("{address} is a small integer")))?;
        match heap.view(object.clone())? {
            HeapView::Object(_)
            | HeapView::Error(_)
            | HeapView::Array(_)
            | HeapView::RegExp(_)
            | HeapView::Date(_)
            | HeapView::Global(_) => JsObject::new(object).keys(&heap),
            other => Err(HindsightError::InvalidArgument(format!(
                "{address} is a {}, not a JS object",
                other.kind_name()
            ))),
        }
    }

    /// Whole text of the string at `address`, never truncated.
    pub fn string_value(&self, address: Address) -> HindsightResult<String>
    {
        self.sync();
        let heap = self.heap();
        let value = heap.classify(address.value());
        match value.as_heap() {
            Some(object) if heap.is_string(&value)? => JsString::new(object.clone()).text(&heap, StringText::Unicode),
            _ => Err(HindsightError::InvalidArgument(format!("{address} is not a string"))),
        }
    }

    /// Threads of the target.
    pub fn threads(&self) -> HindsightResult<Vec<ThreadInfo>>
    {
        self.threads.threads()
    }

    /// Summary of frame `frame` of thread `thread` (0 = innermost).
    pub fn decode_frame(&self, thread: usize, frame: usize) -> HindsightResult<FrameSummary>
    {
        self.sync();
        if let Some(summary) = self.cached_frame(thread, frame) {
            return Ok(summary);
        }

        let frames = self.threads.native_frames(thread)?;
        let native = frames.get(frame).ok_or_else(|| {
            HindsightError::InvalidArgument(format!("thread {thread} has {} frames, no frame {frame}", frames.len()))
        })?;
        Ok(self.summarize(thread, frame, native))
    }

    /// One page of thread `thread`'s backtrace.
    pub fn backtrace(&self, thread: usize, current: usize, limit: usize) -> HindsightResult<Page<FrameSummary>>
    {
        self.sync();
        let frames = self.threads.native_frames(thread)?;
        let window = Window::new(current, limit, frames.len());
        let items = window
            .range()
            .zip(&frames[window.range()])
            .map(|(frame, native)| {
                self.cached_frame(thread, frame)
                    .unwrap_or_else(|| self.summarize(thread, frame, native))
            })
            .collect();
        debug!(thread, total = frames.len(), "backtrace page decoded");
        Ok(Page::new(items, window))
    }

    fn frame_key(&self, thread: usize, frame: usize) -> FrameKey
    {
        FrameKey {
            thread,
            frame,
            generation: self.generation.get(),
        }
    }

    fn cached_frame(&self, thread: usize, frame: usize) -> Option<FrameSummary>
    {
        let summary = self.frames.borrow().get(&self.frame_key(thread, frame)).cloned();
        if summary.is_some() {
            trace!(thread, frame, "frame cache hit");
        }
        summary
    }

    /// Decode one walked frame and remember the result.
    fn summarize(&self, thread: usize, frame: usize, native: &NativeFrame) -> FrameSummary
    {
        let summary = if native.is_native() {
            FrameSummary::native(native)
        } else {
            let state = JsFrame::new(native.fp).decode(&Decoder::new(self.heap()));
            FrameSummary::managed(native, state)
        };
        self.frames
            .borrow_mut()
            .insert(self.frame_key(thread, frame), summary.clone());
        summary
    }
}
