//! # hindsight-core
//!
//! Postmortem decoding of V8 heaps and stacks.
//!
//! Given read access to a captured process image and the layout constants
//! its V8 build exports, this crate turns tagged words back into JavaScript
//! values: objects with their properties, arrays, strings, functions with
//! their source locations, closures' contexts, and the managed frames on a
//! thread's stack.
//!
//! ## Layers
//!
//! - [`layout`]: the `v8dbg_*` constant table, resolved once per target.
//! - [`memory`] and [`value`]: typed reads and tagged-word classification.
//! - [`heap`]: one view per heap object kind, plus the type dispatcher.
//! - [`inspect`]: the inspection engine (result trees, pagination, caching).
//! - [`frame`]: the stack frame decoder.
//! - [`target`]: the collaborator traits and the ELF core-file target.
//!
//! ## Failure model
//!
//! Nothing here writes to the target. Every read can fail and every failure
//! is propagated: a decode either returns a complete result or an error
//! naming what could not be read. Untrusted lengths are clamped before they
//! reach the allocator.
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
//! let text = builder.one_byte_string("hello");
//! let layout = Arc::new(builder.layout().clone());
//! let memory = builder.finish();
//! let threads = MockThreads::new();
//!
//! let inspector = Inspector::new(&memory, &threads, layout);
//! let node = inspector.inspect(text, &InspectOptions::default())?;
//! assert_eq!(node.to_string(), "<String: \"hello\">");
//! # Ok::<(), hindsight_core::HindsightError>(())
//! ```

pub mod error;
pub mod frame;
pub mod heap;
pub mod inspect;
pub mod layout;
pub mod memory;
pub mod mock;
pub mod prelude;
pub mod target;
pub mod types;
pub mod value;

// Re-export commonly used types
pub use error::{HindsightError, HindsightResult};
pub use inspect::{InspectOptions, Inspector};
pub use layout::Layout;
pub use memory::MemoryAccess;
pub use target::{CoreTarget, ThreadSource};
pub use types::Address;
