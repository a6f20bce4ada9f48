//! Common module for library exports

pub use crate::error::{HindsightError, HindsightResult};
pub use crate::inspect::{InspectOptions, InspectReport, Inspector, Page, ResultNode};
pub use crate::layout::{ConstantSource, Layout, LayoutCache};
pub use crate::memory::MemoryAccess;
pub use crate::target::{CoreTarget, ThreadSource};
pub use crate::types::address::Address;
pub use crate::types::process::{Architecture, ThreadId, ThreadInfo};
