//! Tool entries and the tool registry
//!
//! Tools are trusted, in-process invocable units. An entry associates a
//! name with either a synchronous callable or an asynchronous trait
//! object; the executor dispatches both through one `invoke` surface and
//! awaits asynchronous bodies to completion before considering the next
//! step. The registry is a read-only O(1) lookup during a run.

mod entry;
mod registry;

pub use entry::{AsyncTool, SyncToolFn, ToolEntry, ToolError};
pub use registry::{RegistryError, ToolRegistry, ToolSummary};
