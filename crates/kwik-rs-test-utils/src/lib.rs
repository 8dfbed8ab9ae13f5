//! Test helpers shared across Kwik crates.

pub mod context;
pub mod llm;
pub mod memory;

pub use context::TempServices;
pub use llm::{
    FailingModel, FixedModel, RecordedRequest, ScriptedModel, StubProvider, provider_tool_call,
    tool_call,
};
pub use memory::StubMemory;
