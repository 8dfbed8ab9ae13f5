//! Append-only topic memory for Kwik agents.
//!
//! Facts are filed under free-form topics and persisted as JSON Lines. Records
//! are never rewritten or removed; `reorganize` only appends derived facts.

pub mod error;
pub mod model;
pub mod policy;
pub mod store;
pub mod synth;

pub use error::MemoryError;
pub use model::TopicRecord;
pub use policy::FactCapturePolicy;
pub use store::{FileTopicMemory, TopicMemory};
pub use synth::{DerivedFact, FactSynthesizer, TopicDigestSynthesizer};
