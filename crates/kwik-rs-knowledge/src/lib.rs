//! Document knowledge for Kwik agents: text extraction, chunking, embeddings,
//! a persisted similarity index and the registry of ingested documents.

pub mod chunker;
pub mod embed;
pub mod error;
pub mod keywords;
pub mod loader;
pub mod registry;
pub mod retriever;
mod snapshot;

pub use chunker::Chunker;
pub use embed::{Embedder, HashingEmbedder};
pub use error::KnowledgeError;
pub use keywords::top_keywords;
pub use loader::{DocumentLoader, LoadedDocument, PdfiumLoader, PlainTextLoader};
pub use registry::{DocumentRecord, DocumentRegistry};
pub use retriever::{IndexReceipt, Passage, Retriever, VectorKnowledgeBase};
