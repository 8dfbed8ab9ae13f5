//! Core runtime for Kwik knowledge agents.
//!
//! This crate binds agent network manifests to the coded tools, runs user
//! turns through the agent tree with an `autoagents-llm` chat provider, and
//! exposes the PDF knowledge assistant used by the server and the CLI.

pub mod assistant;
pub mod error;
pub mod llm;
pub mod network;
pub mod orchestrator;
pub mod services;
pub mod synth;

pub use assistant::{
    AssistantBuilder, KnowledgeAssistant, KnowledgeStats, knowledge_stats, upload_instruction,
};
pub use error::KwikCoreError;
pub use llm::{ProviderChatModel, ProviderEmbedder, build_provider};
pub use network::{
    AgentNetwork, AgentNode, BANKING_OPS_NETWORK, PDF_KNOWLEDGE_NETWORK, bundled_network,
    bundled_network_names, load_network,
};
pub use orchestrator::{NO_RESPONSE, Orchestrator, RunLimits, RunResult};
pub use services::{ServicesBuilder, call_tool};
pub use synth::LlmFactSynthesizer;
