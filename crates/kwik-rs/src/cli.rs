//! `kwik` command line: run the web front end, chat from the terminal, or
//! inspect and edit the knowledge stores directly.
//!
//! Store commands call the coded tools without an agent turn, so they work
//! without LLM credentials (except `reorganize --llm`).

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use kwik_rs_config::{KwikConfig, LayeredConfigOptions};
use kwik_rs_core::{
    AgentNetwork, KnowledgeAssistant, LlmFactSynthesizer, ProviderChatModel, ServicesBuilder,
    bundled_network_names, call_tool, load_network,
};
use kwik_rs_tools::{ToolServices, coded_tool_registry};
use log::{debug, info};
use serde_json::{Value, json};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Command-line options for `kwik`.
#[derive(Debug, Parser)]
#[command(name = "kwik", version, about = "PDF knowledge assistant backed by a network of agents")]
pub struct Cli {
    /// Extra kwik.json5 layer applied after the discovered ones
    #[arg(long, global = true, env = "KWIK_CONFIG")]
    pub config: Option<PathBuf>,
    /// Directory holding topic memory, the document registry, vectors and uploads
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the web front end
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Ask the assistant a single question
    Ask { query: String },
    /// Add a PDF to the knowledge base without going through the agents
    Ingest { file: PathBuf },
    /// List memory topics
    Topics,
    /// Print the facts stored under a topic
    Recall { topic: String },
    /// Store a fact under a topic
    Commit { topic: String, fact: String },
    /// Derive consolidated facts from topic memory
    Reorganize {
        /// Use the configured chat model instead of the local digest
        #[arg(long)]
        llm: bool,
    },
    /// List ingested documents
    Documents,
    /// Validate an agent network and print its hierarchy
    Network {
        /// Bundled network name or path to a JSON5 manifest
        #[arg(long)]
        manifest: Option<String>,
    },
}

/// Load layered config for `cwd`, then env and command-line overrides.
pub fn load_config(cli: &Cli, options: LayeredConfigOptions) -> anyhow::Result<KwikConfig> {
    let options = match cli.config.as_ref() {
        Some(path) => options.with_runtime_path(path),
        None => options,
    };
    let layered = KwikConfig::load_layered_with_options(options)
        .context("failed to load layered config")?;
    debug!("layered config loaded (layers={})", layered.layers.len());
    let mut config = layered.config;
    config
        .apply_process_env()
        .context("invalid environment override")?;
    if let Some(dir) = cli.data_dir.as_ref() {
        config.storage.root = Some(dir.display().to_string());
    }
    Ok(config)
}

/// Run `command` and return what should be printed.
///
/// `serve` blocks until shutdown and prints nothing.
pub async fn execute(command: Command, config: KwikConfig, cwd: &Path) -> anyhow::Result<String> {
    match command {
        Command::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let assistant = KnowledgeAssistant::builder(config)
                .cwd(cwd)
                .build()
                .context("failed to start the knowledge assistant")?;
            kwik_rs_server::serve(Arc::new(assistant), &host, port).await?;
            Ok(String::new())
        }
        Command::Ask { query } => {
            let assistant = KnowledgeAssistant::builder(config)
                .cwd(cwd)
                .build()
                .context("failed to start the knowledge assistant")?;
            let result = assistant.process_user_query(&query).await?;
            let mut out = result.response;
            if !result.sources.is_empty() {
                let labels: Vec<&str> = result.sources.iter().map(|tag| tag.label()).collect();
                write!(out, "\n\nSources: {}", labels.join(", "))?;
            }
            Ok(out)
        }
        Command::Ingest { file } => {
            let services = offline_services(&config, cwd, false)?;
            let value = call_tool(
                &services,
                "add_pdf_to_knowledge",
                json!({ "file_path": file }),
            )
            .await?;
            Ok(str_field(&value, "message").to_string())
        }
        Command::Topics => {
            let services = offline_services(&config, cwd, false)?;
            let value = call_tool(&services, "list_topics", json!({})).await?;
            let topics = string_list(&value["topics"]);
            if topics.is_empty() {
                return Ok("No topics in memory.".to_string());
            }
            Ok(topics.join("\n"))
        }
        Command::Recall { topic } => {
            let services = offline_services(&config, cwd, false)?;
            let value = call_tool(&services, "recall_memory", json!({ "topic": topic })).await?;
            let facts = string_list(&value["facts"]);
            if facts.is_empty() {
                return Ok(format!("No facts found for topic '{topic}'."));
            }
            Ok(bullets(&facts))
        }
        Command::Commit { topic, fact } => {
            let services = offline_services(&config, cwd, false)?;
            let value = call_tool(
                &services,
                "commit_to_memory",
                json!({ "topic": topic, "fact": fact }),
            )
            .await?;
            Ok(format!(
                "Committed to {} ({})",
                str_field(&value, "topic"),
                str_field(&value, "id")
            ))
        }
        Command::Reorganize { llm } => {
            let services = offline_services(&config, cwd, llm)?;
            let value = call_tool(&services, "reorganize_memory", json!({})).await?;
            let derived = value["derived"].as_array().cloned().unwrap_or_default();
            let mut out = format!("Derived {} new facts", derived.len());
            for entry in &derived {
                write!(
                    out,
                    "\n- [{}] {}",
                    str_field(entry, "topic"),
                    str_field(entry, "fact")
                )?;
            }
            Ok(out)
        }
        Command::Documents => {
            let services = offline_services(&config, cwd, false)?;
            let value = call_tool(&services, "list_documents", json!({})).await?;
            let documents = value["documents"].as_array().cloned().unwrap_or_default();
            if documents.is_empty() {
                return Ok("No documents in the knowledge base.".to_string());
            }
            let mut lines = Vec::with_capacity(documents.len());
            for document in &documents {
                lines.push(format!(
                    "{}  pages={}  uploaded={}  topics={}",
                    str_field(document, "filename"),
                    document["page_count"],
                    str_field(document, "upload_date"),
                    string_list(&document["topics"]).join(", ")
                ));
            }
            Ok(lines.join("\n"))
        }
        Command::Network { manifest } => {
            let manifest = manifest.or(config.agents.manifest.clone());
            let network = AgentNetwork::build(
                load_network(manifest.as_deref())?,
                &coded_tool_registry(),
            )
            .with_context(|| {
                format!(
                    "invalid agent network (bundled networks: {})",
                    bundled_network_names().join(", ")
                )
            })?;
            Ok(network.describe())
        }
    }
}

/// Tool services for store commands; `llm` swaps in the model-backed synthesizer.
fn offline_services(
    config: &KwikConfig,
    cwd: &Path,
    llm: bool,
) -> anyhow::Result<Arc<ToolServices>> {
    let mut builder = ServicesBuilder::new(config, cwd);
    if llm {
        let model = ProviderChatModel::from_config(&config.llm)
            .context("reorganize --llm needs chat model credentials")?;
        builder = builder.synthesizer(Arc::new(LlmFactSynthesizer::new(
            Arc::new(model),
            config.memory.reorganize.max_fact_chars,
        )));
    }
    let (services, paths) = builder.build()?;
    info!("opened knowledge stores (data_dir={})", paths.root.display());
    Ok(services)
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value[key].as_str().unwrap_or_default()
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Load config for the process cwd and run the parsed command.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("failed to resolve current working directory")?;
    if let Some(path) = cli.config.as_ref().filter(|path| !path.is_file()) {
        bail!("config file not found: {}", path.display());
    }
    let config = load_config(&cli, LayeredConfigOptions::new(&cwd))?;
    let out = execute(cli.command, config, &cwd).await?;
    if !out.is_empty() {
        println!("{out}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, execute, load_config};
    use clap::Parser;
    use kwik_rs_config::LayeredConfigOptions;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("kwik").chain(args.iter().copied())).expect("args")
    }

    #[test]
    fn parses_store_commands() {
        let cli = parse(&["--data-dir", "/tmp/kwik", "commit", "budget", "Total budget: $500K"]);
        assert_eq!(cli.data_dir.as_deref(), Some(std::path::Path::new("/tmp/kwik")));
        match cli.command {
            Command::Commit { topic, fact } => {
                assert_eq!(topic, "budget");
                assert_eq!(fact, "Total budget: $500K");
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(matches!(parse(&["reorganize", "--llm"]).command, Command::Reorganize { llm: true }));
    }

    #[test]
    fn data_dir_flag_overrides_config() {
        let cwd = tempdir().expect("tempdir");
        let cli = parse(&["--data-dir", "store", "topics"]);
        let config = load_config(&cli, LayeredConfigOptions::isolated(cwd.path())).expect("config");
        assert_eq!(config.storage.root.as_deref(), Some("store"));
    }

    #[tokio::test]
    async fn commit_then_recall_and_list_topics() {
        let cwd = tempdir().expect("tempdir");
        let cli = parse(&["--data-dir", "data", "topics"]);
        let config = load_config(&cli, LayeredConfigOptions::isolated(cwd.path())).expect("config");

        for (topic, fact) in [
            ("budget", "Total budget: $500K"),
            ("budget", "Phase 1: $200K"),
        ] {
            let out = execute(
                Command::Commit {
                    topic: topic.to_string(),
                    fact: fact.to_string(),
                },
                config.clone(),
                cwd.path(),
            )
            .await
            .expect("commit");
            assert!(out.starts_with("Committed to budget ("));
        }

        let recalled = execute(
            Command::Recall {
                topic: "budget".to_string(),
            },
            config.clone(),
            cwd.path(),
        )
        .await
        .expect("recall");
        assert_eq!(recalled, "- Total budget: $500K\n- Phase 1: $200K");

        let topics = execute(Command::Topics, config.clone(), cwd.path())
            .await
            .expect("topics");
        assert_eq!(topics, "budget");
        assert!(cwd.path().join("data").join("TopicMemory.jsonl").is_file());
    }

    #[tokio::test]
    async fn empty_stores_print_friendly_messages() {
        let cwd = tempdir().expect("tempdir");
        let cli = parse(&["--data-dir", "data", "documents"]);
        let config = load_config(&cli, LayeredConfigOptions::isolated(cwd.path())).expect("config");
        let documents = execute(Command::Documents, config.clone(), cwd.path())
            .await
            .expect("documents");
        assert_eq!(documents, "No documents in the knowledge base.");
        let recall = execute(
            Command::Recall {
                topic: "ghost".to_string(),
            },
            config,
            cwd.path(),
        )
        .await
        .expect("recall");
        assert_eq!(recall, "No facts found for topic 'ghost'.");
    }

    #[tokio::test]
    async fn network_command_prints_bundled_hierarchy() {
        let cwd = tempdir().expect("tempdir");
        let cli = parse(&["network", "--manifest", "banking_ops"]);
        let config = load_config(&cli, LayeredConfigOptions::isolated(cwd.path())).expect("config");
        let Command::Network { manifest } = cli.command else {
            panic!("expected network command");
        };
        let tree = execute(Command::Network { manifest }, config, cwd.path())
            .await
            .expect("network");
        assert!(tree.contains("customer_service"));
        assert!(tree.contains("    - mortgages"));
    }
}
