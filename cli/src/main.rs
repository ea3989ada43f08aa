//! CLI entrypoint for massgen
//!
//! This is the main binary that wires together all layers using dependency
//! injection, adapted from the donor's verbosity-init → config-load →
//! use-case-execute → formatted-output shape.

use anyhow::{bail, Context, Result};
use clap::Parser;
use massgen_application::ports::conversation_logger::{ConversationLogger, NoopConversationLogger};
use massgen_application::ports::message_templates::PlainTextTemplates;
use massgen_application::{CoordinationEngine, EventBus};
use massgen_domain::{ManagedPath, Permission, Task, TaskId};
use massgen_infrastructure::{ConfigLoader, FsPathPermissionManager, FsToolInvoker, FsWorkspaceManager, NdjsonTranscriptLogger, ScriptedBackend};
use massgen_presentation::{ConsoleFormatter, ConsoleSubscriber};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Runs one MassGen coordination attempt against a configured set of agents.
#[derive(Parser, Debug)]
#[command(name = "massgen")]
#[command(author, version, about = "Multi-agent coordination engine")]
pub struct Cli {
    /// The task prompt to dispatch to every configured agent.
    pub prompt: String,

    /// Path to a TOML config file (overrides project/global config discovery).
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress the live per-agent progress display.
    #[arg(short, long)]
    pub quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    massgen_infrastructure::init_tracing(cli.verbose);
    info!("starting massgen");

    let runtime_config = ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow::anyhow!("{e}"))?;

    runtime_config.coordination.validate().context("invalid configuration")?;

    let mut backends: HashMap<String, Arc<dyn massgen_application::ports::backend::BackendPort>> = HashMap::new();
    for agent in &runtime_config.coordination.agents {
        if backends.contains_key(&agent.backend_ref) {
            continue;
        }
        let Some(turns) = runtime_config.scripted_backends.get(&agent.backend_ref) else {
            bail!("agent '{}' references backend '{}', which has no scripted_backends entry in config", agent.id, agent.backend_ref);
        };
        backends.insert(agent.backend_ref.clone(), Arc::new(ScriptedBackend::new(turns.clone())));
    }

    let mut managed_paths: Vec<ManagedPath> = runtime_config
        .coordination
        .context_paths
        .iter()
        .map(|spec| {
            let permission = match spec.permission {
                massgen_domain::ContextPermission::Read => Permission::Read,
                massgen_domain::ContextPermission::Write => Permission::Write,
            };
            ManagedPath::new(PathBuf::from(&spec.path), permission).with_protected_subpaths(spec.protected_paths.clone())
        })
        .collect();
    for agent in &runtime_config.coordination.agents {
        let workspace_dir = runtime_config.workspace_root.join("agents").join(agent.id.as_str()).join("live");
        managed_paths.push(ManagedPath::workspace(workspace_dir));
    }

    let permissions = Arc::new(FsPathPermissionManager::new(managed_paths));
    let tool_invoker = Arc::new(FsToolInvoker::new(permissions));
    let templates = Arc::new(PlainTextTemplates);
    let workspace = Arc::new(FsWorkspaceManager::new(runtime_config.workspace_root.clone()));
    let logger: Arc<dyn ConversationLogger> = match &runtime_config.transcript_path {
        Some(path) => match NdjsonTranscriptLogger::new(path) {
            Some(logger) => Arc::new(logger),
            None => Arc::new(NoopConversationLogger),
        },
        None => Arc::new(NoopConversationLogger),
    };
    let bus = EventBus::default();

    let engine = CoordinationEngine::new(backends, tool_invoker, templates, logger, workspace, bus);

    let subscriber_handle = if cli.quiet {
        None
    } else {
        let rx = engine.event_bus().subscribe();
        Some(tokio::spawn(async move { ConsoleSubscriber::new().run(rx).await }))
    };

    let task_id = TaskId::new(format!("task-{}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0)));
    let task = Task::new(task_id, cli.prompt.clone(), runtime_config.coordination.clone());

    if !cli.quiet {
        println!();
        println!("Prompt: {}", cli.prompt);
        println!("Agents: {}", runtime_config.coordination.declaration_order().iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", "));
        println!();
    }

    let result = engine.coordinate(task).await;

    if let Some(handle) = subscriber_handle {
        handle.abort();
    }

    let attempt = result.context("coordination failed")?;
    println!("{}", ConsoleFormatter::format(&attempt));

    Ok(())
}
