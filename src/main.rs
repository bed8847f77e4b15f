//! ChatQueue - queued follow-up prompts for a chat web application.
//!
//! Main entry point: attaches to the chat tab over the Chrome DevTools
//! Protocol, wires the controllers together and runs the dispatch loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use chatqueue_controller::{
    ComposerConfig, ComposerController, DispatchConfig, ModelConfig, ModelController,
    QueueController, QueueHandle,
};
use chatqueue_host::{
    CdpBridgeTransport, CdpClient, CdpInteractions, CdpProbe, EditorBridge, HostConfig, HostProbe,
};
use chatqueue_protocols::{conversation_key, Command, EventBus};
use chatqueue_store::{FileKvStore, KvStore, MemoryKvStore, SnapshotStore};

/// ChatQueue CLI.
#[derive(Parser)]
#[command(name = "chatqueue")]
#[command(about = "Queue follow-up prompts and auto-send them when the chat host goes idle")]
#[command(version)]
struct Cli {
    /// Chrome debugging endpoint
    #[arg(long, default_value = "http://localhost:9222", env = "CHATQUEUE_ENDPOINT", global = true)]
    endpoint: String,

    /// URL fragment identifying the chat tab to attach to
    #[arg(long, default_value = "chat.", env = "CHATQUEUE_PAGE", global = true)]
    page: String,

    /// Directory for persisted queue snapshots (in-memory when omitted)
    #[arg(long, env = "CHATQUEUE_STORAGE_DIR", global = true)]
    storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Attach to the chat tab and dispatch the queue until interrupted (default)
    Run,
    /// Print queue status for the current conversation and exit
    Status,
    /// Capture the host editor's draft into the queue and exit
    Capture,
}

struct Stack {
    /// Keeps the debugging socket alive for the session's lifetime.
    _client: CdpClient,
    queue: Arc<QueueController>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chatqueue=info")),
        )
        .init();

    let cli = Cli::parse();
    let stack = build_stack(&cli).await?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(stack).await,
        Commands::Status => {
            stack.queue.restore_persisted().await;
            let status = stack
                .queue
                .handle_command(Command::GetStatus)
                .await
                .context("no status reply")?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }
        Commands::Capture => {
            stack.queue.restore_persisted().await;
            stack.queue.handle_command(Command::QueueFromShortcut).await;
            let status = stack.queue.status();
            info!("Queue now holds {} entr{}", status.queued, plural(status.queued));
            Ok(())
        }
    }
}

async fn run(stack: Stack) -> anyhow::Result<()> {
    stack.queue.restore_persisted().await;
    stack.queue.start();
    info!("Dispatch loop running; Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    stack.queue.dispose();
    Ok(())
}

async fn build_stack(cli: &Cli) -> anyhow::Result<Stack> {
    let host_config = HostConfig {
        endpoint: cli.endpoint.clone(),
        ..HostConfig::default()
    };

    let client = CdpClient::connect(
        &host_config.endpoint,
        Duration::from_millis(host_config.call_timeout_ms),
    )
    .await?;
    let page = client.find_page(&cli.page).await?;
    info!("Attaching to {}", page.url);
    let session = Arc::new(client.attach(&page).await?);

    let probe: Arc<dyn HostProbe> = Arc::new(CdpProbe::new(session.clone()));
    let interact = Arc::new(CdpInteractions::new(session.clone()));
    let transport = Arc::new(CdpBridgeTransport::install(session.clone()).await?);
    let bridge = Arc::new(EditorBridge::new(transport, host_config.bridge_timeout_ms));

    let kv: Arc<dyn KvStore> = match &cli.storage_dir {
        Some(dir) => Arc::new(FileKvStore::new(dir.clone()).await?),
        None => Arc::new(MemoryKvStore::new()),
    };
    let store = Arc::new(SnapshotStore::new(kv));

    let url = probe.current_url().await.unwrap_or_else(|| page.url.clone());
    let key = conversation_key(&url)
        .with_context(|| format!("cannot derive a conversation key from {}", url))?;
    info!("Conversation key: {}", key);

    let handle = Arc::new(QueueHandle::new(EventBus::default()));
    let models = Arc::new(ModelController::new(
        handle.clone(),
        probe.clone(),
        interact.clone(),
        ModelConfig::default(),
    ));
    models.ensure_model_options(false).await;
    models.spawn_header_watch();

    let scratch_dir = std::env::temp_dir().join("chatqueue");
    tokio::fs::create_dir_all(&scratch_dir).await?;

    let composer = Arc::new(ComposerController::new(
        handle.clone(),
        probe.clone(),
        interact.clone(),
        bridge,
        models.clone(),
        store.clone(),
        key.clone(),
        ComposerConfig::default(),
        scratch_dir,
    ));

    let queue = QueueController::new(
        handle,
        composer,
        models,
        probe,
        store,
        key,
        DispatchConfig::default(),
    );

    Ok(Stack {
        _client: client,
        queue,
    })
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "y" } else { "ies" }
}
