use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use dispatch::app::App;
use dispatch::config::Settings;
use dispatch::event::Event;
use dispatch::http::builder::to_curl;
use dispatch::http::executor::{HttpTransport, ReqwestTransport};
use dispatch::http::history::{HistorySink, JsonlHistory, NoopHistory};
use dispatch::state::app_state::AppState;
use dispatch::state::workspace::RequestStatus;
use dispatch::storage::workspace::load_workspace;

/// Send a saved request from a workspace file.
#[derive(Parser, Debug)]
#[command(name = "dispatch", version, about)]
struct Cli {
    /// Workspace file (TOML) holding environments and collections
    #[arg(short, long)]
    workspace: PathBuf,

    /// Saved request, by id or name
    #[arg(short, long)]
    request: String,

    /// Collection to look in, by id or name (default: first that has the request)
    #[arg(short, long)]
    collection: Option<String>,

    /// Environment to activate, by id or name (default: the workspace's active one)
    #[arg(short, long)]
    env: Option<String>,

    /// Settings file (default: <config dir>/dispatch/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the compiled request as a curl command instead of sending it
    #[arg(long)]
    curl: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(Settings::default_path);
    let settings = Settings::load(&config_path)
        .with_context(|| format!("loading settings from {}", config_path.display()))?;

    let ws = load_workspace(&cli.workspace)
        .with_context(|| format!("loading workspace {}", cli.workspace.display()))?;
    info!(workspace = %ws.name, "workspace loaded");

    let mut state = AppState::new(ws.environments, ws.collections, ws.active_environment_id);
    if let Some(wanted) = &cli.env {
        let id = state
            .find_environment(wanted)
            .map(|e| e.id.clone())
            .with_context(|| format!("unknown environment '{wanted}'"))?;
        state.set_active_environment(Some(&id))?;
    }

    let collection = match &cli.collection {
        Some(c) => c.clone(),
        None => state
            .collections
            .iter()
            .find(|c| c.find_request(&cli.request).is_some())
            .map(|c| c.id.clone())
            .with_context(|| format!("no collection contains request '{}'", cli.request))?,
    };

    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(&settings.network)?);
    let history: Arc<dyn HistorySink> = if settings.history.enabled {
        Arc::new(JsonlHistory::new(settings.history.resolved_file()))
    } else {
        Arc::new(NoopHistory)
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let mut app = App::new(state, transport, history, tx);
    app.record_history = settings.history.enabled;

    let tab_id = app.open_saved(&collection, &cli.request)?;

    if cli.curl {
        if let Some(compiled) = app.compile_active() {
            println!("{}", to_curl(&compiled));
        }
        return Ok(());
    }

    app.send_tab(&tab_id)?;

    while let Some(event) = rx.recv().await {
        app.handle_event(event);
        let still_loading = app.state.tabs.get(&tab_id).is_some_and(|t| t.is_loading());
        if !still_loading {
            break;
        }
    }

    let Some(tab) = app.state.tabs.get(&tab_id) else {
        bail!("tab disappeared before the response arrived");
    };
    if let RequestStatus::Error(msg) = &tab.status {
        bail!("{msg}");
    }
    let Some(response) = tab.response() else {
        bail!("no response received");
    };

    println!("{} {}", response.status(), response.status_text());
    for (key, value) in response.headers() {
        println!("{key}: {value}");
    }
    println!(
        "# {} · {}",
        humantime::format_duration(Duration::from_millis(response.time_ms())),
        humansize::format_size(response.size(), humansize::DECIMAL)
    );
    println!();
    println!("{}", response.body());

    app.flush_history().await;
    Ok(())
}
