use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cdp_bridge::SharedBrowser;
use run_executor::RunExecutor;
use webpilot::collaborators::{JsonlHistoryStore, ScriptedPlanner};
use webpilot::server::{automation_router, session_router, ServeState};
use webpilot::{Config, SessionManager};

/// Browser automation broker driving a shared Chromium over CDP.
#[derive(Parser, Debug)]
#[command(name = "webpilot", version, about)]
struct Cli {
    /// Port for the session service.
    #[arg(long)]
    session_port: Option<u16>,

    /// Port for the automation service.
    #[arg(long)]
    automation_port: Option<u16>,

    /// Root directory for run artifacts.
    #[arg(long)]
    runs_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(port) = cli.session_port {
        config.session_port = port;
    }
    if let Some(port) = cli.automation_port {
        config.automation_port = port;
    }
    if let Some(dir) = cli.runs_dir {
        config.runs_root = dir.into();
    }
    let config = Arc::new(config);

    let browser = Arc::new(SharedBrowser::new(config.bridge.clone()));
    let executor = Arc::new(RunExecutor::new(
        browser.clone(),
        config.runs_root.clone(),
        config.allowed_domains.clone(),
    ));
    let history = Arc::new(JsonlHistoryStore::new(config.runs_root.join("history.jsonl")));
    let manager = Arc::new(SessionManager::new(
        browser.clone(),
        Some(browser.clone()),
        Arc::new(ScriptedPlanner),
        history,
        config.clone(),
    ));

    let state = ServeState::new(config.clone(), manager, executor);

    let session_addr = SocketAddr::from(([0, 0, 0, 0], config.session_port));
    let automation_addr = SocketAddr::from(([0, 0, 0, 0], config.automation_port));

    let session_app = session_router().with_state(state.clone());
    let automation_app = automation_router().with_state(state);

    info!(
        target: "webpilot",
        %session_addr,
        %automation_addr,
        "starting webpilot services"
    );

    let session_listener = tokio::net::TcpListener::bind(session_addr).await?;
    let automation_listener = tokio::net::TcpListener::bind(automation_addr).await?;

    tokio::try_join!(
        axum::serve(session_listener, session_app),
        axum::serve(automation_listener, automation_app),
    )?;

    Ok(())
}
