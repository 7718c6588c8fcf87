// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::application::clock::SystemClock;
use crate::application::command_service::CommandService;
use crate::application::dashboard_api::DashboardApi;
use crate::application::dashboard_controller::{DashboardController, DashboardEvent};
use crate::application::render::Sinks;
use crate::application::session_service::SessionService;
use crate::domain::session::Session;
use crate::infrastructure::config::load_settings;
use crate::infrastructure::http_api::HttpDashboardApi;
use crate::infrastructure::telemetry_stream::TelemetryStream;
use crate::infrastructure::view_surface::{default_targets, ViewSurface};
use crate::presentation::app_state::AppState;

const EVENT_BUFFER: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let settings = load_settings()?;
    let options = settings.dashboard_options()?;
    let targets = settings
        .dashboard
        .targets
        .clone()
        .unwrap_or_else(|| default_targets(&settings.dashboard.machines));

    // Create adapters (infrastructure layer)
    let surface = Arc::new(ViewSurface::new(targets));
    let api: Arc<dyn DashboardApi> = Arc::new(HttpDashboardApi::new(&settings.upstream)?);
    let stream = TelemetryStream::new(&settings.upstream)?;

    // Create the controller actor and its single event queue
    let (events, inbox) = mpsc::channel::<DashboardEvent>(EVENT_BUFFER);
    let controller = DashboardController::new(
        options,
        Session::new(settings.dashboard.default_role),
        Sinks::from_surface(surface.clone()),
        Arc::new(SystemClock),
    );
    tokio::spawn(controller.run(inbox));

    // History hydrates independently of the live stream
    let history_api = api.clone();
    let history_events = events.clone();
    tokio::spawn(async move {
        match history_api.fetch_historical().await {
            Ok(history) => {
                let _ = history_events.send(DashboardEvent::Hydrated(history)).await;
            }
            Err(e) => tracing::error!("Error fetching historical data: {}", e),
        }
    });

    tokio::spawn(stream.run(events.clone()));

    // Create services (application layer)
    let commands = CommandService::new(api, surface.clone());
    let sessions = SessionService::new(
        settings.role_map(),
        settings.dashboard.default_role,
        commands.clone(),
        events,
    );

    // Create application state
    let state = Arc::new(AppState {
        surface,
        commands,
        sessions,
    });

    // Build router (presentation layer)
    let router = presentation::router(state);

    // Start server
    let addr: SocketAddr = settings.server.bind.parse()?;
    tracing::info!("Starting evtwin-dashboard on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
