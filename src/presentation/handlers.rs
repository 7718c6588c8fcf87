// HTTP request handlers
use crate::application::command_service::COMMAND_FAILED;
use crate::application::dashboard_api::{ControlCommand, ControlResponse};
use crate::domain::session::{Identity, Role, Session};
use crate::infrastructure::view_surface::SurfaceUpdate;
use crate::presentation::app_state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

#[derive(Deserialize)]
pub struct RoleRequest {
    pub role: String,
}

#[derive(Deserialize)]
pub struct CommandRequest {
    pub text: String,
}

#[derive(Serialize)]
pub struct SessionView {
    pub role: Role,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl From<Session> for SessionView {
    fn from(session: Session) -> Self {
        let (email, display_name) = match session.identity {
            Some(identity) => (Some(identity.email), Some(identity.display_name)),
            None => (None, None),
        };
        Self {
            role: session.role,
            email,
            display_name,
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Every render target and its current fragment
pub async fn get_view(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.surface.snapshot())
}

/// Full snapshot first, then each target change and toast as it happens
pub async fn stream_view(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let surface = state.surface.clone();
    // Subscribe before reading the snapshot so nothing falls in between.
    let mut updates = surface.subscribe();

    let stream = async_stream::stream! {
        yield Ok(snapshot_event(&surface.snapshot()));
        loop {
            match updates.recv().await {
                Ok(update) => {
                    let name = match &update {
                        SurfaceUpdate::Target { .. } => "target",
                        SurfaceUpdate::Toast(_) => "toast",
                    };
                    match Event::default().event(name).json_data(&update) {
                        Ok(event) => yield Ok(event),
                        Err(e) => tracing::warn!("Dropping unencodable view update: {}", e),
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("View stream lagged by {} updates; resending snapshot", skipped);
                    yield Ok(snapshot_event(&surface.snapshot()));
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn snapshot_event<T: Serialize>(snapshot: &T) -> Event {
    Event::default()
        .event("snapshot")
        .json_data(snapshot)
        .unwrap_or_else(|_| Event::default().event("snapshot").data("{}"))
}

/// Sign in with an identity from the identity provider
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(identity): Json<Identity>,
) -> impl IntoResponse {
    let session = state.sessions.login(identity).await;
    Json(SessionView::from(session))
}

pub async fn logout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session = state.sessions.logout().await;
    Json(SessionView::from(session))
}

/// Role selector. Unknown tokens are rejected, never coerced.
pub async fn select_role(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RoleRequest>,
) -> impl IntoResponse {
    match request.role.parse::<Role>() {
        Ok(role) => {
            state.sessions.select_role(role).await;
            (StatusCode::OK, Json(json!({ "role": role })))
        }
        Err(e) => {
            tracing::warn!("Rejected role selection: {}", e);
            (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() })))
        }
    }
}

/// Forward one control command upstream and report its outcome
pub async fn control(
    State(state): State<Arc<AppState>>,
    Json(command): Json<ControlCommand>,
) -> impl IntoResponse {
    match state.commands.send_control(command).await {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(_) => (
            StatusCode::BAD_GATEWAY,
            Json(ControlResponse {
                success: false,
                message: COMMAND_FAILED.to_string(),
            }),
        ),
    }
}

/// Free-text command bar. The outcome arrives later as a toast.
pub async fn command(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CommandRequest>,
) -> impl IntoResponse {
    let commands = state.commands.clone();
    tokio::spawn(async move {
        commands.run_text_command(&request.text).await;
    });
    StatusCode::ACCEPTED
}
