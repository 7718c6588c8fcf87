// Presentation layer - browser-facing HTTP
pub mod app_state;
pub mod handlers;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    command, control, get_view, health_check, login, logout, select_role, stream_view,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/view", get(get_view))
        .route("/api/view/stream", get(stream_view))
        .route("/api/session/login", post(login))
        .route("/api/session/logout", post(logout))
        .route("/api/session/role", post(select_role))
        .route("/api/control", post(control))
        .route("/api/command", post(command))
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::command_service::tests::FakeApi;
    use crate::application::command_service::{CommandService, COMMAND_FAILED};
    use crate::application::dashboard_controller::DashboardEvent;
    use crate::application::render::{Gauge, GaugeSink};
    use crate::application::session_service::SessionService;
    use crate::domain::indicators::Indicator;
    use crate::domain::session::Role;
    use crate::infrastructure::view_surface::{default_targets, ViewSurface};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use futures::StreamExt;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    struct Harness {
        router: Router,
        surface: Arc<ViewSurface>,
        api: Arc<FakeApi>,
        events: mpsc::Receiver<DashboardEvent>,
    }

    fn harness(api: FakeApi) -> Harness {
        let api = Arc::new(api);
        let surface = Arc::new(ViewSurface::new(default_targets(&["M1".to_string()])));
        let (tx, events) = mpsc::channel(8);
        let commands = CommandService::new(api.clone(), surface.clone());
        let roles = HashMap::from([("head@plant.example".to_string(), Role::Head)]);
        let sessions = SessionService::new(roles, Role::Worker, commands.clone(), tx);
        let state = Arc::new(AppState {
            surface: surface.clone(),
            commands,
            sessions,
        });
        Harness {
            router: router(state),
            surface,
            api,
            events,
        }
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness(FakeApi::default());
        let response = h
            .router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn test_view_returns_rendered_targets() {
        let h = harness(FakeApi::default());
        h.surface
            .render_gauge(Gauge::Efficiency, &Indicator::new(87.4))
            .unwrap();

        let response = h
            .router
            .oneshot(Request::get("/api/view").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["efficiency-gauge"], json!({"value": 87.0, "complement": 13.0}));
    }

    #[tokio::test]
    async fn test_view_stream_opens_with_snapshot() {
        let h = harness(FakeApi::default());
        let response = h
            .router
            .oneshot(Request::get("/api/view/stream").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let mut body = response.into_body().into_data_stream();
        let first = body.next().await.unwrap().unwrap();
        let text = String::from_utf8_lossy(&first);
        assert!(text.starts_with("event: snapshot"), "got {:?}", text);
    }

    #[tokio::test]
    async fn test_login_maps_role() {
        let h = harness(FakeApi::default());
        let response = h
            .router
            .oneshot(post_json(
                "/api/session/login",
                json!({"email": "head@plant.example", "display_name": "Plant Head"}),
            ))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["role"], json!("head"));
        assert_eq!(body["display_name"], json!("Plant Head"));
    }

    #[tokio::test]
    async fn test_role_selection() {
        let mut h = harness(FakeApi::default());

        let rejected = h
            .router
            .clone()
            .oneshot(post_json("/api/session/role", json!({"role": "admin"})))
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
        assert!(h.events.try_recv().is_err());

        let accepted = h
            .router
            .oneshot(post_json("/api/session/role", json!({"role": "lead"})))
            .await
            .unwrap();
        assert_eq!(accepted.status(), StatusCode::OK);
        assert!(matches!(
            h.events.recv().await,
            Some(DashboardEvent::RoleChanged(Role::Lead))
        ));
    }

    #[tokio::test]
    async fn test_control_forwards_and_reports() {
        let h = harness(FakeApi::default());
        let response = h
            .router
            .oneshot(post_json(
                "/api/control",
                json!({"machine_id": "M1", "action": "reset_alarm"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["success"], json!(true));
        assert_eq!(h.api.controls.lock().unwrap()[0].machine_id, "M1");
    }

    #[tokio::test]
    async fn test_control_network_failure_is_bad_gateway() {
        let h = harness(FakeApi {
            fail: true,
            ..Default::default()
        });
        let response = h
            .router
            .oneshot(post_json(
                "/api/control",
                json!({"machine_id": "M2", "action": "shut_down"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["message"], json!(COMMAND_FAILED));
    }

    #[tokio::test]
    async fn test_text_command_is_accepted() {
        let h = harness(FakeApi::default());
        let response = h
            .router
            .oneshot(post_json("/api/command", json!({"text": "shutdown m2"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
