// Session service - login/logout, role selection and their audit trail
use crate::application::command_service::CommandService;
use crate::application::dashboard_api::{AuditEvent, AuditKind};
use crate::application::dashboard_controller::DashboardEvent;
use crate::domain::session::{Identity, Role, Session};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct SessionService {
    roles: Arc<HashMap<String, Role>>,
    default_role: Role,
    commands: CommandService,
    events: mpsc::Sender<DashboardEvent>,
}

impl SessionService {
    pub fn new(
        roles: HashMap<String, Role>,
        default_role: Role,
        commands: CommandService,
        events: mpsc::Sender<DashboardEvent>,
    ) -> Self {
        Self {
            roles: Arc::new(roles),
            default_role,
            commands,
            events,
        }
    }

    pub fn role_for(&self, email: &str) -> Role {
        self.roles.get(email).copied().unwrap_or(self.default_role)
    }

    pub async fn login(&self, identity: Identity) -> Session {
        let session = Session {
            role: self.role_for(&identity.email),
            identity: Some(identity),
        };
        self.commands.audit(AuditEvent {
            event: AuditKind::Login,
            user: session.user().to_string(),
            details: "Google login".to_string(),
        });
        self.publish(DashboardEvent::SessionChanged(session.clone())).await;
        session
    }

    pub async fn logout(&self) -> Session {
        self.commands.audit(AuditEvent {
            event: AuditKind::Logout,
            user: String::new(),
            details: "User signed out".to_string(),
        });
        let session = Session::new(self.default_role);
        self.publish(DashboardEvent::SessionChanged(session.clone())).await;
        session
    }

    pub async fn select_role(&self, role: Role) {
        self.publish(DashboardEvent::RoleChanged(role)).await;
    }

    async fn publish(&self, event: DashboardEvent) {
        if self.events.send(event).await.is_err() {
            tracing::warn!("dashboard controller is gone; session change dropped");
        }
    }
}
