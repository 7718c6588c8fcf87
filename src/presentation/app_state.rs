// Application state for HTTP handlers
use crate::application::command_service::CommandService;
use crate::application::session_service::SessionService;
use crate::infrastructure::view_surface::ViewSurface;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub surface: Arc<ViewSurface>,
    pub commands: CommandService,
    pub sessions: SessionService,
}
