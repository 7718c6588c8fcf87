// Application layer - use cases over the domain
pub mod clock;
pub mod command_service;
pub mod dashboard_api;
pub mod dashboard_controller;
pub mod render;
pub mod session_service;
