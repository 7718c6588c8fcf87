// Command service - control, free-text and audit use cases
use crate::application::dashboard_api::{
    ApiError, AuditEvent, ControlCommand, ControlResponse, DashboardApi, PromptRequest,
};
use crate::application::render::{Notifier, Toast, ToastKind};
use crate::domain::session::ControlAction;
use std::sync::Arc;

pub const COMMAND_FAILED: &str = "Failed to send command";
pub const PROMPT_FAILED: &str = "Error processing command";

#[derive(Debug, Clone, PartialEq)]
pub enum TextCommand {
    Control(ControlCommand),
    Prompt(String),
    Empty,
}

/// `shutdown <machine>` becomes a control command, anything else a prompt.
pub fn parse_text_command(text: &str) -> TextCommand {
    let text = text.trim();
    if text.is_empty() {
        return TextCommand::Empty;
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    match words.as_slice() {
        [verb, machine] if verb.eq_ignore_ascii_case("shutdown") => TextCommand::Control(
            ControlCommand::new(machine.to_ascii_uppercase(), ControlAction::ShutDown),
        ),
        _ => TextCommand::Prompt(text.to_string()),
    }
}

#[derive(Clone)]
pub struct CommandService {
    api: Arc<dyn DashboardApi>,
    notifier: Arc<dyn Notifier>,
}

impl CommandService {
    pub fn new(api: Arc<dyn DashboardApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, notifier }
    }

    /// Sends one command and surfaces the outcome as a toast. No retry.
    pub async fn send_control(
        &self,
        command: ControlCommand,
    ) -> Result<ControlResponse, ApiError> {
        tracing::info!(
            machine = %command.machine_id,
            action = ?command.action,
            "sending control command"
        );
        match self.api.send_control(&command).await {
            Ok(response) => {
                let kind = if response.success {
                    ToastKind::Success
                } else {
                    ToastKind::Error
                };
                self.notifier.notify(Toast::new(response.message.clone(), kind));
                Ok(response)
            }
            Err(e) => {
                tracing::error!("Control command for {} failed: {}", command.machine_id, e);
                self.notifier.notify(Toast::new(COMMAND_FAILED, ToastKind::Error));
                Err(e)
            }
        }
    }

    pub async fn run_text_command(&self, text: &str) {
        match parse_text_command(text) {
            TextCommand::Empty => {}
            TextCommand::Control(command) => {
                let _ = self.send_control(command).await;
            }
            TextCommand::Prompt(prompt) => {
                let request = PromptRequest { prompt };
                match self.api.ask(&request).await {
                    Ok(response) => match response.answer {
                        Some(answer) => self.notifier.notify(Toast::new(answer, ToastKind::Info)),
                        None => self.notifier.notify(Toast::new(PROMPT_FAILED, ToastKind::Error)),
                    },
                    Err(e) => {
                        tracing::error!("Prompt request failed: {}", e);
                        self.notifier.notify(Toast::new(PROMPT_FAILED, ToastKind::Error));
                    }
                }
            }
        }
    }

    /// Fire-and-forget. Failures are only logged.
    pub fn audit(&self, event: AuditEvent) {
        let api = self.api.clone();
        tokio::spawn(async move {
            if let Err(e) = api.audit(&event).await {
                tracing::warn!("Audit {:?} for {:?} not recorded: {}", event.event, event.user, e);
            }
        });
    }
}
