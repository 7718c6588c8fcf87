// Role/session gate - display-only access tiers
//
// Nothing here authorizes anything. Every command is re-checked upstream.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Worker,
    Lead,
    Head,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Worker => "worker",
            Role::Lead => "lead",
            Role::Head => "head",
        }
    }

    pub fn can_control(&self) -> bool {
        matches!(self, Role::Head | Role::Lead)
    }

    pub fn can_resolve(&self) -> bool {
        *self != Role::Worker
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role token: {0:?}")]
pub struct RoleParseError(pub String);

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "worker" => Ok(Role::Worker),
            "lead" => Ok(Role::Lead),
            "head" => Ok(Role::Head),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub role: Role,
    pub identity: Option<Identity>,
}

impl Session {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            identity: None,
        }
    }

    pub fn user(&self) -> &str {
        self.identity.as_ref().map(|i| i.email.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    ReducePower,
    ShutDown,
    ResetAlarm,
    ResolveRecommendation,
}

impl ControlAction {
    pub const MACHINE_ACTIONS: [ControlAction; 3] = [
        ControlAction::ReducePower,
        ControlAction::ShutDown,
        ControlAction::ResetAlarm,
    ];
}

/// A control rendered next to an entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Affordance {
    Control {
        machine_id: String,
        actions: Vec<ControlAction>,
    },
    Resolve {
        message: String,
    },
}

impl Affordance {
    pub fn label(&self) -> &'static str {
        match self {
            Affordance::Control { .. } => "Control",
            Affordance::Resolve { .. } => "Resolve",
        }
    }
}

pub fn machine_affordances(role: Role, machine_id: &str) -> Vec<Affordance> {
    if role.can_control() {
        vec![Affordance::Control {
            machine_id: machine_id.to_string(),
            actions: ControlAction::MACHINE_ACTIONS.to_vec(),
        }]
    } else {
        Vec::new()
    }
}

pub fn recommendation_affordances(role: Role, message: &str) -> Vec<Affordance> {
    if role.can_resolve() {
        vec![Affordance::Resolve {
            message: message.to_string(),
        }]
    } else {
        Vec::new()
    }
}
