use serde::Serialize;
use std::collections::BTreeMap;

/// Status category derived from the engine's human-readable status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateCategory {
    Running,
    Paused,
    Stopped,
    Created,
}

impl StateCategory {
    /// `Up ...` is running (or paused when the engine marks it so); the
    /// non-running statuses are categorized by prefix.
    pub fn from_status(status: &str) -> Self {
        if status.starts_with("Up") {
            if status.contains("(Paused)") {
                StateCategory::Paused
            } else {
                StateCategory::Running
            }
        } else if status.starts_with("Created") {
            StateCategory::Created
        } else {
            // "Exited", "Restarting", and anything unrecognized
            StateCategory::Stopped
        }
    }

    pub fn api_state(&self) -> &'static str {
        match self {
            StateCategory::Running => "running",
            StateCategory::Paused => "paused",
            StateCategory::Stopped => "exited",
            StateCategory::Created => "created",
        }
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct Port {
    #[serde(rename = "IP", skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(rename = "PrivatePort")]
    pub private_port: u16,
    #[serde(rename = "PublicPort", skip_serializing_if = "Option::is_none")]
    pub public_port: Option<u16>,
    #[serde(rename = "Type")]
    pub port_type: String,
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct HostConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_mode: Option<String>,
}

/// One element of the `GET /<ver>/containers/json` response.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerSummary {
    #[serde(rename = "Id")]
    pub id: String,
    pub names: Vec<String>,
    pub image: String,
    #[serde(rename = "ImageID")]
    pub image_id: String,
    pub command: String,
    pub created: i64,
    pub ports: Vec<Port>,
    pub labels: BTreeMap<String, String>,
    pub state: String,
    pub status: String,
    pub host_config: HostConfig,
    pub mounts: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_up_status_when_categorized_then_running() {
        let category = StateCategory::from_status("Up 3 minutes");
        assert_eq!(category, StateCategory::Running);
        assert_eq!(category.api_state(), "running");
    }

    #[test]
    fn given_exited_status_when_categorized_then_stopped() {
        let category = StateCategory::from_status("Exited (0) 2 hours ago");
        assert_eq!(category, StateCategory::Stopped);
        assert!(format!("{:?}", category).starts_with("Stopped"));
    }

    #[test]
    fn given_restarting_status_when_categorized_then_stopped() {
        assert_eq!(
            StateCategory::from_status("Restarting (1) 5 seconds ago"),
            StateCategory::Stopped
        );
    }

    #[test]
    fn given_created_status_when_categorized_then_created() {
        assert_eq!(StateCategory::from_status("Created"), StateCategory::Created);
    }

    #[test]
    fn given_paused_status_when_categorized_then_paused() {
        assert_eq!(
            StateCategory::from_status("Up 10 minutes (Paused)"),
            StateCategory::Paused
        );
    }
}
