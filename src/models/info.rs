use serde::Serialize;
use std::collections::BTreeMap;

/// `GET /<ver>/info` response. Docker clients expect a non-empty `Runtimes`
/// map and an explicit inactive swarm even though swarm is never supported.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct InfoResponse {
    #[serde(rename = "ID")]
    pub id: String,
    pub containers: i64,
    pub containers_running: i64,
    pub containers_paused: i64,
    pub containers_stopped: i64,
    pub images: i64,
    pub driver: String,
    pub logging_driver: String,
    pub cgroup_driver: String,
    pub kernel_version: String,
    pub operating_system: String,
    #[serde(rename = "OSType")]
    pub os_type: String,
    pub architecture: String,
    #[serde(rename = "NCPU")]
    pub ncpu: i64,
    pub mem_total: i64,
    pub index_server_address: String,
    pub name: String,
    pub labels: Vec<String>,
    pub experimental_build: bool,
    pub server_version: String,
    pub runtimes: BTreeMap<String, RuntimeInfo>,
    pub default_runtime: String,
    pub security_options: Vec<String>,
    pub live_restore_enabled: bool,
    pub swarm: SwarmInfo,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct RuntimeInfo {
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SwarmInfo {
    pub local_node_state: String,
    pub control_available: bool,
}

impl Default for SwarmInfo {
    fn default() -> Self {
        SwarmInfo {
            local_node_state: "inactive".to_string(),
            control_available: false,
        }
    }
}
