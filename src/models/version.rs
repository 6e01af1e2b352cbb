use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::is_false;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Platform {
    pub name: String,
}

/// Version of one dependency of the engine (build daemon, runtime, init
/// process). A missing commit is simply absent, never a synthetic zero.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ComponentVersion {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, String>>,
}

impl ComponentVersion {
    pub fn new(name: &str, version: String, commit: Option<String>) -> Self {
        ComponentVersion {
            name: name.to_string(),
            version,
            details: commit.map(|c| BTreeMap::from([("GitCommit".to_string(), c)])),
        }
    }
}

/// `GET /<ver>/version` response. The platform/components block is present
/// only for API versions above the components threshold.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<ComponentVersion>>,

    pub version: String,
    #[serde(rename = "ApiVersion")]
    pub api_version: String,
    #[serde(rename = "MinAPIVersion", skip_serializing_if = "Option::is_none")]
    pub min_api_version: Option<String>,
    pub git_commit: String,
    pub go_version: String,
    pub os: String,
    pub arch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel_version: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub experimental: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_time: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_component_without_commit_when_serialized_then_details_omitted() {
        let component = ComponentVersion::new("buildkitd", "0.12.5".to_string(), None);
        let json = serde_json::to_value(&component).unwrap();
        assert_eq!(json["Name"], "buildkitd");
        assert!(json.get("Details").is_none());
    }

    #[test]
    fn given_component_with_commit_when_serialized_then_details_present() {
        let component =
            ComponentVersion::new("containerd", "1.7.16".to_string(), Some("abc".to_string()));
        let json = serde_json::to_value(&component).unwrap();
        assert_eq!(json["Details"]["GitCommit"], "abc");
    }
}
