//! Intermediate records parsed from the engine and build CLIs. Fields that
//! the CLI emits sometimes as a string and sometimes structured are resolved
//! here, at the parse boundary, so the mappers never re-inspect raw JSON.

use serde::Deserialize;
use std::collections::BTreeMap;

/// A JSON field the engine emits either as one string or as a list.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            StringOrList::One(s) => vec![s],
            StringOrList::Many(v) => v,
        }
    }
}

impl Default for StringOrList {
    fn default() -> Self {
        StringOrList::Many(Vec::new())
    }
}

/// A labels field the engine emits either as `k=v,k=v` text (listings) or as
/// a JSON map (inspect).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum LabelSet {
    Text(String),
    Map(BTreeMap<String, String>),
}

impl LabelSet {
    pub fn into_map(self) -> BTreeMap<String, String> {
        match self {
            LabelSet::Map(map) => map,
            LabelSet::Text(text) => text
                .split(',')
                .filter_map(|pair| {
                    let (key, value) = pair.split_once('=')?;
                    Some((key.trim().to_string(), value.trim().to_string()))
                })
                .collect(),
        }
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        LabelSet::Map(BTreeMap::new())
    }
}

/// One line of `images --format '{{json .}}'`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ImageRecord {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "Repository", default)]
    pub repository: String,
    #[serde(rename = "Tag", default)]
    pub tag: String,
    #[serde(rename = "Digest", default)]
    pub digest: String,
    #[serde(rename = "CreatedAt", default)]
    pub created_at: String,
    #[serde(rename = "Size", default)]
    pub size: String,
}

/// One line of `ps --format '{{json .}}'`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ContainerRecord {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "Names", default)]
    pub names: StringOrList,
    #[serde(rename = "Image", default)]
    pub image: String,
    #[serde(rename = "Command", default)]
    pub command: String,
    #[serde(rename = "CreatedAt", default)]
    pub created_at: String,
    #[serde(rename = "Status", default)]
    pub status: String,
    #[serde(rename = "Labels", default)]
    pub labels: LabelSet,
}

/// One line of `volume ls --format '{{json .}}'`, or one record of
/// `volume inspect`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct VolumeRecord {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Driver", default)]
    pub driver: String,
    #[serde(rename = "Mountpoint", default)]
    pub mountpoint: String,
    #[serde(rename = "Scope", default)]
    pub scope: String,
    #[serde(rename = "Labels", default)]
    pub labels: LabelSet,
}

/// One line of `network ls --format '{{json .}}'`, or one record of
/// `network inspect`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NetworkRecord {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Labels", default)]
    pub labels: LabelSet,
}

/// One line of `history --format '{{json .}}'`. Timestamps here are relative
/// natural language when no absolute form is available.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct HistoryRecord {
    #[serde(rename = "Snapshot", default)]
    pub snapshot: String,
    #[serde(rename = "CreatedAt", default)]
    pub created_at: String,
    #[serde(rename = "CreatedSince", default)]
    pub created_since: String,
    #[serde(rename = "CreatedBy", default)]
    pub created_by: String,
    #[serde(rename = "Size", default)]
    pub size: String,
    #[serde(rename = "Comment", default)]
    pub comment: String,
}

/// The blob printed by `version --format '{{json .}}'`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EngineVersion {
    #[serde(rename = "Client", default)]
    pub client: EngineClientVersion,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EngineClientVersion {
    #[serde(rename = "Version", default)]
    pub version: String,
    #[serde(rename = "GitCommit", default)]
    pub git_commit: String,
    #[serde(rename = "GoVersion", default)]
    pub go_version: String,
    #[serde(rename = "Os", default)]
    pub os: String,
    #[serde(rename = "Arch", default)]
    pub arch: String,
}

/// The blob printed by `info --format '{{json .}}'`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EngineInfo {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "NCPU", default)]
    pub ncpu: i64,
    #[serde(rename = "MemTotal", default)]
    pub mem_total: i64,
    #[serde(rename = "Driver", default)]
    pub driver: String,
    #[serde(rename = "LoggingDriver", default)]
    pub logging_driver: String,
    #[serde(rename = "CgroupDriver", default)]
    pub cgroup_driver: String,
    #[serde(rename = "KernelVersion", default)]
    pub kernel_version: String,
    #[serde(rename = "OperatingSystem", default)]
    pub operating_system: String,
    #[serde(rename = "OSType", default)]
    pub os_type: String,
    #[serde(rename = "Architecture", default)]
    pub architecture: String,
}

/// One record of the build CLI's verbose cache-usage report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheRecord {
    pub id: String,
    pub parent: Option<String>,
    pub record_type: String,
    pub size: u64,
    pub shared: bool,
    pub reclaimable: bool,
    pub description: Option<String>,
}
