use serde::Serialize;
use std::collections::BTreeMap;

/// Options extracted from the `POST /<ver>/build` query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub tag: Option<String>,
    pub dockerfile: Option<String>,
    pub platform: Option<String>,
    pub build_args: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
}

/// One build-cache entry in the `system/df` response.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct BuildCacheRecord {
    #[serde(rename = "ID")]
    pub id: String,
    pub parent: String,
    #[serde(rename = "Type")]
    pub cache_type: String,
    pub description: String,
    pub in_use: bool,
    pub shared: bool,
    pub size: i64,
}

/// `POST /<ver>/build/prune` response.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct BuildPruneResponse {
    pub caches_deleted: Vec<String>,
    pub space_reclaimed: i64,
}
