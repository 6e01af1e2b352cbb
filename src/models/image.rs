use serde::Serialize;
use std::collections::BTreeMap;

/// One element of the `GET /<ver>/images/json` response.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ImageSummary {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "ParentId")]
    pub parent_id: String,
    pub repo_tags: Vec<String>,
    pub repo_digests: Vec<String>,
    pub created: i64,
    pub size: i64,
    pub virtual_size: i64,
    pub labels: BTreeMap<String, String>,
}

/// One element of the `GET /<ver>/images/<name>/history` response.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct HistoryEntry {
    #[serde(rename = "Id")]
    pub id: String,
    pub created: i64,
    pub created_by: String,
    pub tags: Vec<String>,
    pub size: i64,
    pub comment: String,
}

/// One element of the `DELETE /<ver>/images/<name>` response; serializes as
/// `{"Untagged": ...}` or `{"Deleted": ...}`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub enum ImageDeleteItem {
    Untagged(String),
    Deleted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_delete_items_when_serialized_then_externally_tagged() {
        let untagged = ImageDeleteItem::Untagged("alpine:latest".to_string());
        assert_eq!(
            serde_json::to_string(&untagged).unwrap(),
            r#"{"Untagged":"alpine:latest"}"#
        );
        let deleted = ImageDeleteItem::Deleted("sha256:abc".to_string());
        assert_eq!(
            serde_json::to_string(&deleted).unwrap(),
            r#"{"Deleted":"sha256:abc"}"#
        );
    }
}
