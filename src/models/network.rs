use serde::Serialize;
use std::collections::BTreeMap;

/// One network in the `GET /<ver>/networks` and network-inspect responses.
/// The driver is only known for the reserved `host`/`none` networks; for
/// managed networks it is left unset.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkResource {
    pub name: String,
    pub id: String,
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    pub labels: BTreeMap<String, String>,
}
