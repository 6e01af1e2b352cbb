use std::sync::Arc;

use crate::errors::ShimResult;
use crate::models::engine::{NetworkRecord, VolumeRecord};
use crate::models::network::NetworkResource;
use crate::models::volume::{Volume, VolumeListResponse};
use crate::repositories::engine_client::EngineClient;

pub struct VolumeUsecase<C: EngineClient> {
    client: Arc<C>,
}

impl<C: EngineClient> Clone for VolumeUsecase<C> {
    fn clone(&self) -> Self {
        VolumeUsecase {
            client: self.client.clone(),
        }
    }
}

impl<C: EngineClient> VolumeUsecase<C> {
    pub fn new(client: Arc<C>) -> Self {
        VolumeUsecase { client }
    }

    pub async fn volumes(&self) -> ShimResult<VolumeListResponse> {
        let records = self.client.list_volumes().await?;
        Ok(VolumeListResponse {
            volumes: records.into_iter().map(map_volume).collect(),
            warnings: Vec::new(),
        })
    }

    pub async fn volume(&self, name: &str) -> ShimResult<Volume> {
        let record = self.client.inspect_volume(name).await?;
        Ok(map_volume(record))
    }

    pub async fn networks(&self) -> ShimResult<Vec<NetworkResource>> {
        let records = self.client.list_networks().await?;
        Ok(records.into_iter().map(map_network).collect())
    }

    pub async fn network(&self, name: &str) -> ShimResult<NetworkResource> {
        let record = self.client.inspect_network(name).await?;
        Ok(map_network(record))
    }
}

pub(crate) fn map_volume(record: VolumeRecord) -> Volume {
    Volume {
        name: record.name,
        driver: if record.driver.is_empty() {
            "local".to_string()
        } else {
            record.driver
        },
        mountpoint: record.mountpoint,
        labels: record.labels.into_map(),
        scope: if record.scope.is_empty() {
            "local".to_string()
        } else {
            record.scope
        },
    }
}

fn map_network(record: NetworkRecord) -> NetworkResource {
    // Only the reserved networks have a well-known driver; CNI-managed
    // networks report none.
    let driver = match record.name.as_str() {
        "host" | "none" => Some(record.name.clone()),
        _ => None,
    };
    let id = if record.id.is_empty() {
        record.name.clone()
    } else {
        record.id
    };
    NetworkResource {
        name: record.name,
        id,
        scope: "local".to_string(),
        driver,
        labels: record.labels.into_map(),
    }
}
