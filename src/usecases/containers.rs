use std::sync::Arc;

use serde_json::Value;

use crate::errors::ShimResult;
use crate::models::container::{ContainerSummary, HostConfig, StateCategory};
use crate::models::engine::ContainerRecord;
use crate::parsers;
use crate::repositories::engine_client::EngineClient;

pub struct ContainerUsecase<C: EngineClient> {
    client: Arc<C>,
}

impl<C: EngineClient> Clone for ContainerUsecase<C> {
    fn clone(&self) -> Self {
        ContainerUsecase {
            client: self.client.clone(),
        }
    }
}

impl<C: EngineClient> ContainerUsecase<C> {
    pub fn new(client: Arc<C>) -> Self {
        ContainerUsecase { client }
    }

    pub async fn list(&self, all: bool) -> ShimResult<Vec<ContainerSummary>> {
        let records = self.client.list_containers(all).await?;
        Ok(records.into_iter().map(map_container_summary).collect())
    }

    pub async fn inspect(&self, name: &str) -> ShimResult<Value> {
        Ok(self.client.inspect_container(name).await?)
    }

    pub async fn logs(&self, name: &str, tail: Option<String>) -> ShimResult<Vec<String>> {
        Ok(self.client.container_logs(name, tail).await?)
    }
}

pub(crate) fn map_container_summary(record: ContainerRecord) -> ContainerSummary {
    let category = StateCategory::from_status(&record.status);
    let names = record
        .names
        .into_vec()
        .into_iter()
        .map(|name| format!("/{}", name.trim_start_matches('/')))
        .collect();
    ContainerSummary {
        id: record.id,
        names,
        image: record.image,
        image_id: String::new(),
        command: record.command.trim_matches('"').to_string(),
        created: parsers::unix_time(&record.created_at)
            .or_else(|_| parsers::unix_natural(&record.created_at))
            .unwrap_or_default(),
        ports: Vec::new(),
        labels: record.labels.into_map(),
        state: category.api_state().to_string(),
        status: record.status,
        host_config: HostConfig::default(),
        mounts: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::engine::{LabelSet, StringOrList};
    use crate::repositories::engine_client::MockEngineClient;

    fn web() -> ContainerRecord {
        ContainerRecord {
            id: "3f2a91c".to_string(),
            names: StringOrList::One("web".to_string()),
            image: "nginx:alpine".to_string(),
            command: "\"nginx -g daemon off;\"".to_string(),
            created_at: "1970-01-01 00:00:10 +0000 UTC".to_string(),
            status: "Up 3 minutes".to_string(),
            labels: LabelSet::Text("app=web".to_string()),
        }
    }

    #[test]
    fn given_listing_record_when_mapped_then_docker_shape() {
        let summary = map_container_summary(web());
        assert_eq!(summary.names, vec!["/web".to_string()]);
        assert_eq!(summary.command, "nginx -g daemon off;");
        assert_eq!(summary.created, 10);
        assert_eq!(summary.state, "running");
        assert_eq!(summary.status, "Up 3 minutes");
        assert_eq!(summary.labels.get("app").map(String::as_str), Some("web"));
    }

    #[test]
    fn given_exited_record_when_mapped_then_state_exited() {
        let mut record = web();
        record.status = "Exited (0) 2 hours ago".to_string();
        assert_eq!(map_container_summary(record).state, "exited");
    }

    #[test]
    fn given_already_slashed_name_when_mapped_then_single_slash() {
        let mut record = web();
        record.names = StringOrList::One("/web".to_string());
        assert_eq!(map_container_summary(record).names, vec!["/web".to_string()]);
    }

    #[tokio::test]
    async fn given_all_flag_when_list_then_forwarded_to_client() {
        let mut mock = MockEngineClient::new();
        mock.expect_list_containers()
            .withf(|all| *all)
            .returning(|_| Ok(vec![web()]));

        let usecase = ContainerUsecase::new(Arc::new(mock));
        let containers = usecase.list(true).await.unwrap();
        assert_eq!(containers.len(), 1);
    }
}
