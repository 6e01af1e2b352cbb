use std::cmp::Ordering;
use std::sync::Arc;

use tracing::debug;

use crate::errors::ShimResult;
use crate::models::container::StateCategory;
use crate::models::info::{InfoResponse, RuntimeInfo, SwarmInfo};
use crate::models::system::DiskUsageResponse;
use crate::models::version::{Platform, VersionResponse};
use crate::parsers::vercmp;
use crate::repositories::engine_client::EngineClient;
use crate::usecases::build::map_cache_record;
use crate::usecases::containers::map_container_summary;
use crate::usecases::images::map_image_summary;
use crate::usecases::volumes::map_volume;

/// Docker clients older than this never ask for the platform/components
/// block and some of them reject it.
pub const COMPONENTS_THRESHOLD: &str = "1.35";

const INDEX_SERVER_ADDRESS: &str = "https://index.docker.io/v1/";

pub struct SystemUsecase<C: EngineClient> {
    client: Arc<C>,
}

impl<C: EngineClient> Clone for SystemUsecase<C> {
    fn clone(&self) -> Self {
        SystemUsecase {
            client: self.client.clone(),
        }
    }
}

impl<C: EngineClient> SystemUsecase<C> {
    pub fn new(client: Arc<C>) -> Self {
        SystemUsecase { client }
    }

    /// Builds the `/version` response. `requested` is the API version taken
    /// from the request path; it gates the components block.
    pub async fn version(
        &self,
        requested: &str,
        api_version: &str,
        min_api_version: &str,
    ) -> ShimResult<VersionResponse> {
        let client = self.client.client_version().await?.client;
        let with_components = vercmp(requested, COMPONENTS_THRESHOLD) == Ordering::Greater;
        let (platform, components) = if with_components {
            let components = self.client.component_versions().await?;
            let platform = Platform {
                name: format!("nerdctl/{}", client.version),
            };
            (Some(platform), Some(components))
        } else {
            (None, None)
        };
        Ok(VersionResponse {
            platform,
            components,
            version: client.version,
            api_version: api_version.to_string(),
            min_api_version: Some(min_api_version.to_string()),
            git_commit: client.git_commit,
            go_version: client.go_version,
            os: client.os,
            arch: client.arch,
            kernel_version: None,
            experimental: true,
            build_time: None,
        })
    }

    pub async fn info(&self) -> ShimResult<InfoResponse> {
        let info = self.client.system_info().await?;
        let server_version = self.client.engine_version().await?;
        let containers = self.client.list_containers(true).await?;
        let images = self.client.list_images().await?;

        let mut running = 0;
        let mut paused = 0;
        let mut stopped = 0;
        for container in &containers {
            match StateCategory::from_status(&container.status) {
                StateCategory::Running => running += 1,
                StateCategory::Paused => paused += 1,
                _ => stopped += 1,
            }
        }

        let runtimes = [
            ("io.containerd.runc.v2", "runc"),
            ("runc", "runc"),
        ]
        .into_iter()
        .map(|(name, path)| {
            (
                name.to_string(),
                RuntimeInfo {
                    path: path.to_string(),
                },
            )
        })
        .collect();

        Ok(InfoResponse {
            id: info.id,
            containers: containers.len() as i64,
            containers_running: running,
            containers_paused: paused,
            containers_stopped: stopped,
            images: images.len() as i64,
            driver: info.driver,
            logging_driver: info.logging_driver,
            cgroup_driver: info.cgroup_driver,
            kernel_version: info.kernel_version,
            operating_system: info.operating_system,
            os_type: info.os_type,
            architecture: info.architecture,
            ncpu: info.ncpu,
            mem_total: info.mem_total,
            index_server_address: INDEX_SERVER_ADDRESS.to_string(),
            name: info.name,
            labels: Vec::new(),
            experimental_build: false,
            server_version,
            runtimes,
            default_runtime: "runc".to_string(),
            security_options: Vec::new(),
            live_restore_enabled: false,
            swarm: SwarmInfo::default(),
        })
    }

    pub async fn disk_usage(&self) -> ShimResult<DiskUsageResponse> {
        let images = self.client.list_images().await?;
        let containers = self.client.list_containers(true).await?;
        let volumes = self.client.list_volumes().await?;
        // Best effort: the build CLI may be absent on hosts that never build.
        let caches = match self.client.cache_usage().await {
            Ok(caches) => caches,
            Err(e) => {
                debug!(error = %e, "cache usage unavailable");
                Vec::new()
            }
        };

        let images: Vec<_> = images.into_iter().map(map_image_summary).collect();
        let layers_size = images.iter().map(|i| i.size).sum();

        Ok(DiskUsageResponse {
            layers_size,
            images,
            containers: containers.into_iter().map(map_container_summary).collect(),
            volumes: volumes.into_iter().map(map_volume).collect(),
            build_cache: caches.iter().map(map_cache_record).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::engine::{EngineClientVersion, EngineVersion};
    use crate::models::version::ComponentVersion;
    use crate::repositories::engine_client::MockEngineClient;

    fn client_version() -> EngineVersion {
        EngineVersion {
            client: EngineClientVersion {
                version: "1.7.6".to_string(),
                git_commit: "845e989".to_string(),
                go_version: "go1.22.2".to_string(),
                os: "linux".to_string(),
                arch: "amd64".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn given_old_api_version_when_version_then_components_absent() {
        let mut mock = MockEngineClient::new();
        mock.expect_client_version()
            .returning(|| Ok(client_version()));
        mock.expect_component_versions().never();

        let usecase = SystemUsecase::new(Arc::new(mock));
        let response = usecase.version("1.24", "1.43", "1.24").await.unwrap();
        assert!(response.components.is_none());
        assert!(response.platform.is_none());
        assert_eq!(response.version, "1.7.6");
        assert_eq!(response.min_api_version.as_deref(), Some("1.24"));
    }

    #[tokio::test]
    async fn given_current_api_version_when_version_then_components_present() {
        let mut mock = MockEngineClient::new();
        mock.expect_client_version()
            .returning(|| Ok(client_version()));
        mock.expect_component_versions().returning(|| {
            Ok(vec![ComponentVersion::new(
                "nerdctl",
                "1.7.6".to_string(),
                None,
            )])
        });

        let usecase = SystemUsecase::new(Arc::new(mock));
        let response = usecase.version("1.43", "1.43", "1.24").await.unwrap();
        assert_eq!(response.components.unwrap().len(), 1);
        assert_eq!(response.platform.unwrap().name, "nerdctl/1.7.6");
        assert!(response.experimental);
    }

    #[tokio::test]
    async fn given_unavailable_build_cli_when_disk_usage_then_build_cache_empty() {
        use crate::errors::engine::EngineError;

        let mut mock = MockEngineClient::new();
        mock.expect_list_images().returning(|| Ok(Vec::new()));
        mock.expect_list_containers().returning(|_| Ok(Vec::new()));
        mock.expect_list_volumes().returning(|| Ok(Vec::new()));
        mock.expect_cache_usage().returning(|| {
            Err(EngineError::SpawnFailed {
                command: "buildctl du --verbose".to_string(),
                reason: "No such file or directory".to_string(),
            })
        });

        let usecase = SystemUsecase::new(Arc::new(mock));
        let response = usecase.disk_usage().await.unwrap();
        assert!(response.build_cache.is_empty());
        assert_eq!(response.layers_size, 0);
    }

    #[tokio::test]
    async fn given_threshold_version_exactly_when_version_then_components_absent() {
        let mut mock = MockEngineClient::new();
        mock.expect_client_version()
            .returning(|| Ok(client_version()));
        mock.expect_component_versions().never();

        let usecase = SystemUsecase::new(Arc::new(mock));
        let response = usecase.version("1.35", "1.43", "1.24").await.unwrap();
        assert!(response.components.is_none());
    }
}
