use async_trait::async_trait;
use axum::body::Bytes;
use futures_util::Stream;
use mockall::automock;
use serde_json::Value;
use std::path::PathBuf;
use std::pin::Pin;

use crate::errors::engine::EngineError;
use crate::models::build::BuildOptions;
use crate::models::engine::{
    CacheRecord, ContainerRecord, EngineVersion, EngineInfo, HistoryRecord, ImageRecord,
    NetworkRecord, VolumeRecord,
};
use crate::models::image::ImageDeleteItem;
use crate::models::version::ComponentVersion;

/// Line-oriented subprocess output, delivered as the process produces it.
pub type LineStream = Pin<Box<dyn Stream<Item = std::io::Result<String>> + Send>>;
/// Raw subprocess output chunks (image export).
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;
/// An incoming HTTP body fed to a subprocess (image load).
pub type BodyInput = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Everything the shim needs from the engine and build CLIs, one method per
/// logical operation. Streaming operations hand back the subprocess output
/// incrementally; all other operations return fully parsed records.
#[automock]
#[async_trait]
pub trait EngineClient: Send + Sync + 'static {
    async fn engine_version(&self) -> Result<String, EngineError>;
    async fn client_version(&self) -> Result<EngineVersion, EngineError>;
    async fn component_versions(&self) -> Result<Vec<ComponentVersion>, EngineError>;
    async fn system_info(&self) -> Result<EngineInfo, EngineError>;

    async fn list_images(&self) -> Result<Vec<ImageRecord>, EngineError>;
    async fn inspect_image(&self, name: &str) -> Result<Value, EngineError>;
    async fn image_history(&self, name: &str) -> Result<Vec<HistoryRecord>, EngineError>;
    async fn tag_image(&self, name: &str, target: &str) -> Result<(), EngineError>;
    async fn remove_image(&self, name: &str) -> Result<Vec<ImageDeleteItem>, EngineError>;

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerRecord>, EngineError>;
    async fn inspect_container(&self, name: &str) -> Result<Value, EngineError>;
    async fn container_logs(
        &self,
        name: &str,
        tail: Option<String>,
    ) -> Result<Vec<String>, EngineError>;

    async fn list_volumes(&self) -> Result<Vec<VolumeRecord>, EngineError>;
    async fn inspect_volume(&self, name: &str) -> Result<VolumeRecord, EngineError>;
    async fn list_networks(&self) -> Result<Vec<NetworkRecord>, EngineError>;
    async fn inspect_network(&self, name: &str) -> Result<NetworkRecord, EngineError>;

    async fn pull_image(&self, reference: &str) -> Result<LineStream, EngineError>;
    async fn push_image(&self, reference: &str) -> Result<LineStream, EngineError>;
    async fn load_images(&self, input: BodyInput) -> Result<LineStream, EngineError>;
    async fn save_images(&self, names: Vec<String>) -> Result<ByteStream, EngineError>;
    async fn build_image(
        &self,
        context: PathBuf,
        options: BuildOptions,
    ) -> Result<LineStream, EngineError>;

    async fn cache_usage(&self) -> Result<Vec<CacheRecord>, EngineError>;
    async fn prune_cache(&self) -> Result<(), EngineError>;
}
