use serde::Serialize;

use crate::models::build::BuildCacheRecord;
use crate::models::container::ContainerSummary;
use crate::models::image::ImageSummary;
use crate::models::volume::Volume;

/// `GET /<ver>/system/df` response.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct DiskUsageResponse {
    pub layers_size: i64,
    pub images: Vec<ImageSummary>,
    pub containers: Vec<ContainerSummary>,
    pub volumes: Vec<Volume>,
    pub build_cache: Vec<BuildCacheRecord>,
}
