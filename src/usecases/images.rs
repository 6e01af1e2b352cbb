use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::errors::api::ApiError;
use crate::errors::ShimResult;
use crate::models::engine::{HistoryRecord, ImageRecord};
use crate::models::image::{HistoryEntry, ImageDeleteItem, ImageSummary};
use crate::parsers;
use crate::repositories::engine_client::{BodyInput, ByteStream, EngineClient, LineStream};

pub struct ImageUsecase<C: EngineClient> {
    client: Arc<C>,
}

impl<C: EngineClient> Clone for ImageUsecase<C> {
    fn clone(&self) -> Self {
        ImageUsecase {
            client: self.client.clone(),
        }
    }
}

impl<C: EngineClient> ImageUsecase<C> {
    pub fn new(client: Arc<C>) -> Self {
        ImageUsecase { client }
    }

    pub async fn list(&self, filters: Option<String>) -> ShimResult<Vec<ImageSummary>> {
        let references = match filters.as_deref() {
            Some(raw) => Some(parse_reference_filters(raw)?),
            None => None,
        };
        let images = self.client.list_images().await?;
        Ok(images
            .into_iter()
            .filter(|image| match &references {
                Some(wanted) => {
                    wanted.contains(&image.repository)
                        || wanted.contains(&format!("{}:{}", image.repository, image.tag))
                }
                None => true,
            })
            .map(map_image_summary)
            .collect())
    }

    pub async fn inspect(&self, name: &str) -> ShimResult<Value> {
        Ok(self.client.inspect_image(name).await?)
    }

    pub async fn history(&self, name: &str) -> ShimResult<Vec<HistoryEntry>> {
        let records = self.client.image_history(name).await?;
        Ok(records.into_iter().map(map_history_entry).collect())
    }

    pub async fn tag(&self, name: &str, repo: &str, tag: &str) -> ShimResult<()> {
        let target = format!("{}:{}", repo, tag);
        Ok(self.client.tag_image(name, &target).await?)
    }

    pub async fn remove(&self, name: &str) -> ShimResult<Vec<ImageDeleteItem>> {
        Ok(self.client.remove_image(name).await?)
    }

    pub async fn pull(&self, from: &str, tag: Option<&str>) -> ShimResult<LineStream> {
        let reference = match tag {
            // A digest or tag already embedded in the name wins.
            Some(tag) if !from.contains('@') && !tag.is_empty() => format!("{}:{}", from, tag),
            _ => from.to_string(),
        };
        Ok(self.client.pull_image(&reference).await?)
    }

    pub async fn push(&self, name: &str, tag: Option<&str>) -> ShimResult<LineStream> {
        let reference = match tag {
            Some(tag) if !tag.is_empty() => format!("{}:{}", name, tag),
            _ => name.to_string(),
        };
        Ok(self.client.push_image(&reference).await?)
    }

    pub async fn load(&self, input: BodyInput) -> ShimResult<LineStream> {
        Ok(self.client.load_images(input).await?)
    }

    pub async fn save(&self, names: Vec<String>) -> ShimResult<ByteStream> {
        Ok(self.client.save_images(names).await?)
    }
}

/// Decodes the `filters` query parameter; only `reference` filters are
/// honored, everything else is ignored.
fn parse_reference_filters(raw: &str) -> Result<Vec<String>, ApiError> {
    let filters: BTreeMap<String, BTreeMap<String, bool>> =
        serde_json::from_str(raw).map_err(|e| ApiError::InvalidQuery {
            name: "filters",
            reason: e.to_string(),
        })?;
    Ok(filters
        .get("reference")
        .map(|refs| refs.keys().cloned().collect())
        .unwrap_or_default())
}

pub(crate) fn map_image_summary(record: ImageRecord) -> ImageSummary {
    let created = parsers::unix_time(&record.created_at)
        .or_else(|_| parsers::unix_natural(&record.created_at))
        .unwrap_or_default();
    let size = parsers::byte_size(&record.size).unwrap_or_else(|e| {
        debug!(size = %record.size, error = %e, "unreadable image size");
        0
    }) as i64;
    let repo_digests = if record.digest.is_empty() || record.digest == "<none>" {
        Vec::new()
    } else {
        vec![format!("{}@{}", record.repository, record.digest)]
    };
    ImageSummary {
        id: record.id,
        parent_id: String::new(),
        repo_tags: vec![format!("{}:{}", record.repository, record.tag)],
        repo_digests,
        created,
        size,
        virtual_size: size,
        labels: BTreeMap::new(),
    }
}

fn map_history_entry(record: HistoryRecord) -> HistoryEntry {
    let created = parsers::unix_time(&record.created_at)
        .or_else(|_| parsers::unix_natural(&record.created_since))
        .unwrap_or_default();
    HistoryEntry {
        id: record.snapshot,
        created,
        created_by: record.created_by,
        tags: Vec::new(),
        size: parsers::byte_size(&record.size).unwrap_or_default() as i64,
        comment: record.comment,
    }
}
