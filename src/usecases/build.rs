use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::body::Bytes;
use flate2::read::GzDecoder;
use futures_util::StreamExt;
use tempfile::TempDir;
use tracing::debug;

use crate::errors::build::BuildError;
use crate::errors::{ShimError, ShimResult};
use crate::models::build::{BuildCacheRecord, BuildOptions, BuildPruneResponse};
use crate::models::engine::CacheRecord;
use crate::repositories::engine_client::{EngineClient, LineStream};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Cache records of these types are build machinery, not user layers, and
/// are excluded from prune accounting.
const HIDDEN_CACHE_TYPES: [&str; 2] = ["internal", "frontend"];

pub struct BuildUsecase<C: EngineClient> {
    client: Arc<C>,
}

impl<C: EngineClient> Clone for BuildUsecase<C> {
    fn clone(&self) -> Self {
        BuildUsecase {
            client: self.client.clone(),
        }
    }
}

impl<C: EngineClient> BuildUsecase<C> {
    pub fn new(client: Arc<C>) -> Self {
        BuildUsecase { client }
    }

    /// Unpacks the request body into a temporary context directory and runs
    /// the build from it. The directory lives exactly as long as the
    /// returned stream and is removed when the stream is dropped.
    pub async fn build(&self, body: Bytes, options: BuildOptions) -> ShimResult<LineStream> {
        let context = tokio::task::spawn_blocking(move || extract_build_context(&body))
            .await
            .map_err(|e| ShimError::Internal(e.into()))??;
        debug!(context = %context.path().display(), "build context extracted");

        let lines = self
            .client
            .build_image(context.path().to_path_buf(), options)
            .await?;
        Ok(Box::pin(lines.map(move |item| {
            let _keep = &context;
            item
        })))
    }

    pub async fn prune(&self) -> ShimResult<BuildPruneResponse> {
        let caches = self.client.cache_usage().await?;
        self.client.prune_cache().await?;
        let mut response = BuildPruneResponse::default();
        for record in caches {
            if !record.reclaimable || HIDDEN_CACHE_TYPES.contains(&record.record_type.as_str()) {
                continue;
            }
            response.space_reclaimed += record.size as i64;
            response.caches_deleted.push(record.id);
        }
        Ok(response)
    }
}

pub(crate) fn map_cache_record(record: &CacheRecord) -> BuildCacheRecord {
    BuildCacheRecord {
        id: record.id.clone(),
        parent: record.parent.clone().unwrap_or_default(),
        cache_type: record.record_type.clone(),
        description: record.description.clone().unwrap_or_default(),
        in_use: !record.reclaimable,
        shared: record.shared,
        size: record.size as i64,
    }
}

/// Unpacks a tar (optionally gzipped) build context into a fresh temporary
/// directory.
fn extract_build_context(body: &[u8]) -> Result<TempDir, BuildError> {
    let dir = TempDir::new()?;
    if body.starts_with(&GZIP_MAGIC) {
        unpack_archive(GzDecoder::new(body), dir.path())?;
    } else {
        unpack_archive(body, dir.path())?;
    }
    Ok(dir)
}

fn unpack_archive<R: Read>(reader: R, dest: &Path) -> Result<(), BuildError> {
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);
    let entries = archive.entries().map_err(|e| BuildError::BadArchive {
        reason: e.to_string(),
    })?;
    for entry in entries {
        let mut entry = entry.map_err(|e| BuildError::BadArchive {
            reason: e.to_string(),
        })?;
        let name = entry
            .path()
            .map_err(|e| BuildError::BadArchive {
                reason: e.to_string(),
            })?
            .into_owned();
        let target = safe_join(dest, &name)?;
        check_link_entry(&mut entry, dest, &name)?;
        entry.unpack(target)?;
    }
    Ok(())
}

/// Link entries get the same scrutiny as entry names: a symlink pointing
/// above the context root would let later entries write through it to the
/// outside, so an escaping target aborts the extraction.
fn check_link_entry<R: Read>(
    entry: &mut tar::Entry<'_, R>,
    dest: &Path,
    name: &Path,
) -> Result<(), BuildError> {
    let kind = entry.header().entry_type();
    if !kind.is_symlink() && !kind.is_hard_link() {
        return Ok(());
    }
    let target = entry
        .link_name()
        .map_err(|e| BuildError::BadArchive {
            reason: e.to_string(),
        })?
        .ok_or_else(|| BuildError::BadArchive {
            reason: format!("link entry '{}' without a target", name.display()),
        })?
        .into_owned();
    if kind.is_hard_link() {
        // Hard link targets are archive-root relative, like entry names.
        safe_join(dest, &target)?;
    } else if symlink_escapes(name, &target) {
        return Err(BuildError::UnsafePath {
            name: name.display().to_string(),
        });
    }
    Ok(())
}

/// Lexically resolves a symlink target against the link's directory and
/// reports whether it leaves the context root. Targets that never exist
/// still count as escapes; the check is conservative.
fn symlink_escapes(entry_path: &Path, target: &Path) -> bool {
    if target.has_root() {
        return true;
    }
    // Directories between the context root and the link itself.
    let mut depth = entry_path
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count() as i64
        - 1;
    for component in target.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(_) => depth += 1,
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            _ => return true,
        }
    }
    false
}

/// Joins an archive entry name onto the context root, rejecting names that
/// would land outside it.
fn safe_join(root: &Path, name: &Path) -> Result<PathBuf, BuildError> {
    let mut target = root.to_path_buf();
    for component in name.components() {
        match component {
            Component::Normal(part) => target.push(part),
            Component::CurDir => {}
            _ => {
                return Err(BuildError::UnsafePath {
                    name: name.display().to_string(),
                })
            }
        }
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn tar_with(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, content, mode) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(*mode);
            // `append_data`/`set_path` refuse `..` components, which some
            // fixtures need; write the name bytes straight into the header.
            header.as_gnu_mut().unwrap().name[..name.len()].copy_from_slice(name.as_bytes());
            header.set_cksum();
            builder.append(&header, *content).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn given_plain_tar_when_extracted_then_files_land_in_context() {
        let archive = tar_with(&[
            ("Dockerfile", b"FROM alpine\n", 0o644),
            ("app/run.sh", b"#!/bin/sh\n", 0o755),
        ]);
        let dir = extract_build_context(&archive).unwrap();
        let dockerfile = std::fs::read_to_string(dir.path().join("Dockerfile")).unwrap();
        assert_eq!(dockerfile, "FROM alpine\n");
        assert!(dir.path().join("app/run.sh").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn given_executable_entry_when_extracted_then_mode_preserved() {
        use std::os::unix::fs::PermissionsExt;

        let archive = tar_with(&[("run.sh", b"#!/bin/sh\n", 0o755)]);
        let dir = extract_build_context(&archive).unwrap();
        let mode = std::fs::metadata(dir.path().join("run.sh"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn given_gzipped_tar_when_extracted_then_decompressed_first() {
        let archive = tar_with(&[("Dockerfile", b"FROM alpine\n", 0o644)]);
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&archive).unwrap();
        let gzipped = encoder.finish().unwrap();

        let dir = extract_build_context(&gzipped).unwrap();
        assert!(dir.path().join("Dockerfile").is_file());
    }

    fn append_symlink(builder: &mut tar::Builder<Vec<u8>>, name: &str, target: &Path) {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Symlink);
        header.set_size(0);
        builder.append_link(&mut header, name, target).unwrap();
    }

    #[test]
    fn given_parent_dir_entry_when_extracted_then_rejected() {
        let archive = tar_with(&[("../evil.sh", b"#!/bin/sh\n", 0o755)]);
        let result = extract_build_context(&archive);
        assert!(matches!(result, Err(BuildError::UnsafePath { .. })));
    }

    #[test]
    fn given_symlink_to_outside_dir_when_extracted_then_rejected_before_any_write() {
        let outside = TempDir::new().unwrap();
        let mut builder = tar::Builder::new(Vec::new());
        append_symlink(&mut builder, "leak", outside.path());
        let mut header = tar::Header::new_gnu();
        let payload = b"oops\n";
        header.set_size(payload.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "leak/pwned", payload.as_slice())
            .unwrap();
        let archive = builder.into_inner().unwrap();

        let result = extract_build_context(&archive);
        assert!(matches!(result, Err(BuildError::UnsafePath { .. })));
        assert!(!outside.path().join("pwned").exists());
    }

    #[test]
    fn given_symlink_with_relative_escape_when_extracted_then_rejected() {
        let mut builder = tar::Builder::new(Vec::new());
        append_symlink(&mut builder, "dir/leak", Path::new("../../somewhere"));
        let archive = builder.into_inner().unwrap();

        let result = extract_build_context(&archive);
        assert!(matches!(result, Err(BuildError::UnsafePath { .. })));
    }

    #[test]
    fn given_internal_symlink_when_extracted_then_kept() {
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        let dockerfile = b"FROM alpine\n";
        header.set_size(dockerfile.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "Dockerfile", dockerfile.as_slice())
            .unwrap();
        append_symlink(&mut builder, "Dockerfile.dev", Path::new("Dockerfile"));
        let archive = builder.into_inner().unwrap();

        let dir = extract_build_context(&archive).unwrap();
        let link = dir.path().join("Dockerfile.dev");
        assert!(std::fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read_to_string(&link).unwrap(), "FROM alpine\n");
    }

    #[test]
    fn given_symlink_targets_when_resolved_lexically_then_escapes_detected() {
        assert!(symlink_escapes(Path::new("leak"), Path::new("/tmp")));
        assert!(symlink_escapes(Path::new("leak"), Path::new("../outside")));
        assert!(symlink_escapes(Path::new("a/b/leak"), Path::new("../../../x")));
        assert!(!symlink_escapes(Path::new("a/b/leak"), Path::new("../x")));
        assert!(!symlink_escapes(Path::new("leak"), Path::new("Dockerfile")));
        assert!(!symlink_escapes(Path::new("leak"), Path::new("./sub/file")));
    }

    #[test]
    fn given_garbage_body_when_extracted_then_bad_archive() {
        assert!(extract_build_context(b"definitely not a tarball").is_err());
    }

    #[test]
    fn given_cache_record_when_mapped_then_in_use_is_inverse_of_reclaimable() {
        let record = CacheRecord {
            id: "abc".to_string(),
            parent: None,
            record_type: "regular".to_string(),
            size: 1024,
            shared: true,
            reclaimable: true,
            description: Some("local source".to_string()),
        };
        let mapped = map_cache_record(&record);
        assert!(!mapped.in_use);
        assert!(mapped.shared);
        assert_eq!(mapped.size, 1024);
    }

    #[tokio::test]
    async fn given_internal_caches_when_pruned_then_excluded_from_accounting() {
        use crate::repositories::engine_client::MockEngineClient;

        let mut mock = MockEngineClient::new();
        mock.expect_cache_usage().returning(|| {
            Ok(vec![
                CacheRecord {
                    id: "user".to_string(),
                    record_type: "regular".to_string(),
                    size: 100,
                    reclaimable: true,
                    ..CacheRecord::default()
                },
                CacheRecord {
                    id: "machinery".to_string(),
                    record_type: "internal".to_string(),
                    size: 50,
                    reclaimable: true,
                    ..CacheRecord::default()
                },
                CacheRecord {
                    id: "pinned".to_string(),
                    record_type: "regular".to_string(),
                    size: 25,
                    reclaimable: false,
                    ..CacheRecord::default()
                },
            ])
        });
        mock.expect_prune_cache().returning(|| Ok(()));

        let usecase = BuildUsecase::new(Arc::new(mock));
        let response = usecase.prune().await.unwrap();
        assert_eq!(response.caches_deleted, vec!["user".to_string()]);
        assert_eq!(response.space_reclaimed, 100);
    }
}
