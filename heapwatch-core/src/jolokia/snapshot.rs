use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, instrument};

use super::client::JolokiaClient;
use super::protocol::{JolokiaRequest, HOTSPOT_DIAGNOSTIC_MBEAN};
use crate::error::SnapshotError;
use crate::sink::SnapshotSink;
use crate::utils::format::format_bytes;

/// Captures heap dumps through the HotSpot diagnostic MBean.
///
/// The dump is written by the managed process, so the target directory is
/// prepared locally before the request and the finished file is opened up
/// for other users afterwards. Both steps assume the monitored JVM shares
/// the filesystem with this process.
#[derive(Debug, Clone)]
pub struct JolokiaSnapshotSink {
    client: JolokiaClient,
}

impl JolokiaSnapshotSink {
    pub fn new(client: JolokiaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SnapshotSink for JolokiaSnapshotSink {
    #[instrument(skip(self), fields(endpoint = %self.client.base_url()))]
    async fn capture(&self, path: &Path) -> Result<(), SnapshotError> {
        let path = prepare_target(path).await?;

        // Second argument: dump live objects only.
        let request = JolokiaRequest::exec(
            HOTSPOT_DIAGNOSTIC_MBEAN,
            "dumpHeap",
            vec![json!(path.to_string_lossy()), json!(true)],
        );
        let response =
            self.client
                .exec(&request)
                .await
                .map_err(|source| SnapshotError::Request {
                    path: path.clone(),
                    source,
                })?;

        if !response.is_success() {
            return Err(SnapshotError::Rejected {
                path,
                status: response.status,
                message: response.error_message(),
            });
        }

        open_permissions(&path)
            .await
            .map_err(|source| SnapshotError::FilePermissions {
                path: path.clone(),
                source,
            })?;

        let size = tokio::fs::metadata(&path)
            .await
            .map(|meta| format_bytes(meta.len()))
            .unwrap_or_else(|_| "unknown size".to_string());
        info!(path = %path.display(), size = %size, "Heap dump created");

        Ok(())
    }
}

/// Creates the parent directory if needed, makes it writable for the owner
/// and returns `path` with an absolute parent.
async fn prepare_target(path: &Path) -> Result<PathBuf, SnapshotError> {
    let (Some(dir), Some(file_name)) = (path.parent(), path.file_name()) else {
        return Err(SnapshotError::InvalidPath {
            path: path.to_path_buf(),
        });
    };
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };

    if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| SnapshotError::CreateDirectory {
                dir: dir.to_path_buf(),
                source,
            })?;
        info!(dir = %dir.display(), "Created heap dump directory");
    }

    make_owner_writable(dir)
        .await
        .map_err(|source| SnapshotError::DirectoryPermissions {
            dir: dir.to_path_buf(),
            source,
        })?;

    let dir = tokio::fs::canonicalize(dir)
        .await
        .map_err(|source| SnapshotError::ResolveDirectory {
            dir: dir.to_path_buf(),
            source,
        })?;

    Ok(dir.join(file_name))
}

#[cfg(unix)]
async fn make_owner_writable(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = tokio::fs::metadata(dir).await?.permissions();
    permissions.set_mode(permissions.mode() | 0o200);
    tokio::fs::set_permissions(dir, permissions).await
}

#[cfg(not(unix))]
async fn make_owner_writable(dir: &Path) -> std::io::Result<()> {
    let mut permissions = tokio::fs::metadata(dir).await?.permissions();
    permissions.set_readonly(false);
    tokio::fs::set_permissions(dir, permissions).await
}

#[cfg(unix)]
async fn open_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o777)).await
}

#[cfg(not(unix))]
async fn open_permissions(path: &Path) -> std::io::Result<()> {
    let mut permissions = tokio::fs::metadata(path).await?.permissions();
    permissions.set_readonly(false);
    tokio::fs::set_permissions(path, permissions).await
}
