//! File-backed storage for built packages and campaign metadata

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::fs as async_fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::debug;

/// Directory of package files named `{campaign_id}_{zone_id}.bin`.
#[derive(Debug, Clone)]
pub struct PackageStore {
    base_dir: PathBuf,
}

impl PackageStore {
    /// Open `base_dir`, creating it if needed.
    pub async fn open(base_dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let base_dir = base_dir.into();
        async_fs::create_dir_all(&base_dir)
            .await
            .with_context(|| format!("Failed to create package directory: {base_dir:?}"))?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// File name of the package for one zone of one campaign.
    pub fn package_file_name(campaign_id: &str, zone_id: &str) -> anyhow::Result<String> {
        check_component("campaign id", campaign_id)?;
        check_component("zone id", zone_id)?;
        Ok(format!("{campaign_id}_{zone_id}.bin"))
    }

    pub fn package_path(&self, campaign_id: &str, zone_id: &str) -> anyhow::Result<PathBuf> {
        Ok(self
            .base_dir
            .join(Self::package_file_name(campaign_id, zone_id)?))
    }

    pub fn metadata_path(&self, campaign_id: &str) -> anyhow::Result<PathBuf> {
        check_component("campaign id", campaign_id)?;
        Ok(self.base_dir.join(format!("{campaign_id}_metadata.json")))
    }

    /// Write `bytes` to `path` via a sibling temp file and rename.
    ///
    /// Readers never observe a partially written package.
    pub async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
        debug!(path = ?path, len = bytes.len(), "Writing file atomically");

        let temp_path = path.with_extension("tmp");
        let mut file = async_fs::File::create(&temp_path)
            .await
            .with_context(|| format!("Failed to create temp file: {temp_path:?}"))?;
        file.write_all(bytes)
            .await
            .with_context(|| format!("Failed to write temp file: {temp_path:?}"))?;
        file.sync_all()
            .await
            .with_context(|| format!("Failed to sync temp file: {temp_path:?}"))?;
        drop(file);

        async_fs::rename(&temp_path, path)
            .await
            .with_context(|| format!("Failed to rename temp file to target: {path:?}"))?;
        Ok(())
    }

    pub async fn read(&self, path: &Path) -> anyhow::Result<Vec<u8>> {
        async_fs::read(path)
            .await
            .with_context(|| format!("Failed to read file: {path:?}"))
    }

    /// Size of the file at `path`, or `None` if it does not exist.
    pub async fn size(&self, path: &Path) -> anyhow::Result<Option<u64>> {
        match async_fs::metadata(path).await {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to stat file: {path:?}")),
        }
    }

    /// Read `len` bytes starting at `offset` straight from disk.
    pub async fn read_range(&self, path: &Path, offset: u64, len: u64) -> anyhow::Result<Vec<u8>> {
        let mut file = async_fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open file: {path:?}"))?;
        file.seek(SeekFrom::Start(offset))
            .await
            .with_context(|| format!("Failed to seek to {offset} in {path:?}"))?;

        let capacity = usize::try_from(len).context("Range too large for this platform")?;
        let mut buf = Vec::with_capacity(capacity);
        file.take(len)
            .read_to_end(&mut buf)
            .await
            .with_context(|| format!("Failed to read range from {path:?}"))?;
        anyhow::ensure!(
            buf.len() as u64 == len,
            "Short read from {path:?}: wanted {len} bytes, got {}",
            buf.len()
        );
        Ok(buf)
    }
}

fn check_component(what: &str, value: &str) -> anyhow::Result<()> {
    let ok = !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'.')
        && value != "."
        && value != "..";
    anyhow::ensure!(ok, "Invalid {what} for a file name: {value:?}");
    Ok(())
}
