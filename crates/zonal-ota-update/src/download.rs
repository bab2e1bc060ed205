//! Resumable package downloads
//!
//! Vehicles fetch zone packages over lossy links and resume with HTTP-style
//! byte ranges. Ranges are served straight from the stored file.

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};
use zonal_ota_errors::PackageError;

use crate::metadata::{load_campaign_metadata, storage_error};
use crate::storage::PackageStore;

/// Inclusive byte range within a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Whole package of `size` bytes; `None` for an empty package.
    pub fn full(size: u64) -> Option<Self> {
        size.checked_sub(1).map(|end| Self { start: 0, end })
    }

    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// An inclusive range always holds at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Parse a `Range` header value against a package of `size` bytes.
    ///
    /// Accepts `bytes=a-b`, `bytes=a-` and `bytes=-n`. An end past the last
    /// byte is clamped. Multiple ranges are not supported.
    pub fn parse_header(value: &str, size: u64) -> Result<Self, PackageError> {
        let spec = value
            .trim()
            .strip_prefix("bytes=")
            .ok_or_else(|| PackageError::InvalidRange(format!("unsupported unit in {value:?}")))?;
        if spec.contains(',') {
            return Err(PackageError::InvalidRange(format!(
                "multiple ranges in {value:?}"
            )));
        }
        let (first, last) = spec
            .split_once('-')
            .ok_or_else(|| PackageError::InvalidRange(format!("missing '-' in {value:?}")))?;

        let number = |s: &str| {
            let digits = s.trim();
            let bad = || PackageError::InvalidRange(format!("bad offset {s:?} in {value:?}"));
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(bad());
            }
            digits.parse::<u64>().ok().ok_or_else(bad)
        };
        let unsatisfiable = |start: u64, end: u64| PackageError::RangeNotSatisfiable { start, end, size };

        match (first.trim().is_empty(), last.trim().is_empty()) {
            (true, true) => Err(PackageError::InvalidRange(format!("empty range {value:?}"))),
            (true, false) => {
                let suffix = number(last)?;
                if suffix == 0 || size == 0 {
                    return Err(unsatisfiable(0, suffix));
                }
                Ok(Self {
                    start: size.saturating_sub(suffix),
                    end: size - 1,
                })
            }
            (false, open_end) => {
                let start = number(first)?;
                let end = if open_end { u64::MAX } else { number(last)? };
                if end < start {
                    return Err(PackageError::InvalidRange(format!(
                        "end before start in {value:?}"
                    )));
                }
                if start >= size {
                    return Err(unsatisfiable(start, end));
                }
                Ok(Self {
                    start,
                    end: end.min(size - 1),
                })
            }
        }
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Bytes served for one download request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSlice {
    pub bytes: Vec<u8>,
    pub range: Option<ByteRange>,
    pub total_size: u64,
    /// SHA-256 of the whole package, for the client's final check
    pub content_hash: String,
    /// True when a range was requested
    pub partial: bool,
}

impl PackageSlice {
    /// `Content-Range` value for a partial response.
    pub fn content_range_header(&self) -> Option<String> {
        match (self.partial, self.range) {
            (true, Some(r)) => Some(format!("bytes {}-{}/{}", r.start, r.end, self.total_size)),
            _ => None,
        }
    }
}

/// Serves byte ranges of stored campaign packages.
#[derive(Debug, Clone)]
pub struct DownloadService {
    store: PackageStore,
}

impl DownloadService {
    pub fn new(store: PackageStore) -> Self {
        Self { store }
    }

    /// Read `range` (or the whole file) of the package for `zone_id`.
    pub async fn read_range(
        &self,
        campaign_id: &str,
        zone_id: &str,
        range: Option<ByteRange>,
    ) -> Result<PackageSlice, PackageError> {
        let metadata = load_campaign_metadata(&self.store, campaign_id).await?;
        let package = metadata
            .package(zone_id)
            .ok_or_else(|| PackageError::not_found(campaign_id, zone_id))?;

        let path = self
            .store
            .package_path(campaign_id, zone_id)
            .map_err(storage_error)?;
        let total_size = self
            .store
            .size(&path)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| PackageError::not_found(campaign_id, zone_id))?;

        if let Some(r) = range.filter(|r| r.start > r.end || r.end >= total_size) {
            warn!(campaign_id, zone_id, range = %r, total_size, "Range not satisfiable");
            return Err(PackageError::RangeNotSatisfiable {
                start: r.start,
                end: r.end,
                size: total_size,
            });
        }

        let served = range.or_else(|| ByteRange::full(total_size));
        let bytes = match served {
            Some(r) => self
                .store
                .read_range(&path, r.start, r.len())
                .await
                .map_err(storage_error)?,
            None => Vec::new(),
        };
        debug!(campaign_id, zone_id, len = bytes.len(), total_size, "Serving package bytes");

        Ok(PackageSlice {
            bytes,
            range: served,
            total_size,
            content_hash: package.content_hash.clone(),
            partial: range.is_some(),
        })
    }

    /// Parse `range_header` and serve it.
    pub async fn read_with_header(
        &self,
        campaign_id: &str,
        zone_id: &str,
        range_header: Option<&str>,
    ) -> Result<PackageSlice, PackageError> {
        let range = match range_header {
            Some(value) => {
                let path = self
                    .store
                    .package_path(campaign_id, zone_id)
                    .map_err(storage_error)?;
                let size = self
                    .store
                    .size(&path)
                    .await
                    .map_err(storage_error)?
                    .ok_or_else(|| PackageError::not_found(campaign_id, zone_id))?;
                Some(ByteRange::parse_header(value, size)?)
            }
            None => None,
        };
        self.read_range(campaign_id, zone_id, range).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() -> Result<(), PackageError> {
        assert_eq!(
            ByteRange::parse_header("bytes=0-99", 1000)?,
            ByteRange { start: 0, end: 99 }
        );
        assert_eq!(
            ByteRange::parse_header("bytes=900-", 1000)?,
            ByteRange { start: 900, end: 999 }
        );
        assert_eq!(
            ByteRange::parse_header("bytes=-100", 1000)?,
            ByteRange { start: 900, end: 999 }
        );
        assert_eq!(
            ByteRange::parse_header("bytes=-5000", 1000)?,
            ByteRange { start: 0, end: 999 }
        );
        assert_eq!(
            ByteRange::parse_header("bytes=10-5000", 1000)?,
            ByteRange { start: 10, end: 999 }
        );
        Ok(())
    }

    #[test]
    fn test_parse_rejects() {
        for bad in ["0-10", "bytes=", "bytes=-", "bytes=a-b", "bytes=5-1", "bytes=0-1,5-6"] {
            assert!(
                matches!(ByteRange::parse_header(bad, 100), Err(PackageError::InvalidRange(_))),
                "{bad}"
            );
        }
        assert!(matches!(
            ByteRange::parse_header("bytes=100-", 100),
            Err(PackageError::RangeNotSatisfiable { start: 100, .. })
        ));
        assert!(matches!(
            ByteRange::parse_header("bytes=-0", 100),
            Err(PackageError::RangeNotSatisfiable { .. })
        ));
        assert!(matches!(
            ByteRange::parse_header("bytes=0-", 0),
            Err(PackageError::RangeNotSatisfiable { .. })
        ));
    }

    #[test]
    fn test_parse_offsets_are_digits_only() {
        for bad in ["bytes=+5-+7", "bytes=+5-", "bytes=-+5", "bytes=5-+7", "bytes=0x1-2", "bytes=1 0-20"] {
            assert!(
                matches!(ByteRange::parse_header(bad, 100), Err(PackageError::InvalidRange(_))),
                "{bad}"
            );
        }
        assert!(matches!(
            ByteRange::parse_header("bytes= 5 - 7 ", 100),
            Ok(ByteRange { start: 5, end: 7 })
        ));
    }

    #[test]
    fn test_content_range_header() {
        let slice = PackageSlice {
            bytes: vec![0; 10],
            range: Some(ByteRange { start: 10, end: 19 }),
            total_size: 40,
            content_hash: String::new(),
            partial: true,
        };
        assert_eq!(slice.content_range_header().as_deref(), Some("bytes 10-19/40"));
        assert_eq!(ByteRange::full(0), None);
        assert_eq!(ByteRange::full(5).map(|r| r.len()), Some(5));
    }
}
