// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The byte source backed by the on-disk content bundle.

use async_trait::async_trait;
use orrery_core::asset::SourceLocation;
use orrery_core::error::FetchError;
use orrery_core::io::ByteSource;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Reads raw asset bytes from the content bundle directory on disk.
///
/// Handles [`SourceLocation::Bundle`] locations only; remote locations need
/// a networked source and are rejected as unsupported. Bundle paths must
/// stay inside the bundle root, so absolute paths and `..` components are
/// rejected before any I/O happens.
pub struct BundleByteSource {
    root: PathBuf,
}

impl BundleByteSource {
    /// Creates a source rooted at the given bundle directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        log::debug!("Bundle byte source rooted at {}", root.display());
        Self { root }
    }

    /// The bundle root this source reads from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn escapes_root(path: &Path) -> bool {
        path.is_absolute()
            || path
                .components()
                .any(|component| matches!(component, Component::ParentDir))
    }
}

#[async_trait]
impl ByteSource for BundleByteSource {
    async fn fetch_bytes(&self, location: &SourceLocation) -> Result<Vec<u8>, FetchError> {
        let relative = match location {
            SourceLocation::Bundle(path) => path,
            SourceLocation::Remote(_) => {
                return Err(FetchError::Unsupported {
                    location: location.to_string(),
                })
            }
        };

        if Self::escapes_root(relative) {
            log::warn!("Rejected bundle path escaping the root: {location}");
            return Err(FetchError::Unsupported {
                location: location.to_string(),
            });
        }

        let full_path = self.root.join(relative);
        match tokio::fs::read(&full_path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(FetchError::NotFound {
                location: location.to_string(),
            }),
            Err(err) if err.kind() == ErrorKind::TimedOut => Err(FetchError::Timeout),
            Err(err) => Err(FetchError::Io {
                details: err.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle_with_file(name: &str, bytes: &[u8]) -> (tempfile::TempDir, BundleByteSource) {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join(name), bytes).expect("write fixture");
        let source = BundleByteSource::new(dir.path());
        (dir, source)
    }

    #[tokio::test]
    async fn reads_a_bundled_file() {
        let (_dir, source) = bundle_with_file("planet.png", b"pixels");
        let bytes = source
            .fetch_bytes(&SourceLocation::Bundle(PathBuf::from("planet.png")))
            .await
            .expect("file exists");
        assert_eq!(bytes, b"pixels");
    }

    #[tokio::test]
    async fn missing_files_are_not_found_not_io() {
        let (_dir, source) = bundle_with_file("present.png", b"x");
        let err = source
            .fetch_bytes(&SourceLocation::Bundle(PathBuf::from("absent.png")))
            .await
            .expect_err("file is missing");
        assert!(matches!(err, FetchError::NotFound { .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn parent_components_are_rejected() {
        let (_dir, source) = bundle_with_file("inside.png", b"x");
        let err = source
            .fetch_bytes(&SourceLocation::Bundle(PathBuf::from("../outside.png")))
            .await
            .expect_err("path escapes the root");
        assert!(matches!(err, FetchError::Unsupported { .. }));
    }

    #[tokio::test]
    async fn remote_locations_are_unsupported() {
        let (_dir, source) = bundle_with_file("inside.png", b"x");
        let err = source
            .fetch_bytes(&SourceLocation::Remote("https://example/planet.png".into()))
            .await
            .expect_err("bundle source has no network");
        assert!(matches!(err, FetchError::Unsupported { .. }));
    }
}
