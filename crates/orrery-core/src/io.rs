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

//! The byte-fetching contract between the pipeline and its I/O backend.

use crate::asset::SourceLocation;
use crate::error::FetchError;
use async_trait::async_trait;

/// A provider of raw asset bytes.
///
/// This trait abstracts where bytes physically come from: a content bundle
/// on disk, a remote content server, or a test stub. Fetching may involve
/// slow I/O, so the method is asynchronous; it runs inside the queue's
/// bounded task pool, never on the render path.
///
/// Implementations classify their failures: [`FetchError::is_transient`]
/// decides whether the loader retries with backoff or fails the load
/// immediately.
#[async_trait]
pub trait ByteSource: Send + Sync {
    /// Fetches the complete raw bytes behind a source location.
    ///
    /// # Arguments
    /// * `location` - Where the bytes live, from the asset's descriptor.
    ///
    /// # Returns
    /// The full byte payload, or a [`FetchError`] describing why the fetch
    /// did not produce bytes.
    async fn fetch_bytes(&self, location: &SourceLocation) -> Result<Vec<u8>, FetchError>;
}
