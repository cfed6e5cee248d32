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

//! The fetch-then-decode loader with transient-failure retry.

use crate::decode::DecodeRegistry;
use orrery_core::asset::{AssetDescriptor, AssetPayload, Tier};
use orrery_core::config::RetryConfig;
use orrery_core::error::LoadError;
use orrery_core::io::ByteSource;
use std::sync::Arc;

/// Loads one (asset, tier) payload end to end: fetch, retry, decode.
///
/// Transient fetch failures retry with exponential backoff up to the
/// configured attempt cap; permanent fetch failures and decode failures end
/// the load immediately. Nothing is fetched until [`LazyAssetLoader::load`]
/// is called, and nothing is cached here: caching is the queue's business.
pub struct LazyAssetLoader {
    source: Arc<dyn ByteSource>,
    registry: DecodeRegistry,
    retry: RetryConfig,
}

impl LazyAssetLoader {
    /// Creates a loader over a byte source and a set of decode lanes.
    pub fn new(source: Arc<dyn ByteSource>, registry: DecodeRegistry, retry: RetryConfig) -> Self {
        Self {
            source,
            registry,
            retry,
        }
    }

    /// Produces the decoded payload for one asset at one tier.
    ///
    /// # Errors
    /// [`LoadError::NoDecoder`] when no lane covers the asset's category,
    /// [`LoadError::FetchExhausted`] when fetching failed for good, and
    /// [`LoadError::Decode`] when the fetched bytes were unusable.
    pub async fn load(
        &self,
        descriptor: &AssetDescriptor,
        tier: Tier,
    ) -> Result<AssetPayload, LoadError> {
        let lane = self
            .registry
            .lane_for(descriptor.category)
            .ok_or(LoadError::NoDecoder {
                category: descriptor.category,
            })?;

        let mut attempt = 0u32;
        let bytes = loop {
            attempt += 1;
            match self.source.fetch_bytes(&descriptor.source).await {
                Ok(bytes) => break bytes,
                Err(err) => {
                    if err.is_transient() && attempt < self.retry.max_attempts {
                        let delay = self.retry.backoff_delay(attempt);
                        log::debug!(
                            "Fetch attempt {attempt} for {} failed ({err}), retrying in {delay:?}",
                            descriptor.id
                        );
                        tokio::time::sleep(delay).await;
                    } else {
                        return Err(LoadError::FetchExhausted {
                            attempts: attempt,
                            last: err,
                        });
                    }
                }
            }
        };

        let payload = lane.decode(&bytes, tier)?;
        Ok(payload)
    }
}
