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

//! Defines the hierarchy of error types for the asset pipeline.
//!
//! Fetch errors split into transient (retried with backoff) and permanent;
//! decode errors are always fatal for their (asset, tier); [`LoadError`]
//! wraps the terminal outcome of one load. None of these ever cross the
//! facade boundary as failures the renderer must handle: they collapse into
//! a [`LoadFailureKind`] tag plus a placeholder payload.

use crate::asset::{AssetCategory, AssetId};
use std::fmt;

/// An error while fetching raw bytes from a byte source.
#[derive(Debug)]
pub enum FetchError {
    /// The source has no bytes at the given location.
    NotFound {
        /// Display form of the location that was asked for.
        location: String,
    },
    /// An I/O or network failure that may succeed on retry.
    Io {
        /// The underlying I/O or transport error text.
        details: String,
    },
    /// The source gave up waiting on a slow transfer.
    Timeout,
    /// The source does not understand this kind of location.
    Unsupported {
        /// Display form of the rejected location.
        location: String,
    },
}

impl FetchError {
    /// Whether a retry with backoff is worth attempting.
    ///
    /// Only infrastructure hiccups qualify; a missing or unsupported
    /// location will not appear by asking again.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Io { .. } | FetchError::Timeout)
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::NotFound { location } => {
                write!(f, "No bytes found at '{location}'")
            }
            FetchError::Io { details } => write!(f, "I/O failure while fetching: {details}"),
            FetchError::Timeout => write!(f, "Fetch timed out"),
            FetchError::Unsupported { location } => {
                write!(f, "Source cannot handle location '{location}'")
            }
        }
    }
}

impl std::error::Error for FetchError {}

/// An error while decoding fetched bytes into a payload.
///
/// Always fatal for the requesting (asset, tier): malformed bytes stay
/// malformed no matter how often they are decoded.
#[derive(Debug)]
pub enum DecodeError {
    /// The bytes are not a valid instance of the expected format.
    Malformed {
        /// The category whose decode lane rejected the bytes.
        category: AssetCategory,
        /// Detailed error text from the underlying decoder.
        details: String,
    },
    /// The bytes decoded but described no usable geometry.
    EmptyGeometry,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Malformed { category, details } => {
                write!(f, "Malformed {category} data: {details}")
            }
            DecodeError::EmptyGeometry => {
                write!(f, "Decoded geometry contains no triangles")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// The terminal failure of one (asset, tier) load.
#[derive(Debug)]
pub enum LoadError {
    /// The asset id is not present in the catalog.
    UnknownAsset {
        /// The id that was requested.
        id: AssetId,
    },
    /// No decode lane is registered for the asset's category.
    NoDecoder {
        /// The category missing a lane.
        category: AssetCategory,
    },
    /// Every fetch attempt failed; retries are exhausted.
    FetchExhausted {
        /// How many attempts were made, including the first.
        attempts: u32,
        /// The error from the final attempt.
        last: FetchError,
    },
    /// The fetched bytes could not be decoded.
    Decode(DecodeError),
}

impl LoadError {
    /// Collapses the error into its compact, copyable tag.
    pub fn kind(&self) -> LoadFailureKind {
        match self {
            LoadError::UnknownAsset { .. } => LoadFailureKind::UnknownAsset,
            LoadError::NoDecoder { .. } => LoadFailureKind::NoDecoder,
            LoadError::FetchExhausted { .. } => LoadFailureKind::FetchExhausted,
            LoadError::Decode(_) => LoadFailureKind::Decode,
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::UnknownAsset { id } => {
                write!(f, "Asset {id} is not in the catalog")
            }
            LoadError::NoDecoder { category } => {
                write!(f, "No decode lane registered for {category} assets")
            }
            LoadError::FetchExhausted { attempts, last } => {
                write!(f, "Fetch failed after {attempts} attempts: {last}")
            }
            LoadError::Decode(err) => write!(f, "Decode failed: {err}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::FetchExhausted { last, .. } => Some(last),
            LoadError::Decode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DecodeError> for LoadError {
    fn from(err: DecodeError) -> Self {
        LoadError::Decode(err)
    }
}

/// Compact, copyable tag naming why a load ended in fallback.
///
/// This is what failure memoization and warning events carry; the full
/// [`LoadError`] with its source chain only lives as long as the load task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFailureKind {
    /// The asset id is not in the catalog.
    UnknownAsset,
    /// No decode lane for the category.
    NoDecoder,
    /// Retries exhausted on fetch.
    FetchExhausted,
    /// Fetched bytes failed to decode.
    Decode,
}

impl fmt::Display for LoadFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadFailureKind::UnknownAsset => "unknown-asset",
            LoadFailureKind::NoDecoder => "no-decoder",
            LoadFailureKind::FetchExhausted => "fetch-exhausted",
            LoadFailureKind::Decode => "decode-failed",
        };
        write!(f, "{name}")
    }
}
