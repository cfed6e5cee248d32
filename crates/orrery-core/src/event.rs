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

//! Side-channel eventing for the pipeline.
//!
//! Failures never propagate to the renderer as blocking errors; anything a
//! UI layer should surface (fallbacks, budget overruns, quality changes)
//! travels as a [`PipelineEvent`] over an [`EventBus`] instead. Publishing
//! never blocks and tolerates an absent consumer.

use crate::asset::{AssetId, Tier};
use crate::error::LoadFailureKind;
use crate::quality::{QualityLevel, TransitionCause};

/// A non-blocking warning or notice emitted by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// A load ended fatally and the placeholder was served instead.
    ///
    /// Emitted exactly once per (asset, tier) failure; later requests for
    /// the same key are answered from the failure memo without a new event.
    LoadFallback {
        /// The asset whose load failed.
        id: AssetId,
        /// The tier that was being produced.
        tier: Tier,
        /// Why the load could not complete.
        kind: LoadFailureKind,
    },
    /// The cache exceeded its budget and eviction could not fix it.
    ///
    /// Happens only when the sweep finds nothing unpinned to remove.
    OverBudget {
        /// Bytes currently resident.
        usage_bytes: usize,
        /// The configured soft budget.
        budget_bytes: usize,
    },
    /// The process-wide quality level changed.
    QualityChanged {
        /// Level before the transition.
        from: QualityLevel,
        /// Level after the transition.
        to: QualityLevel,
        /// What drove the transition.
        cause: TransitionCause,
    },
}

/// Manages a generic, thread-safe event channel.
///
/// The bus is generic over the event type `T` so this crate stays decoupled
/// from whatever higher layers want to transport; the pipeline instantiates
/// it as `EventBus<PipelineEvent>`.
#[derive(Debug)]
pub struct EventBus<T: Clone + Send + Sync + 'static> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
}

impl<T: Clone + Send + Sync + 'static> EventBus<T> {
    /// Creates a new bus backed by an unbounded channel.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self { sender, receiver }
    }

    /// Sends an event, logging if the receiving side is gone.
    ///
    /// A disconnected receiver is an expected state (headless hosts drop
    /// the receiver), so this logs at debug and otherwise does nothing.
    pub fn publish(&self, event: T) {
        if self.sender.send(event).is_err() {
            log::debug!("Event dropped; receiver disconnected");
        }
    }

    /// Returns a clone of the sender end of the channel.
    ///
    /// Components that emit events hold one of these; cloning is cheap.
    pub fn sender(&self) -> flume::Sender<T> {
        self.sender.clone()
    }

    /// Returns a reference to the receiver end of the channel.
    ///
    /// Intended for the single owner of the bus to drain events.
    pub fn receiver(&self) -> &flume::Receiver<T> {
        &self.receiver
    }
}

impl<T: Clone + Send + Sync + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}
