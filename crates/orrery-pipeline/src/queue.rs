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

//! The prioritized, deduplicating loading queue.
//!
//! Every load in the pipeline funnels through one [`LoadingQueue`]: it
//! coalesces concurrent requests for the same (asset, tier), bounds how many
//! loads run at once, dispatches strictly by priority class, memoizes
//! terminal failures, and writes completed payloads into the cache before
//! waking the waiters.

use crate::placeholder::{PlaceholderRef, PlaceholderSet};
use ahash::AHashMap;
use async_trait::async_trait;
use orrery_cache::{AssetCache, CacheKey};
use orrery_core::asset::{AssetCategory, PayloadHandle};
use orrery_core::error::{LoadError, LoadFailureKind};
use orrery_core::event::PipelineEvent;
use orrery_core::telemetry::QueueReport;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

/// How urgently a load is needed.
///
/// Declared lowest first so the derived ordering ranks urgency: the queue
/// dispatches `Critical` before `Proximate` before `Prefetch`, first-come
/// first-served within a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Speculative warming, e.g. the assets of an upcoming lesson chapter.
    Prefetch,
    /// Near the camera but not on screen yet.
    Proximate,
    /// Needed for the current view.
    Critical,
}

impl Priority {
    fn class_index(self) -> usize {
        self as usize
    }
}

/// What a finished load produced, as handed back by the executor.
#[derive(Debug)]
pub struct CompletedLoad {
    /// The decoded payload.
    pub payload: PayloadHandle,
    /// Whether the payload was derived from a cached higher tier rather
    /// than fetched from the source.
    pub derived: bool,
}

/// Produces the payload for one cache key.
///
/// The queue decides *when* a load runs; the executor decides *how*. The
/// split keeps the queue testable with scripted executors and lets the
/// production executor consult the cache for tier derivation.
#[async_trait]
pub trait LoadExecutor: Send + Sync {
    /// Produces the payload for `key`, by derivation or a full load.
    async fn execute(&self, key: CacheKey) -> Result<CompletedLoad, LoadError>;
}

/// The final word a [`LoadTicket`] resolves to.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// The payload arrived and is resident in the cache.
    Loaded(PayloadHandle),
    /// The load failed for good; the placeholder stands in.
    FallbackServed {
        /// The category placeholder to render instead.
        placeholder: PlaceholderRef,
        /// Why the real payload could not be produced.
        kind: LoadFailureKind,
    },
    /// The load was abandoned before it produced anything.
    Cancelled,
}

struct Waiter {
    id: u64,
    sender: oneshot::Sender<LoadOutcome>,
}

#[derive(PartialEq)]
enum RequestPhase {
    Queued,
    InFlight,
}

struct LoadRequest {
    priority: Priority,
    category: AssetCategory,
    waiters: Vec<Waiter>,
    phase: RequestPhase,
}

#[derive(Default)]
struct QueueState {
    /// One FIFO per priority class, indexed by [`Priority::class_index`].
    classes: [VecDeque<CacheKey>; 3],
    requests: AHashMap<CacheKey, LoadRequest>,
    failures: AHashMap<CacheKey, LoadFailureKind>,
    next_waiter: u64,
    in_flight: usize,
    completed: u64,
    coalesced: u64,
    cancelled: u64,
    failed: u64,
}

impl QueueState {
    fn pop_next(&mut self) -> Option<CacheKey> {
        for class in self.classes.iter_mut().rev() {
            if let Some(key) = class.pop_front() {
                return Some(key);
            }
        }
        None
    }

    fn remove_queued(&mut self, key: &CacheKey, class: usize) {
        self.classes[class].retain(|queued| queued != key);
    }
}

/// The single admission point for asset loads.
///
/// Holds no payloads itself: completed loads go straight into the shared
/// [`AssetCache`], and waiters receive a handle to the cached payload. The
/// queue is constructed once per pipeline and shared behind an `Arc`.
pub struct LoadingQueue {
    weak: Weak<LoadingQueue>,
    state: Mutex<QueueState>,
    executor: Arc<dyn LoadExecutor>,
    cache: Arc<AssetCache>,
    placeholders: PlaceholderSet,
    events: flume::Sender<PipelineEvent>,
    max_in_flight: usize,
    runtime: tokio::runtime::Handle,
}

impl LoadingQueue {
    /// Creates a queue dispatching onto the given runtime.
    ///
    /// `max_in_flight` bounds concurrently running loads; further admitted
    /// requests wait in their priority class.
    pub fn new(
        executor: Arc<dyn LoadExecutor>,
        cache: Arc<AssetCache>,
        placeholders: PlaceholderSet,
        events: flume::Sender<PipelineEvent>,
        max_in_flight: usize,
        runtime: tokio::runtime::Handle,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            state: Mutex::new(QueueState::default()),
            executor,
            cache,
            placeholders,
            events,
            max_in_flight: max_in_flight.max(1),
            runtime,
        })
    }

    /// Admits a load request and returns a ticket for its outcome.
    ///
    /// Never blocks and never loads twice: a key already resident resolves
    /// immediately, a key with a memoized failure resolves immediately to
    /// its fallback, and a key already requested attaches this caller to
    /// the existing load, promoting its priority if the new request is more
    /// urgent.
    pub fn request(
        &self,
        key: CacheKey,
        category: AssetCategory,
        priority: Priority,
    ) -> LoadTicket {
        let (sender, receiver) = oneshot::channel();
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        let waiter_id = state.next_waiter;
        state.next_waiter += 1;

        let ticket = LoadTicket {
            receiver,
            received: None,
            queue: self.weak.clone(),
            key,
            waiter_id,
        };

        if let Some(&kind) = state.failures.get(&key) {
            log::debug!("Serving memoized fallback for {key}");
            let placeholder = self.placeholders.for_category(category).clone();
            let _ = sender.send(LoadOutcome::FallbackServed { placeholder, kind });
            return ticket;
        }

        // touch: the facade already sampled hit/miss for this request.
        if let Some(payload) = self.cache.touch(&key) {
            let _ = sender.send(LoadOutcome::Loaded(payload));
            return ticket;
        }

        match state.requests.get_mut(&key) {
            Some(request) => {
                request.waiters.push(Waiter {
                    id: waiter_id,
                    sender,
                });
                state.coalesced += 1;
                if request.phase == RequestPhase::Queued && priority > request.priority {
                    let old_class = request.priority.class_index();
                    request.priority = priority;
                    state.remove_queued(&key, old_class);
                    state.classes[priority.class_index()].push_back(key);
                    log::debug!("Promoted queued load {key} to {priority:?}");
                }
            }
            None => {
                state.requests.insert(
                    key,
                    LoadRequest {
                        priority,
                        category,
                        waiters: vec![Waiter {
                            id: waiter_id,
                            sender,
                        }],
                        phase: RequestPhase::Queued,
                    },
                );
                state.classes[priority.class_index()].push_back(key);
            }
        }

        self.pump(state);
        ticket
    }

    /// The memoized terminal failure for a key, if one is recorded.
    pub fn failure_for(&self, key: &CacheKey) -> Option<LoadFailureKind> {
        self.state.lock().unwrap().failures.get(key).copied()
    }

    /// Forgets all memoized failures, allowing fresh load attempts.
    ///
    /// Paired with clearing the cache: content updates are the one reason a
    /// previously fatal load might start working.
    pub fn clear_failures(&self) {
        let mut state = self.state.lock().unwrap();
        let forgotten = state.failures.len();
        state.failures.clear();
        if forgotten > 0 {
            log::info!("Forgot {forgotten} memoized load failures");
        }
    }

    /// The placeholder standing in for a category.
    pub fn placeholder_for(&self, category: AssetCategory) -> PlaceholderRef {
        self.placeholders.for_category(category).clone()
    }

    /// A snapshot of queue activity.
    pub fn report(&self) -> QueueReport {
        let state = self.state.lock().unwrap();
        QueueReport {
            pending_count: state.classes.iter().map(VecDeque::len).sum(),
            in_flight_count: state.in_flight,
            completed_count: state.completed,
            coalesced_count: state.coalesced,
            cancelled_count: state.cancelled,
            failed_count: state.failed,
        }
    }

    /// Starts queued loads while the in-flight window has room.
    fn pump(&self, state: &mut QueueState) {
        while state.in_flight < self.max_in_flight {
            let Some(key) = state.pop_next() else {
                break;
            };
            let Some(request) = state.requests.get_mut(&key) else {
                continue;
            };
            let Some(queue) = self.weak.upgrade() else {
                break;
            };
            request.phase = RequestPhase::InFlight;
            state.in_flight += 1;
            self.runtime.spawn(async move {
                let result = queue.executor.execute(key).await;
                queue.complete(key, result);
            });
        }
    }

    /// Finishes one load: caches, memoizes, notifies, then refills the
    /// in-flight window.
    fn complete(&self, key: CacheKey, result: Result<CompletedLoad, LoadError>) {
        let mut state = self.state.lock().unwrap();
        state.in_flight = state.in_flight.saturating_sub(1);
        let Some(request) = state.requests.remove(&key) else {
            self.pump(&mut state);
            return;
        };

        match result {
            Ok(done) => {
                state.completed += 1;
                let size = done.payload.size_bytes();
                let outcome = self.cache.put(key, done.payload.clone(), size, done.derived);
                if outcome.over_budget {
                    let report = self.cache.status();
                    self.publish(PipelineEvent::OverBudget {
                        usage_bytes: report.memory_usage_bytes,
                        budget_bytes: report.memory_budget_bytes,
                    });
                }
                for waiter in request.waiters {
                    let _ = waiter.sender.send(LoadOutcome::Loaded(done.payload.clone()));
                }
            }
            Err(err) => {
                state.failed += 1;
                let kind = err.kind();
                state.failures.insert(key, kind);
                log::warn!("Load of {key} failed for good: {err}");
                self.publish(PipelineEvent::LoadFallback {
                    id: key.id,
                    tier: key.tier,
                    kind,
                });
                let placeholder = self.placeholders.for_category(request.category).clone();
                for waiter in request.waiters {
                    let _ = waiter.sender.send(LoadOutcome::FallbackServed {
                        placeholder: placeholder.clone(),
                        kind,
                    });
                }
            }
        }

        self.pump(&mut state);
    }

    /// Detaches one waiter; abandons the load when it was still queued and
    /// no other waiter remains.
    fn cancel_waiter(&self, key: CacheKey, waiter_id: u64) -> bool {
        let mut state = self.state.lock().unwrap();
        let Some(request) = state.requests.get_mut(&key) else {
            return false;
        };
        request.waiters.retain(|waiter| waiter.id != waiter_id);
        if request.waiters.is_empty() && request.phase == RequestPhase::Queued {
            let class = request.priority.class_index();
            state.requests.remove(&key);
            state.remove_queued(&key, class);
            state.cancelled += 1;
            log::debug!("Abandoned queued load {key}, no waiters left");
            return true;
        }
        false
    }

    fn publish(&self, event: PipelineEvent) {
        if self.events.send(event).is_err() {
            log::debug!("Pipeline event dropped, no listeners attached");
        }
    }
}

/// A caller's handle on one admitted load.
///
/// Await it with [`LoadTicket::wait`], poll it with
/// [`LoadTicket::try_outcome`], or abandon interest with
/// [`LoadTicket::cancel`]. Dropping a ticket without cancelling leaves the
/// load running, which is exactly what fire-and-forget prefetching wants.
#[derive(Debug)]
pub struct LoadTicket {
    receiver: oneshot::Receiver<LoadOutcome>,
    received: Option<LoadOutcome>,
    queue: Weak<LoadingQueue>,
    key: CacheKey,
    waiter_id: u64,
}

impl LoadTicket {
    /// The key this ticket is waiting on.
    pub fn key(&self) -> CacheKey {
        self.key
    }

    /// Waits for the load to resolve.
    pub async fn wait(self) -> LoadOutcome {
        if let Some(outcome) = self.received {
            return outcome;
        }
        match self.receiver.await {
            Ok(outcome) => outcome,
            Err(_) => LoadOutcome::Cancelled,
        }
    }

    /// The outcome, if the load has already resolved. Never blocks.
    pub fn try_outcome(&mut self) -> Option<LoadOutcome> {
        if self.received.is_none() {
            match self.receiver.try_recv() {
                Ok(outcome) => self.received = Some(outcome),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Closed) => self.received = Some(LoadOutcome::Cancelled),
            }
        }
        self.received.clone()
    }

    /// Withdraws this caller from the load.
    ///
    /// Returns `true` when the load itself was abandoned, which happens
    /// only while it is still queued and this was its last waiter. A load
    /// already in flight always completes and caches its payload.
    pub fn cancel(self) -> bool {
        match self.queue.upgrade() {
            Some(queue) => queue.cancel_waiter(self.key, self.waiter_id),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_core::asset::{AssetId, AssetPayload, TexturePayload, Tier};
    use orrery_core::error::FetchError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;

    /// Executes only when the gate has permits; records execution order.
    struct GatedExecutor {
        gate: Semaphore,
        order: Mutex<Vec<CacheKey>>,
        calls: AtomicU32,
        fail: bool,
    }

    impl GatedExecutor {
        fn new(initial_permits: usize, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                gate: Semaphore::new(initial_permits),
                order: Mutex::new(Vec::new()),
                calls: AtomicU32::new(0),
                fail,
            })
        }

        fn release(&self, permits: usize) {
            self.gate.add_permits(permits);
        }

        fn order(&self) -> Vec<CacheKey> {
            self.order.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LoadExecutor for GatedExecutor {
        async fn execute(&self, key: CacheKey) -> Result<CompletedLoad, LoadError> {
            let permit = self.gate.acquire().await.expect("gate never closes");
            permit.forget();
            self.order.lock().unwrap().push(key);
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(LoadError::FetchExhausted {
                    attempts: 3,
                    last: FetchError::Timeout,
                })
            } else {
                Ok(CompletedLoad {
                    payload: PayloadHandle::new(AssetPayload::Texture(TexturePayload {
                        width: 2,
                        height: 2,
                        pixels: vec![0u8; 16],
                    })),
                    derived: false,
                })
            }
        }
    }

    fn key(name: &str) -> CacheKey {
        CacheKey::new(AssetId::from_name(name), Tier::Medium)
    }

    fn queue_with(
        executor: Arc<GatedExecutor>,
        max_in_flight: usize,
    ) -> (Arc<LoadingQueue>, Arc<AssetCache>, flume::Receiver<PipelineEvent>) {
        let cache = Arc::new(AssetCache::new(1_000_000));
        let (tx, rx) = flume::unbounded();
        let queue = LoadingQueue::new(
            executor,
            Arc::clone(&cache),
            PlaceholderSet::new(),
            tx,
            max_in_flight,
            tokio::runtime::Handle::current(),
        );
        (queue, cache, rx)
    }

    async fn settle(cache: &AssetCache, k: &CacheKey) {
        for _ in 0..100 {
            if cache.contains(k) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("load of {k} never completed");
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_load() {
        let executor = GatedExecutor::new(0, false);
        let (queue, cache, _rx) = queue_with(executor.clone(), 4);
        let k = key("shared");

        let first = queue.request(k, AssetCategory::Texture, Priority::Critical);
        let second = queue.request(k, AssetCategory::Texture, Priority::Critical);
        executor.release(2);

        assert!(matches!(first.wait().await, LoadOutcome::Loaded(_)));
        assert!(matches!(second.wait().await, LoadOutcome::Loaded(_)));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
        assert!(cache.contains(&k));
        let report = queue.report();
        assert_eq!(report.coalesced_count, 1);
        assert_eq!(report.completed_count, 1);
    }

    #[tokio::test]
    async fn the_in_flight_window_is_bounded() {
        let executor = GatedExecutor::new(0, false);
        let (queue, _cache, _rx) = queue_with(executor.clone(), 1);

        let first = queue.request(key("first"), AssetCategory::Texture, Priority::Critical);
        let second = queue.request(key("second"), AssetCategory::Texture, Priority::Critical);

        let report = queue.report();
        assert_eq!(report.in_flight_count, 1);
        assert_eq!(report.pending_count, 1);

        executor.release(2);
        assert!(matches!(first.wait().await, LoadOutcome::Loaded(_)));
        assert!(matches!(second.wait().await, LoadOutcome::Loaded(_)));
        assert_eq!(queue.report().in_flight_count, 0);
    }

    #[tokio::test]
    async fn dispatch_order_follows_priority_classes() {
        let executor = GatedExecutor::new(0, false);
        let (queue, _cache, _rx) = queue_with(executor.clone(), 1);
        let blocker = key("blocker");
        let background = key("background");
        let urgent = key("urgent");

        // The blocker occupies the single in-flight slot, so the other two
        // sit queued and must come out most-urgent first.
        let t1 = queue.request(blocker, AssetCategory::Texture, Priority::Critical);
        let t2 = queue.request(background, AssetCategory::Texture, Priority::Prefetch);
        let t3 = queue.request(urgent, AssetCategory::Texture, Priority::Critical);

        executor.release(3);
        t1.wait().await;
        t3.wait().await;
        t2.wait().await;

        assert_eq!(executor.order(), vec![blocker, urgent, background]);
    }

    #[tokio::test]
    async fn a_duplicate_request_promotes_the_queued_priority() {
        let executor = GatedExecutor::new(0, false);
        let (queue, _cache, _rx) = queue_with(executor.clone(), 1);
        let blocker = key("blocker");
        let promoted = key("promoted");
        let middle = key("middle");

        let t1 = queue.request(blocker, AssetCategory::Texture, Priority::Critical);
        let t2 = queue.request(promoted, AssetCategory::Texture, Priority::Prefetch);
        let t3 = queue.request(middle, AssetCategory::Texture, Priority::Proximate);
        // Re-requesting at Critical jumps `promoted` past `middle`.
        let t4 = queue.request(promoted, AssetCategory::Texture, Priority::Critical);

        executor.release(3);
        for ticket in [t1, t2, t3, t4] {
            ticket.wait().await;
        }

        assert_eq!(executor.order(), vec![blocker, promoted, middle]);
    }

    #[tokio::test]
    async fn failures_are_memoized_and_warned_once() {
        let executor = GatedExecutor::new(10, true);
        let (queue, _cache, rx) = queue_with(executor.clone(), 4);
        let k = key("doomed");

        let outcome = queue
            .request(k, AssetCategory::Mesh, Priority::Critical)
            .wait()
            .await;
        match outcome {
            LoadOutcome::FallbackServed { placeholder, kind } => {
                assert_eq!(kind, LoadFailureKind::FetchExhausted);
                assert_eq!(placeholder.category, AssetCategory::Mesh);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        // The second request never reaches the executor.
        let outcome = queue
            .request(k, AssetCategory::Mesh, Priority::Critical)
            .wait()
            .await;
        assert!(matches!(outcome, LoadOutcome::FallbackServed { .. }));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(queue.failure_for(&k), Some(LoadFailureKind::FetchExhausted));

        let fallbacks = rx
            .try_iter()
            .filter(|event| matches!(event, PipelineEvent::LoadFallback { .. }))
            .count();
        assert_eq!(fallbacks, 1);

        queue.clear_failures();
        assert_eq!(queue.failure_for(&k), None);
    }

    #[tokio::test]
    async fn an_already_cached_key_resolves_immediately() {
        let executor = GatedExecutor::new(0, false);
        let (queue, cache, _rx) = queue_with(executor.clone(), 4);
        let k = key("warm");
        cache.put(
            k,
            PayloadHandle::new(AssetPayload::Texture(TexturePayload {
                width: 1,
                height: 1,
                pixels: vec![0u8; 4],
            })),
            4,
            false,
        );

        let mut ticket = queue.request(k, AssetCategory::Texture, Priority::Critical);
        assert!(matches!(ticket.try_outcome(), Some(LoadOutcome::Loaded(_))));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelling_the_last_queued_waiter_abandons_the_load() {
        let executor = GatedExecutor::new(0, false);
        let (queue, _cache, _rx) = queue_with(executor.clone(), 1);
        let blocker = key("blocker");
        let doomed = key("doomed");

        let t1 = queue.request(blocker, AssetCategory::Texture, Priority::Critical);
        let t2 = queue.request(doomed, AssetCategory::Texture, Priority::Critical);

        assert_eq!(t2.key(), doomed);
        assert!(t2.cancel());
        assert_eq!(queue.report().cancelled_count, 1);

        executor.release(2);
        t1.wait().await;
        assert_eq!(executor.order(), vec![blocker]);
    }

    #[tokio::test]
    async fn cancelling_one_of_several_waiters_keeps_the_load() {
        let executor = GatedExecutor::new(0, false);
        let (queue, _cache, _rx) = queue_with(executor.clone(), 1);
        let k = key("shared");

        let kept = queue.request(k, AssetCategory::Texture, Priority::Critical);
        let dropped = queue.request(k, AssetCategory::Texture, Priority::Critical);

        assert!(!dropped.cancel());
        executor.release(1);
        assert!(matches!(kept.wait().await, LoadOutcome::Loaded(_)));
        assert_eq!(queue.report().cancelled_count, 0);
    }

    #[tokio::test]
    async fn an_in_flight_load_survives_cancellation_and_caches() {
        let executor = GatedExecutor::new(0, false);
        let (queue, cache, _rx) = queue_with(executor.clone(), 1);
        let k = key("committed");

        let ticket = queue.request(k, AssetCategory::Texture, Priority::Critical);
        // Dispatched immediately, so cancel cannot abort it.
        assert!(!ticket.cancel());

        executor.release(1);
        settle(&cache, &k).await;
        assert_eq!(queue.report().completed_count, 1);
    }
}
