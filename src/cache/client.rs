//! The query client: shared cache, request de-duplication and tag-driven
//! invalidation.
//!
//! All cache bookkeeping happens under one `std::sync::Mutex` that is never
//! held across an `.await`. Network calls run on spawned tasks and report
//! back through [`ClientInner::complete`], which applies the staleness guard:
//! each issued request carries a sequence number and a response only lands
//! if no newer response has already been applied to the entry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use metrics::{counter, histogram};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::transport::{Transport, open_envelope};

use super::config::{CacheConfig, RefetchOnMount};
use super::endpoint::{Api, EndpointDefinition, EndpointKind};
use super::keys::{CacheKey, Tag};
use super::lock::mutex_lock;
use super::registry::TagRegistry;
use super::store::{CacheEntry, QueryState, QueryStatus};
use super::subscription::{MutationHandle, QuerySubscription};

const SOURCE: &str = "cache::client";

const METRIC_CACHE_HIT: &str = "edudash_cache_hit_total";
const METRIC_CACHE_MISS: &str = "edudash_cache_miss_total";
const METRIC_CACHE_INVALIDATED: &str = "edudash_cache_invalidated_total";
const METRIC_RESPONSE_DISCARDED: &str = "edudash_response_discarded_total";
const METRIC_REQUEST_DURATION_MS: &str = "edudash_request_duration_ms";

/// Per-subscription options.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Do not subscribe or fetch; the subscription stays `Uninitialized`.
    pub skip: bool,
    /// Refetch on this interval while subscribed.
    pub polling_interval: Option<Duration>,
    /// Overrides [`CacheConfig::refetch_on_mount`] for this subscription.
    pub refetch_on_mount: Option<RefetchOnMount>,
}

impl QueryOptions {
    pub fn skipped() -> Self {
        Self {
            skip: true,
            ..Self::default()
        }
    }

    pub fn polling(interval: Duration) -> Self {
        Self {
            polling_interval: Some(interval),
            ..Self::default()
        }
    }

    pub fn with_refetch_on_mount(mut self, policy: RefetchOnMount) -> Self {
        self.refetch_on_mount = Some(policy);
        self
    }
}

/// Counters exposed for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub subscribed: usize,
    pub in_flight: usize,
    pub discarded_responses: u64,
    pub registered_tags: usize,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    tags: TagRegistry,
    next_seq: u64,
    discarded: u64,
}

pub(crate) struct ClientInner {
    api: Api,
    transport: Arc<dyn Transport>,
    config: CacheConfig,
    state: Mutex<CacheState>,
}

/// Handle to the shared cache. Cheap to clone; clones share the cache.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<ClientInner>,
}

impl QueryClient {
    pub fn new(api: Api, transport: Arc<dyn Transport>, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                api,
                transport,
                config,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    pub fn api(&self) -> &Api {
        &self.inner.api
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Subscribe to the query `name` with `args`.
    ///
    /// Starts a request unless a usable entry exists or one is already in
    /// flight. Must be called from within a tokio runtime. Only dispatch
    /// problems (unknown endpoint, wrong kind, bad arguments) are returned
    /// as `Err`; request failures show up in the subscription's state.
    pub fn use_query<A: Serialize + ?Sized>(
        &self,
        name: &str,
        args: &A,
        options: QueryOptions,
    ) -> Result<QuerySubscription, ApiError> {
        let definition = self.inner.api.resolve(name, EndpointKind::Query)?;
        let args = serde_json::to_value(args).map_err(|err| ApiError::InvalidArgs {
            endpoint: name.to_string(),
            message: err.to_string(),
        })?;
        definition.build_request(&args)?;

        if options.skip {
            debug!(endpoint = name, "Query skipped");
            return Ok(QuerySubscription::detached());
        }

        let key = CacheKey::new(name, &args);
        let policy = options
            .refetch_on_mount
            .unwrap_or(self.inner.config.refetch_on_mount);

        let receiver = {
            let mut state = mutex_lock(&self.inner.state, SOURCE, "use_query");
            let state = &mut *state;
            let entry = state
                .entries
                .entry(key.clone())
                .or_insert_with(|| CacheEntry::new(Arc::clone(&definition), args.clone()));
            entry.subscribers += 1;
            entry.unused_since = None;
            entry.gc_generation += 1;

            let snapshot = entry.snapshot();
            let pending = entry.has_pending();
            let fetch = !pending && needs_fetch(&snapshot, policy);
            let receiver = entry.state.subscribe();

            if fetch {
                counter!(METRIC_CACHE_MISS, "endpoint" => name.to_string()).increment(1);
                self.inner.start_fetch(state, &key, "mount");
            } else {
                let source = if pending { "in_flight" } else { "cached" };
                counter!(METRIC_CACHE_HIT, "endpoint" => name.to_string(), "source" => source)
                    .increment(1);
                debug!(key = %key, status = ?snapshot.status, source, "Query served from cache");
            }
            receiver
        };

        let poller = options
            .polling_interval
            .filter(|interval| !interval.is_zero())
            .map(|interval| spawn_poller(Arc::downgrade(&self.inner), key.clone(), interval));

        Ok(QuerySubscription::attached(
            Arc::clone(&self.inner),
            key,
            receiver,
            poller,
        ))
    }

    /// Handle for triggering the mutation `name`.
    pub fn use_mutation(&self, name: &str) -> Result<MutationHandle, ApiError> {
        let definition = self.inner.api.resolve(name, EndpointKind::Mutation)?;
        Ok(MutationHandle::new(Arc::clone(&self.inner), definition))
    }

    /// Subscribe, wait for the entry to settle and return its data.
    pub async fn query<A: Serialize + ?Sized>(
        &self,
        name: &str,
        args: &A,
    ) -> Result<Arc<Value>, ApiError> {
        let mut subscription = self.use_query(name, args, QueryOptions::default())?;
        subscription.settled().await.into_result()
    }

    /// [`query`](Self::query), decoding the data into `T`.
    pub async fn query_as<T, A>(&self, name: &str, args: &A) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        A: Serialize + ?Sized,
    {
        let data = self.query(name, args).await?;
        T::deserialize(&*data).map_err(|err| ApiError::Decode {
            endpoint: name.to_string(),
            message: err.to_string(),
        })
    }

    /// Trigger the mutation `name` once and return its transformed result.
    pub async fn mutate<A: Serialize + ?Sized>(
        &self,
        name: &str,
        args: &A,
    ) -> Result<Value, ApiError> {
        self.use_mutation(name)?.trigger(args).await
    }

    pub async fn mutate_as<T, A>(&self, name: &str, args: &A) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        A: Serialize + ?Sized,
    {
        self.use_mutation(name)?.trigger_as(args).await
    }

    /// Invalidate every entry providing a tag matched by `tags`: subscribed
    /// entries refetch, the rest are dropped. Returns the number of entries
    /// affected.
    pub fn invalidate_tags(&self, tags: &[Tag]) -> usize {
        self.inner.invalidate(tags)
    }

    /// Drop unsubscribed entries whose retention period has elapsed.
    pub fn collect_garbage(&self) -> usize {
        let keep_for = self.inner.config.keep_unused_for;
        let mut state = mutex_lock(&self.inner.state, SOURCE, "collect_garbage");
        let expired: Vec<CacheKey> = state
            .entries
            .iter()
            .filter(|(_, entry)| {
                entry.subscribers == 0
                    && entry
                        .unused_since
                        .is_some_and(|since| since.elapsed() >= keep_for)
            })
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            state.remove(key);
        }
        if !expired.is_empty() {
            info!(removed = expired.len(), "Collected unused cache entries");
        }
        expired.len()
    }

    /// Current state of an entry without subscribing to it.
    pub fn snapshot<A: Serialize + ?Sized>(&self, name: &str, args: &A) -> Option<QueryState> {
        let args = serde_json::to_value(args).ok()?;
        let key = CacheKey::new(name, &args);
        let state = mutex_lock(&self.inner.state, SOURCE, "snapshot");
        state.entries.get(&key).map(CacheEntry::snapshot)
    }

    /// Drop all cached data. Unsubscribed entries are removed, subscribed
    /// ones start over from an empty state and refetch.
    pub fn reset(&self) {
        let mut state = mutex_lock(&self.inner.state, SOURCE, "reset");
        let state = &mut *state;
        state.tags.clear();

        let keys: Vec<CacheKey> = state.entries.keys().cloned().collect();
        let mut refetched = 0_usize;
        for key in keys {
            let subscribed = state
                .entries
                .get(&key)
                .is_some_and(|entry| entry.subscribers > 0);
            if !subscribed {
                state.remove(&key);
                continue;
            }
            if let Some(entry) = state.entries.get_mut(&key) {
                entry.abort_all();
                entry.state.send_replace(QueryState::default());
            }
            self.inner.start_fetch(state, &key, "reset");
            refetched += 1;
        }
        info!(refetched, "Cache reset");
    }

    pub fn stats(&self) -> CacheStats {
        let state = mutex_lock(&self.inner.state, SOURCE, "stats");
        CacheStats {
            entries: state.entries.len(),
            subscribed: state
                .entries
                .values()
                .filter(|entry| entry.subscribers > 0)
                .count(),
            in_flight: state.entries.values().map(|entry| entry.in_flight.len()).sum(),
            discarded_responses: state.discarded,
            registered_tags: state.tags.tag_count(),
        }
    }
}

impl CacheState {
    fn remove(&mut self, key: &CacheKey) {
        if let Some(mut entry) = self.entries.remove(key) {
            entry.abort_all();
        }
        self.tags.unregister(key);
    }
}

fn needs_fetch(state: &QueryState, policy: RefetchOnMount) -> bool {
    match state.status {
        QueryStatus::Uninitialized | QueryStatus::Loading | QueryStatus::Error => true,
        QueryStatus::Success => match policy {
            RefetchOnMount::Never => false,
            RefetchOnMount::Always => true,
            RefetchOnMount::IfOlderThan(age) => state
                .fulfilled_at
                .is_none_or(|fulfilled| fulfilled.elapsed() >= age),
        },
    }
}

impl ClientInner {
    /// Issue a new request for `key`, superseding any request in flight.
    fn start_fetch(self: &Arc<Self>, state: &mut CacheState, key: &CacheKey, reason: &'static str) {
        let Some(entry) = state.entries.get_mut(key) else {
            return;
        };

        state.next_seq += 1;
        let seq = state.next_seq;

        // Entries that have not resolved yet still need to be reachable by
        // invalidation, so register what the tags resolve to without a result.
        if state.tags.tags_for_key(key).is_empty() {
            let provisional = entry.definition.tags().resolve(&entry.args, None);
            state.tags.register(key, provisional);
        }

        entry.state.send_modify(|current| {
            current.status = QueryStatus::Loading;
            current.error = None;
            current.is_fetching = true;
        });

        let client = Arc::clone(self);
        let definition = Arc::clone(&entry.definition);
        let args = entry.args.clone();
        let task_key = key.clone();
        let task = tokio::spawn(async move {
            let result = client.execute(&definition, &args).await;
            client.complete(&task_key, seq, result);
        });
        entry.in_flight.insert(seq, task.abort_handle());

        debug!(key = %key, seq, reason, "Query request issued");
    }

    /// Build, send and transform one request.
    pub(crate) async fn execute(
        &self,
        definition: &EndpointDefinition,
        args: &Value,
    ) -> Result<Value, ApiError> {
        let request = definition.build_request(args)?;
        let started_at = Instant::now();
        let response = self.transport.send(&request).await;

        let outcome = match &response {
            Ok(_) => "ok",
            Err(_) => "error",
        };
        histogram!(
            METRIC_REQUEST_DURATION_MS,
            "endpoint" => definition.name().to_string(),
            "outcome" => outcome
        )
        .record(started_at.elapsed().as_secs_f64() * 1000.0);

        let payload = open_envelope(response?).map_err(|err| match err {
            ApiError::Decode { message, .. } => ApiError::Decode {
                endpoint: definition.name().to_string(),
                message,
            },
            other => other,
        })?;
        definition.transform(args, payload)
    }

    /// Apply the outcome of request `seq` to `key`, unless it is stale.
    fn complete(&self, key: &CacheKey, seq: u64, result: Result<Value, ApiError>) {
        let mut state = mutex_lock(&self.state, SOURCE, "complete");
        let state = &mut *state;

        let Some(entry) = state.entries.get_mut(key) else {
            discard(&mut state.discarded, key, seq, "entry_removed");
            return;
        };
        // Applying `seq` drops every older request from `in_flight`, so a
        // request still listed there is newer than the last applied one.
        if entry.in_flight.remove(&seq).is_none() {
            discard(&mut state.discarded, key, seq, "request_superseded");
            return;
        }
        if entry.subscribers == 0 {
            let pending = entry.has_pending();
            entry.state.send_modify(|current| current.is_fetching = pending);
            discard(&mut state.discarded, key, seq, "no_subscribers");
            return;
        }

        debug_assert!(seq > entry.applied_seq, "stale response reached apply");
        entry.applied_seq = seq;
        entry.abort_older_than(seq);
        let pending = entry.has_pending();

        let provided = entry
            .definition
            .tags()
            .resolve(&entry.args, result.as_ref().ok());
        state.tags.register(key, provided);

        match result {
            Ok(data) => {
                entry.state.send_replace(QueryState {
                    status: if pending {
                        QueryStatus::Loading
                    } else {
                        QueryStatus::Success
                    },
                    data: Some(Arc::new(data)),
                    error: None,
                    is_fetching: pending,
                    fulfilled_at: Some(Instant::now()),
                });
                debug!(key = %key, seq, pending, "Query response applied");
            }
            Err(error) => {
                warn!(key = %key, seq, error = %error, "Query request failed");
                entry.state.send_replace(QueryState {
                    status: if pending {
                        QueryStatus::Loading
                    } else {
                        QueryStatus::Error
                    },
                    data: None,
                    error: Some(error),
                    is_fetching: pending,
                    fulfilled_at: None,
                });
            }
        }
    }

    pub(crate) fn invalidate(self: &Arc<Self>, tags: &[Tag]) -> usize {
        if tags.is_empty() {
            return 0;
        }
        let mut state = mutex_lock(&self.state, SOURCE, "invalidate");
        let state = &mut *state;

        let mut affected: Vec<CacheKey> = state.tags.keys_matching_any(tags).into_iter().collect();
        affected.sort();

        let mut refetched = 0_usize;
        let mut purged = 0_usize;
        for key in &affected {
            let subscribed = state
                .entries
                .get(key)
                .is_some_and(|entry| entry.subscribers > 0);
            if subscribed {
                self.start_fetch(state, key, "invalidated");
                refetched += 1;
            } else {
                state.remove(key);
                purged += 1;
            }
        }

        counter!(METRIC_CACHE_INVALIDATED).increment(affected.len() as u64);
        let tags: Vec<String> = tags.iter().map(Tag::to_string).collect();
        info!(?tags, refetched, purged, "Cache tags invalidated");
        affected.len()
    }

    /// Called when a subscription to `key` goes away.
    pub(crate) fn unsubscribe(self: &Arc<Self>, key: &CacheKey) {
        let mut state = mutex_lock(&self.state, SOURCE, "unsubscribe");
        let Some(entry) = state.entries.get_mut(key) else {
            return;
        };
        entry.subscribers = entry.subscribers.saturating_sub(1);
        if entry.subscribers > 0 {
            return;
        }

        entry.unused_since = Some(Instant::now());
        entry.gc_generation += 1;
        let generation = entry.gc_generation;

        if self.config.abort_on_unsubscribe && entry.has_pending() {
            entry.abort_all();
            entry.state.send_modify(|current| current.is_fetching = false);
            debug!(key = %key, "Aborted requests of unsubscribed query");
        }

        match Handle::try_current() {
            Ok(handle) => {
                let weak = Arc::downgrade(self);
                let key = key.clone();
                let keep_for = self.config.keep_unused_for;
                handle.spawn(async move {
                    tokio::time::sleep(keep_for).await;
                    if let Some(client) = weak.upgrade() {
                        client.expire(&key, generation);
                    }
                });
            }
            Err(_) => {
                debug!(key = %key, "No runtime for retention timer; entry left for collect_garbage");
            }
        }
    }

    /// Retention timer callback: drop the entry if nobody resubscribed.
    fn expire(&self, key: &CacheKey, generation: u64) {
        let mut state = mutex_lock(&self.state, SOURCE, "expire");
        let expired = state
            .entries
            .get(key)
            .is_some_and(|entry| entry.subscribers == 0 && entry.gc_generation == generation);
        if expired {
            state.remove(key);
            debug!(key = %key, "Unused cache entry removed");
        }
    }

    /// Force a new request for a subscribed entry.
    pub(crate) fn refetch(self: &Arc<Self>, key: &CacheKey) -> bool {
        let mut state = mutex_lock(&self.state, SOURCE, "refetch");
        let state = &mut *state;
        if !state.entries.contains_key(key) {
            return false;
        }
        self.start_fetch(state, key, "refetch");
        true
    }

    /// Polling tick: refetch unless a request is already running.
    fn poll(self: &Arc<Self>, key: &CacheKey) -> bool {
        let mut state = mutex_lock(&self.state, SOURCE, "poll");
        let state = &mut *state;
        match state.entries.get(key) {
            None => false,
            Some(entry) if entry.has_pending() => true,
            Some(_) => {
                self.start_fetch(state, key, "poll");
                true
            }
        }
    }
}

fn discard(discarded: &mut u64, key: &CacheKey, seq: u64, reason: &'static str) {
    *discarded += 1;
    counter!(METRIC_RESPONSE_DISCARDED, "reason" => reason).increment(1);
    debug!(key = %key, seq, reason, "Query response discarded");
}

fn spawn_poller(
    client: Weak<ClientInner>,
    key: CacheKey,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + every, every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let Some(client) = client.upgrade() else {
                break;
            };
            if !client.poll(&key) {
                break;
            }
        }
    })
}
