//! Cache entry storage.
//!
//! Every entry owns a `watch` channel carrying its [`QueryState`]; all
//! subscriptions to the same key observe the same channel.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::error::ApiError;

use super::endpoint::EndpointDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStatus {
    #[default]
    Uninitialized,
    Loading,
    Success,
    Error,
}

/// Observable state of one cache entry.
#[derive(Debug, Clone, Default)]
pub struct QueryState {
    pub status: QueryStatus,
    /// Last successfully fetched data. Kept while a refetch is in flight,
    /// cleared when the entry errors.
    pub data: Option<Arc<Value>>,
    pub error: Option<ApiError>,
    /// A request for this entry is in flight.
    pub is_fetching: bool,
    /// When the data currently held was received.
    pub fulfilled_at: Option<Instant>,
}

impl QueryState {
    /// No data yet and a request is pending.
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading && self.data.is_none()
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    /// Reached `Success` or `Error` with nothing newer in flight.
    pub fn is_settled(&self) -> bool {
        matches!(self.status, QueryStatus::Success | QueryStatus::Error) && !self.is_fetching
    }

    /// Decode the held data into `T`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.data
            .as_deref()
            .map(|data| T::deserialize(data))
            .transpose()
    }

    /// Collapse a settled state into its outcome.
    pub fn into_result(self) -> Result<Arc<Value>, ApiError> {
        match (self.status, self.data, self.error) {
            (QueryStatus::Success, Some(data), _) => Ok(data),
            (_, _, Some(error)) => Err(error),
            _ => Err(ApiError::Cancelled),
        }
    }
}

/// Bookkeeping for one `(endpoint, args)` pair. Guarded by the client's
/// state lock.
pub(crate) struct CacheEntry {
    pub definition: Arc<EndpointDefinition>,
    pub args: Value,
    pub state: watch::Sender<QueryState>,
    /// Sequence of the last response written into `state`.
    pub applied_seq: u64,
    /// Requests issued and not yet completed, by sequence.
    pub in_flight: BTreeMap<u64, AbortHandle>,
    pub subscribers: usize,
    pub unused_since: Option<Instant>,
    /// Bumped on every subscribe/unsubscribe so stale GC timers can tell
    /// they lost the race.
    pub gc_generation: u64,
}

impl CacheEntry {
    pub fn new(definition: Arc<EndpointDefinition>, args: Value) -> Self {
        let (state, _) = watch::channel(QueryState::default());
        Self {
            definition,
            args,
            state,
            applied_seq: 0,
            in_flight: BTreeMap::new(),
            subscribers: 0,
            unused_since: Some(Instant::now()),
            gc_generation: 0,
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn snapshot(&self) -> QueryState {
        self.state.borrow().clone()
    }

    /// Abort every in-flight request and forget about them.
    pub fn abort_all(&mut self) {
        for (_, handle) in std::mem::take(&mut self.in_flight) {
            handle.abort();
        }
    }

    /// Abort requests issued before `seq`; their responses can no longer apply.
    pub fn abort_older_than(&mut self, seq: u64) {
        let newer = self.in_flight.split_off(&seq);
        for (_, handle) in std::mem::replace(&mut self.in_flight, newer) {
            handle.abort();
        }
    }
}
