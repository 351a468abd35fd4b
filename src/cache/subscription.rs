//! Consumer-side handles: live query subscriptions and mutation triggers.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::ApiError;

use super::client::ClientInner;
use super::endpoint::EndpointDefinition;
use super::keys::{CacheKey, Tag};
use super::store::QueryState;

struct Attachment {
    client: Arc<ClientInner>,
    key: CacheKey,
    poller: Option<JoinHandle<()>>,
}

/// A consumer's interest in one cache entry.
///
/// Dropping the subscription releases the entry; once the last subscription
/// is gone the entry's retention timer starts.
pub struct QuerySubscription {
    receiver: watch::Receiver<QueryState>,
    attachment: Option<Attachment>,
}

impl QuerySubscription {
    pub(crate) fn attached(
        client: Arc<ClientInner>,
        key: CacheKey,
        receiver: watch::Receiver<QueryState>,
        poller: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            receiver,
            attachment: Some(Attachment {
                client,
                key,
                poller,
            }),
        }
    }

    /// Subscription created with `skip`: never fetches, stays uninitialized.
    pub(crate) fn detached() -> Self {
        let (_, receiver) = watch::channel(QueryState::default());
        Self {
            receiver,
            attachment: None,
        }
    }

    pub fn key(&self) -> Option<&CacheKey> {
        self.attachment.as_ref().map(|attachment| &attachment.key)
    }

    pub fn is_skipped(&self) -> bool {
        self.attachment.is_none()
    }

    pub fn state(&self) -> QueryState {
        self.receiver.borrow().clone()
    }

    /// Decode the current data into `T`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<Option<T>, ApiError> {
        self.receiver.borrow().data_as().map_err(|err| ApiError::Decode {
            endpoint: self
                .key()
                .map(|key| key.endpoint.clone())
                .unwrap_or_default(),
            message: err.to_string(),
        })
    }

    /// Wait for the next state change. Returns `false` once the entry is gone.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    /// Wait until the entry holds a final outcome with nothing in flight.
    ///
    /// Skipped subscriptions return their current state immediately.
    pub async fn settled(&mut self) -> QueryState {
        if self.attachment.is_none() {
            return self.state();
        }
        let settled = match self.receiver.wait_for(QueryState::is_settled).await {
            Ok(state) => Some(state.clone()),
            Err(_) => None,
        };
        settled.unwrap_or_else(|| self.state())
    }

    /// Issue a new request for this entry and wait for it to settle.
    pub async fn refetch(&mut self) -> QueryState {
        let issued = match &self.attachment {
            Some(attachment) => attachment.client.refetch(&attachment.key),
            None => false,
        };
        if !issued {
            return self.state();
        }
        self.settled().await
    }
}

impl Drop for QuerySubscription {
    fn drop(&mut self) {
        if let Some(attachment) = self.attachment.take() {
            if let Some(poller) = attachment.poller {
                poller.abort();
            }
            attachment.client.unsubscribe(&attachment.key);
        }
    }
}

impl std::fmt::Debug for QuerySubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuerySubscription")
            .field("key", &self.key())
            .field("state", &*self.receiver.borrow())
            .finish()
    }
}

/// Observable state of a mutation handle.
#[derive(Debug, Clone, Default)]
pub struct MutationState {
    /// Triggers currently awaiting a response.
    pub pending: usize,
    pub data: Option<Arc<Value>>,
    pub error: Option<ApiError>,
}

impl MutationState {
    pub fn is_loading(&self) -> bool {
        self.pending > 0
    }
}

/// Trigger for one mutation endpoint.
pub struct MutationHandle {
    client: Arc<ClientInner>,
    definition: Arc<EndpointDefinition>,
    state: watch::Sender<MutationState>,
}

impl MutationHandle {
    pub(crate) fn new(client: Arc<ClientInner>, definition: Arc<EndpointDefinition>) -> Self {
        let (state, _) = watch::channel(MutationState::default());
        Self {
            client,
            definition,
            state,
        }
    }

    pub fn name(&self) -> &str {
        self.definition.name()
    }

    pub fn state(&self) -> MutationState {
        self.state.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    pub fn error(&self) -> Option<ApiError> {
        self.state.borrow().error.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MutationState> {
        self.state.subscribe()
    }

    /// Perform the mutation. On success the tags it invalidates are walked
    /// before this returns, so subscribed queries are already refetching.
    pub async fn trigger<A: Serialize + ?Sized>(&self, args: &A) -> Result<Value, ApiError> {
        let name = self.definition.name();
        let args = serde_json::to_value(args).map_err(|err| ApiError::InvalidArgs {
            endpoint: name.to_string(),
            message: err.to_string(),
        })?;

        self.state.send_modify(|state| {
            state.pending += 1;
            state.error = None;
        });
        let result = self.client.execute(&self.definition, &args).await;

        match result {
            Ok(data) => {
                let tags: Vec<Tag> = self.definition.tags().resolve(&args, Some(&data));
                debug!(endpoint = name, invalidates = tags.len(), "Mutation succeeded");
                self.client.invalidate(&tags);
                self.state.send_modify(|state| {
                    state.pending = state.pending.saturating_sub(1);
                    state.data = Some(Arc::new(data.clone()));
                });
                Ok(data)
            }
            Err(error) => {
                warn!(endpoint = name, error = %error, "Mutation failed");
                self.state.send_modify(|state| {
                    state.pending = state.pending.saturating_sub(1);
                    state.error = Some(error.clone());
                });
                Err(error)
            }
        }
    }

    /// [`trigger`](Self::trigger), decoding the result into `T`.
    pub async fn trigger_as<T, A>(&self, args: &A) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        A: Serialize + ?Sized,
    {
        let data = self.trigger(args).await?;
        T::deserialize(data).map_err(|err| ApiError::Decode {
            endpoint: self.definition.name().to_string(),
            message: err.to_string(),
        })
    }
}

impl std::fmt::Debug for MutationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationHandle")
            .field("endpoint", &self.definition.name())
            .field("state", &*self.state.borrow())
            .finish()
    }
}
