//! Query cache and request orchestration.
//!
//! Endpoints are declared on an [`Api`] registry. A [`QueryClient`] built
//! from it keeps one cache entry per `(endpoint, canonical args)` pair:
//!
//! - concurrent subscriptions to the same key share one entry and one
//!   in-flight request;
//! - queries label their entries with [`Tag`]s, and successful mutations
//!   invalidate tags, refetching subscribed entries and dropping the rest;
//! - responses are sequenced so an older request can never overwrite the
//!   data of a newer one;
//! - entries without subscribers are collected after
//!   [`CacheConfig::keep_unused_for`].
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! keep_unused_for_seconds = 60
//! refetch_on_mount = "never"   # "always" or an age in seconds
//! abort_on_unsubscribe = false
//! ```

mod client;
mod config;
mod endpoint;
mod keys;
mod lock;
mod registry;
mod store;
mod subscription;

pub use client::{CacheStats, QueryClient, QueryOptions};
pub use config::{CacheConfig, RefetchOnMount};
pub use endpoint::{
    Api, EndpointDefinition, EndpointKind, TagSource, TransformError, acknowledged, payload,
};
pub use keys::{CacheKey, LIST_ID, Tag, canonical_args};
pub use registry::TagRegistry;
pub use store::{QueryState, QueryStatus};
pub use subscription::{MutationHandle, MutationState, QuerySubscription};
