//! The backend surface of the admin dashboard.
//!
//! [`catalogue`] declares every endpoint on one [`Api`] registry; the typed
//! facades ([`CoursesApi`], [`UsersApi`], ...) wrap a [`QueryClient`] built
//! from it.

pub mod analytics;
pub mod courses;
pub mod documents;
pub mod livestreams;
pub mod system;
pub mod users;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use edudash_api_types::Page;

use crate::cache::{Api, QueryClient, Tag, TransformError};
use crate::error::RegistryError;

pub use analytics::AnalyticsApi;
pub use courses::CoursesApi;
pub use documents::DocumentsApi;
pub use livestreams::LivestreamsApi;
pub use system::SystemApi;
pub use users::UsersApi;

/// Tag kinds used across the catalogue.
pub mod tags {
    pub const ANALYTICS: &str = "Analytics";
    pub const CITY: &str = "City";
    pub const COURSE: &str = "Course";
    pub const COURSE_STATS: &str = "CourseStats";
    pub const DOCUMENT: &str = "Document";
    pub const LIVESTREAM: &str = "Livestream";
    pub const NOTIFICATION: &str = "Notification";
    pub const QUEUE_JOB: &str = "QueueJob";
    pub const SCHOOL: &str = "School";
    pub const SYSTEM_CONFIG: &str = "SystemConfig";
    pub const USER: &str = "User";
    pub const USER_STATS: &str = "UserStats";
}

/// Register every dashboard endpoint.
pub fn catalogue() -> Result<Api, RegistryError> {
    let mut api = Api::new();
    analytics::register(&mut api)?;
    courses::register(&mut api)?;
    documents::register(&mut api)?;
    livestreams::register(&mut api)?;
    system::register(&mut api)?;
    users::register(&mut api)?;
    Ok(api)
}

/// Arguments of update endpoints: the target id plus the fields to change.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WithId<T> {
    pub id: i64,
    #[serde(flatten)]
    pub body: T,
}

impl<T> WithId<T> {
    pub fn new(id: i64, body: T) -> Self {
        Self { id, body }
    }
}

/// Transform normalising either pagination layout into [`Page`]. The
/// `limit` argument of the call fills in the page size when the payload
/// omits it.
pub fn page_of<T: DeserializeOwned>(
    items_field: &'static str,
) -> impl Fn(&Value, Option<Value>) -> Result<Page<T>, TransformError> + Send + Sync + 'static {
    move |args: &Value, payload: Option<Value>| {
        let payload = payload.ok_or(TransformError::MissingPayload)?;
        Page::from_payload_with_limit(payload, items_field, requested_limit(args))
            .map_err(|err| TransformError::Decode(err.to_string()))
    }
}

fn requested_limit(args: &Value) -> Option<u32> {
    let limit = args.get("limit")?;
    limit
        .as_u64()
        .or_else(|| limit.as_str().and_then(|text| text.parse().ok()))
        .and_then(|limit| u32::try_from(limit).ok())
}

/// Entity id carried by endpoint arguments: a bare id, or the `id` field of
/// an object.
pub fn arg_id(args: &Value) -> String {
    let id = match args {
        Value::Object(map) => map.get("id").unwrap_or(&Value::Null),
        other => other,
    };
    match id {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Collection tag plus one tag per item of a transformed [`Page`] or array.
pub fn list_tags(kind: &str, result: Option<&Value>) -> Vec<Tag> {
    let items = result.and_then(|result| match result {
        Value::Array(items) => Some(items),
        other => other.get("items").and_then(Value::as_array),
    });

    let mut tags = vec![Tag::list(kind)];
    if let Some(items) = items {
        tags.extend(
            items
                .iter()
                .filter_map(|item| item.get("id"))
                .map(|id| Tag::id(kind, arg_id(id))),
        );
    }
    tags
}

/// Tags for an id-addressed write: the entity and the collection it lives in.
pub fn entity_tags(kind: &str, args: &Value) -> Vec<Tag> {
    vec![Tag::id(kind, arg_id(args)), Tag::list(kind)]
}

impl QueryClient {
    pub fn analytics(&self) -> AnalyticsApi<'_> {
        AnalyticsApi::new(self)
    }

    pub fn courses(&self) -> CoursesApi<'_> {
        CoursesApi::new(self)
    }

    pub fn documents(&self) -> DocumentsApi<'_> {
        DocumentsApi::new(self)
    }

    pub fn livestreams(&self) -> LivestreamsApi<'_> {
        LivestreamsApi::new(self)
    }

    pub fn system(&self) -> SystemApi<'_> {
        SystemApi::new(self)
    }

    pub fn users(&self) -> UsersApi<'_> {
        UsersApi::new(self)
    }
}
