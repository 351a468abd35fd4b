//! Canonical pagination shape.
//!
//! The backend reports pagination in two layouts depending on the resource:
//!
//! - flat: `{ "<items>": [...], "total": 57, "totalPages": 6, "currentPage": 1 }`
//! - nested: `{ "<items>": [...], "pagination": { "currentPage": 1, "perPage": 10, "total": 57, "lastPage": 6 } }`
//!
//! Both are folded into [`Page`] at the response boundary so consumers only
//! ever see one shape. The flat layout never reports a page size; it is taken
//! from the request's `limit` when known and left empty otherwise.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub per_page: Option<u32>,
    pub total: u64,
    pub total_pages: u32,
}

impl Pagination {
    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Error)]
pub enum PageShapeError {
    #[error("list payload has no `{field}` array")]
    MissingItems { field: String },
    #[error("list payload must be an object or an array")]
    UnexpectedShape,
    #[error("failed to decode list payload: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FlatPagination {
    total: Option<u64>,
    total_pages: Option<u32>,
    current_page: Option<u32>,
    per_page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct NestedPagination {
    current_page: Option<u32>,
    per_page: Option<u32>,
    total: Option<u64>,
    last_page: Option<u32>,
}

impl<T: DeserializeOwned> Page<T> {
    /// Build a page from a raw list payload whose items live under `items_field`.
    pub fn from_payload(payload: Value, items_field: &str) -> Result<Self, PageShapeError> {
        Self::from_payload_with_limit(payload, items_field, None)
    }

    /// Like [`Page::from_payload`], using the `limit` the page was requested
    /// with when the payload does not report its page size.
    pub fn from_payload_with_limit(
        payload: Value,
        items_field: &str,
        requested_limit: Option<u32>,
    ) -> Result<Self, PageShapeError> {
        let mut object = match payload {
            Value::Array(items) => return Self::unpaged(items),
            Value::Object(object) => object,
            _ => return Err(PageShapeError::UnexpectedShape),
        };

        let items = take_items(&mut object, items_field)?;
        let items: Vec<T> = serde_json::from_value(Value::Array(items))?;
        let count = items.len();

        let pagination = match object.remove("pagination") {
            Some(nested @ Value::Object(_)) => {
                let nested: NestedPagination = serde_json::from_value(nested)?;
                normalise(
                    nested.total,
                    nested.last_page,
                    nested.current_page,
                    nested.per_page.or(requested_limit),
                    count,
                )
            }
            _ => {
                let flat: FlatPagination = serde_json::from_value(Value::Object(object))?;
                normalise(
                    flat.total,
                    flat.total_pages,
                    flat.current_page,
                    flat.per_page.or(flat.limit).or(requested_limit),
                    count,
                )
            }
        };

        Ok(Self { items, pagination })
    }

    fn unpaged(items: Vec<Value>) -> Result<Self, PageShapeError> {
        let items: Vec<T> = serde_json::from_value(Value::Array(items))?;
        let count = items.len();
        Ok(Self {
            items,
            pagination: normalise(None, None, None, None, count),
        })
    }
}

fn take_items(object: &mut Map<String, Value>, field: &str) -> Result<Vec<Value>, PageShapeError> {
    let value = object
        .remove(field)
        .or_else(|| object.remove("items"))
        .ok_or_else(|| PageShapeError::MissingItems {
            field: field.to_string(),
        })?;
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(PageShapeError::MissingItems {
            field: field.to_string(),
        }),
    }
}

fn normalise(
    total: Option<u64>,
    total_pages: Option<u32>,
    current_page: Option<u32>,
    per_page: Option<u32>,
    count: usize,
) -> Pagination {
    let count = u64::try_from(count).unwrap_or(u64::MAX);
    let total = total.unwrap_or(count);
    let per_page = per_page.filter(|size| *size > 0);
    let total_pages = total_pages.unwrap_or_else(|| match per_page {
        _ if total == 0 => 0,
        Some(size) => u32::try_from(total.div_ceil(u64::from(size))).unwrap_or(u32::MAX),
        None => 1,
    });

    Pagination {
        current_page: current_page.unwrap_or(1).max(1),
        per_page,
        total,
        total_pages,
    }
}
