//! Request and response shapes shared by the edudash client and its tools.
//!
//! The backend wraps every payload in an [`Envelope`]; list endpoints return
//! one of two pagination layouts which are normalised into [`Page`].

pub mod analytics;
pub mod courses;
pub mod documents;
mod envelope;
pub mod livestreams;
mod pagination;
mod query;
pub mod system;
pub mod users;

pub use envelope::Envelope;
pub use pagination::{Page, PageShapeError, Pagination};
pub use query::{ListQuery, SortOrder};
