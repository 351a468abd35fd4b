#![deny(clippy::all, clippy::pedantic)]

pub mod analytics;
pub mod courses;
pub mod documents;
pub mod livestreams;
pub mod raw;
pub mod system;
pub mod users;

use edudash::types::ListQuery;

use crate::args::PageArgs;

impl From<PageArgs> for ListQuery {
    fn from(args: PageArgs) -> Self {
        let query = ListQuery::page(args.page, args.limit);
        match args.search {
            Some(search) => query.with_search(search),
            None => query,
        }
    }
}
