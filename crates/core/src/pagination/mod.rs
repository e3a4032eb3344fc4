//! Paginated search over cursor-linked result sets

pub mod query;
pub mod scheduler;

pub use query::SearchQuery;
pub use scheduler::{PaginationScheduler, SchedulerOptions};
