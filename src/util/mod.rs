pub mod backoff;
pub mod concurrency;
pub mod pagination;

pub use backoff::{retry_with_backoff, RetryPolicy};
pub use concurrency::bounded_concurrent_map;
pub use pagination::{collect_all, paginate, Page};
