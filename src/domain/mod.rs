//! Domain Facades
//!
//! Named wrappers that fix key naming, ttl and tags for common call sites.
//! They only go through [`CacheManager`](crate::cache::CacheManager).

mod notifications;
mod rate_limit;
mod search;
mod users;

pub use notifications::{Notification, NotificationInbox};
pub use rate_limit::{RateLimitDecision, RateLimiter};
pub use search::SearchCache;
pub use users::UserCache;
