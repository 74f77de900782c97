//! State layer for animus: durable key-value backends with TTL,
//! the fixed-window rate limiter, and the session history store.

pub mod in_memory;
pub mod rate_limit;
pub mod session;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryKv;
pub use rate_limit::{Admission, RateLimiter, RateRecord};
pub use session::SessionStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteKv;
