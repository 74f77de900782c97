//! # Animus Core
//!
//! Domain types, traits, and error definitions for the animus persona
//! chat gateway. This crate has **zero framework dependencies** — it defines
//! the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The two external collaborators — the LLM backend and the durable
//! key-value store — are defined as traits here. Implementations live in
//! their respective crates (`animus-providers`, `animus-store`), which keeps
//! the dependency graph pointing inward and makes every subsystem mockable
//! in tests.

pub mod backend;
pub mod error;
pub mod kv;
pub mod memory;
pub mod message;

// Re-export key types at crate root for ergonomics
pub use backend::Backend;
pub use error::{BackendError, Error, Result, RetrievalError, StoreError};
pub use kv::{CounterStore, KvStore, WindowCount};
pub use memory::{MemoryItem, ScoredItem};
pub use message::{ChatMessage, Role, SessionHistory, SessionId};
