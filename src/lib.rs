//! Document-store abstraction and watermark-driven trustee appointment sync.
//!
//! Layers, leaf to root: [`query`] (portable filter AST and renderer),
//! [`driver`] (store contract plus an in-memory store), [`adapter`] (typed
//! CRUD with identity and acknowledgment checks), [`repositories`], and
//! [`sync`]. A [`context::RunContext`] owns the connections each request or
//! run opens and releases them when it ends.

pub mod adapter;
pub mod config;
pub mod context;
pub mod driver;
pub mod errors;
pub mod gateway;
pub mod logger;
pub mod model;
pub mod query;
pub mod repositories;
pub mod sync;

pub use adapter::DocumentCollectionAdapter;
pub use config::AppConfig;
pub use context::RunContext;
pub use errors::{ErrorKind, StoreError};
