//! aura-state — deployment lifecycle tracking for Aura.
//!
//! Backed by [redb](https://docs.rs/redb). Each deployment is one JSON
//! record keyed by its id. Status changes are compare-and-set operations
//! inside a single redb write transaction; redb admits one writer at a time,
//! so concurrent transitions on the same id are serialized and the recorded
//! status only ever moves forward:
//!
//! ```text
//! uploading ──▶ building ──▶ deployed
//!     │             │
//!     └─────────────┴──────▶ failed
//! ```
//!
//! `deployed` and `failed` are terminal. The [`LifecycleTracker`] wraps the
//! store, derives `deployed_url`, and publishes every committed change on a
//! broadcast channel.

pub mod error;
pub mod store;
pub mod tables;
pub mod tracker;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use tracker::LifecycleTracker;
pub use types::*;
