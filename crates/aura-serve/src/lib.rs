//! aura-serve — static hosting for deployed sites.
//!
//! A request for `http://<id>.<base-domain>/<path>` is answered from the
//! object at `dist/<id>/<path>`, with one store read per request and no
//! cache.
//!
//! # Components
//!
//! - **`resolver`** — host/path validation, key computation, content types
//! - **`http`** — axum router answering every `GET` path

pub mod http;
pub mod resolver;

pub use http::hosting_router;
pub use resolver::{Asset, Resolution, ResolveError, StaticResolver};
