//! aura-deploy — turns accepted deployments into published sites.
//!
//! ```text
//!  POST /deploy ──► BuildQueue ──► worker loop ──► BuildWorker ──► TreeSync ──► dist/<id>/…
//!                   (building)                     (clone+build)    (upload)     (deployed)
//! ```
//!
//! Any failure along the way moves the deployment to `failed`; the cause is
//! only logged.

pub mod error;
pub mod pipeline;
pub mod queue;
pub mod worker;

pub use error::DeployError;
pub use pipeline::Pipeline;
pub use queue::{BuildJob, BuildQueue, BuildReceiver};
pub use worker::{BuildFuture, BuildWorker, ShellBuildWorker};
