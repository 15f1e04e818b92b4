//! redb table definitions for the lifecycle state store.

use redb::TableDefinition;

/// Deployment records (JSON) keyed by deployment id.
pub const DEPLOYMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("deployments");
