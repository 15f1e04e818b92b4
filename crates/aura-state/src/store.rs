//! StateStore — redb-backed persistence for deployment records.
//!
//! Deployment records live in a single table as JSON, keyed by id. Status
//! changes are checked and written inside one write transaction.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use aura_core::DeploymentId;

use crate::error::{StateError, StateResult};
use crate::tables::DEPLOYMENTS;
use crate::types::{Deployment, DeploymentStatus};

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe deployment store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Insert a new deployment. Fails with `AlreadyExists` if the id is taken.
    pub fn insert(&self, deployment: &Deployment) -> StateResult<()> {
        let key = deployment.id.as_str();
        let value = serde_json::to_vec(deployment).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
            if table.get(key).map_err(map_err!(Read))?.is_some() {
                return Err(StateError::AlreadyExists(key.to_string()));
            }
            table
                .insert(key, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, "deployment stored");
        Ok(())
    }

    /// Load one deployment record.
    pub fn get(&self, id: &DeploymentId) -> StateResult<Option<Deployment>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
        let guard = table.get(id.as_str()).map_err(map_err!(Read))?;
        guard.map(|g| decode(g.value())).transpose()
    }

    /// Every deployment record, in id order.
    pub fn list(&self) -> StateResult<Vec<Deployment>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
        table
            .iter()
            .map_err(map_err!(Read))?
            .map(|entry| {
                let (_, value) = entry.map_err(map_err!(Read))?;
                decode(value.value())
            })
            .collect()
    }

    /// Compare-and-set the status of a deployment.
    ///
    /// Reads the current record, checks the edge, and writes the new status
    /// in one write transaction. Returns the previous status and the updated
    /// record. Rejected transitions leave the record untouched.
    pub fn set_status(
        &self,
        id: &DeploymentId,
        to: DeploymentStatus,
        deployed_url: Option<String>,
        now: u64,
    ) -> StateResult<(DeploymentStatus, Deployment)> {
        let key = id.as_str();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let (from, updated) = {
            let mut table = txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
            let current: Deployment = match table.get(key).map_err(map_err!(Read))? {
                Some(guard) => decode(guard.value())?,
                None => return Err(StateError::NotFound(key.to_string())),
            };

            let from = current.status;
            if !from.can_transition_to(to) {
                return Err(StateError::Conflict {
                    id: key.to_string(),
                    from,
                    to,
                });
            }

            let updated = Deployment {
                status: to,
                deployed_url,
                updated_at: now,
                ..current
            };
            let value = serde_json::to_vec(&updated).map_err(map_err!(Serialize))?;
            table
                .insert(key, value.as_slice())
                .map_err(map_err!(Write))?;
            (from, updated)
        };
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, %from, %to, "deployment status updated");
        Ok((from, updated))
    }
}

fn decode(bytes: &[u8]) -> StateResult<Deployment> {
    serde_json::from_slice(bytes).map_err(map_err!(Deserialize))
}
