//! StateStore — redb-backed persistence for the instance directory.
//!
//! The table is read once at the start of a run and overwritten once at
//! the end. A missing file is an empty table; a file that exists but
//! cannot be opened or read is fatal, since the table is authoritative.

use std::path::{Path, PathBuf};

use redb::{Database, ReadableDatabase, ReadableTable, TableError};
use stowage_core::{InstanceRecord, RunLog};
use tracing::debug;

use crate::directory::InstanceDirectory;
use crate::error::{StateError, StateResult};
use crate::tables::INSTANCES;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Handle to the state table file.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read every persisted row.
    ///
    /// Rows that fail to decode are reported to `log` and carried in the
    /// directory untouched, so the next save writes them back.
    pub fn load(&self, log: &mut RunLog) -> StateResult<InstanceDirectory> {
        if !self.exists() {
            debug!(path = ?self.path, "no state table yet, starting empty");
            return Ok(InstanceDirectory::new());
        }

        let db = Database::open(&self.path).map_err(map_err!(Open))?;
        let txn = db.begin_read().map_err(map_err!(Transaction))?;
        let table = match txn.open_table(INSTANCES) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(InstanceDirectory::new()),
            Err(e) => return Err(StateError::Table(e.to_string())),
        };

        let mut dir = InstanceDirectory::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            match serde_json::from_slice::<InstanceRecord>(value.value()) {
                Ok(record) => {
                    dir.insert(record);
                }
                Err(e) => {
                    log.error(format!(
                        "Keeping unreadable state row {} untouched: {e}",
                        key.value()
                    ));
                    dir.keep_undecoded(key.value().to_string(), value.value().to_vec());
                }
            }
        }

        debug!(path = ?self.path, rows = dir.len(), "state table loaded");
        Ok(dir)
    }

    /// Replace the persisted table with `dir` in a single transaction.
    /// Rows `dir` could not decode are written back as they were read.
    pub fn save(&self, dir: &InstanceDirectory) -> StateResult<()> {
        let db = Database::create(&self.path).map_err(map_err!(Open))?;
        let txn = db.begin_write().map_err(map_err!(Transaction))?;
        txn.delete_table(INSTANCES).map_err(map_err!(Table))?;
        {
            let mut table = txn.open_table(INSTANCES).map_err(map_err!(Table))?;
            for record in dir.records() {
                let key = record.instance_name();
                let value = serde_json::to_vec(record).map_err(map_err!(Serialize))?;
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
            }
            for (key, raw) in dir.undecoded() {
                table.insert(key, raw).map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(path = ?self.path, rows = dir.len(), "state table saved");
        Ok(())
    }
}
