//! redb table definitions for the state table.

use redb::TableDefinition;

/// Instance records keyed by instance name (`{id}-{name}-{path}`).
pub const INSTANCES: TableDefinition<&str, &[u8]> = TableDefinition::new("instances");
