//! Partition schema and migrations
//!
//! Every partition is one SQLite table. Record partitions are keyed by the
//! record's `id` field and store the serialized record in a JSON `data`
//! column; key-value partitions carry an explicit external key. Migrations
//! are strictly additive (`CREATE ... IF NOT EXISTS`, never a drop) and are
//! safe to re-run on every open.

use rusqlite::{Connection, Result};

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Whether a partition is keyed by a record's own `id` or an external key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKind {
    Record,
    KeyValue,
}

/// A named range index over one JSON field of a record partition
#[derive(Debug, Clone, Copy)]
pub struct IndexSpec {
    /// Index name used by `get_all_by_index`
    pub name: &'static str,
    /// JSON field the index covers
    pub field: &'static str,
}

/// Static description of one partition
#[derive(Debug, Clone, Copy)]
pub struct PartitionSpec {
    pub name: &'static str,
    pub kind: PartitionKind,
    pub indexes: &'static [IndexSpec],
}

/// Every partition the store manages.
///
/// New partitions and indexes are appended here; removing one would be a
/// destructive migration and is not supported.
pub const PARTITIONS: &[PartitionSpec] = &[
    PartitionSpec {
        name: "tasks",
        kind: PartitionKind::Record,
        indexes: &[IndexSpec {
            name: "dueDate",
            field: "dueDate",
        }],
    },
    PartitionSpec {
        name: "notes",
        kind: PartitionKind::Record,
        indexes: &[],
    },
    PartitionSpec {
        name: "journal",
        kind: PartitionKind::Record,
        indexes: &[IndexSpec {
            name: "createdAt",
            field: "createdAt",
        }],
    },
    PartitionSpec {
        name: "goals",
        kind: PartitionKind::Record,
        indexes: &[],
    },
    PartitionSpec {
        name: "timelines",
        kind: PartitionKind::Record,
        indexes: &[],
    },
    PartitionSpec {
        name: "folders",
        kind: PartitionKind::Record,
        indexes: &[],
    },
    PartitionSpec {
        name: "achievements",
        kind: PartitionKind::Record,
        indexes: &[IndexSpec {
            name: "date",
            field: "date",
        }],
    },
    PartitionSpec {
        name: "outbox",
        kind: PartitionKind::Record,
        indexes: &[],
    },
    PartitionSpec {
        name: "userProfile",
        kind: PartitionKind::KeyValue,
        indexes: &[],
    },
    PartitionSpec {
        name: "settings",
        kind: PartitionKind::KeyValue,
        indexes: &[],
    },
];

/// Look up a partition spec by name
pub fn partition(name: &str) -> Option<&'static PartitionSpec> {
    PARTITIONS.iter().find(|p| p.name == name)
}

/// Ensure every partition table and index exists.
///
/// Idempotent; called on every open.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;

    for spec in PARTITIONS {
        match spec.kind {
            PartitionKind::Record => {
                conn.execute_batch(&format!(
                    "CREATE TABLE IF NOT EXISTS \"{}\" (
                        id TEXT PRIMARY KEY,
                        data TEXT NOT NULL
                    );",
                    spec.name
                ))?;
                for index in spec.indexes {
                    conn.execute_batch(&format!(
                        "CREATE INDEX IF NOT EXISTS \"idx_{table}_{index}\"
                         ON \"{table}\" (json_extract(data, '$.{field}'));",
                        table = spec.name,
                        index = index.name,
                        field = index.field,
                    ))?;
                }
            }
            PartitionKind::KeyValue => {
                conn.execute_batch(&format!(
                    "CREATE TABLE IF NOT EXISTS \"{}\" (
                        key TEXT PRIMARY KEY,
                        value TEXT NOT NULL
                    );",
                    spec.name
                ))?;
            }
        }
    }

    conn.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Get the installed schema version, if any
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_info WHERE key = 'version'")?;
    let result: Result<String> = stmt.query_row([], |row| row.get(0));

    match result {
        Ok(version_str) => Ok(version_str.parse().ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_creates_every_partition() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        for spec in PARTITIONS {
            assert!(tables.contains(&spec.name.to_string()), "{}", spec.name);
        }
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        // A migration must never drop existing data
        conn.execute(
            "INSERT INTO tasks (id, data) VALUES ('a', '{\"id\":\"a\"}')",
            [],
        )
        .unwrap();

        migrate(&conn).unwrap();
        migrate(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(get_schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_indexes_exist() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        let indexes: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(indexes.contains(&"idx_tasks_dueDate".to_string()));
        assert!(indexes.contains(&"idx_journal_createdAt".to_string()));
        assert!(indexes.contains(&"idx_achievements_date".to_string()));
    }

    #[test]
    fn test_partition_lookup() {
        let spec = partition("settings").unwrap();
        assert_eq!(spec.kind, PartitionKind::KeyValue);
        assert!(partition("bogus").is_none());
    }
}
