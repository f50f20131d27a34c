//! Partitioned storage engine
//!
//! A thin, schema-versioned layer over one SQLite connection. Records are
//! stored as JSON in a `data` column so every partition shares one engine;
//! range queries go through JSON1 expression indexes declared in the schema.
//!
//! The engine is the only component that touches durable storage. It knows
//! nothing about record types; the typed layer lives in
//! [`Collection`](crate::collection::Collection).

use rusqlite::Connection;
use serde_json::Value;

use crate::config::Config;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::schema::{migrate, partition, PartitionKind, PartitionSpec};

/// An inclusive range over an indexed JSON field
#[derive(Debug, Clone)]
pub struct IndexRange {
    pub lower: Value,
    pub upper: Value,
}

impl IndexRange {
    /// Range including both bounds
    pub fn inclusive(lower: impl Into<Value>, upper: impl Into<Value>) -> Self {
        Self {
            lower: lower.into(),
            upper: upper.into(),
        }
    }
}

/// Durable, partitioned key/record store
pub struct StorageEngine {
    conn: Connection,
}

impl StorageEngine {
    /// Open or create the database at the configured path and run migrations
    pub fn open(config: &Config) -> StorageResult<Self> {
        let path = config.db_path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(&path).map_err(StorageError::from_sqlite)?;
        migrate(&conn).map_err(StorageError::from_sqlite)?;
        tracing::debug!(path = %path.display(), "storage engine opened");

        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory().map_err(StorageError::from_sqlite)?;
        migrate(&conn).map_err(StorageError::from_sqlite)?;
        Ok(Self { conn })
    }

    /// Get a single value by key, or `None` if absent
    pub fn get(&self, partition: &str, key: &str) -> StorageResult<Option<Value>> {
        let spec = self.spec(partition)?;
        let sql = match spec.kind {
            PartitionKind::Record => format!("SELECT data FROM \"{}\" WHERE id = ?", spec.name),
            PartitionKind::KeyValue => format!("SELECT value FROM \"{}\" WHERE key = ?", spec.name),
        };

        let mut stmt = self.conn.prepare(&sql).map_err(StorageError::from_sqlite)?;
        let mut rows = stmt
            .query(rusqlite::params![key])
            .map_err(StorageError::from_sqlite)?;

        match rows.next().map_err(StorageError::from_sqlite)? {
            Some(row) => {
                let raw: String = row.get(0).map_err(StorageError::from_sqlite)?;
                Ok(Some(decode(partition, &raw)?))
            }
            None => Ok(None),
        }
    }

    /// Full list of a partition's values, in insertion order
    pub fn get_all(&self, partition: &str) -> StorageResult<Vec<Value>> {
        let spec = self.spec(partition)?;
        let column = match spec.kind {
            PartitionKind::Record => "data",
            PartitionKind::KeyValue => "value",
        };
        let sql = format!("SELECT {} FROM \"{}\" ORDER BY rowid", column, spec.name);
        self.query_values(partition, &sql, [])
    }

    /// Values whose indexed field falls within the inclusive range
    pub fn get_all_by_index(
        &self,
        partition: &str,
        index: &str,
        range: &IndexRange,
    ) -> StorageResult<Vec<Value>> {
        let spec = self.record_spec(partition)?;
        let index_spec = spec
            .indexes
            .iter()
            .find(|i| i.name == index)
            .ok_or_else(|| StorageError::UnknownIndex {
                partition: partition.to_string(),
                index: index.to_string(),
            })?;

        // A missing field extracts to NULL, which BETWEEN never matches
        let sql = format!(
            "SELECT data FROM \"{table}\"
             WHERE json_extract(data, '$.{field}') BETWEEN ?1 AND ?2
             ORDER BY json_extract(data, '$.{field}'), rowid",
            table = spec.name,
            field = index_spec.field,
        );
        self.query_values(
            partition,
            &sql,
            rusqlite::params![index_param(&range.lower), index_param(&range.upper)],
        )
    }

    /// Upsert one value.
    ///
    /// Record partitions derive the key from the value's `id` field and must
    /// not be given an explicit key; key-value partitions require one. An
    /// existing entry is fully overwritten, never field-merged.
    pub fn put(&self, partition: &str, value: &Value, key: Option<&str>) -> StorageResult<()> {
        let spec = self.spec(partition)?;
        match (spec.kind, key) {
            (PartitionKind::Record, None) => self.put_record(spec, value),
            (PartitionKind::KeyValue, Some(key)) => self.put_kv(spec, key, value),
            (PartitionKind::Record, Some(_)) => Err(StorageError::WrongPartitionKind {
                partition: partition.to_string(),
                expected: "key-value",
            }),
            (PartitionKind::KeyValue, None) => Err(StorageError::WrongPartitionKind {
                partition: partition.to_string(),
                expected: "record",
            }),
        }
    }

    /// Bulk upsert into one record partition.
    ///
    /// Atomic within that partition only; there is no transaction spanning
    /// multiple partitions.
    pub fn put_all(&self, partition: &str, values: &[Value]) -> StorageResult<()> {
        let spec = self.record_spec(partition)?;

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(StorageError::from_sqlite)?;
        for value in values {
            self.put_record(spec, value)?;
        }
        tx.commit().map_err(StorageError::from_sqlite)
    }

    /// Delete by key; missing keys are a silent no-op
    pub fn delete(&self, partition: &str, key: &str) -> StorageResult<()> {
        let spec = self.spec(partition)?;
        let sql = match spec.kind {
            PartitionKind::Record => format!("DELETE FROM \"{}\" WHERE id = ?", spec.name),
            PartitionKind::KeyValue => format!("DELETE FROM \"{}\" WHERE key = ?", spec.name),
        };
        self.conn
            .execute(&sql, rusqlite::params![key])
            .map_err(StorageError::from_sqlite)?;
        Ok(())
    }

    /// Remove every entry in a partition
    pub fn clear(&self, partition: &str) -> StorageResult<()> {
        let spec = self.spec(partition)?;
        self.conn
            .execute(&format!("DELETE FROM \"{}\"", spec.name), [])
            .map_err(StorageError::from_sqlite)?;
        Ok(())
    }

    /// Dump a key-value partition preserving keys.
    ///
    /// Needed to round-trip key-value partitions through a backup file.
    pub fn entries(&self, partition: &str) -> StorageResult<Vec<(String, Value)>> {
        let spec = self.spec(partition)?;
        if spec.kind != PartitionKind::KeyValue {
            return Err(StorageError::WrongPartitionKind {
                partition: partition.to_string(),
                expected: "key-value",
            });
        }

        let sql = format!("SELECT key, value FROM \"{}\" ORDER BY key", spec.name);
        let mut stmt = self.conn.prepare(&sql).map_err(StorageError::from_sqlite)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(StorageError::from_sqlite)?;

        let mut entries = Vec::new();
        for row in rows {
            let (key, raw) = row.map_err(StorageError::from_sqlite)?;
            entries.push((key, decode(partition, &raw)?));
        }
        Ok(entries)
    }

    /// Number of entries in a partition
    pub fn count(&self, partition: &str) -> StorageResult<i64> {
        let spec = self.spec(partition)?;
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM \"{}\"", spec.name), [], |r| {
                r.get(0)
            })
            .map_err(StorageError::from_sqlite)
    }

    // ==================== Private helpers ====================

    fn spec(&self, partition: &str) -> StorageResult<&'static PartitionSpec> {
        partition_lookup(partition)
    }

    fn record_spec(&self, name: &str) -> StorageResult<&'static PartitionSpec> {
        let spec = self.spec(name)?;
        if spec.kind != PartitionKind::Record {
            return Err(StorageError::WrongPartitionKind {
                partition: name.to_string(),
                expected: "record",
            });
        }
        Ok(spec)
    }

    fn put_record(&self, spec: &PartitionSpec, value: &Value) -> StorageResult<()> {
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StorageError::MissingId {
                partition: spec.name.to_string(),
            })?;
        let raw = encode(spec.name, value)?;

        // ON CONFLICT keeps the rowid, so insertion order survives an upsert
        let sql = format!(
            "INSERT INTO \"{}\" (id, data) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET data = excluded.data",
            spec.name
        );
        self.conn
            .execute(&sql, rusqlite::params![id, raw])
            .map_err(StorageError::from_sqlite)?;
        Ok(())
    }

    fn put_kv(&self, spec: &PartitionSpec, key: &str, value: &Value) -> StorageResult<()> {
        let raw = encode(spec.name, value)?;
        let sql = format!(
            "INSERT INTO \"{}\" (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            spec.name
        );
        self.conn
            .execute(&sql, rusqlite::params![key, raw])
            .map_err(StorageError::from_sqlite)?;
        Ok(())
    }

    fn query_values<P: rusqlite::Params>(
        &self,
        partition: &str,
        sql: &str,
        params: P,
    ) -> StorageResult<Vec<Value>> {
        let mut stmt = self.conn.prepare(sql).map_err(StorageError::from_sqlite)?;
        let rows = stmt
            .query_map(params, |row| row.get::<_, String>(0))
            .map_err(StorageError::from_sqlite)?;

        let mut values = Vec::new();
        for row in rows {
            let raw = row.map_err(StorageError::from_sqlite)?;
            values.push(decode(partition, &raw)?);
        }
        Ok(values)
    }
}

fn partition_lookup(name: &str) -> StorageResult<&'static PartitionSpec> {
    partition(name).ok_or_else(|| StorageError::UnknownPartition(name.to_string()))
}

fn encode(partition: &str, value: &Value) -> StorageResult<String> {
    serde_json::to_string(value).map_err(|source| StorageError::Encode {
        partition: partition.to_string(),
        source,
    })
}

fn decode(partition: &str, raw: &str) -> StorageResult<Value> {
    serde_json::from_str(raw).map_err(|source| StorageError::Decode {
        partition: partition.to_string(),
        source,
    })
}

/// Convert a JSON bound into a SQLite parameter for index range queries
fn index_param(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;
    match value {
        Value::Null => Sql::Null,
        Value::Bool(b) => Sql::Integer(*b as i64),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Sql::Integer(i),
            None => Sql::Real(n.as_f64().unwrap_or(0.0)),
        },
        Value::String(s) => Sql::Text(s.clone()),
        other => Sql::Text(other.to_string()),
    }
}
