//! Folder deletion cascade
//!
//! Folders group either notes or journal entries. Deleting one is a
//! two-phase cascade: first every member record is reassigned to "no
//! folder" so nothing is orphaned against a dead folder id, then the
//! folder record itself is removed. Consumers see the result after one
//! version bump.

use serde_json::Value;

use crate::models::{now_millis, Folder, FolderKind};
use crate::storage::{StorageEngine, StorageResult};
use crate::version::DataVersion;

fn member_partition(kind: FolderKind) -> &'static str {
    match kind {
        FolderKind::Note => "notes",
        FolderKind::Journal => "journal",
    }
}

/// Delete a folder, unfiling its members first.
///
/// Members keep all their other fields; only `folderId` is cleared and
/// `updatedAt` stamped. A missing folder id is a silent no-op and does not
/// bump the version.
pub fn delete_folder(
    engine: &StorageEngine,
    versions: &DataVersion,
    folder_id: &str,
) -> StorageResult<()> {
    let Some(value) = engine.get("folders", folder_id)? else {
        return Ok(());
    };
    let folder: Folder =
        serde_json::from_value(value).map_err(|source| crate::storage::StorageError::Decode {
            partition: "folders".to_string(),
            source,
        })?;
    let partition = member_partition(folder.kind);

    let mut members: Vec<Value> = engine
        .get_all(partition)?
        .into_iter()
        .filter(|record| record.get("folderId").and_then(Value::as_str) == Some(folder_id))
        .collect();
    let stamp = now_millis();
    for record in &mut members {
        if let Some(fields) = record.as_object_mut() {
            fields.insert("folderId".to_string(), Value::Null);
            fields.insert("updatedAt".to_string(), stamp.into());
        }
    }

    if !members.is_empty() {
        engine.put_all(partition, &members)?;
    }
    engine.delete("folders", folder_id)?;

    tracing::debug!(folder = folder_id, unfiled = members.len(), "folder deleted");
    versions.bump();
    Ok(())
}
