//! Bookkeeping for the file references a record owns.
//!
//! Nothing here touches the filesystem. The tracker only decides which path
//! strings a record should hold next and which files stop being referenced;
//! callers persist the record first and unlink afterwards, so a crash in
//! between leaves an orphaned file rather than a dangling reference.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::schema::{Cardinality, FieldError, KindSchema};

/// Stored paths of freshly committed uploads, keyed by attachment field.
pub type CommittedUploads = BTreeMap<String, Vec<String>>;

/// Outcome of moving a single-file field to its next value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleChange {
    pub next: Option<String>,
    pub superseded: Option<String>,
}

/// Replace a single-file reference.
///
/// Without an upload the current reference is kept; absence never clears.
pub fn replace_single(current: Option<&str>, upload: Option<String>) -> SingleChange {
    match upload {
        None => SingleChange {
            next: current.map(str::to_string),
            superseded: None,
        },
        Some(new) => SingleChange {
            superseded: current.filter(|old| *old != new).map(str::to_string),
            next: Some(new),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryChange {
    pub next: Vec<String>,
    /// Entries of the existing list that were dropped.
    pub removed: Vec<String>,
}

/// Drop every entry named in `remove`, then append `added`.
///
/// Survivors keep their relative order. Entries of `remove` that the list
/// does not hold are ignored.
pub fn revise_gallery(existing: &[String], remove: &[String], added: Vec<String>) -> GalleryChange {
    let (removed, mut next): (Vec<String>, Vec<String>) = existing
        .iter()
        .cloned()
        .partition(|path| remove.contains(path));
    next.extend(added);

    let mut removed_unique = Vec::with_capacity(removed.len());
    for path in removed {
        if !removed_unique.contains(&path) {
            removed_unique.push(path);
        }
    }

    GalleryChange {
        next,
        removed: removed_unique,
    }
}

/// Field assignments plus the filesystem work that follows a record write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttachmentPlan {
    /// Attachment values to write with the record.
    pub assignments: Map<String, Value>,
    /// Files no longer referenced once the write succeeds.
    pub superseded: Vec<String>,
    /// Files committed for this request; unreferenced if the write fails.
    pub introduced: Vec<String>,
}

impl AttachmentPlan {
    pub fn for_create(schema: &KindSchema, mut uploads: CommittedUploads) -> Self {
        let mut plan = AttachmentPlan::default();
        for field in schema.attachments {
            let added = uploads.remove(field.name).unwrap_or_default();
            plan.introduced.extend(added.iter().cloned());
            match field.cardinality {
                Cardinality::Single => {
                    if let Some(path) = added.into_iter().next() {
                        plan.assignments
                            .insert(field.name.to_string(), Value::String(path));
                    }
                }
                Cardinality::Gallery => {
                    plan.assignments
                        .insert(field.name.to_string(), string_array(added));
                }
            }
        }
        plan
    }

    /// Plan the update of every attachment field of `current`.
    ///
    /// `removals` maps gallery field names to the paths the client asked to
    /// drop. Fields with neither an upload nor a removal are not assigned, so
    /// their stored value is left alone.
    pub fn for_update(
        schema: &KindSchema,
        current: &Map<String, Value>,
        mut uploads: CommittedUploads,
        removals: &BTreeMap<String, Vec<String>>,
    ) -> Self {
        let mut plan = AttachmentPlan::default();
        for field in schema.attachments {
            let added = uploads.remove(field.name).unwrap_or_default();
            plan.introduced.extend(added.iter().cloned());
            match field.cardinality {
                Cardinality::Single => {
                    let stored = current.get(field.name).and_then(Value::as_str);
                    let change = replace_single(stored, added.into_iter().next());
                    if let Some(next) = change.next.filter(|next| Some(next.as_str()) != stored) {
                        plan.assignments
                            .insert(field.name.to_string(), Value::String(next));
                    }
                    plan.superseded.extend(change.superseded);
                }
                Cardinality::Gallery => {
                    let remove = removals.get(field.name).map(Vec::as_slice).unwrap_or(&[]);
                    if remove.is_empty() && added.is_empty() {
                        continue;
                    }
                    let existing = paths_of(current.get(field.name));
                    let change = revise_gallery(&existing, remove, added);
                    plan.assignments
                        .insert(field.name.to_string(), string_array(change.next));
                    plan.superseded.extend(change.removed);
                }
            }
        }
        plan
    }
}

/// Every file a record references, for purging when it is deleted.
pub fn owned_paths(schema: &KindSchema, fields: &Map<String, Value>) -> Vec<String> {
    schema
        .attachments
        .iter()
        .flat_map(|field| paths_of(fields.get(field.name)))
        .filter(|path| !path.is_empty())
        .collect()
}

/// Reject uploads sent under a key that is not an attachment field, and
/// more than one upload for a single-file field.
pub fn check_uploads<'a, I>(schema: &KindSchema, fields: I) -> Result<(), FieldError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for name in fields {
        *counts.entry(name).or_default() += 1;
    }
    for (name, count) in counts {
        let field = schema
            .attachment(name)
            .ok_or_else(|| FieldError::UnexpectedUpload(name.to_string()))?;
        if field.cardinality == Cardinality::Single && count > 1 {
            return Err(FieldError::TooManyUploads(field.name));
        }
    }
    Ok(())
}

fn paths_of(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(path)) => vec![path.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn string_array(paths: Vec<String>) -> Value {
    Value::Array(paths.into_iter().map(Value::String).collect())
}

/// What happened when unreferenced files were unlinked.
///
/// Cleanup never fails the operation that triggered it; the report exists so
/// callers can log and count orphans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: Vec<String>,
    /// Already gone, e.g. removed by a concurrent request.
    pub missing: Vec<String>,
    /// Path and error text for files that could not be unlinked.
    pub failed: Vec<(String, String)>,
}
