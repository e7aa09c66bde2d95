//! Field-level comparison of two snapshots.

use serde_json::Value;

use crate::audit::{Changes, FieldChange};
use crate::entity::Snapshot;

/// Compares every field of `before` (except `excluded`) with `after`.
///
/// Changes keep the field order of `before`, which for snapshots taken
/// with [`snapshot_of`](crate::entity::snapshot_of) is declaration order.
///
/// Values are compared by their string form; `null` and missing values map
/// to `None`, which differs from every real value including `"null"`. A
/// field whose value cannot be stringified is skipped.
///
/// # Examples
///
/// ```
/// use audit_scope::tracker::diff_snapshots;
/// use serde_json::json;
///
/// let before = json!({ "id": 1, "phone": "111", "age": 30 });
/// let after = json!({ "id": 1, "phone": "222", "age": 30 });
///
/// let changes = diff_snapshots(
///     before.as_object().unwrap(),
///     after.as_object().unwrap(),
///     &["id".to_string()],
/// );
///
/// assert_eq!(changes.len(), 1);
/// assert_eq!(changes["phone"].before(), Some("111"));
/// assert_eq!(changes["phone"].after(), Some("222"));
/// ```
pub fn diff_snapshots(before: &Snapshot, after: &Snapshot, excluded: &[String]) -> Changes {
    let mut changes = Changes::new();

    for (field, old) in before {
        if excluded.iter().any(|name| name == field) {
            continue;
        }

        let (old, new) = match (stringify(Some(old)), stringify(after.get(field))) {
            (Ok(old), Ok(new)) => (old, new),
            (Err(err), _) | (_, Err(err)) => {
                tracing::debug!(field = %field, error = %err, "field skipped in diff");
                continue;
            }
        };

        if old != new {
            changes.insert(field.clone(), FieldChange(old, new));
        }
    }

    changes
}

fn stringify(value: Option<&Value>) -> Result<Option<String>, serde_json::Error> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(nested) => serde_json::to_string(nested).map(Some),
    }
}
