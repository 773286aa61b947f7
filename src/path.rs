//! Path splitting and the copy-on-the-way-down resolver shared by every
//! mutating operation.

use tracing::trace;

use crate::error::Result;
use crate::tree::Value;

/// Separator between path segments. There is no escape for it.
pub const PATH_DELIMITER: char = '.';

/// Split a path into its literal segments. `""` is a single empty segment.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(PATH_DELIMITER)
}

/// The result of resolving a path for writing.
///
/// `root` is the new root; every container from it down to `cursor` is a
/// fresh shallow copy, linked to the next copy down. `cursor` is the copy
/// of the target's immediate parent and `key` is the final segment.
pub(crate) struct Spine<'p> {
    pub root: Value,
    pub cursor: Value,
    pub key: &'p str,
}

/// Copy the spine of `path` in `root` and hand back the cursor.
///
/// `root` is never touched. Missing or scalar intermediate values are
/// replaced by empty mappings in the copy.
pub(crate) fn resolve<'p>(root: &Value, path: &'p str) -> Result<Spine<'p>> {
    let mut parts: Vec<&'p str> = segments(path).collect();
    // split always yields at least one segment
    let key = parts.pop().unwrap_or_default();

    let new_root = Value::shallow_copy(Some(root));
    let mut cursor = new_root.clone();

    for part in &parts {
        let child = Value::shallow_copy(cursor.get(part).as_ref());
        cursor.insert(part, child.clone())?;
        cursor = child;
    }

    trace!(path, depth = parts.len(), "copied spine");

    Ok(Spine {
        root: new_root,
        cursor,
        key,
    })
}
