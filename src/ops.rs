use tracing::debug;

use crate::error::{PathError, Result};
use crate::path::{resolve, segments, Spine};
use crate::tree::{Container, Seq, Value};

fn require_object(op: &'static str, obj: &Value) -> Result<()> {
    if obj.is_container() {
        Ok(())
    } else {
        Err(PathError::not_an_object(op))
    }
}

/// Read the value at `path`. Absence at any level is `Ok(None)`.
///
/// Nothing is copied: a container in the result is the same container
/// that lives inside `obj`.
pub fn get_path(obj: &Value, path: &str) -> Result<Option<Value>> {
    require_object("get_path", obj)?;
    if path.is_empty() {
        return Ok(None);
    }

    let mut value = obj.clone();
    for part in segments(path) {
        match value.get(part) {
            Some(child) => value = child,
            None => return Ok(None),
        }
    }
    Ok(Some(value))
}

/// Return a new structure with `value` stored at `path`, creating
/// intermediate mappings as needed.
pub fn set_path(old: &Value, path: &str, value: Value) -> Result<Value> {
    require_object("set_path", old)?;
    let Spine { root, cursor, key } = resolve(old, path)?;
    cursor.insert(key, value)?;
    Ok(root)
}

/// Return a new structure without the final key of `path`. A missing key
/// still yields a new root with a copied spine.
pub fn delete_path(old: &Value, path: &str) -> Result<Value> {
    require_object("delete_path", old)?;
    let Spine { root, cursor, key } = resolve(old, path)?;
    cursor.remove(key)?;
    Ok(root)
}

/// Replace the value at `path` with `transform(current)`. The current value
/// is `None` when the key is absent.
pub fn transform_path<F>(old: &Value, path: &str, transform: F) -> Result<Value>
where
    F: FnOnce(Option<&Value>) -> Value,
{
    require_object("transform_path", old)?;
    let Spine { root, cursor, key } = resolve(old, path)?;
    let current = cursor.get(key);
    cursor.insert(key, transform(current.as_ref()))?;
    Ok(root)
}

/// Replace the sequence at `path` with `f` applied to each element.
pub fn map_path<F>(old: &Value, path: &str, mut f: F) -> Result<Value>
where
    F: FnMut(&Value, usize) -> Value,
{
    update_sequence("map_path", old, path, |items| {
        items.iter().enumerate().map(|(i, v)| f(v, i)).collect()
    })
}

/// Replace the sequence at `path` with the elements for which `keep`
/// returns true. Kept elements are shared with the original.
pub fn filter_path<F>(old: &Value, path: &str, mut keep: F) -> Result<Value>
where
    F: FnMut(&Value, usize) -> bool,
{
    update_sequence("filter_path", old, path, |items| {
        items
            .into_iter()
            .enumerate()
            .filter(|(i, v)| keep(v, *i))
            .map(|(_, v)| v)
            .collect()
    })
}

/// Replace the sequence at `path` with its elements followed by `values`.
pub fn push_path<I>(old: &Value, path: &str, values: I) -> Result<Value>
where
    I: IntoIterator<Item = Value>,
{
    update_sequence("push_path", old, path, |mut items| {
        items.extend(values);
        items
    })
}

/// Shared body of the sequence operations. `build` receives a snapshot of
/// the current elements and returns the elements of the new sequence.
fn update_sequence<B>(op: &'static str, old: &Value, path: &str, build: B) -> Result<Value>
where
    B: FnOnce(Seq) -> Seq,
{
    require_object(op, old)?;
    let Spine { root, cursor, key } = resolve(old, path)?;

    let items = match cursor.get(key) {
        Some(Value::Seq(current)) => current.borrow().clone(),
        other => {
            debug!(
                op,
                path,
                found = ?other.as_ref().map(|v| v.kind()),
                "target is not a sequence"
            );
            return Err(PathError::not_an_array(op, path));
        }
    };

    cursor.insert(key, Value::Seq(Container::new(build(items))))?;
    Ok(root)
}
