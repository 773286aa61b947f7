use std::collections::HashSet;

use tracing::{debug, trace};

use crate::error::{PathError, Result};
use crate::tree::Value;

/// Freeze `root` and every container reachable from it, in place.
///
/// Afterwards `insert`, `remove` and `push` on any of those containers
/// fail with [`PathError::Frozen`]. Cycles and containers frozen by an
/// earlier call are skipped, so the walk always terminates.
pub fn deep_freeze(root: &Value) -> Result<()> {
    if !root.is_container() {
        return Err(PathError::not_an_object("deep_freeze"));
    }

    let mut visited = HashSet::new();
    freeze_node(root, &mut visited);
    debug!(containers = visited.len(), "deep freeze finished");
    Ok(())
}

fn freeze_node(node: &Value, visited: &mut HashSet<*const ()>) {
    let addr = match node {
        Value::Scalar(_) => return,
        Value::Map(c) => c.addr(),
        Value::Seq(c) => c.addr(),
    };

    if node.is_frozen() {
        trace!(?addr, "already frozen");
        return;
    }
    if !visited.insert(addr) {
        trace!(?addr, "cycle");
        return;
    }

    // Children first; the node stays mutable until its subtree is done.
    for child in node.children() {
        freeze_node(&child, visited);
    }

    match node {
        Value::Map(c) => c.freeze(),
        Value::Seq(c) => c.freeze(),
        Value::Scalar(_) => {}
    }
}
