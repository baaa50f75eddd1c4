//! Recursive enumeration of the array leaves of a container.

use sag_common::Result;
use sag_container::{ArrayContainer, NodeKind, path};

enum Visit {
    Group(String),
    Array(String),
}

/// Returns the fully qualified names of all arrays beneath `root`.
///
/// Children are visited in the order the container lists them, depth first.
/// Links and type definitions are skipped. Fails with `StorageAccess` if a
/// group cannot be listed.
pub fn scan(container: &dyn ArrayContainer, root: &str) -> Result<Vec<String>> {
    let mut columns = Vec::new();
    let mut stack = vec![Visit::Group(path::normalize(root).into_owned())];
    while let Some(visit) = stack.pop() {
        let group = match visit {
            Visit::Array(name) => {
                columns.push(name);
                continue;
            }
            Visit::Group(group) => group,
        };
        let children = container.list_children(&group)?;
        // Reversed so the first listed child is popped first.
        for child in children.into_iter().rev() {
            let name = path::join(&group, &child.name);
            log::trace!("scan: {name} ({:?})", child.kind);
            match child.kind {
                NodeKind::Group => stack.push(Visit::Group(name)),
                NodeKind::Array => stack.push(Visit::Array(name)),
                NodeKind::TypeDef | NodeKind::Link => (),
            }
        }
    }
    Ok(columns)
}
