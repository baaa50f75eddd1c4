//! Helpers for slash-separated node paths.

use std::borrow::Cow;

pub const ROOT: &str = "/";

/// Joins a child name onto a group path.
pub fn join(parent: &str, child: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{child}")
    } else {
        format!("{parent}/{child}")
    }
}

/// Returns the absolute form of a node name (leading `/`, no trailing `/`).
pub fn normalize(name: &str) -> Cow<'_, str> {
    let trimmed = if name.len() > 1 {
        name.trim_end_matches('/')
    } else {
        name
    };
    if trimmed.starts_with('/') {
        Cow::Borrowed(trimmed)
    } else {
        Cow::Owned(format!("/{trimmed}"))
    }
}

/// Splits an absolute path into its non-empty components.
pub fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|c| !c.is_empty())
}
