//! Per-file metadata read from the root attributes.

use sag_common::{Result, error::Error};
use sag_container::{ArrayContainer, AttributeValue};
use serde::Serialize;

pub const SNAPSHOT_ATTRIBUTE: &str = "Snapshot";
pub const REDSHIFT_ATTRIBUTE: &str = "Redshift";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SnapshotMeta {
    pub snapshot: i32,
    pub redshift: f32,
}

/// Everything about the open file that is constant across its rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FileMeta {
    pub file_number: i32,
    pub snapshot: i32,
    pub redshift: f32,
}

impl FileMeta {
    pub fn new(file_number: i32, meta: SnapshotMeta) -> FileMeta {
        FileMeta {
            file_number,
            snapshot: meta.snapshot,
            redshift: meta.redshift,
        }
    }
}

/// Reads the snapshot index and redshift attached to `root`.
pub fn load_meta(container: &dyn ArrayContainer, root: &str) -> Result<SnapshotMeta> {
    let snapshot = match container.read_attribute(root, SNAPSHOT_ATTRIBUTE)? {
        AttributeValue::Int32(v) => v,
        AttributeValue::Int64(v) => i32::try_from(v).map_err(|_| {
            Error::missing_attribute(root, SNAPSHOT_ATTRIBUTE, format!("{v} does not fit int32"))
        })?,
        other => {
            return Err(unexpected_type(root, SNAPSHOT_ATTRIBUTE, &other));
        }
    };
    let redshift = match container.read_attribute(root, REDSHIFT_ATTRIBUTE)? {
        AttributeValue::Float32(v) => v,
        AttributeValue::Float64(v) => v as f32,
        other => {
            return Err(unexpected_type(root, REDSHIFT_ATTRIBUTE, &other));
        }
    };
    Ok(SnapshotMeta { snapshot, redshift })
}

fn unexpected_type(node: &str, name: &str, value: &AttributeValue) -> Error {
    Error::missing_attribute(
        node,
        name,
        format!("unexpected attribute type {}", value.type_name()),
    )
}
