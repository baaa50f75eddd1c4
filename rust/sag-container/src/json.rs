//! JSON documents describing a container tree.
//!
//! A document is a root group object:
//!
//! ```json
//! {
//!   "attributes": { "Snapshot": { "type": "int32", "value": 63 } },
//!   "children": {
//!     "Galaxies": {
//!       "kind": "group",
//!       "children": {
//!         "HaloMass": { "kind": "array", "dtype": "float32", "values": [1.5, 2.5] },
//!         "Pos": { "kind": "array", "dtype": "float32", "shape": [1, 3], "values": [0, 1, 2] },
//!         "Alias": { "kind": "link", "target": "/Galaxies/HaloMass" }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Array values are decoded only for the native scalar kinds; arrays of other
//! types are kept as opaque nodes with their declared shape.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use sag_common::{Result, error::Error, verify_data};
use serde::{Deserialize, Serialize};

use crate::{
    ArrayContainer, AttributeValue, ContainerDriver, Extent, ScalarKind, StoredType,
    TypedBuffer,
    memory::{MemoryArray, MemoryContainer, MemoryGroup, MemoryNode},
    path,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupDocument {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, NodeDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeDocument {
    Group(GroupDocument),
    Array(ArrayDocument),
    Typedef { dtype: String },
    Link { target: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayDocument {
    pub dtype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<u64>>,
    #[serde(default)]
    pub values: serde_json::Value,
}

impl MemoryContainer {
    /// Materializes a container from its document form.
    pub fn from_document(
        location: impl Into<String>,
        document: &GroupDocument,
    ) -> Result<MemoryContainer> {
        let mut container = MemoryContainer::new(location);
        load_group(&mut container, path::ROOT, document)?;
        Ok(container)
    }

    /// Returns the document form of this container.
    pub fn to_document(&self) -> GroupDocument {
        save_group(self.root())
    }

    /// Writes the document form of this container to `path` as JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .map_err(|e| Error::io(format!("create {}", path.display()), e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &self.to_document())
            .map_err(|e| Error::storage_access(path.display().to_string(), e.to_string()))?;
        writer
            .flush()
            .map_err(|e| Error::io(format!("write {}", path.display()), e))
    }
}

fn load_group(
    container: &mut MemoryContainer,
    group_path: &str,
    document: &GroupDocument,
) -> Result<()> {
    for (name, value) in &document.attributes {
        container.set_attribute(group_path, name.clone(), value.clone())?;
    }
    for (name, child) in &document.children {
        if name.is_empty() || name.contains('/') {
            return Err(Error::invalid_format(
                group_path,
                format!("invalid child name '{name}'"),
            ));
        }
        let child_path = path::join(group_path, name);
        match child {
            NodeDocument::Group(group) => {
                container.add_group(&child_path)?;
                load_group(container, &child_path, group)?;
            }
            NodeDocument::Array(array) => {
                container.add_array(&child_path, decode_array(&child_path, array)?)?;
            }
            NodeDocument::Typedef { dtype } => {
                container.add_typedef(&child_path, dtype.parse()?)?;
            }
            NodeDocument::Link { target } => {
                container.add_link(&child_path, target.clone())?;
            }
        }
    }
    Ok(())
}

fn decode_array(array_path: &str, document: &ArrayDocument) -> Result<MemoryArray> {
    let stored: StoredType = document.dtype.parse()?;
    let Some(kind) = ScalarKind::from_stored(&stored) else {
        let dims = document.shape.clone().unwrap_or_else(|| {
            vec![document.values.as_array().map_or(0, |v| v.len()) as u64]
        });
        return Ok(MemoryArray::opaque(stored, dims));
    };

    let values = &document.values;
    let decoded = match kind {
        ScalarKind::Int32 => Vec::<i32>::deserialize(values).map(TypedBuffer::Int32),
        ScalarKind::Int64 => Vec::<i64>::deserialize(values).map(TypedBuffer::Int64),
        ScalarKind::Float32 => Vec::<f32>::deserialize(values).map(TypedBuffer::Float32),
        ScalarKind::Float64 => Vec::<f64>::deserialize(values).map(TypedBuffer::Float64),
    }
    .map_err(|e| Error::invalid_format(array_path, e.to_string()))?;

    match &document.shape {
        Some(dims) => {
            verify_data!(shape, Extent::new(dims.clone()).element_count() == decoded.len() as u64);
            MemoryArray::with_shape(decoded, dims.clone())
        }
        None => Ok(MemoryArray::new(decoded)),
    }
}

fn save_group(group: &MemoryGroup) -> GroupDocument {
    let children = group
        .children
        .iter()
        .map(|(name, node)| {
            let node = match node {
                MemoryNode::Group(child) => NodeDocument::Group(save_group(child)),
                MemoryNode::Array(array) => NodeDocument::Array(save_array(array)),
                MemoryNode::TypeDef(stored) => NodeDocument::Typedef {
                    dtype: stored.to_string(),
                },
                MemoryNode::Link(target) => NodeDocument::Link {
                    target: target.clone(),
                },
            };
            (name.clone(), node)
        })
        .collect();
    GroupDocument {
        attributes: group.attributes.clone(),
        children,
    }
}

fn save_array(array: &MemoryArray) -> ArrayDocument {
    let values = match array.data() {
        Some(TypedBuffer::Int32(v)) => serde_json::Value::from(v.clone()),
        Some(TypedBuffer::Int64(v)) => serde_json::Value::from(v.clone()),
        Some(TypedBuffer::Float32(v)) => serde_json::Value::from(v.clone()),
        Some(TypedBuffer::Float64(v)) => serde_json::Value::from(v.clone()),
        None => serde_json::Value::Null,
    };
    let dims = &array.extent().dims;
    let shape = match (array.data(), dims.as_slice()) {
        (Some(data), [rows]) if *rows == data.len() as u64 => None,
        _ => Some(dims.clone()),
    };
    ArrayDocument {
        dtype: array.stored_type().to_string(),
        shape,
        values,
    }
}

/// Opens JSON container documents from the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonContainerDriver;

impl ContainerDriver for JsonContainerDriver {
    fn open_read_only(&self, path: &Path) -> Result<Box<dyn ArrayContainer>> {
        let location = path.display().to_string();
        let file = File::open(path).map_err(|e| Error::storage_access(&location, e.to_string()))?;
        let document: GroupDocument = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::storage_access(&location, e.to_string()))?;
        let container = MemoryContainer::from_document(location, &document)?;
        log::debug!("opened JSON container {}", container.location());
        Ok(Box::new(container))
    }
}
