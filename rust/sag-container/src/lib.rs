//! Storage abstractions for hierarchical array containers:
//! - `ArrayContainer`: an opened, read-only container of groups, attributes and typed arrays.
//! - `ContainerDriver`: opens containers by path.
//!
//! Provides two implementations: memory-based (`MemoryContainer`) and a JSON document
//! loader (`JsonContainerDriver`) that materializes into the memory representation.

use std::{fmt, path::Path, str::FromStr};

use sag_common::{Result, error::Error};
use serde::{Deserialize, Serialize};

pub mod json;
pub mod memory;
pub mod path;

pub use json::JsonContainerDriver;
pub use memory::{MemoryArray, MemoryContainer, MemoryDriver};

/// A conceptual read-only container holding a tree of named nodes.
///
/// Nodes are addressed by slash-separated absolute paths (`/`, `/Galaxies`,
/// `/Galaxies/HaloMass`). Dropping the container closes the underlying handle.
pub trait ArrayContainer: Send {
    /// Returns the location this container was opened from.
    fn location(&self) -> &str;

    /// Lists the direct children of a group node, in the container's iteration
    /// order.
    ///
    /// Fails with `StorageAccess` if `node` does not exist or is not a group.
    fn list_children(&self, node: &str) -> Result<Vec<ChildEntry>>;

    /// Reads a scalar attribute attached to `node`.
    ///
    /// Fails with `MissingAttribute` if the attribute is absent.
    fn read_attribute(&self, node: &str, name: &str) -> Result<AttributeValue>;

    /// Returns the stored element type of an array node.
    fn stored_type(&self, array: &str) -> Result<StoredType>;

    /// Returns the dimensions of an array node.
    fn extent(&self, array: &str) -> Result<Extent>;

    /// Reads `count` rows starting at row `offset` from an array node.
    ///
    /// The returned buffer holds exactly `count` values unless the range extends
    /// beyond the end of the array, in which case it is truncated. Fails with
    /// `UnsupportedColumnType` if `kind` does not match the stored type.
    fn read_range(
        &self,
        array: &str,
        offset: u64,
        count: u64,
        kind: ScalarKind,
    ) -> Result<TypedBuffer>;
}

/// Opens containers for reading.
pub trait ContainerDriver: Send + Sync + 'static {
    /// Opens the container at `path` in read-only mode.
    fn open_read_only(&self, path: &Path) -> Result<Box<dyn ArrayContainer>>;
}

/// Classification of a child node within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Group,
    Array,
    TypeDef,
    Link,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    pub name: String,
    pub kind: NodeKind,
}

impl ChildEntry {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> ChildEntry {
        ChildEntry {
            name: name.into(),
            kind,
        }
    }
}

/// Element type of an array as recorded in the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredType {
    Integer { signed: bool, size: usize },
    Float { size: usize },
    /// Any other element class (strings, compounds, enums...), by label.
    Other(String),
}

impl StoredType {
    pub fn int(size: usize) -> StoredType {
        StoredType::Integer { signed: true, size }
    }

    pub fn uint(size: usize) -> StoredType {
        StoredType::Integer {
            signed: false,
            size,
        }
    }

    pub fn float(size: usize) -> StoredType {
        StoredType::Float { size }
    }
}

impl fmt::Display for StoredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoredType::Integer { signed: true, size } => write!(f, "int{}", size * 8),
            StoredType::Integer {
                signed: false,
                size,
            } => write!(f, "uint{}", size * 8),
            StoredType::Float { size } => write!(f, "float{}", size * 8),
            StoredType::Other(label) => f.write_str(label),
        }
    }
}

impl FromStr for StoredType {
    type Err = Error;

    fn from_str(s: &str) -> Result<StoredType> {
        let parse_bits = |bits: &str| -> Result<usize> {
            match bits {
                "8" => Ok(1),
                "16" => Ok(2),
                "32" => Ok(4),
                "64" => Ok(8),
                _ => Err(Error::invalid_format("dtype", s)),
            }
        };
        if let Some(bits) = s.strip_prefix("uint") {
            Ok(StoredType::uint(parse_bits(bits)?))
        } else if let Some(bits) = s.strip_prefix("int") {
            Ok(StoredType::int(parse_bits(bits)?))
        } else if let Some(bits) = s.strip_prefix("float") {
            Ok(StoredType::float(parse_bits(bits)?))
        } else if s.is_empty() {
            Err(Error::invalid_format("dtype", "empty type name"))
        } else {
            Ok(StoredType::Other(s.to_string()))
        }
    }
}

/// The closed set of native scalar kinds a column can be decoded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Int32,
    Int64,
    Float32,
    Float64,
}

impl ScalarKind {
    /// Maps a stored type onto a scalar kind, or `None` if the class/width
    /// combination has no native counterpart.
    pub fn from_stored(stored: &StoredType) -> Option<ScalarKind> {
        match *stored {
            StoredType::Integer { signed: true, size: 4 } => Some(ScalarKind::Int32),
            StoredType::Integer { signed: true, size: 8 } => Some(ScalarKind::Int64),
            StoredType::Float { size: 4 } => Some(ScalarKind::Float32),
            StoredType::Float { size: 8 } => Some(ScalarKind::Float64),
            _ => None,
        }
    }

    pub fn stored_type(&self) -> StoredType {
        match self {
            ScalarKind::Int32 => StoredType::int(4),
            ScalarKind::Int64 => StoredType::int(8),
            ScalarKind::Float32 => StoredType::float(4),
            ScalarKind::Float64 => StoredType::float(8),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.stored_type().fmt(f)
    }
}

/// Dimensions of an array node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extent {
    pub dims: Vec<u64>,
}

impl Extent {
    pub fn new(dims: impl Into<Vec<u64>>) -> Extent {
        Extent { dims: dims.into() }
    }

    /// Number of rows (the length of the leading dimension), if the extent is
    /// column-shaped: rank 1, or rank 2 with a trailing dimension of 1.
    pub fn column_rows(&self) -> Option<u64> {
        match self.dims.as_slice() {
            [rows] => Some(*rows),
            [rows, 1] => Some(*rows),
            _ => None,
        }
    }

    /// Total number of elements.
    pub fn element_count(&self) -> u64 {
        self.dims.iter().product()
    }
}

/// An owned, typed buffer of column values.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedBuffer {
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

impl TypedBuffer {
    pub fn kind(&self) -> ScalarKind {
        match self {
            TypedBuffer::Int32(_) => ScalarKind::Int32,
            TypedBuffer::Int64(_) => ScalarKind::Int64,
            TypedBuffer::Float32(_) => ScalarKind::Float32,
            TypedBuffer::Float64(_) => ScalarKind::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TypedBuffer::Int32(v) => v.len(),
            TypedBuffer::Int64(v) => v.len(),
            TypedBuffer::Float32(v) => v.len(),
            TypedBuffer::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the elements in `range` into a new buffer of the same kind.
    pub fn slice(&self, range: std::ops::Range<usize>) -> TypedBuffer {
        match self {
            TypedBuffer::Int32(v) => TypedBuffer::Int32(v[range].to_vec()),
            TypedBuffer::Int64(v) => TypedBuffer::Int64(v[range].to_vec()),
            TypedBuffer::Float32(v) => TypedBuffer::Float32(v[range].to_vec()),
            TypedBuffer::Float64(v) => TypedBuffer::Float64(v[range].to_vec()),
        }
    }
}

/// A scalar attribute value attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum AttributeValue {
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
}

impl AttributeValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::Int32(_) => "int32",
            AttributeValue::Int64(_) => "int64",
            AttributeValue::Float32(_) => "float32",
            AttributeValue::Float64(_) => "float64",
            AttributeValue::String(_) => "string",
        }
    }
}
