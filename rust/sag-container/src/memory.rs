use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use sag_common::{Result, error::Error, verify_arg};

use crate::{
    ArrayContainer, AttributeValue, ChildEntry, ContainerDriver, Extent, NodeKind, ScalarKind,
    StoredType, TypedBuffer, path,
};

/// An array node held in memory.
///
/// Arrays whose stored type has no native scalar kind carry no values; they
/// can be listed and described, but not read.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryArray {
    stored: StoredType,
    extent: Extent,
    data: Option<TypedBuffer>,
}

impl MemoryArray {
    /// Creates a one-dimensional array over `data`.
    pub fn new(data: TypedBuffer) -> MemoryArray {
        MemoryArray {
            stored: data.kind().stored_type(),
            extent: Extent::new([data.len() as u64]),
            data: Some(data),
        }
    }

    /// Creates an array over `data` with explicit dimensions, laid out row-major.
    pub fn with_shape(data: TypedBuffer, dims: impl Into<Vec<u64>>) -> Result<MemoryArray> {
        let extent = Extent::new(dims);
        verify_arg!(dims, extent.element_count() == data.len() as u64);
        Ok(MemoryArray {
            stored: data.kind().stored_type(),
            extent,
            data: Some(data),
        })
    }

    /// Creates an array of a type without a native representation.
    pub fn opaque(stored: StoredType, dims: impl Into<Vec<u64>>) -> MemoryArray {
        MemoryArray {
            stored,
            extent: Extent::new(dims),
            data: None,
        }
    }

    pub fn stored_type(&self) -> &StoredType {
        &self.stored
    }

    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    pub fn data(&self) -> Option<&TypedBuffer> {
        self.data.as_ref()
    }
}

#[derive(Debug, Clone)]
pub(crate) enum MemoryNode {
    Group(MemoryGroup),
    Array(MemoryArray),
    TypeDef(StoredType),
    Link(String),
}

impl MemoryNode {
    fn kind(&self) -> NodeKind {
        match self {
            MemoryNode::Group(_) => NodeKind::Group,
            MemoryNode::Array(_) => NodeKind::Array,
            MemoryNode::TypeDef(_) => NodeKind::TypeDef,
            MemoryNode::Link(_) => NodeKind::Link,
        }
    }
}

/// Children are kept in name order, matching the name-indexed iteration of
/// hierarchical array formats.
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryGroup {
    pub(crate) attributes: BTreeMap<String, AttributeValue>,
    pub(crate) children: BTreeMap<String, MemoryNode>,
}

/// A container whose whole tree lives in memory.
///
/// Cloning is cheap until the clone is modified.
#[derive(Debug, Clone)]
pub struct MemoryContainer {
    location: String,
    root: Arc<MemoryGroup>,
    _handle: Option<HandleGuard>,
}

impl MemoryContainer {
    pub fn new(location: impl Into<String>) -> MemoryContainer {
        MemoryContainer {
            location: location.into(),
            root: Default::default(),
            _handle: None,
        }
    }

    pub(crate) fn root(&self) -> &MemoryGroup {
        &self.root
    }

    /// Creates a group (and any missing parent groups).
    pub fn add_group(&mut self, group_path: &str) -> Result<()> {
        self.group_mut(group_path, true).map(|_| ())
    }

    /// Adds an array node at `array_path`, creating missing parent groups.
    pub fn add_array(&mut self, array_path: &str, array: MemoryArray) -> Result<()> {
        self.insert(array_path, MemoryNode::Array(array))
    }

    /// Adds a named type definition.
    pub fn add_typedef(&mut self, typedef_path: &str, stored: StoredType) -> Result<()> {
        self.insert(typedef_path, MemoryNode::TypeDef(stored))
    }

    /// Adds a soft link pointing at `target`.
    pub fn add_link(&mut self, link_path: &str, target: impl Into<String>) -> Result<()> {
        self.insert(link_path, MemoryNode::Link(target.into()))
    }

    /// Sets (or replaces) an attribute on a group node.
    pub fn set_attribute(
        &mut self,
        group_path: &str,
        name: impl Into<String>,
        value: AttributeValue,
    ) -> Result<()> {
        self.group_mut(group_path, false)?
            .attributes
            .insert(name.into(), value);
        Ok(())
    }

    fn insert(&mut self, node_path: &str, node: MemoryNode) -> Result<()> {
        let node_path = path::normalize(node_path);
        let (parent, name) = node_path
            .rsplit_once('/')
            .filter(|(_, name)| !name.is_empty())
            .ok_or_else(|| Error::invalid_arg("node_path", "cannot replace the root group"))?;
        let parent = if parent.is_empty() { path::ROOT } else { parent };
        let group = self.group_mut(parent, true)?;
        if group.children.contains_key(name) {
            return Err(Error::invalid_arg(
                "node_path",
                format!("'{node_path}' already exists"),
            ));
        }
        group.children.insert(name.to_string(), node);
        Ok(())
    }

    fn group_mut(&mut self, group_path: &str, create: bool) -> Result<&mut MemoryGroup> {
        let mut group = Arc::make_mut(&mut self.root);
        for component in path::components(group_path) {
            if create && !group.children.contains_key(component) {
                group.children.insert(
                    component.to_string(),
                    MemoryNode::Group(MemoryGroup::default()),
                );
            }
            group = match group.children.get_mut(component) {
                Some(MemoryNode::Group(child)) => child,
                Some(_) => {
                    return Err(Error::invalid_arg(
                        "group_path",
                        format!("'{component}' in '{group_path}' is not a group"),
                    ));
                }
                None => {
                    return Err(Error::invalid_arg(
                        "group_path",
                        format!("'{group_path}' does not exist"),
                    ));
                }
            };
        }
        Ok(group)
    }

    fn find_group(&self, group_path: &str) -> Option<&MemoryGroup> {
        let mut group = self.root.as_ref();
        for component in path::components(group_path) {
            match group.children.get(component)? {
                MemoryNode::Group(child) => group = child,
                _ => return None,
            }
        }
        Some(group)
    }

    fn find_node(&self, node_path: &str) -> Option<&MemoryNode> {
        let node_path = path::normalize(node_path);
        let (parent, name) = node_path.rsplit_once('/')?;
        self.find_group(parent)?.children.get(name)
    }

    fn array(&self, array_path: &str) -> Result<&MemoryArray> {
        match self.find_node(array_path) {
            Some(MemoryNode::Array(array)) => Ok(array),
            Some(other) => Err(Error::storage_access(
                array_path,
                format!("node is a {:?}, not an array", other.kind()),
            )),
            None => Err(Error::storage_access(array_path, "no such array")),
        }
    }
}

impl ArrayContainer for MemoryContainer {
    fn location(&self) -> &str {
        &self.location
    }

    fn list_children(&self, node: &str) -> Result<Vec<ChildEntry>> {
        let group = self
            .find_group(node)
            .ok_or_else(|| Error::storage_access(node, "no such group"))?;
        Ok(group
            .children
            .iter()
            .map(|(name, child)| ChildEntry::new(name.clone(), child.kind()))
            .collect())
    }

    fn read_attribute(&self, node: &str, name: &str) -> Result<AttributeValue> {
        let group = self
            .find_group(node)
            .ok_or_else(|| Error::missing_attribute(node, name, "no such group"))?;
        group
            .attributes
            .get(name)
            .cloned()
            .ok_or_else(|| Error::missing_attribute(node, name, "attribute not found"))
    }

    fn stored_type(&self, array: &str) -> Result<StoredType> {
        Ok(self.array(array)?.stored.clone())
    }

    fn extent(&self, array: &str) -> Result<Extent> {
        Ok(self.array(array)?.extent.clone())
    }

    fn read_range(
        &self,
        array: &str,
        offset: u64,
        count: u64,
        kind: ScalarKind,
    ) -> Result<TypedBuffer> {
        let node = self.array(array)?;
        if ScalarKind::from_stored(&node.stored) != Some(kind) {
            return Err(Error::unsupported_column_type(
                array,
                node.stored.to_string(),
            ));
        }
        let rows = node
            .extent
            .column_rows()
            .ok_or_else(|| Error::unsupported_shape(array, &node.extent.dims))?;
        let data = node
            .data
            .as_ref()
            .ok_or_else(|| Error::storage_access(array, "array values are not materialized"))?;
        let start = offset.min(rows) as usize;
        let end = offset.saturating_add(count).min(rows) as usize;
        Ok(data.slice(start..end))
    }
}

/// Counts live container handles opened through a `MemoryDriver`.
#[derive(Debug)]
struct HandleGuard(Arc<AtomicUsize>);

impl HandleGuard {
    fn new(counter: &Arc<AtomicUsize>) -> HandleGuard {
        counter.fetch_add(1, Ordering::SeqCst);
        HandleGuard(counter.clone())
    }
}

impl Clone for HandleGuard {
    fn clone(&self) -> Self {
        HandleGuard::new(&self.0)
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A driver serving `MemoryContainer`s registered under file paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryDriver {
    containers: HashMap<PathBuf, MemoryContainer>,
    open_handles: Arc<AtomicUsize>,
}

impl MemoryDriver {
    pub fn new() -> MemoryDriver {
        Default::default()
    }

    pub fn with_container(
        mut self,
        path: impl Into<PathBuf>,
        container: MemoryContainer,
    ) -> MemoryDriver {
        self.containers.insert(path.into(), container);
        self
    }

    /// Number of containers opened by this driver and not yet dropped.
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }
}

impl ContainerDriver for MemoryDriver {
    fn open_read_only(&self, path: &Path) -> Result<Box<dyn ArrayContainer>> {
        let container = self.containers.get(path).ok_or_else(|| {
            Error::storage_access(path.display().to_string(), "no such container")
        })?;
        let mut opened = container.clone();
        opened._handle = Some(HandleGuard::new(&self.open_handles));
        Ok(Box::new(opened))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use sag_common::error::ErrorKind;

    use crate::{
        ArrayContainer, AttributeValue, ContainerDriver, Extent, NodeKind, ScalarKind,
        StoredType, TypedBuffer,
    };

    use super::{MemoryArray, MemoryContainer, MemoryDriver};

    fn sample() -> MemoryContainer {
        let mut container = MemoryContainer::new("mem://sample");
        container
            .set_attribute("/", "Snapshot", AttributeValue::Int32(63))
            .unwrap();
        container
            .add_array(
                "/Galaxies/GalaxyID",
                MemoryArray::new(TypedBuffer::Int64((0..10).collect())),
            )
            .unwrap();
        container
            .add_array(
                "/Galaxies/Mass",
                MemoryArray::with_shape(
                    TypedBuffer::Float32((0..10).map(|i| i as f32).collect()),
                    [10, 1],
                )
                .unwrap(),
            )
            .unwrap();
        container.add_link("/Galaxies/Alias", "/Galaxies/Mass").unwrap();
        container.add_typedef("/MassType", StoredType::float(4)).unwrap();
        container
    }

    #[test]
    fn test_list_children_in_name_order() {
        let container = sample();
        let root = container.list_children("/").unwrap();
        let names = root.iter().map(|c| c.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["Galaxies", "MassType"]);
        assert_eq!(root[0].kind, NodeKind::Group);
        assert_eq!(root[1].kind, NodeKind::TypeDef);

        let galaxies = container.list_children("/Galaxies").unwrap();
        let kinds = galaxies.iter().map(|c| c.kind).collect::<Vec<_>>();
        assert_eq!(kinds, [NodeKind::Link, NodeKind::Array, NodeKind::Array]);

        let err = container.list_children("/Nope").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::StorageAccess { .. }));
    }

    #[test]
    fn test_read_range() {
        let container = sample();
        let buf = container
            .read_range("/Galaxies/GalaxyID", 8, 6, ScalarKind::Int64)
            .unwrap();
        assert_eq!(buf, TypedBuffer::Int64(vec![8, 9]));

        let buf = container
            .read_range("Galaxies/Mass", 2, 3, ScalarKind::Float32)
            .unwrap();
        assert_eq!(buf, TypedBuffer::Float32(vec![2.0, 3.0, 4.0]));
        assert_eq!(
            container.extent("/Galaxies/Mass").unwrap(),
            Extent::new([10, 1])
        );

        let err = container
            .read_range("/Galaxies/Mass", 0, 1, ScalarKind::Float64)
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnsupportedColumnType { .. }));
    }

    #[test]
    fn test_attributes() {
        let container = sample();
        assert_eq!(
            container.read_attribute("/", "Snapshot").unwrap(),
            AttributeValue::Int32(63)
        );
        let err = container.read_attribute("/", "Redshift").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::MissingAttribute { .. }));
    }

    #[test]
    fn test_duplicate_and_invalid_inserts() {
        let mut container = sample();
        assert!(
            container
                .add_array(
                    "/Galaxies/GalaxyID",
                    MemoryArray::new(TypedBuffer::Int64(vec![]))
                )
                .is_err()
        );
        assert!(
            container
                .add_array("/Galaxies/Mass/X", MemoryArray::new(TypedBuffer::Int64(vec![])))
                .is_err()
        );
        assert!(
            MemoryArray::with_shape(TypedBuffer::Int32(vec![1, 2, 3]), [2, 2]).is_err()
        );
    }

    #[test]
    fn test_driver_tracks_open_handles() {
        let driver = MemoryDriver::new().with_container("/data/a.h5", sample());
        assert_eq!(driver.open_handles(), 0);
        let first = driver.open_read_only(Path::new("/data/a.h5")).unwrap();
        let second = driver.open_read_only(Path::new("/data/a.h5")).unwrap();
        assert_eq!(first.location(), "mem://sample");
        assert_eq!(driver.open_handles(), 2);
        drop(first);
        assert_eq!(driver.open_handles(), 1);
        drop(second);
        assert_eq!(driver.open_handles(), 0);

        let err = driver.open_read_only(Path::new("/data/b.h5")).err().unwrap();
        assert!(matches!(err.kind(), ErrorKind::StorageAccess { .. }));
    }
}
