//! Inspect command implementation

use anyhow::{Context, Result};
use sag_container::{ArrayContainer, NodeKind, ScalarKind, path};
use sag_reader::{SagReader, meta::FileMeta};
use serde::Serialize;

use crate::commands::{ReaderArgs, open_reader};

#[derive(Serialize)]
struct InspectSummary {
    file: String,
    meta: FileMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    row_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    problem: Option<String>,
    columns: Vec<ColumnInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    groups: Vec<GroupInfo>,
}

#[derive(Serialize)]
struct ColumnInfo {
    name: String,
    stored_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<ScalarKind>,
    shape: Vec<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<u64>,
}

#[derive(Serialize)]
struct GroupInfo {
    path: String,
    children: Vec<ChildInfo>,
}

#[derive(Serialize)]
struct ChildInfo {
    name: String,
    kind: NodeKind,
}

/// Run the inspect command
pub fn run(verbose: u8, reader_args: ReaderArgs, file: String) -> Result<()> {
    let mut reader = open_reader(&file, reader_args.to_options())?;
    let summary = create_summary(&mut reader, &file, verbose)?;
    let json = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
    println!("{json}");
    Ok(())
}

fn create_summary(reader: &mut SagReader, file: &str, verbose: u8) -> Result<InspectSummary> {
    let meta = *reader.meta().context("Catalogue is not open")?;
    let (row_count, problem) = match reader.num_rows() {
        Ok(rows) => (Some(rows), None),
        Err(e) => (None, Some(e.to_string())),
    };

    let root = reader.options().root.clone();
    let container = reader.container().context("Catalogue is not open")?;
    let columns = reader
        .column_names()
        .iter()
        .map(|name| create_column_info(container, name))
        .collect::<Result<Vec<_>>>()?;
    let groups = if verbose > 0 {
        create_group_infos(container, &root)?
    } else {
        Vec::new()
    };

    Ok(InspectSummary {
        file: file.to_string(),
        meta,
        row_count,
        problem,
        columns,
        groups,
    })
}

fn create_column_info(container: &dyn ArrayContainer, name: &str) -> Result<ColumnInfo> {
    let stored = container
        .stored_type(name)
        .with_context(|| format!("Failed to read type of {name}"))?;
    let extent = container
        .extent(name)
        .with_context(|| format!("Failed to read shape of {name}"))?;
    Ok(ColumnInfo {
        name: name.to_string(),
        stored_type: stored.to_string(),
        kind: ScalarKind::from_stored(&stored),
        rows: extent.column_rows(),
        shape: extent.dims,
    })
}

fn create_group_infos(container: &dyn ArrayContainer, root: &str) -> Result<Vec<GroupInfo>> {
    let mut groups = Vec::new();
    let mut pending = vec![path::normalize(root).into_owned()];
    while let Some(group) = pending.pop() {
        let children = container
            .list_children(&group)
            .with_context(|| format!("Failed to list group {group}"))?;
        for child in children.iter().rev() {
            if child.kind == NodeKind::Group {
                pending.push(path::join(&group, &child.name));
            }
        }
        groups.push(GroupInfo {
            path: group,
            children: children
                .into_iter()
                .map(|child| ChildInfo {
                    name: child.name,
                    kind: child.kind,
                })
                .collect(),
        });
    }
    Ok(groups)
}
