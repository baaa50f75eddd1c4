//! Command implementations for sag-cmd

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use clap::Args;
use sag_container::JsonContainerDriver;
use sag_reader::{
    IdFactors, ReaderOptions, SagReader, Schema, generate_schema, mapping::read_mapping_file,
};

use crate::utils;

pub mod export;
pub mod inspect;
pub mod validate;

/// Reader settings shared by all commands.
#[derive(Args, Debug, Clone)]
pub struct ReaderArgs {
    /// Index of the file within its snapshot
    #[arg(long, default_value_t = 0)]
    pub file_num: i32,

    /// Rows read per block
    #[arg(long, default_value_t = 6)]
    pub block_size: usize,

    /// Snapshot multiplier of the dbId
    #[arg(long, default_value_t = 1000)]
    pub snapshot_factor: i64,

    /// Row multiplier of the dbId
    #[arg(long, default_value_t = 1_000_000)]
    pub row_factor: i64,

    /// Group holding the catalogue attributes and columns
    #[arg(long, default_value = "/")]
    pub root: String,
}

impl ReaderArgs {
    pub fn to_options(&self) -> ReaderOptions {
        ReaderOptions::default()
            .with_file_number(self.file_num)
            .with_block_size(self.block_size)
            .with_id_factors(IdFactors::new(self.snapshot_factor, self.row_factor))
            .with_root(self.root.clone())
    }
}

/// Opens a JSON catalogue document for reading.
pub fn open_reader(file: &str, options: ReaderOptions) -> Result<SagReader> {
    utils::validate_file_exists(file).with_context(|| format!("Invalid catalogue: {file}"))?;
    SagReader::open(Arc::new(JsonContainerDriver), file, options)
        .with_context(|| format!("Failed to open catalogue: {file}"))
}

/// Loads a mapping file and builds its schema, named after the file stem.
pub fn load_schema(map: &str) -> Result<Schema> {
    utils::validate_file_exists(map).with_context(|| format!("Invalid mapping file: {map}"))?;
    let mappings = read_mapping_file(Path::new(map))
        .with_context(|| format!("Failed to parse mapping file: {map}"))?;
    let table_name = Path::new(map)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("galaxies");
    generate_schema(&mappings, "sag", table_name)
        .with_context(|| format!("Failed to build schema from: {map}"))
}
