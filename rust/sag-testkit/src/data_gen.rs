//! Synthetic galaxy catalogues for tests.
//!
//! A generated catalogue has the layout of a SAG output file:
//!
//! ```text
//! /                      Snapshot, Redshift attributes
//! /Galaxies/GalaxyID     int64
//! /Galaxies/HaloMass     float32
//! /Galaxies/SFR          float64
//! /Galaxies/Position/X   float32, shape [n, 1]
//! /Galaxies/Alias        link to /Galaxies/HaloMass
//! /MassType              type definition
//! ```

use sag_container::{AttributeValue, MemoryArray, MemoryContainer, StoredType, TypedBuffer};

pub const GALAXY_ID: &str = "/Galaxies/GalaxyID";
pub const HALO_MASS: &str = "/Galaxies/HaloMass";
pub const SFR: &str = "/Galaxies/SFR";
pub const POSITION_X: &str = "/Galaxies/Position/X";

/// Array columns of a generated catalogue, in scan order.
pub const CATALOGUE_COLUMNS: [&str; 4] = [GALAXY_ID, HALO_MASS, POSITION_X, SFR];

/// Mapping file text covering every resolution rule.
pub const SAMPLE_MAPPING: &str = "\
# source              type   column        column type
/Galaxies/GalaxyID    INT8   galaxy_id     BIGINT
/Galaxies/HaloMass    REAL4  halo_mass     REAL
/Galaxies/SFR         REAL8  sfr           DOUBLE
/Galaxies/Position/X  REAL4  x             REAL

dbId                  INT8   db_id         BIGINT
snapnum               INT4   snapnum       INTEGER
redshift              REAL4  redshift      REAL
fileNum               INT4   file_num      INTEGER
NInFile               INT8   n_in_file     BIGINT
forestId              INT8   forest_id     BIGINT
ix                    INT4   ix            INTEGER
";

/// Parameters of a generated catalogue.
#[derive(Debug, Clone)]
pub struct CatalogueParams {
    pub rows: usize,
    pub snapshot: i32,
    pub redshift: f32,
    pub seed: u64,
}

impl Default for CatalogueParams {
    fn default() -> Self {
        CatalogueParams {
            rows: 10,
            snapshot: 63,
            redshift: 0.5,
            seed: 42,
        }
    }
}

impl CatalogueParams {
    pub fn with_rows(rows: usize) -> CatalogueParams {
        CatalogueParams {
            rows,
            ..Default::default()
        }
    }
}

/// Generates a catalogue of `rows` galaxies with default parameters.
pub fn generate_galaxy_catalogue(rows: usize) -> MemoryContainer {
    generate_catalogue(&CatalogueParams::with_rows(rows))
}

/// Generates a catalogue described by `params`.
///
/// `GalaxyID` holds `1000 + i` for row `i`; the remaining columns are seeded
/// random values.
pub fn generate_catalogue(params: &CatalogueParams) -> MemoryContainer {
    build_catalogue(params).expect("catalogue layout")
}

fn build_catalogue(params: &CatalogueParams) -> sag_common::Result<MemoryContainer> {
    let mut rng = fastrand::Rng::with_seed(params.seed);
    let n = params.rows;

    let ids = (0..n as i64).map(|i| 1000 + i).collect::<Vec<_>>();
    let halo_mass = (0..n).map(|_| 10.0 + rng.f32() * 5.0).collect::<Vec<_>>();
    let sfr = (0..n).map(|_| rng.f64() * 100.0).collect::<Vec<_>>();
    let x = (0..n).map(|_| rng.f32() * 500.0).collect::<Vec<_>>();

    let mut container = MemoryContainer::new(format!("mem://catalogue-{}", params.seed));
    container.set_attribute("/", "Snapshot", AttributeValue::Int32(params.snapshot))?;
    container.set_attribute("/", "Redshift", AttributeValue::Float32(params.redshift))?;
    container.add_array(GALAXY_ID, MemoryArray::new(TypedBuffer::Int64(ids)))?;
    container.add_array(HALO_MASS, MemoryArray::new(TypedBuffer::Float32(halo_mass)))?;
    container.add_array(SFR, MemoryArray::new(TypedBuffer::Float64(sfr)))?;
    container.add_array(
        POSITION_X,
        MemoryArray::with_shape(TypedBuffer::Float32(x), [n as u64, 1])?,
    )?;
    container.add_link("/Galaxies/Alias", HALO_MASS)?;
    container.add_typedef("/MassType", StoredType::float(4))?;
    Ok(container)
}

/// Adds an int64 column of `rows` values to `container`.
pub fn add_int64_column(container: &mut MemoryContainer, name: &str, rows: usize) {
    container
        .add_array(
            name,
            MemoryArray::new(TypedBuffer::Int64((0..rows as i64).collect())),
        )
        .expect("add_array");
}

/// Adds an int32 column of `rows` values to `container`.
pub fn add_int32_column(container: &mut MemoryContainer, name: &str, rows: usize) {
    container
        .add_array(
            name,
            MemoryArray::new(TypedBuffer::Int32((0..rows as i32).collect())),
        )
        .expect("add_array");
}

/// Adds a float32 column of shape `[rows, width]` to `container`.
pub fn add_float32_matrix(container: &mut MemoryContainer, name: &str, rows: usize, width: usize) {
    container
        .add_array(
            name,
            MemoryArray::with_shape(
                TypedBuffer::Float32(vec![0.0; rows * width]),
                [rows as u64, width as u64],
            )
            .expect("shape"),
        )
        .expect("add_array");
}
