//! Catalogue and mapping files on disk for end-to-end tests.

use std::io::Write;

use sag_container::MemoryContainer;

/// Writes `container` as a JSON container document into a temporary file.
pub fn write_catalogue_json(
    container: &MemoryContainer,
) -> anyhow::Result<tempfile::NamedTempFile> {
    let file = tempfile::Builder::new().suffix(".json").tempfile()?;
    container.save_json(file.path())?;
    Ok(file)
}

/// Writes mapping file text into a temporary file.
pub fn write_mapping_file(text: &str) -> anyhow::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new().suffix(".map").tempfile()?;
    file.write_all(text.as_bytes())?;
    file.flush()?;
    Ok(file)
}
