//! Artifact file I/O: atomic writes and typed readers.
//!
//! Stages never leave a partial artifact behind. Payloads are written to a
//! temp file in the target directory and renamed into place, so a crash
//! mid-write leaves the previous generation untouched.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{Error, Result};

pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().ok_or_else(|| {
        Error::InvalidConfig(format!("artifact path has no parent: {}", path.display()))
    })?;
    fs::create_dir_all(dir).map_err(|e| Error::unavailable(path.display(), e))?;
    let mut tmp =
        tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::unavailable(path.display(), e))?;
    tmp.write_all(bytes)
        .map_err(|e| Error::unavailable(path.display(), e))?;
    tmp.persist(path)
        .map_err(|e| Error::unavailable(path.display(), e))?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| Error::unavailable(path.display(), e))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::unavailable(path.display(), format!("corrupt JSON: {e}")))
}

pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| Error::unavailable(path.display(), format!("serialize failed: {e}")))?;
    write_atomic(path, &bytes)
}

pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut rdr = csv::Reader::from_path(path).map_err(|e| Error::unavailable(path.display(), e))?;
    let mut rows = Vec::new();
    for record in rdr.deserialize::<T>() {
        rows.push(
            record.map_err(|e| Error::unavailable(path.display(), format!("corrupt row: {e}")))?,
        );
    }
    Ok(rows)
}

pub fn write_csv_atomic<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for row in rows {
        wtr.serialize(row)
            .map_err(|e| Error::unavailable(path.display(), format!("serialize failed: {e}")))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| Error::unavailable(path.display(), format!("flush failed: {e}")))?;
    write_atomic(path, &bytes)
}
