use std::path::Path;

use anyhow::{Context, Result, anyhow};
use polars::{frame::DataFrame, prelude::ParquetWriter};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::common::{ensure_dir_exists, sha256_file};

/// Write a DataFrame to Parquet atomically: the bytes land in a temp file in
/// the destination directory and become visible only through a rename, so
/// readers never observe a partial file and a failed write leaves nothing.
pub fn write_parquet_atomic(df: &DataFrame, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir_exists(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    ParquetWriter::new(&mut tmp)
        .finish(&mut df.clone())
        .with_context(|| format!("failed to write Parquet for {}", path.display()))?;
    tmp.persist(path)
        .map_err(|e| anyhow!("failed to move output into place at {}: {}", path.display(), e))?;
    Ok(())
}

/// Sidecar metadata for one pipeline run, written next to the output table.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunManifest {
    pub version: String,
    pub depth: usize,
    pub bands: Vec<String>,
    pub rows: usize,
    pub output: String,
    pub sha256: String,
}

impl RunManifest {
    /// Describe a persisted table: hashes the output file on disk.
    pub fn describe(
        df: &DataFrame,
        depth: usize,
        bands: Vec<String>,
        output: &Path,
    ) -> Result<Self> {
        Ok(Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            depth,
            bands,
            rows: df.height(),
            output: output
                .file_name()
                .ok_or_else(|| anyhow!("output path {} has no file name", output.display()))?
                .to_string_lossy()
                .into_owned(),
            sha256: sha256_file(output)?,
        })
    }

    /// Write the manifest as pretty JSON, atomically like the table itself.
    pub fn write(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
        serde_json::to_writer_pretty(&mut tmp, self)
            .with_context(|| format!("failed to serialize manifest for {}", path.display()))?;
        tmp.persist(path)
            .map_err(|e| anyhow!("failed to move manifest into place at {}: {}", path.display(), e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn small_df() -> DataFrame {
        DataFrame::new(vec![
            Column::new("admin_name_0".into(), vec![Some("Kenya"), None]),
            Column::new("value".into(), vec![Some(1.0f64), None]),
        ])
        .unwrap()
    }

    #[test]
    fn round_trips_through_parquet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parquet");
        let df = small_df();
        write_parquet_atomic(&df, &path).unwrap();

        let read = ParquetReader::new(std::fs::File::open(&path).unwrap())
            .finish()
            .unwrap();
        assert!(df.equals_missing(&read));
    }

    #[test]
    fn manifest_describes_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parquet");
        let df = small_df();
        write_parquet_atomic(&df, &path).unwrap();

        let manifest =
            RunManifest::describe(&df, 1, vec!["value_band".to_string()], &path).unwrap();
        assert_eq!(manifest.rows, 2);
        assert_eq!(manifest.output, "out.parquet");
        assert_eq!(manifest.sha256.len(), 64);

        let manifest_path = dir.path().join("out.manifest.json");
        manifest.write(&manifest_path).unwrap();
        let read: RunManifest =
            serde_json::from_reader(std::fs::File::open(&manifest_path).unwrap()).unwrap();
        assert_eq!(read.sha256, manifest.sha256);
    }
}
