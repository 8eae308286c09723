#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv_recon::{Dataset, DatasetLabel, RawRow};
use tempfile::{TempDir, tempdir};

pub const HEADER: &str = "ID,Name,Date,Amount\n";

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Builds an in-memory dataset from `(id, name, date, amount)` cells.
pub fn dataset(rows: &[(&str, &str, &str, &str)]) -> Dataset {
    Dataset::new(
        rows.iter()
            .enumerate()
            .map(|(idx, (id, name, date, amount))| RawRow::from_cells(idx, id, name, date, amount))
            .collect(),
    )
}

/// Parses CSV text (header included) into a dataset.
pub fn parse_dataset(label: DatasetLabel, csv: &str) -> Result<Dataset, csv_recon::ReconError> {
    Dataset::from_reader(csv.as_bytes(), label, b',', encoding_rs::UTF_8)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}
