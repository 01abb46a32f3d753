//! Durable storage for tables
//!
//! Tables are serialized one per file as JSON artifacts, and exported as CSV
//! for interchange.

use std::fs;
use std::path::{Path, PathBuf};

use csv::Writer;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::table::{Table, Value};

/// File extension of serialized table artifacts
pub const ARTIFACT_EXT: &str = "json";

/// File extension of delimited-text exports
pub const EXPORT_EXT: &str = "csv";

const ARTIFACT_FORMAT: &str = "sqlplay.table";
const ARTIFACT_VERSION: u32 = 1;

/// On-disk envelope around a table
#[derive(Serialize, Deserialize)]
struct Artifact {
    format: String,
    version: u32,
    table: Table,
}

/// Path of the artifact for `name` inside `dir`
pub fn artifact_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.{}", name, ARTIFACT_EXT))
}

/// Check that `path` carries the extension `ext`
pub fn require_extension(path: &Path, ext: &'static str) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(found) if found == ext => Ok(()),
        _ => Err(Error::UnsupportedFormat {
            path: path.to_path_buf(),
            expected: ext,
        }),
    }
}

/// Replace whatever extension `file` has with `ext`
pub fn with_extension(file: &str, ext: &str) -> String {
    let path = Path::new(file);
    if path.extension().and_then(|e| e.to_str()) == Some(ext) {
        return file.to_string();
    }
    path.with_extension(ext).to_string_lossy().into_owned()
}

/// Serialize a table to an artifact file
pub fn write_artifact(table: &Table, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let artifact = Artifact {
        format: ARTIFACT_FORMAT.to_string(),
        version: ARTIFACT_VERSION,
        table: table.clone(),
    };
    let json = serde_json::to_string_pretty(&artifact)?;
    fs::write(path, json)?;
    Ok(())
}

/// Deserialize a table from an artifact file.
///
/// Anything that does not decode to a valid table is reported as
/// [`Error::CorruptArtifact`].
pub fn read_artifact(path: &Path) -> Result<Table> {
    let corrupt = |reason: String| Error::CorruptArtifact {
        path: path.to_path_buf(),
        reason,
    };

    let json = fs::read_to_string(path)?;
    let artifact: Artifact = serde_json::from_str(&json).map_err(|e| corrupt(e.to_string()))?;
    if artifact.format != ARTIFACT_FORMAT {
        return Err(corrupt(format!("unknown format '{}'", artifact.format)));
    }
    if artifact.version != ARTIFACT_VERSION {
        return Err(corrupt(format!("unsupported version {}", artifact.version)));
    }
    artifact
        .table
        .validate()
        .map_err(|e| corrupt(e.to_string()))?;
    Ok(artifact.table)
}

/// Export a table as CSV with a header row of column names
pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let mut wtr = Writer::from_path(path)?;

    wtr.write_record(table.column_names())?;
    for row in table.rows() {
        let record: Vec<String> = row.iter().map(csv_field).collect();
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

fn csv_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Blob(b) => Value::hex(b),
        other => other.to_string(),
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableBuilder;
    use tempfile::TempDir;

    fn sample() -> Table {
        TableBuilder::new()
            .column("id", vec![1i64, 2])
            .column("name", vec![Some("a"), None])
            .build()
            .unwrap()
    }

    #[test]
    fn test_artifact_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = artifact_path(dir.path(), "sample");
        write_artifact(&sample(), &path).unwrap();
        assert_eq!(read_artifact(&path).unwrap(), sample());
    }

    #[test]
    fn test_non_table_artifact_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(
            read_artifact(&path),
            Err(Error::CorruptArtifact { .. })
        ));

        fs::write(&path, "not json at all").unwrap();
        assert!(matches!(
            read_artifact(&path),
            Err(Error::CorruptArtifact { .. })
        ));
    }

    #[test]
    fn test_ragged_artifact_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ragged.json");
        let json = r#"{
            "format": "sqlplay.table",
            "version": 1,
            "table": {"columns": {
                "a": {"kind": "Integer", "values": [{"Integer": 1}, {"Integer": 2}]},
                "b": {"kind": "Integer", "values": [{"Integer": 1}]}
            }}
        }"#;
        fs::write(&path, json).unwrap();
        assert!(matches!(
            read_artifact(&path),
            Err(Error::CorruptArtifact { .. })
        ));
    }

    #[test]
    fn test_csv_export() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("sample.csv");
        write_csv(&sample(), &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "id,name\n1,a\n2,\n");
    }

    #[test]
    fn test_extension_helpers() {
        assert!(require_extension(Path::new("t.json"), ARTIFACT_EXT).is_ok());
        assert!(matches!(
            require_extension(Path::new("t.csv"), ARTIFACT_EXT),
            Err(Error::UnsupportedFormat { expected: "json", .. })
        ));
        assert!(require_extension(Path::new("noext"), EXPORT_EXT).is_err());
        assert_eq!(with_extension("out.txt", "csv"), "out.csv");
        assert_eq!(with_extension("out", "csv"), "out.csv");
        assert_eq!(with_extension("out.csv", "csv"), "out.csv");
    }
}
