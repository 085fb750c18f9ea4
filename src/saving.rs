use bincode::{deserialize_from, serialize_into};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

use crate::error::BackendError;
use crate::records::{Row, TableName};
use crate::store::TableBackend;

/// Every worksheet of the launchpad, as persisted on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    pub sheets: BTreeMap<TableName, Vec<Row>>,
}

pub fn save_workbook(workbook: &Workbook, filename: &Path) -> Result<(), BackendError> {
    let dir = match filename.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    // Written beside the target and renamed over it, so readers never see half a workbook.
    let staging = NamedTempFile::new_in(&dir)?;
    {
        let encoder = GzEncoder::new(staging.as_file(), Compression::default());
        let mut writer = BufWriter::new(encoder);
        serialize_into(&mut writer, workbook)?;
        let encoder = writer.into_inner().map_err(|e| e.into_error())?;
        encoder.finish()?;
    }
    staging.as_file().sync_all()?;
    staging.persist(filename).map_err(|e| e.error)?;

    Ok(())
}

/// Load a workbook; a file that does not exist yet is an empty workbook
pub fn load_workbook(filename: &Path) -> Result<Workbook, BackendError> {
    if !filename.exists() {
        return Ok(Workbook::default());
    }

    let file = File::open(filename)?;
    let decoder = GzDecoder::new(file);
    let mut reader = BufReader::new(decoder);

    let workbook: Workbook = deserialize_from(&mut reader)?;

    Ok(workbook)
}

/// Worksheets kept in a single gzip-compressed workbook file
pub struct WorkbookFile {
    path: PathBuf,
    // Serialises this process's writes to the file itself. Table-level
    // read-modify-write cycles still race; see `store`.
    file_lock: Mutex<()>,
}

impl WorkbookFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        WorkbookFile {
            path: path.into(),
            file_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TableBackend for WorkbookFile {
    fn read_sheet(&self, table: TableName) -> Result<Vec<Row>, BackendError> {
        let workbook = load_workbook(&self.path)?;
        Ok(workbook.sheets.get(&table).cloned().unwrap_or_default())
    }

    fn write_sheet(&self, table: TableName, rows: &[Row]) -> Result<(), BackendError> {
        let _guard = self
            .file_lock
            .lock()
            .map_err(|_| BackendError::Unavailable("workbook lock poisoned".to_string()))?;

        let mut workbook = load_workbook(&self.path)?;
        workbook.sheets.insert(table, rows.to_vec());
        save_workbook(&workbook, &self.path)
    }
}
