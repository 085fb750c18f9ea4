//! Record Store Adapter
//!
//! Whole-table reads and whole-table writes against the four launchpad
//! worksheets. The backing spreadsheet offers no partial update, so every
//! mutation elsewhere in the crate is read table, change rows in memory,
//! write table. There is no locking or version check: two sessions that
//! interleave those cycles on one worksheet lose the earlier write.

use crate::cache::TableCache;
use crate::error::{BackendError, Result, StoreError};
use crate::records::{
    NodeId, ProgressFlag, Record, Row, TableName, bool_cell, coerce_bool, is_bool_token,
};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// A place that can hold the launchpad worksheets
pub trait TableBackend: Send + Sync {
    /// Every row of a worksheet, in stored order. A worksheet that was never
    /// written reads as empty.
    fn read_sheet(&self, table: TableName) -> std::result::Result<Vec<Row>, BackendError>;

    /// Replace a worksheet's entire contents
    fn write_sheet(&self, table: TableName, rows: &[Row]) -> std::result::Result<(), BackendError>;
}

/// In-process worksheets; clones share the same tables
#[derive(Clone, Default)]
pub struct MemoryBackend {
    sheets: Arc<Mutex<HashMap<TableName, Vec<Row>>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend::default()
    }

    /// Simulate losing the connection to the spreadsheet
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> std::result::Result<(), BackendError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

impl TableBackend for MemoryBackend {
    fn read_sheet(&self, table: TableName) -> std::result::Result<Vec<Row>, BackendError> {
        self.check_available()?;
        let sheets = self
            .sheets
            .lock()
            .map_err(|_| BackendError::Unavailable("worksheet lock poisoned".to_string()))?;
        Ok(sheets.get(&table).cloned().unwrap_or_default())
    }

    fn write_sheet(&self, table: TableName, rows: &[Row]) -> std::result::Result<(), BackendError> {
        self.check_available()?;
        let mut sheets = self
            .sheets
            .lock()
            .map_err(|_| BackendError::Unavailable("worksheet lock poisoned".to_string()))?;
        sheets.insert(table, rows.to_vec());
        Ok(())
    }
}

/// Adapter the reconciler and view composer talk to
///
/// Wraps a backend with an optional [`TableCache`]. Each `RecordStore` is
/// one session's view of the workbook; sessions that should not see each
/// other's cache get their own store over a shared backend.
#[derive(Clone)]
pub struct RecordStore {
    backend: Arc<dyn TableBackend>,
    cache: Option<Arc<TableCache>>,
}

impl RecordStore {
    pub fn new(backend: Arc<dyn TableBackend>) -> Self {
        RecordStore {
            backend,
            cache: None,
        }
    }

    pub fn with_cache(backend: Arc<dyn TableBackend>, cache: Arc<TableCache>) -> Self {
        RecordStore {
            backend,
            cache: Some(cache),
        }
    }

    pub fn backend(&self) -> Arc<dyn TableBackend> {
        Arc::clone(&self.backend)
    }

    pub fn cache(&self) -> Option<&Arc<TableCache>> {
        self.cache.as_ref()
    }

    /// Read a whole worksheet, through the cache when one is attached
    ///
    /// Node_Analytics rows come back with their checkbox columns coerced to
    /// `TRUE`/`FALSE` and their node ids in canonical form.
    pub fn read_table(&self, table: TableName) -> Result<Vec<Row>> {
        if let Some(cache) = &self.cache {
            if let Some(rows) = cache.get(table) {
                debug!("cache hit for {} ({} rows)", table, rows.len());
                return Ok(rows);
            }
        }

        let mut rows = self
            .backend
            .read_sheet(table)
            .map_err(|e| StoreError::read(table, e))?;
        // Trailing blank rows are routine in hand-edited sheets.
        rows.retain(|row| row.values().any(|v| !v.trim().is_empty()));
        debug!("read {} rows from {}", rows.len(), table);

        if table == TableName::NodeAnalytics {
            coerce_progress_rows(&mut rows);
        }

        if let Some(cache) = &self.cache {
            cache.put(table, rows.clone());
        }
        Ok(rows)
    }

    /// Replace a whole worksheet, then drop every cached snapshot
    pub fn write_table(&self, table: TableName, rows: Vec<Row>) -> Result<()> {
        self.backend
            .write_sheet(table, &rows)
            .map_err(|e| StoreError::write(table, e))?;

        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
        info!("wrote {} rows to {}", rows.len(), table);
        Ok(())
    }

    /// Every readable record of a worksheet; unreadable rows are skipped
    pub fn read_records<R: Record>(&self) -> Result<Vec<R>> {
        Ok(self.load_sheet::<R>()?.into_records())
    }

    /// Replace a worksheet with exactly these records
    pub fn write_records<R: Record>(&self, records: &[R]) -> Result<()> {
        let rows = records.iter().map(Record::to_row).collect();
        self.write_table(R::TABLE, rows)
    }

    /// Read a worksheet for a read-modify-write cycle
    pub fn load_sheet<R: Record>(&self) -> Result<Sheet<R>> {
        Ok(Sheet::from_rows(self.read_table(R::TABLE)?))
    }

    pub fn save_sheet<R: Record>(&self, sheet: Sheet<R>) -> Result<()> {
        self.write_table(R::TABLE, sheet.into_rows())
    }
}

struct SheetEntry<R> {
    raw: Row,
    record: Option<R>,
}

/// A worksheet held for modification
///
/// Keeps every stored row as it was read, including columns no record type
/// knows about and rows that do not parse. On save each record's fields are
/// merged over its original row and unreadable rows go back untouched.
pub struct Sheet<R> {
    entries: Vec<SheetEntry<R>>,
}

impl<R: Record> Sheet<R> {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let entries = rows
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                let record = match R::from_row(&raw, index) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!(
                            "row {} of {} is unreadable, keeping it as is: {}",
                            index + 1,
                            R::TABLE,
                            e
                        );
                        None
                    }
                };
                SheetEntry { raw, record }
            })
            .collect();
        Sheet { entries }
    }

    /// Number of rows, readable or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &R> {
        self.entries.iter().filter_map(|e| e.record.as_ref())
    }

    pub fn into_records(self) -> Vec<R> {
        self.entries.into_iter().filter_map(|e| e.record).collect()
    }

    /// First readable record matching `pred`
    pub fn find_mut(&mut self, pred: impl Fn(&R) -> bool) -> Option<&mut R> {
        self.entries
            .iter_mut()
            .filter_map(|e| e.record.as_mut())
            .find(|r| pred(r))
    }

    pub fn push(&mut self, record: R) {
        self.entries.push(SheetEntry {
            raw: Row::new(),
            record: Some(record),
        });
    }

    /// Keep the readable records `keep` accepts; unreadable rows always stay
    pub fn retain(&mut self, mut keep: impl FnMut(&R) -> bool) {
        self.entries.retain(|e| match &e.record {
            Some(record) => keep(record),
            None => true,
        });
    }

    /// Remove unreadable rows `addresses` selects, returning how many went
    pub fn drop_unreadable(&mut self, addresses: impl Fn(&Row) -> bool) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| e.record.is_some() || !addresses(&e.raw));
        before - self.entries.len()
    }

    /// Fail with the parse error of the first unreadable row `addresses`
    /// selects
    pub fn ensure_readable(&self, addresses: impl Fn(&Row) -> bool) -> Result<()> {
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.record.is_none() && addresses(&entry.raw) {
                R::from_row(&entry.raw, index)?;
            }
        }
        Ok(())
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.entries
            .into_iter()
            .map(|entry| match entry.record {
                Some(record) => {
                    let mut row = entry.raw;
                    row.extend(record.to_row());
                    row
                }
                None => entry.raw,
            })
            .collect()
    }
}

fn coerce_progress_rows(rows: &mut [Row]) {
    for (index, row) in rows.iter_mut().enumerate() {
        let mut all = true;
        for flag in ProgressFlag::ALL {
            let raw = row.get(flag.column()).cloned().unwrap_or_default();
            if !is_bool_token(&raw) {
                warn!(
                    "row {} of {}: {} holds '{}', treating as FALSE",
                    index + 1,
                    TableName::NodeAnalytics,
                    flag.column(),
                    raw
                );
            }
            let value = coerce_bool(&raw);
            all &= value;
            row.insert(flag.column().to_string(), bool_cell(value));
        }
        row.insert("Complete".to_string(), bool_cell(all));

        let canonical = row.get("Node_ID").and_then(|raw| NodeId::parse(raw).ok());
        if let Some(id) = canonical {
            row.insert("Node_ID".to_string(), id.to_string());
        }
    }
}
