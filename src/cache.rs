use crate::records::{Row, TableName};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Default time a worksheet snapshot stays fresh
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

struct CachedSheet {
    fetched_at: Instant,
    rows: Vec<Row>,
}

/// Read-through cache of whole worksheets with a fixed time-to-live
///
/// The store clears every entry after a successful write, so a writer never
/// reads back its own pre-write snapshot. Nothing is coordinated across
/// separate caches: another session's cache may serve a stale table until
/// its entry expires.
pub struct TableCache {
    ttl: Duration,
    entries: RwLock<HashMap<TableName, CachedSheet>>,
}

impl TableCache {
    pub fn new(ttl: Duration) -> Self {
        TableCache {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh snapshot of a worksheet, if one is cached
    pub fn get(&self, table: TableName) -> Option<Vec<Row>> {
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        entries
            .get(&table)
            .filter(|cached| cached.fetched_at.elapsed() < self.ttl)
            .map(|cached| cached.rows.clone())
    }

    pub fn put(&self, table: TableName, rows: Vec<Row>) {
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        entries.insert(
            table,
            CachedSheet {
                fetched_at: Instant::now(),
                rows,
            },
        );
    }

    pub fn invalidate_all(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TableCache {
    fn default() -> Self {
        TableCache::new(DEFAULT_TTL)
    }
}
