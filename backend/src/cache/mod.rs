//! Table cache - keep loaded sheets in memory between pipeline runs
//!
//! Entries are keyed by (source path, sheet) and shared read-only. They are
//! only dropped by [`TableCache::invalidate`] or [`TableCache::clear`].

use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::LoadResult;
use crate::loader::{self, RawTable};

type CacheKey = (PathBuf, String);

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: usize,
    pub misses: usize,
}

/// In-memory cache of loaded tables
#[derive(Debug, Default)]
pub struct TableCache {
    tables: HashMap<CacheKey, Arc<RawTable>>,
    hits: usize,
    misses: usize,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(source: &Path, sheet: &str) -> CacheKey {
        (source.to_path_buf(), sheet.trim().to_string())
    }

    /// Get a cached table without loading
    pub fn get(&self, source: &Path, sheet: &str) -> Option<Arc<RawTable>> {
        self.tables.get(&Self::key(source, sheet)).cloned()
    }

    /// Return the cached table or load it from disk. Failed loads are not cached.
    pub fn get_or_load(&mut self, source: &Path, sheet: &str) -> LoadResult<Arc<RawTable>> {
        let key = Self::key(source, sheet);
        if let Some(table) = self.tables.get(&key) {
            self.hits += 1;
            return Ok(Arc::clone(table));
        }

        self.misses += 1;
        let table = Arc::new(loader::load(source, sheet)?);
        self.tables.insert(key, Arc::clone(&table));
        Ok(table)
    }

    /// Store a table loaded elsewhere (e.g. from an in-memory workbook)
    pub fn insert(&mut self, source: &Path, sheet: &str, table: RawTable) -> Arc<RawTable> {
        let table = Arc::new(table);
        self.tables.insert(Self::key(source, sheet), Arc::clone(&table));
        table
    }

    /// Drop every sheet of one source. Returns how many entries were removed.
    pub fn invalidate(&mut self, source: &Path) -> usize {
        let before = self.tables.len();
        self.tables.retain(|(path, _), _| path != source);
        before - self.tables.len()
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.tables.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}
