//! heapdb: paged heap-file storage with a pull-based executor.
//!
//! A single-node storage and query-execution core with:
//! - Fixed-size slotted pages addressed by (table id, page number)
//! - Heap files scanned page-at-a-time through an LRU buffer pool
//! - Grouped aggregation (MIN/MAX/SUM/AVG/COUNT) over stored tuples
//! - A pull-model insert operator with an at-most-once execution guard

pub mod buffer;
pub mod catalog;
pub mod error;
pub mod exec;
pub mod schema;
pub mod storage;
pub mod tuple;
pub mod tx;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::catalog::Catalog;
use crate::error::Result;
use crate::schema::TupleDesc;
use crate::storage::heap_file::HeapFile;
use crate::storage::page::DEFAULT_PAGE_SIZE;

/// Main database handle: a catalog of heap files plus the buffer pool
/// shared by every operator.
pub struct Database {
    catalog: Arc<Catalog>,
    pool: Arc<BufferPool>,
    page_size: usize,
}

impl Database {
    pub fn new() -> Self {
        Database::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// The page size applies to every table opened through this handle;
    /// reopening an existing file with a different size misinterprets
    /// its bytes.
    pub fn with_page_size(page_size: usize) -> Self {
        let catalog = Arc::new(Catalog::new());
        let pool = Arc::new(BufferPool::with_default_capacity(Arc::clone(&catalog)));
        Database {
            catalog,
            pool,
            page_size,
        }
    }

    /// Open (or create) a heap file and register it under `name`.
    /// Returns the table id.
    pub fn open_table(&self, name: &str, path: &Path, schema: TupleDesc) -> Result<u64> {
        let file = Arc::new(HeapFile::open(path, schema, self.page_size)?);
        Ok(self.catalog.register(name, file))
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }
}

impl Default for Database {
    fn default() -> Self {
        Database::new()
    }
}
