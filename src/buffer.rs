use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use crate::catalog::Catalog;
use crate::error::{DbError, Result};
use crate::storage::page::{HeapPage, HeapPageId};
use crate::tuple::{serialize_tuple, RecordId, Tuple};
use crate::tx::TransactionId;

/// Default LRU cache capacity, in pages.
pub const DEFAULT_POOL_CAPACITY: usize = 256;

/// How a caller intends to use a fetched page. A lock manager would key
/// lock acquisition off this; the pool itself does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

/// Page-cache contract consumed by the scan and insert operators.
///
/// All physical page access from operators goes through an
/// implementation of this trait, never directly to a heap file.
pub trait PageCache {
    /// Fetch a cached page, reading through to the owning file on a miss.
    fn fetch_page(
        &self,
        tx: TransactionId,
        pid: HeapPageId,
        mode: AccessMode,
    ) -> Result<HeapPage>;

    /// Insert a tuple into the table, setting its record id on success.
    /// Returns the page ids modified by the insertion.
    fn insert_tuple(
        &self,
        tx: TransactionId,
        table_id: u64,
        tuple: &mut Tuple,
    ) -> Result<Vec<HeapPageId>>;
}

/// LRU page cache shared by every operator of a database instance.
///
/// Pages are cloned out of the cache; mutations are written through to
/// the owning heap file and re-cached.
pub struct BufferPool {
    catalog: Arc<Catalog>,
    cache: Mutex<LruCache<HeapPageId, HeapPage>>,
}

impl BufferPool {
    pub fn new(catalog: Arc<Catalog>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        BufferPool {
            catalog,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn with_default_capacity(catalog: Arc<Catalog>) -> Self {
        BufferPool::new(catalog, DEFAULT_POOL_CAPACITY)
    }

    /// Drop a cached page, forcing the next fetch to hit the file. For
    /// tools and tests that write pages out-of-band.
    pub fn discard_page(&self, pid: HeapPageId) {
        self.cache.lock().pop(&pid);
    }
}

impl PageCache for BufferPool {
    fn fetch_page(
        &self,
        _tx: TransactionId,
        pid: HeapPageId,
        _mode: AccessMode,
    ) -> Result<HeapPage> {
        if let Some(page) = self.cache.lock().get(&pid) {
            return Ok(page.clone());
        }

        let file = self.catalog.table(pid.table_id)?;
        let page = file.read_page(pid)?;
        self.cache.lock().put(pid, page.clone());
        Ok(page)
    }

    fn insert_tuple(
        &self,
        tx: TransactionId,
        table_id: u64,
        tuple: &mut Tuple,
    ) -> Result<Vec<HeapPageId>> {
        let file = self.catalog.table(table_id)?;
        if !tuple.matches(file.schema()) {
            return Err(DbError::SchemaMismatch(format!(
                "tuple does not match schema of table {}",
                table_id
            )));
        }
        let payload = serialize_tuple(tuple.values(), file.schema())?;

        // First page with room wins; otherwise append a fresh page.
        let num_pages = file.num_pages()?;
        for page_no in 0..num_pages {
            let pid = HeapPageId::new(table_id, page_no);
            let mut page = self.fetch_page(tx, pid, AccessMode::ReadWrite)?;
            if page.free_space() >= payload.len() {
                let slot = page.insert_cell(&payload)?;
                tuple.set_rid(Some(RecordId::new(pid, slot)));
                file.write_page(&page)?;
                self.cache.lock().put(pid, page);
                return Ok(vec![pid]);
            }
        }

        let pid = HeapPageId::new(table_id, num_pages);
        let mut page = HeapPage::new(pid, file.page_size());
        // PageOverflow here means the tuple can never fit a page.
        let slot = page.insert_cell(&payload)?;
        tuple.set_rid(Some(RecordId::new(pid, slot)));
        file.write_page(&page)?;
        self.cache.lock().put(pid, page);
        Ok(vec![pid])
    }
}
