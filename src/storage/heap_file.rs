use std::collections::hash_map::DefaultHasher;
use std::fs::OpenOptions;
use std::hash::{Hash, Hasher};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs4::fs_std::FileExt;
use parking_lot::Mutex;

use crate::buffer::{AccessMode, PageCache};
use crate::error::{DbError, Result};
use crate::exec::OpIterator;
use crate::schema::TupleDesc;
use crate::storage::page::{HeapPage, HeapPageId};
use crate::tuple::Tuple;
use crate::tx::TransactionId;

/// Unordered collection of fixed-size pages backing one table.
///
/// The file is a contiguous sequence of pages with no file header; page
/// `p` lives at byte offset `p * page_size`. The page count is derived
/// from the live file length, never stored. An exclusive advisory lock
/// is held for the lifetime of the handle.
pub struct HeapFile {
    file: Mutex<std::fs::File>,
    path: PathBuf,
    id: u64,
    schema: TupleDesc,
    page_size: usize,
}

impl HeapFile {
    /// Open (creating if absent) the heap file at `path`.
    pub fn open(path: &Path, schema: TupleDesc, page_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        file.lock_exclusive().map_err(|e| {
            DbError::Lock(format!(
                "failed to lock heap file {}: {}",
                path.display(),
                e
            ))
        })?;

        // Canonicalization cannot fail for a file we just opened; if it
        // does, the configuration is unusable and the error surfaces.
        let path = path.canonicalize()?;
        let id = table_id_for_path(&path);

        Ok(HeapFile {
            file: Mutex::new(file),
            path,
            id,
            schema,
            page_size,
        })
    }

    /// Stable table id, derived from the canonical path. Two stores
    /// opened on the same path agree on it.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn schema(&self) -> &TupleDesc {
        &self.schema
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `floor(file length / page size)`, recomputed from the live file
    /// length on every call. Trailing bytes short of a full page are
    /// never exposed as a page.
    pub fn num_pages(&self) -> Result<u64> {
        let len = self.file.lock().metadata()?.len();
        Ok(len / self.page_size as u64)
    }

    /// Read one whole page. The read is synchronous and complete;
    /// partial results are never returned.
    pub fn read_page(&self, pid: HeapPageId) -> Result<HeapPage> {
        if pid.table_id != self.id {
            return Err(DbError::InvalidPage {
                table_id: pid.table_id,
                page_no: pid.page_no,
            });
        }

        let mut file = self.file.lock();
        let len = file.metadata()?.len();
        let page_size = self.page_size as u64;
        match (pid.page_no + 1).checked_mul(page_size) {
            Some(end) if end <= len => {}
            _ => {
                return Err(DbError::InvalidPage {
                    table_id: pid.table_id,
                    page_no: pid.page_no,
                });
            }
        }

        file.seek(SeekFrom::Start(pid.page_no * page_size))?;
        let mut data = vec![0u8; self.page_size];
        match file.read_exact(&mut data) {
            Ok(()) => {}
            // The length check passed, so running out of bytes here means
            // the file shrank underneath us.
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(DbError::Corruption(format!(
                    "short read of page {} for table {}",
                    pid.page_no, pid.table_id
                )));
            }
            Err(e) => return Err(e.into()),
        }
        Ok(HeapPage::from_bytes(pid, data))
    }

    /// Overwrite one whole page at its computed offset. Writing at
    /// `page_no == num_pages()` appends a page.
    pub fn write_page(&self, page: &HeapPage) -> Result<()> {
        let pid = page.id();
        if pid.table_id != self.id {
            return Err(DbError::InvalidPage {
                table_id: pid.table_id,
                page_no: pid.page_no,
            });
        }
        if page.page_size() != self.page_size {
            return Err(DbError::Corruption(format!(
                "page is {} bytes, file uses {}-byte pages",
                page.page_size(),
                self.page_size
            )));
        }

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(pid.page_no * self.page_size as u64))?;
        file.write_all(page.as_bytes())?;
        Ok(())
    }

    /// Paged scan over every tuple, page by page, through the cache.
    pub fn scan(self: &Arc<Self>, tx: TransactionId, cache: Arc<dyn PageCache>) -> HeapScan {
        HeapScan {
            tx,
            file: Arc::clone(self),
            cache,
            cur_page_no: 0,
            cursor: None,
        }
    }
}

fn table_id_for_path(path: &Path) -> u64 {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    hasher.finish()
}

/// Lazy, restartable tuple sequence over a heap file.
///
/// Pages are requested through the page cache, never read directly from
/// the store, and at most one page is probed per `has_next` call.
pub struct HeapScan {
    tx: TransactionId,
    file: Arc<HeapFile>,
    cache: Arc<dyn PageCache>,
    cur_page_no: u64,
    cursor: Option<std::vec::IntoIter<Tuple>>,
}

impl HeapScan {
    fn page_tuples(&self, page_no: u64) -> Result<std::vec::IntoIter<Tuple>> {
        let pid = HeapPageId::new(self.file.id(), page_no);
        let page = self.cache.fetch_page(self.tx, pid, AccessMode::ReadOnly)?;
        Ok(page.tuples(self.file.schema())?.into_iter())
    }
}

impl OpIterator for HeapScan {
    fn open(&mut self) -> Result<()> {
        self.cur_page_no = 0;
        // A zero-page file yields a valid, immediately exhausted scan
        // rather than an invalid-page error for page 0.
        if self.file.num_pages()? == 0 {
            self.cursor = Some(Vec::new().into_iter());
        } else {
            self.cursor = Some(self.page_tuples(0)?);
        }
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        let Some(cursor) = self.cursor.as_ref() else {
            return Ok(false);
        };
        if !cursor.as_slice().is_empty() {
            return Ok(true);
        }
        // Advance at most one page per call. An empty page reports
        // exhaustion here even if later pages hold tuples; the next call
        // probes past it.
        if self.cur_page_no + 1 < self.file.num_pages()? {
            self.cur_page_no += 1;
            let next = self.page_tuples(self.cur_page_no)?;
            let non_empty = !next.as_slice().is_empty();
            self.cursor = Some(next);
            Ok(non_empty)
        } else {
            Ok(false)
        }
    }

    fn next(&mut self) -> Result<Tuple> {
        self.cursor
            .as_mut()
            .and_then(|c| c.next())
            .ok_or(DbError::NoSuchElement)
    }

    fn rewind(&mut self) -> Result<()> {
        self.close();
        self.open()
    }

    fn close(&mut self) {
        self.cursor = None;
    }

    fn tuple_desc(&self) -> &TupleDesc {
        self.file.schema()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::DEFAULT_PAGE_SIZE;
    use crate::types::DataType;
    use tempfile::TempDir;

    fn int_schema() -> TupleDesc {
        TupleDesc::unnamed(&[DataType::BigInt])
    }

    #[test]
    fn test_id_stable_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.dat");

        let a = HeapFile::open(&path, int_schema(), DEFAULT_PAGE_SIZE).unwrap();
        let id = a.id();
        drop(a);
        let b = HeapFile::open(&path, int_schema(), DEFAULT_PAGE_SIZE).unwrap();
        assert_eq!(b.id(), id);

        let other = HeapFile::open(&dir.path().join("u.dat"), int_schema(), DEFAULT_PAGE_SIZE)
            .unwrap();
        assert_ne!(other.id(), id);
    }

    #[test]
    fn test_num_pages_floor() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.dat");
        let file = HeapFile::open(&path, int_schema(), 512).unwrap();

        assert_eq!(file.num_pages().unwrap(), 0);

        // One byte short of a page: still zero pages.
        std::fs::write(&path, vec![0u8; 511]).unwrap();
        assert_eq!(file.num_pages().unwrap(), 0);

        std::fs::write(&path, vec![0u8; 512]).unwrap();
        assert_eq!(file.num_pages().unwrap(), 1);

        // A partial trailing page is invisible, not an error.
        std::fs::write(&path, vec![0u8; 512 * 2 + 100]).unwrap();
        assert_eq!(file.num_pages().unwrap(), 2);
    }

    #[test]
    fn test_write_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.dat");
        let file = HeapFile::open(&path, int_schema(), 512).unwrap();

        let pid = HeapPageId::new(file.id(), 0);
        let mut page = HeapPage::new(pid, 512);
        page.insert_cell(&7i64.to_le_bytes()).unwrap();
        file.write_page(&page).unwrap();

        let read = file.read_page(pid).unwrap();
        assert_eq!(read.as_bytes().len(), 512);
        assert_eq!(read, page);

        // Two successive reads of an unmodified page agree.
        assert_eq!(file.read_page(pid).unwrap(), read);
    }

    #[test]
    fn test_read_out_of_range() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.dat");
        let file = HeapFile::open(&path, int_schema(), 512).unwrap();

        let pid = HeapPageId::new(file.id(), 0);
        assert!(matches!(
            file.read_page(pid),
            Err(DbError::InvalidPage { .. })
        ));

        file.write_page(&HeapPage::new(pid, 512)).unwrap();
        assert!(file.read_page(pid).is_ok());
        assert!(matches!(
            file.read_page(HeapPageId::new(file.id(), 1)),
            Err(DbError::InvalidPage { page_no: 1, .. })
        ));
    }

    #[test]
    fn test_read_wrong_table() {
        let dir = TempDir::new().unwrap();
        let file =
            HeapFile::open(&dir.path().join("t.dat"), int_schema(), 512).unwrap();
        let foreign = HeapPageId::new(file.id().wrapping_add(1), 0);
        assert!(matches!(
            file.read_page(foreign),
            Err(DbError::InvalidPage { .. })
        ));
    }

    #[test]
    fn test_append_grows_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.dat");
        let file = HeapFile::open(&path, int_schema(), 512).unwrap();

        for page_no in 0..3 {
            let pid = HeapPageId::new(file.id(), page_no);
            file.write_page(&HeapPage::new(pid, 512)).unwrap();
            assert_eq!(file.num_pages().unwrap(), page_no + 1);
        }
    }
}
