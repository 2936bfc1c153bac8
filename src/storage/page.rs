/// Slotted heap page.
///
/// Layout:
///   [PageHeader (6 bytes)] [Slot Pointer Array ...] [Free Space ...] [Tuple Cells ...]
///
/// PageHeader:
///   slot_count: u16 (2 bytes)
///   free_start: u16 (offset where the slot pointer array ends / free space begins)
///   free_end:   u16 (offset where cell data begins, grows downward)
///
/// Slot Pointer: u16 (offset to the cell within the page)
/// Tuple Cell: [u16 len][serialized tuple bytes]
///
/// The page size is chosen per heap file and threaded in explicitly;
/// slot offsets are u16, so it must not exceed 65536 bytes.
use crate::error::{DbError, Result};
use crate::schema::TupleDesc;
use crate::tuple::{deserialize_tuple, RecordId, Tuple};

pub const DEFAULT_PAGE_SIZE: usize = 4096;
pub const PAGE_HEADER_SIZE: usize = 6;
pub const SLOT_POINTER_SIZE: usize = 2;
pub const CELL_HEADER_SIZE: usize = 2; // u16 length prefix

pub const MAX_PAGE_SIZE: usize = u16::MAX as usize;

/// Identifies one page: owning table plus zero-based page number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapPageId {
    pub table_id: u64,
    pub page_no: u64,
}

impl HeapPageId {
    pub fn new(table_id: u64, page_no: u64) -> Self {
        HeapPageId { table_id, page_no }
    }
}

#[derive(Clone, PartialEq)]
pub struct HeapPage {
    id: HeapPageId,
    data: Vec<u8>,
}

impl HeapPage {
    /// Fresh empty page of the given size.
    pub fn new(id: HeapPageId, page_size: usize) -> Self {
        assert!(
            (PAGE_HEADER_SIZE + SLOT_POINTER_SIZE + CELL_HEADER_SIZE..=MAX_PAGE_SIZE)
                .contains(&page_size),
            "page size {} out of range",
            page_size
        );
        let mut page = HeapPage {
            id,
            data: vec![0u8; page_size],
        };
        page.set_slot_count(0);
        page.set_free_start(PAGE_HEADER_SIZE as u16);
        page.set_free_end(page_size as u16);
        page
    }

    /// Reconstruct a page from raw bytes read off disk. The byte length
    /// is the page size.
    pub fn from_bytes(id: HeapPageId, data: Vec<u8>) -> Self {
        HeapPage { id, data }
    }

    pub fn id(&self) -> HeapPageId {
        self.id
    }

    pub fn page_size(&self) -> usize {
        self.data.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    // --- Header accessors ---

    pub fn slot_count(&self) -> u16 {
        u16::from_le_bytes(self.data[0..2].try_into().unwrap())
    }

    fn set_slot_count(&mut self, count: u16) {
        self.data[0..2].copy_from_slice(&count.to_le_bytes());
    }

    fn free_start(&self) -> u16 {
        u16::from_le_bytes(self.data[2..4].try_into().unwrap())
    }

    fn set_free_start(&mut self, offset: u16) {
        self.data[2..4].copy_from_slice(&offset.to_le_bytes());
    }

    fn free_end(&self) -> u16 {
        u16::from_le_bytes(self.data[4..6].try_into().unwrap())
    }

    fn set_free_end(&mut self, offset: u16) {
        self.data[4..6].copy_from_slice(&offset.to_le_bytes());
    }

    /// Free space available to one new cell (pointer and length prefix
    /// already accounted for).
    pub fn free_space(&self) -> usize {
        let start = self.free_start() as usize;
        let end = self.free_end() as usize;
        if end > start + SLOT_POINTER_SIZE + CELL_HEADER_SIZE {
            end - start - SLOT_POINTER_SIZE - CELL_HEADER_SIZE
        } else {
            0
        }
    }

    /// Insert a serialized tuple cell. Returns the slot index.
    pub fn insert_cell(&mut self, payload: &[u8]) -> Result<u16> {
        let total_cell_size = CELL_HEADER_SIZE + payload.len();
        let needed = SLOT_POINTER_SIZE + total_cell_size;

        let free_start = self.free_start() as usize;
        let free_end = self.free_end() as usize;

        if free_end < free_start + needed {
            return Err(DbError::PageOverflow);
        }

        // Cell data grows downward from free_end
        let cell_offset = free_end - total_cell_size;
        let len = payload.len() as u16;
        self.data[cell_offset..cell_offset + 2].copy_from_slice(&len.to_le_bytes());
        self.data[cell_offset + 2..cell_offset + 2 + payload.len()].copy_from_slice(payload);

        // Slot pointer grows upward from free_start
        let slot = self.slot_count();
        self.data[free_start..free_start + 2].copy_from_slice(&(cell_offset as u16).to_le_bytes());

        self.set_slot_count(slot + 1);
        self.set_free_start((free_start + SLOT_POINTER_SIZE) as u16);
        self.set_free_end(cell_offset as u16);

        Ok(slot)
    }

    /// Raw cell payload at the given slot.
    pub fn cell(&self, slot: u16) -> Option<&[u8]> {
        if slot >= self.slot_count() {
            return None;
        }
        let ptr_offset = PAGE_HEADER_SIZE + (slot as usize) * SLOT_POINTER_SIZE;
        let cell_offset =
            u16::from_le_bytes(self.data[ptr_offset..ptr_offset + 2].try_into().unwrap()) as usize;
        let len =
            u16::from_le_bytes(self.data[cell_offset..cell_offset + 2].try_into().unwrap()) as usize;
        Some(&self.data[cell_offset + 2..cell_offset + 2 + len])
    }

    /// Remove the cell at `slot` by shifting later slot pointers down.
    /// Cell data space is not reclaimed (that would need compaction).
    pub fn remove_cell(&mut self, slot: u16) {
        let count = self.slot_count();
        if slot >= count {
            return;
        }

        let start = PAGE_HEADER_SIZE + (slot as usize) * SLOT_POINTER_SIZE;
        let end = PAGE_HEADER_SIZE + (count as usize) * SLOT_POINTER_SIZE;
        if start + SLOT_POINTER_SIZE < end {
            self.data.copy_within(start + SLOT_POINTER_SIZE..end, start);
        }

        self.set_slot_count(count - 1);
        self.set_free_start(self.free_start() - SLOT_POINTER_SIZE as u16);
    }

    /// Decode every live slot into a provenance-tagged tuple, in slot
    /// order. This is the in-page cursor a paged scan drains.
    pub fn tuples(&self, desc: &TupleDesc) -> Result<Vec<Tuple>> {
        let mut tuples = Vec::with_capacity(self.slot_count() as usize);
        for slot in 0..self.slot_count() {
            let cell = self
                .cell(slot)
                .ok_or_else(|| DbError::Corruption(format!("missing cell at slot {}", slot)))?;
            let values = deserialize_tuple(cell, desc)?;
            tuples.push(Tuple::with_rid(values, RecordId::new(self.id, slot)));
        }
        Ok(tuples)
    }
}

impl std::fmt::Debug for HeapPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapPage")
            .field("id", &self.id)
            .field("page_size", &self.page_size())
            .field("slot_count", &self.slot_count())
            .field("free_start", &self.free_start())
            .field("free_end", &self.free_end())
            .finish()
    }
}
