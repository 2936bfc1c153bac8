use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{DbError, Result};
use crate::schema::TupleDesc;
use crate::storage::heap_file::HeapFile;

/// Table registry mapping table ids (and names) to heap files.
///
/// The buffer pool consults it to route a page request to the owning
/// file. Registering a name again replaces the previous binding.
#[derive(Default)]
pub struct Catalog {
    tables: RwLock<HashMap<u64, Arc<HeapFile>>>,
    names: RwLock<HashMap<String, u64>>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog::default()
    }

    /// Register a heap file under `name`. Returns the table id.
    pub fn register(&self, name: &str, file: Arc<HeapFile>) -> u64 {
        let id = file.id();
        if let Some(old) = self.names.write().insert(name.to_string(), id) {
            if old != id {
                self.tables.write().remove(&old);
            }
        }
        self.tables.write().insert(id, file);
        id
    }

    pub fn table(&self, table_id: u64) -> Result<Arc<HeapFile>> {
        self.tables
            .read()
            .get(&table_id)
            .cloned()
            .ok_or(DbError::NoSuchTable(table_id))
    }

    pub fn id_of(&self, name: &str) -> Option<u64> {
        self.names.read().get(name).copied()
    }

    pub fn schema(&self, table_id: u64) -> Result<TupleDesc> {
        Ok(self.table(table_id)?.schema().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::DEFAULT_PAGE_SIZE;
    use crate::types::DataType;
    use tempfile::TempDir;

    fn open(dir: &TempDir, name: &str) -> Arc<HeapFile> {
        let schema = TupleDesc::unnamed(&[DataType::BigInt]);
        Arc::new(HeapFile::open(&dir.path().join(name), schema, DEFAULT_PAGE_SIZE).unwrap())
    }

    #[test]
    fn test_register_and_lookup() {
        let dir = TempDir::new().unwrap();
        let catalog = Catalog::new();
        let file = open(&dir, "t.dat");
        let id = catalog.register("t", Arc::clone(&file));

        assert_eq!(catalog.id_of("t"), Some(id));
        assert_eq!(catalog.table(id).unwrap().id(), id);
        assert!(catalog.schema(id).is_ok());
        assert!(matches!(
            catalog.table(id.wrapping_add(1)),
            Err(DbError::NoSuchTable(_))
        ));
    }

    #[test]
    fn test_reregister_replaces_binding() {
        let dir = TempDir::new().unwrap();
        let catalog = Catalog::new();
        let old_id = catalog.register("t", open(&dir, "old.dat"));
        let new_id = catalog.register("t", open(&dir, "new.dat"));

        assert_ne!(old_id, new_id);
        assert_eq!(catalog.id_of("t"), Some(new_id));
        assert!(catalog.table(old_id).is_err());
    }
}
