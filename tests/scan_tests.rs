use std::sync::Arc;

use heapdb::buffer::PageCache;
use heapdb::error::DbError;
use heapdb::exec::OpIterator;
use heapdb::schema::TupleDesc;
use heapdb::storage::page::{HeapPage, HeapPageId};
use heapdb::tuple::{serialize_tuple, Tuple};
use heapdb::tx::TransactionId;
use heapdb::types::{DataType, Value};
use heapdb::Database;
use tempfile::TempDir;

fn int_schema() -> TupleDesc {
    TupleDesc::unnamed(&[DataType::BigInt])
}

/// Small pages so a handful of tuples spans several of them.
fn setup(n: i64) -> (Database, u64, TempDir) {
    let dir = TempDir::new().unwrap();
    let db = Database::with_page_size(128);
    let table_id = db
        .open_table("t", &dir.path().join("t.dat"), int_schema())
        .unwrap();

    let tx = TransactionId::new();
    for i in 0..n {
        let mut tuple = Tuple::new(vec![Value::Integer(i)]);
        db.pool().insert_tuple(tx, table_id, &mut tuple).unwrap();
    }
    (db, table_id, dir)
}

fn scan_values(db: &Database, table_id: u64) -> Vec<i64> {
    let file = db.catalog().table(table_id).unwrap();
    let cache: Arc<dyn PageCache> = Arc::clone(db.pool()) as Arc<dyn PageCache>;
    let mut scan = file.scan(TransactionId::new(), cache);

    scan.open().unwrap();
    let mut values = Vec::new();
    while scan.has_next().unwrap() {
        values.push(scan.next().unwrap().field(0).unwrap().as_i64().unwrap());
    }
    scan.close();
    values
}

#[test]
fn test_full_scan_visits_every_tuple_in_page_order() {
    let (db, table_id, _dir) = setup(50);
    let file = db.catalog().table(table_id).unwrap();
    assert!(file.num_pages().unwrap() > 1, "scan should span pages");

    let values = scan_values(&db, table_id);
    assert_eq!(values, (0..50).collect::<Vec<_>>());
}

#[test]
fn test_rewind_yields_identical_sequence() {
    let (db, table_id, _dir) = setup(30);
    let file = db.catalog().table(table_id).unwrap();
    let cache: Arc<dyn PageCache> = Arc::clone(db.pool()) as Arc<dyn PageCache>;
    let mut scan = file.scan(TransactionId::new(), cache);

    scan.open().unwrap();
    let mut first = Vec::new();
    while scan.has_next().unwrap() {
        first.push(scan.next().unwrap());
    }
    assert_eq!(first.len(), 30);

    scan.rewind().unwrap();
    let mut second = Vec::new();
    while scan.has_next().unwrap() {
        second.push(scan.next().unwrap());
    }
    assert_eq!(first, second);
}

#[test]
fn test_scan_reports_provenance() {
    let (db, table_id, _dir) = setup(5);
    let file = db.catalog().table(table_id).unwrap();
    let cache: Arc<dyn PageCache> = Arc::clone(db.pool()) as Arc<dyn PageCache>;
    let mut scan = file.scan(TransactionId::new(), cache);

    scan.open().unwrap();
    while scan.has_next().unwrap() {
        let tuple = scan.next().unwrap();
        let rid = tuple.rid().expect("stored tuples carry a record id");
        assert_eq!(rid.page_id.table_id, table_id);
    }
}

#[test]
fn test_empty_file_scan_is_exhausted_not_an_error() {
    let (db, table_id, _dir) = setup(0);
    let file = db.catalog().table(table_id).unwrap();
    assert_eq!(file.num_pages().unwrap(), 0);

    let cache: Arc<dyn PageCache> = Arc::clone(db.pool()) as Arc<dyn PageCache>;
    let mut scan = file.scan(TransactionId::new(), cache);
    scan.open().unwrap();
    assert!(!scan.has_next().unwrap());
    assert!(matches!(scan.next(), Err(DbError::NoSuchElement)));
}

#[test]
fn test_closed_scan_is_exhausted() {
    let (db, table_id, _dir) = setup(3);
    let file = db.catalog().table(table_id).unwrap();
    let cache: Arc<dyn PageCache> = Arc::clone(db.pool()) as Arc<dyn PageCache>;
    let mut scan = file.scan(TransactionId::new(), cache);

    scan.open().unwrap();
    assert!(scan.has_next().unwrap());
    scan.close();
    assert!(!scan.has_next().unwrap());
    assert!(matches!(scan.next(), Err(DbError::NoSuchElement)));
}

#[test]
fn test_next_past_exhaustion_fails() {
    let (db, table_id, _dir) = setup(2);
    let values = scan_values(&db, table_id);
    assert_eq!(values.len(), 2);

    let file = db.catalog().table(table_id).unwrap();
    let cache: Arc<dyn PageCache> = Arc::clone(db.pool()) as Arc<dyn PageCache>;
    let mut scan = file.scan(TransactionId::new(), cache);
    scan.open().unwrap();
    while scan.has_next().unwrap() {
        scan.next().unwrap();
    }
    assert!(matches!(scan.next(), Err(DbError::NoSuchElement)));
}

/// One page is probed per has_next call: with two empty leading pages,
/// the first call reports exhaustion and the second sees page 2.
#[test]
fn test_empty_leading_pages_probe_one_page_per_call() {
    let dir = TempDir::new().unwrap();
    let db = Database::with_page_size(128);
    let table_id = db
        .open_table("t", &dir.path().join("t.dat"), int_schema())
        .unwrap();
    let file = db.catalog().table(table_id).unwrap();

    file.write_page(&HeapPage::new(HeapPageId::new(table_id, 0), 128))
        .unwrap();
    file.write_page(&HeapPage::new(HeapPageId::new(table_id, 1), 128))
        .unwrap();
    let mut page2 = HeapPage::new(HeapPageId::new(table_id, 2), 128);
    let payload = serialize_tuple(&[Value::Integer(7)], &int_schema()).unwrap();
    page2.insert_cell(&payload).unwrap();
    file.write_page(&page2).unwrap();

    let cache: Arc<dyn PageCache> = Arc::clone(db.pool()) as Arc<dyn PageCache>;
    let mut scan = file.scan(TransactionId::new(), cache);
    scan.open().unwrap();

    assert!(!scan.has_next().unwrap()); // probes page 1, still empty
    assert!(scan.has_next().unwrap()); // probes page 2
    assert_eq!(scan.next().unwrap().field(0), Some(&Value::Integer(7)));
    assert!(!scan.has_next().unwrap());
}
