use std::sync::Arc;

use log::warn;

use crate::buffer::PageCache;
use crate::error::{DbError, Result};
use crate::exec::OpIterator;
use crate::schema::TupleDesc;
use crate::tuple::Tuple;
use crate::tx::TransactionId;
use crate::types::{DataType, Value};

/// Drains a child operator into a table and emits a single tuple with
/// the number of inserted records.
///
/// The drain runs at most once per open/close cycle; `rewind` re-arms
/// it. A failed insertion is logged and skipped: the drain continues
/// and the summary count excludes it.
pub struct Insert {
    tx: TransactionId,
    child: Box<dyn OpIterator>,
    table_id: u64,
    cache: Arc<dyn PageCache>,
    desc: TupleDesc,
    count: i64,
    called: bool,
    fetched: Option<Tuple>,
    opened: bool,
}

impl Insert {
    pub fn new(
        tx: TransactionId,
        child: Box<dyn OpIterator>,
        table_id: u64,
        cache: Arc<dyn PageCache>,
    ) -> Self {
        let desc = TupleDesc::new(vec![(
            DataType::BigInt,
            Some("number of inserted tuples".into()),
        )]);
        Insert {
            tx,
            child,
            table_id,
            cache,
            desc,
            count: 0,
            called: false,
            fetched: None,
            opened: false,
        }
    }

    /// One summary tuple on the first call after open/rewind, nothing
    /// afterwards.
    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        if self.called {
            return Ok(None);
        }
        self.called = true;

        while self.child.has_next()? {
            let mut tuple = self.child.next()?;
            match self.cache.insert_tuple(self.tx, self.table_id, &mut tuple) {
                Ok(_) => self.count += 1,
                Err(e) => warn!("insert into table {} failed: {}", self.table_id, e),
            }
        }
        Ok(Some(Tuple::new(vec![Value::Integer(self.count)])))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.opened {
            Ok(())
        } else {
            Err(DbError::IllegalState("insert operator is not open".into()))
        }
    }
}

impl OpIterator for Insert {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.count = 0;
        self.opened = true;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        self.ensure_open()?;
        if self.fetched.is_none() {
            self.fetched = self.fetch_next()?;
        }
        Ok(self.fetched.is_some())
    }

    fn next(&mut self) -> Result<Tuple> {
        self.ensure_open()?;
        if self.fetched.is_none() {
            self.fetched = self.fetch_next()?;
        }
        self.fetched.take().ok_or(DbError::NoSuchElement)
    }

    fn rewind(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.count = 0;
        self.called = false;
        self.fetched = None;
        self.child.rewind()
    }

    fn close(&mut self) {
        self.child.close();
        self.count = 0;
        self.called = false;
        self.fetched = None;
        self.opened = false;
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }
}
