use crate::error::{DbError, Result};
use crate::exec::OpIterator;
use crate::schema::TupleDesc;
use crate::tuple::Tuple;

/// Operator over an in-memory tuple list. The leaf of choice for tests
/// and for feeding synthesized rows into Insert.
pub struct TupleIterator {
    desc: TupleDesc,
    tuples: Vec<Tuple>,
    cursor: Option<usize>,
}

impl TupleIterator {
    pub fn new(desc: TupleDesc, tuples: Vec<Tuple>) -> Self {
        TupleIterator {
            desc,
            tuples,
            cursor: None,
        }
    }
}

impl OpIterator for TupleIterator {
    fn open(&mut self) -> Result<()> {
        self.cursor = Some(0);
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        match self.cursor {
            Some(pos) => Ok(pos < self.tuples.len()),
            None => Ok(false),
        }
    }

    fn next(&mut self) -> Result<Tuple> {
        let pos = self.cursor.ok_or(DbError::NoSuchElement)?;
        let tuple = self.tuples.get(pos).cloned().ok_or(DbError::NoSuchElement)?;
        self.cursor = Some(pos + 1);
        Ok(tuple)
    }

    fn rewind(&mut self) -> Result<()> {
        self.close();
        self.open()
    }

    fn close(&mut self) {
        self.cursor = None;
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }
}
