//! Pull-based query operators.
//!
//! Operators compose into a tree and tuples are pulled top-down, one at
//! a time, through the uniform [`OpIterator`] protocol. No operator
//! spawns independent execution; all blocking happens inside page-cache
//! requests and file I/O at the leaves.
//!
//! - [`HeapScan`](crate::storage::HeapScan): leaf scan over a heap file
//! - [`IntAggregator`] / [`StrAggregator`]: grouped aggregation
//! - [`Insert`]: drains a child into a table, emitting one count tuple
//! - [`TupleIterator`]: in-memory tuple source

mod aggregate;
mod insert;
mod tuple_iterator;

pub use aggregate::{AggregateOp, AggregateResults, Aggregator, IntAggregator, StrAggregator};
pub use insert::Insert;
pub use tuple_iterator::TupleIterator;

use crate::error::Result;
use crate::schema::TupleDesc;
use crate::tuple::Tuple;

/// Uniform pull protocol for every operator.
///
/// Lifecycle: `open`, then any interleaving of `has_next`/`next` (each
/// `next` must be preceded by a confirming `has_next`), optionally
/// `rewind` to restart, and finally `close`. A closed iterator is
/// unusable until reopened.
pub trait OpIterator {
    fn open(&mut self) -> Result<()>;

    fn has_next(&mut self) -> Result<bool>;

    /// Next tuple. Fails with an end-of-sequence error when called past
    /// exhaustion or without a confirming `has_next`.
    fn next(&mut self) -> Result<Tuple>;

    /// Equivalent to `close` followed by `open`.
    fn rewind(&mut self) -> Result<()>;

    fn close(&mut self);

    /// Descriptor of the tuples this operator emits.
    fn tuple_desc(&self) -> &TupleDesc;
}
