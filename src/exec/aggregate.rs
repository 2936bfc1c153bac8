use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use crate::error::{DbError, Result};
use crate::exec::OpIterator;
use crate::schema::TupleDesc;
use crate::tuple::Tuple;
use crate::types::{DataType, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateOp::Min => write!(f, "MIN"),
            AggregateOp::Max => write!(f, "MAX"),
            AggregateOp::Sum => write!(f, "SUM"),
            AggregateOp::Avg => write!(f, "AVG"),
            AggregateOp::Count => write!(f, "COUNT"),
        }
    }
}

/// Folds tuples into per-group running state, then hands the finalized
/// groups to a second-phase iterator.
///
/// `into_results` consumes the aggregator, so merging after iteration
/// has begun is unrepresentable.
pub trait Aggregator {
    fn merge_tuple_into_group(&mut self, tuple: &Tuple) -> Result<()>;

    fn into_results(self) -> AggregateResults;
}

/// Extract the group key, or `None` under no grouping. A present group
/// value whose runtime type disagrees with the configured one is a
/// type-mismatch error.
fn group_key(
    tuple: &Tuple,
    group_by: Option<usize>,
    group_type: Option<DataType>,
) -> Result<Option<Value>> {
    let Some(index) = group_by else {
        return Ok(None);
    };
    let value = tuple.field(index).ok_or_else(|| {
        DbError::TypeMismatch(format!("tuple has no group-by field at index {}", index))
    })?;
    match group_type {
        Some(ty) if value.data_type() == ty => Ok(Some(value.clone())),
        _ => Err(DbError::TypeMismatch(format!(
            "group-by field is {}, configured as {}",
            value.data_type(),
            group_type.map_or("no grouping".to_string(), |ty| ty.to_string()),
        ))),
    }
}

/// Per-group running state. MIN/MAX/SUM keep their scalar in `sum`;
/// COUNT and AVG use `count`, AVG both.
#[derive(Debug, Clone, Copy)]
struct Accum {
    sum: i64,
    count: i64,
}

/// Grouped aggregation over an integer column: MIN, MAX, SUM, AVG, COUNT.
pub struct IntAggregator {
    group_by: Option<usize>,
    group_type: Option<DataType>,
    field: usize,
    op: AggregateOp,
    groups: HashMap<Option<Value>, Accum>,
}

impl IntAggregator {
    /// `group_by`/`group_type` are both `None` under no grouping.
    /// `field` is the index of the aggregated column.
    pub fn new(
        group_by: Option<usize>,
        group_type: Option<DataType>,
        field: usize,
        op: AggregateOp,
    ) -> Self {
        IntAggregator {
            group_by,
            group_type,
            field,
            op,
            groups: HashMap::new(),
        }
    }
}

impl Aggregator for IntAggregator {
    fn merge_tuple_into_group(&mut self, tuple: &Tuple) -> Result<()> {
        let value = match tuple.field(self.field) {
            Some(Value::Integer(n)) => *n,
            Some(other) => {
                return Err(DbError::TypeMismatch(format!(
                    "aggregate field {} is {}, expected BIGINT",
                    self.field,
                    other.data_type()
                )))
            }
            None => {
                return Err(DbError::TypeMismatch(format!(
                    "tuple has no aggregate field at index {}",
                    self.field
                )))
            }
        };
        let key = group_key(tuple, self.group_by, self.group_type)?;

        match self.groups.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(Accum {
                    sum: value,
                    count: 1,
                });
            }
            Entry::Occupied(mut slot) => {
                let acc = slot.get_mut();
                acc.count += 1;
                acc.sum = match self.op {
                    AggregateOp::Min => acc.sum.min(value),
                    AggregateOp::Max => acc.sum.max(value),
                    AggregateOp::Sum | AggregateOp::Avg => acc.sum + value,
                    AggregateOp::Count => acc.sum,
                };
            }
        }
        Ok(())
    }

    fn into_results(self) -> AggregateResults {
        let op = self.op;
        let entries = self
            .groups
            .into_iter()
            .map(|(key, acc)| {
                let value = match op {
                    AggregateOp::Min | AggregateOp::Max | AggregateOp::Sum => acc.sum,
                    AggregateOp::Count => acc.count,
                    // Truncating integer division; count >= 1 because a
                    // group exists only once merged into.
                    AggregateOp::Avg => acc.sum / acc.count,
                };
                (key, value)
            })
            .collect();
        AggregateResults::new(self.group_type, entries)
    }
}

/// Grouped aggregation over a string column. Only COUNT is supported;
/// the check is deferred to merge time.
pub struct StrAggregator {
    group_by: Option<usize>,
    group_type: Option<DataType>,
    field: usize,
    op: AggregateOp,
    groups: HashMap<Option<Value>, i64>,
}

impl StrAggregator {
    pub fn new(
        group_by: Option<usize>,
        group_type: Option<DataType>,
        field: usize,
        op: AggregateOp,
    ) -> Self {
        StrAggregator {
            group_by,
            group_type,
            field,
            op,
            groups: HashMap::new(),
        }
    }
}

impl Aggregator for StrAggregator {
    fn merge_tuple_into_group(&mut self, tuple: &Tuple) -> Result<()> {
        if self.op != AggregateOp::Count {
            return Err(DbError::UnsupportedAggregate(format!(
                "{} over VARCHAR (only COUNT is supported)",
                self.op
            )));
        }
        match tuple.field(self.field) {
            Some(Value::Varchar(_)) => {}
            Some(other) => {
                return Err(DbError::TypeMismatch(format!(
                    "aggregate field {} is {}, expected VARCHAR",
                    self.field,
                    other.data_type()
                )))
            }
            None => {
                return Err(DbError::TypeMismatch(format!(
                    "tuple has no aggregate field at index {}",
                    self.field
                )))
            }
        }
        let key = group_key(tuple, self.group_by, self.group_type)?;
        *self.groups.entry(key).or_insert(0) += 1;
        Ok(())
    }

    fn into_results(self) -> AggregateResults {
        AggregateResults::new(self.group_type, self.groups.into_iter().collect())
    }
}

/// Second-phase iterator over finalized groups.
///
/// Emits `(groupVal, aggregateVal)` under grouping, else a single
/// `(aggregateVal)`. `rewind` re-takes a fresh cursor over the same
/// entries; nothing is recomputed.
pub struct AggregateResults {
    desc: TupleDesc,
    entries: Vec<(Option<Value>, i64)>,
    cursor: Option<usize>,
}

impl AggregateResults {
    fn new(group_type: Option<DataType>, entries: Vec<(Option<Value>, i64)>) -> Self {
        let desc = match group_type {
            None => TupleDesc::new(vec![(DataType::BigInt, Some("aggregateVal".into()))]),
            Some(ty) => TupleDesc::new(vec![
                (ty, Some("groupVal".into())),
                (DataType::BigInt, Some("aggregateVal".into())),
            ]),
        };
        AggregateResults {
            desc,
            entries,
            cursor: None,
        }
    }
}

impl OpIterator for AggregateResults {
    fn open(&mut self) -> Result<()> {
        self.cursor = Some(0);
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        match self.cursor {
            Some(pos) => Ok(pos < self.entries.len()),
            None => Err(DbError::IllegalState(
                "aggregate results iterator is not open".into(),
            )),
        }
    }

    fn next(&mut self) -> Result<Tuple> {
        let pos = self.cursor.ok_or_else(|| {
            DbError::IllegalState("aggregate results iterator is not open".into())
        })?;
        let Some((key, value)) = self.entries.get(pos) else {
            return Err(DbError::NoSuchElement);
        };
        self.cursor = Some(pos + 1);
        Ok(match key {
            None => Tuple::new(vec![Value::Integer(*value)]),
            Some(group) => Tuple::new(vec![group.clone(), Value::Integer(*value)]),
        })
    }

    fn rewind(&mut self) -> Result<()> {
        self.cursor = Some(0);
        Ok(())
    }

    fn close(&mut self) {
        self.cursor = None;
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }
}
