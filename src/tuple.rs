use crate::error::{DbError, Result};
use crate::schema::TupleDesc;
use crate::storage::page::HeapPageId;
use crate::types::{DataType, Value};

/// Physical location of a stored tuple: owning page plus slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: HeapPageId,
    pub slot: u16,
}

impl RecordId {
    pub fn new(page_id: HeapPageId, slot: u16) -> Self {
        RecordId { page_id, slot }
    }
}

/// A fixed-arity row of typed values.
///
/// Tuples read from storage carry their `RecordId`; synthesized tuples
/// (aggregate results, insert summaries) carry none.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    values: Vec<Value>,
    rid: Option<RecordId>,
}

impl Tuple {
    pub fn new(values: Vec<Value>) -> Self {
        Tuple { values, rid: None }
    }

    pub fn with_rid(values: Vec<Value>, rid: RecordId) -> Self {
        Tuple {
            values,
            rid: Some(rid),
        }
    }

    pub fn field(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn rid(&self) -> Option<RecordId> {
        self.rid
    }

    pub fn set_rid(&mut self, rid: Option<RecordId>) {
        self.rid = rid;
    }

    /// Whether this tuple's value types match `desc` positionally.
    pub fn matches(&self, desc: &TupleDesc) -> bool {
        self.values.len() == desc.num_fields()
            && self
                .values
                .iter()
                .map(|v| v.data_type())
                .eq(desc.types())
    }
}

/// Serialize a tuple's values in schema order.
///
/// BIGINT is 8 bytes little-endian; VARCHAR is a u16 length prefix plus
/// UTF-8 bytes.
pub fn serialize_tuple(values: &[Value], desc: &TupleDesc) -> Result<Vec<u8>> {
    if values.len() != desc.num_fields() {
        return Err(DbError::SchemaMismatch(format!(
            "tuple has {} fields, schema has {}",
            values.len(),
            desc.num_fields()
        )));
    }

    let mut buf = Vec::new();
    for (i, val) in values.iter().enumerate() {
        let declared = desc.field_type(i).expect("index bounded by arity check");
        if val.data_type() != declared {
            return Err(DbError::SchemaMismatch(format!(
                "field {} is {}, schema declares {}",
                i,
                val.data_type(),
                declared
            )));
        }
        match val {
            Value::Integer(n) => buf.extend_from_slice(&n.to_le_bytes()),
            Value::Varchar(s) => {
                let bytes = s.as_bytes();
                if bytes.len() > u16::MAX as usize {
                    return Err(DbError::SchemaMismatch(format!(
                        "varchar field {} exceeds {} bytes",
                        i,
                        u16::MAX
                    )));
                }
                buf.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
                buf.extend_from_slice(bytes);
            }
        }
    }
    Ok(buf)
}

/// Decode a tuple cell written by [`serialize_tuple`].
pub fn deserialize_tuple(data: &[u8], desc: &TupleDesc) -> Result<Vec<Value>> {
    let mut values = Vec::with_capacity(desc.num_fields());
    let mut pos = 0usize;

    for ty in desc.types() {
        match ty {
            DataType::BigInt => {
                let end = pos + 8;
                let bytes = data
                    .get(pos..end)
                    .ok_or_else(|| DbError::Corruption("truncated BIGINT field".into()))?;
                values.push(Value::Integer(i64::from_le_bytes(
                    bytes.try_into().expect("slice is 8 bytes"),
                )));
                pos = end;
            }
            DataType::Varchar => {
                let len_bytes = data
                    .get(pos..pos + 2)
                    .ok_or_else(|| DbError::Corruption("truncated VARCHAR length".into()))?;
                let len = u16::from_le_bytes(len_bytes.try_into().expect("slice is 2 bytes")) as usize;
                let end = pos + 2 + len;
                let bytes = data
                    .get(pos + 2..end)
                    .ok_or_else(|| DbError::Corruption("truncated VARCHAR field".into()))?;
                let s = String::from_utf8(bytes.to_vec())
                    .map_err(|_| DbError::Corruption("VARCHAR field is not UTF-8".into()))?;
                values.push(Value::Varchar(s));
                pos = end;
            }
        }
    }

    if pos != data.len() {
        return Err(DbError::Corruption(format!(
            "tuple cell has {} trailing bytes",
            data.len() - pos
        )));
    }
    Ok(values)
}
