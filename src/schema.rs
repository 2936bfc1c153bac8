use crate::types::DataType;

/// Ordered field descriptor for the tuples of one table or operator.
///
/// Storage compatibility is decided by the type sequence alone; field
/// names are advisory and never participate in comparisons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleDesc {
    fields: Vec<(DataType, Option<String>)>,
}

impl TupleDesc {
    pub fn new(fields: Vec<(DataType, Option<String>)>) -> Self {
        TupleDesc { fields }
    }

    /// Descriptor with unnamed fields of the given types.
    pub fn unnamed(types: &[DataType]) -> Self {
        TupleDesc {
            fields: types.iter().map(|ty| (*ty, None)).collect(),
        }
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn field_type(&self, index: usize) -> Option<DataType> {
        self.fields.get(index).map(|(ty, _)| *ty)
    }

    pub fn field_name(&self, index: usize) -> Option<&str> {
        self.fields.get(index).and_then(|(_, name)| name.as_deref())
    }

    pub fn types(&self) -> impl Iterator<Item = DataType> + '_ {
        self.fields.iter().map(|(ty, _)| *ty)
    }

    /// Positional type-sequence equality. Name differences are not an
    /// error for storage purposes.
    pub fn compatible(&self, other: &TupleDesc) -> bool {
        self.num_fields() == other.num_fields() && self.types().eq(other.types())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compatible_ignores_names() {
        let a = TupleDesc::new(vec![
            (DataType::BigInt, Some("id".into())),
            (DataType::Varchar, Some("name".into())),
        ]);
        let b = TupleDesc::unnamed(&[DataType::BigInt, DataType::Varchar]);
        assert!(a.compatible(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_incompatible_on_type_or_arity() {
        let a = TupleDesc::unnamed(&[DataType::BigInt, DataType::Varchar]);
        let b = TupleDesc::unnamed(&[DataType::Varchar, DataType::BigInt]);
        let c = TupleDesc::unnamed(&[DataType::BigInt]);
        assert!(!a.compatible(&b));
        assert!(!a.compatible(&c));
    }

    #[test]
    fn test_field_access() {
        let desc = TupleDesc::new(vec![
            (DataType::BigInt, Some("age".into())),
            (DataType::Varchar, None),
        ]);
        assert_eq!(desc.num_fields(), 2);
        assert_eq!(desc.field_type(0), Some(DataType::BigInt));
        assert_eq!(desc.field_name(0), Some("age"));
        assert_eq!(desc.field_name(1), None);
        assert_eq!(desc.field_type(2), None);
    }
}
