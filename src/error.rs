use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("page {page_no} for table {table_id} is invalid")]
    InvalidPage { table_id: u64, page_no: u64 },

    #[error("page overflow: tuple exceeds page capacity")]
    PageOverflow,

    #[error("table not found: table_id={0}")]
    NoSuchTable(u64),

    #[error("data corruption: {0}")]
    Corruption(String),

    #[error("lock error: {0}")]
    Lock(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("unsupported aggregate: {0}")]
    UnsupportedAggregate(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("no more elements")]
    NoSuchElement,

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("transaction aborted")]
    TransactionAborted,
}

pub type Result<T> = std::result::Result<T, DbError>;
