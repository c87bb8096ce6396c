
pub mod pretty;
mod schema;
mod tuple;

pub use schema::{TdItem, TupleDesc};
pub use tuple::Tuple;

use serde::{Deserialize, Serialize};
use std::{
    fmt, io,
    path::PathBuf,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use thiserror::Error;

/// Logical identifier for a table, derived from its backing file.
/// Examples:
/// - `let users = TableId(7);`
/// - `let orders = TableId(0x9e3779b9);`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableId(pub u64);

/// Address of one page: the owning table plus a dense 0-based page number.
/// Examples:
/// - `let first = PageId::new(TableId(7), 0);`
/// - `let third = PageId::new(TableId(7), 2);`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageId {
    pub table: TableId,
    pub page_no: u64,
}

impl PageId {
    pub fn new(table: TableId, page_no: u64) -> Self {
        Self { table, page_no }
    }
}

/// Page-resident location of a tuple.
/// Examples:
/// - `let rid = RecordId { page_id: PageId::new(TableId(7), 0), slot: 3 };`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: usize,
}

impl RecordId {
    pub fn new(page_id: PageId, slot: usize) -> Self {
        Self { page_id, slot }
    }
}

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque token forwarded with every page access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Allocate a process-unique transaction id.
    pub fn next() -> Self {
        Self(NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn#{}", self.0)
    }
}

/// Access intent declared when acquiring a page from the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permissions {
    ReadOnly,
    ReadWrite,
}

/// Canonical error type shared across the storage subsystems.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("field not found: {0}")]
    FieldNotFound(String),
    #[error("format: {0}")]
    Format(String),
    #[error("no more elements")]
    NoMoreElements,
    #[error("transaction {0} aborted")]
    TransactionAborted(TransactionId),
    #[error("catalog: {0}")]
    Catalog(String),
    #[error("storage: {0}")]
    Storage(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<types::DecodeError> for DbError {
    fn from(err: types::DecodeError) -> Self {
        DbError::Format(err.to_string())
    }
}

/// Result alias that carries a `DbError`.
pub type DbResult<T> = Result<T, DbError>;

/// Fixed page size used when no configuration says otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Runtime configuration for the storage components.
///
/// ```
/// use common::{Config, DEFAULT_PAGE_SIZE};
///
/// let config = Config::builder().buffer_pool_pages(32).build();
/// assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
/// assert_eq!(config.buffer_pool_pages, 32);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, bon::Builder)]
pub struct Config {
    /// Directory that relative table file paths are resolved against.
    #[builder(default = PathBuf::from("."))]
    pub data_dir: PathBuf,
    /// Fixed-size page allocation in bytes.
    #[builder(default = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,
    /// Number of decoded pages the buffer pool keeps resident.
    #[builder(default = 256)]
    pub buffer_pool_pages: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Counters and timings an operator accumulates between `open` and `close`.
///
/// ```
/// use common::ExecutionStats;
/// use std::time::Duration;
///
/// let stats = ExecutionStats {
///     open_time: Duration::from_micros(40),
///     total_next_time: Duration::from_micros(900),
///     close_time: Duration::from_micros(60),
///     rows_produced: 12,
///     pages_scanned: 3,
/// };
/// assert_eq!(ExecutionStats::format_duration(stats.total_time()), "1.00ms");
/// ```
#[derive(Clone, Debug, Default)]
pub struct ExecutionStats {
    pub open_time: Duration,
    /// Summed over every `has_next`/`next` call.
    pub total_next_time: Duration,
    pub close_time: Duration,
    /// Tuples handed to the caller.
    pub rows_produced: u64,
    /// Page requests issued to the page cache.
    pub pages_scanned: u64,
}

impl ExecutionStats {
    pub fn total_time(&self) -> Duration {
        self.open_time + self.total_next_time + self.close_time
    }

    /// `850µs`, `12.34ms` or `1.500s`, depending on magnitude.
    pub fn format_duration(d: Duration) -> String {
        match d.as_micros() {
            us @ 0..1_000 => format!("{us}µs"),
            us @ 1_000..1_000_000 => format!("{:.2}ms", us as f64 / 1e3),
            us => format!("{:.3}s", us as f64 / 1e6),
        }
    }
}

/// Convenient re-exports for downstream crates.
pub mod prelude {
    pub use crate::{
        Config, DbError, DbResult, ExecutionStats, PageId, Permissions, RecordId, TableId,
        TransactionId, Tuple, TupleDesc,
    };
    pub use types::{Field, Type};
}
