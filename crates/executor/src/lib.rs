//! Query executor: pull-based operators over heap files.
//!
//! Operators follow a Volcano-style protocol. A caller opens an operator,
//! asks whether another tuple is pending, pulls it, and closes the operator
//! when done. The only operator here is the sequential scan, which reads a
//! table page by page through the buffer pool.
//!
//! # Architecture
//!
//! ```text
//! SeqScanExec
//!     ↓ HeapFileIterator
//! PageCache (BufferPool)
//!     ↓ cache miss
//! HeapFile::read_page
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::{path::Path, sync::Arc};
//! use buffer::BufferPool;
//! use catalog::Catalog;
//! use common::{Config, TransactionId};
//! use executor::{ExecutionContext, SeqScanExec, execute_scan};
//!
//! let config = Config::builder().data_dir("/tmp/db".into()).build();
//! let mut catalog = Catalog::new();
//! catalog.load_schema(Path::new("/tmp/db/schema.json"), &config).unwrap();
//! let catalog = Arc::new(catalog);
//! let pool = Arc::new(BufferPool::from_config(catalog.clone(), &config));
//! let ctx = ExecutionContext::new(catalog.clone(), pool);
//!
//! let table = catalog.table_id("emp").unwrap();
//! let mut scan = SeqScanExec::new(&ctx, TransactionId::next(), table, Some("e")).unwrap();
//! for tuple in execute_scan(&mut scan).unwrap() {
//!     println!("{tuple}");
//! }
//! ```


mod scan;

pub use scan::SeqScanExec;

use std::sync::Arc;

use catalog::Catalog;
use common::{DbResult, ExecutionStats, TableId, TransactionId, Tuple, TupleDesc};
use storage::{HeapFile, HeapFileIterator, PageCache};

/// Core trait for all executor operators.
///
/// Operators implement a Volcano-style pull protocol:
/// - `open()`: initialize state
/// - `has_next()`: whether a tuple is pending
/// - `next()`: pull the pending tuple
/// - `close()`: release resources
pub trait Executor {
    /// Initialize the operator. Must be called before pulling tuples.
    fn open(&mut self) -> DbResult<()>;

    /// Whether `next` would produce a tuple.
    fn has_next(&mut self) -> DbResult<bool>;

    /// Fetch the next tuple; `DbError::NoMoreElements` once exhausted or when not open.
    fn next(&mut self) -> DbResult<Tuple>;

    /// Restart from the first tuple.
    fn rewind(&mut self) -> DbResult<()>;

    fn close(&mut self) -> DbResult<()>;

    /// Schema of the tuples as this operator presents them.
    fn schema(&self) -> &TupleDesc;

    /// Return execution statistics.
    /// Returns None for operators that don't collect statistics.
    fn stats(&self) -> Option<&ExecutionStats> {
        None
    }
}

/// Shared handles every operator needs: table metadata and the page cache.
#[derive(Clone)]
pub struct ExecutionContext {
    pub catalog: Arc<Catalog>,
    pub pages: Arc<dyn PageCache>,
}

impl ExecutionContext {
    pub fn new(catalog: Arc<Catalog>, pages: Arc<dyn PageCache>) -> Self {
        Self { catalog, pages }
    }

    /// Heap file backing `table_id`.
    pub fn file(&self, table_id: TableId) -> DbResult<Arc<HeapFile>> {
        self.catalog.file(table_id)
    }

    /// A fresh, unopened iterator over `table_id` on behalf of `tid`.
    pub fn table_iterator(
        &self,
        tid: TransactionId,
        table_id: TableId,
    ) -> DbResult<HeapFileIterator> {
        Ok(self.file(table_id)?.iterator(tid, self.pages.clone()))
    }
}

/// Run `executor` to completion and return every tuple it produces.
pub fn execute_scan(executor: &mut dyn Executor) -> DbResult<Vec<Tuple>> {
    executor.open()?;

    let mut results = Vec::new();
    while executor.has_next()? {
        results.push(executor.next()?);
    }

    executor.close()?;

    Ok(results)
}
