//! Heap storage: fixed-size slotted pages and the files that hold them.
//!
//! Bytes flow one way on the read path:
//!
//! ```text
//! file bytes -> HeapFile::read_page -> HeapPage (decode) -> Tuple
//!                      ^                                      |
//!                 PageCache miss         HeapFileIterator <---+
//! ```
//!
//! # Example
//!
//! ```no_run
//! use common::{TransactionId, TupleDesc, DEFAULT_PAGE_SIZE};
//! use std::sync::Arc;
//! use storage::HeapFile;
//! use types::Type;
//!
//! let desc = Arc::new(TupleDesc::from_types(vec![Type::Int, Type::String]).unwrap());
//! let file = HeapFile::open("/tmp/emp.dat", desc, DEFAULT_PAGE_SIZE).unwrap();
//! let page = file.read_page(0).unwrap();
//! for tuple in page.iter() {
//!     println!("{tuple}");
//! }
//! ```


mod file;
mod page;

pub use file::{HeapFile, HeapFileIterator};
pub use page::{HeapPage, HeapPageLayout, PageTuples, Tuples};

use common::{DbResult, PageId, Permissions, TransactionId};
use std::sync::Arc;

/// Source of decoded pages shared between readers.
///
/// Implementations own page lifetime and per-transaction locking. A request
/// may block, or fail with `DbError::TransactionAborted`, which callers must
/// propagate.
pub trait PageCache: Send + Sync {
    fn get_page(
        &self,
        tid: TransactionId,
        pid: PageId,
        perm: Permissions,
    ) -> DbResult<Arc<HeapPage>>;
}
