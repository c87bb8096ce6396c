//! Test support utilities for the heap storage workspace.
//!
//! This crate provides:
//! - Isolated test contexts with a temporary data directory and catalog
//! - Schema and tuple fixtures plus heap-file writers with exact slot layouts
//! - Property-based test generators for fields, tuples and page occupancy
//! - Custom assertion helpers
//!
//! # Example Usage
//!
//! ```no_run
//! use testsupport::prelude::*;
//!
//! let mut ctx = TestContext::new().unwrap();
//! let desc = emp_desc();
//! let table = ctx
//!     .create_table("emp", desc.clone(), &[vec![Some(emp_tuple(&desc, 1, "ann", 30))]])
//!     .unwrap();
//! assert_eq!(ctx.catalog().table_name(table).unwrap(), "emp");
//! ```

pub mod assertions;
pub mod context;
pub mod fixtures;
pub mod proptest_generators;

/// Convenient re-exports for common testing patterns.
pub mod prelude {
    pub use crate::assertions::*;
    pub use crate::context::*;
    pub use crate::fixtures::*;
}
