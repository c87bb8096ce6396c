//! Test helpers and utilities for executor tests.

use crate::{ExecutionContext, Executor};
use buffer::BufferPool;
use catalog::Catalog;
use common::{DbError, DbResult, Tuple, TupleDesc};
use std::{collections::VecDeque, sync::Arc};
use testsupport::prelude::*;

/// Page size holding exactly two int slots.
pub const TWO_INT_PAGE: usize = 12;

/// Mock executor for testing drivers in isolation.
///
/// Allows controlled tuple iteration and error injection.
pub struct MockExecutor {
    tuples: VecDeque<Tuple>,
    schema: Arc<TupleDesc>,
    next_error: Option<DbError>,
    open_called: bool,
    close_called: bool,
    open_error: Option<DbError>,
}

impl MockExecutor {
    /// Create a mock executor that returns the given tuples.
    pub fn new(tuples: Vec<Tuple>, schema: Arc<TupleDesc>) -> Self {
        Self {
            tuples: tuples.into(),
            schema,
            next_error: None,
            open_called: false,
            close_called: false,
            open_error: None,
        }
    }

    /// Create a mock executor whose first pull fails.
    pub fn with_next_error(error: DbError) -> Self {
        Self {
            next_error: Some(error),
            ..Self::new(vec![], int_desc(&["x"]))
        }
    }

    /// Create a mock executor that fails to open.
    pub fn with_open_error(error: DbError) -> Self {
        Self {
            open_error: Some(error),
            ..Self::new(vec![], int_desc(&["x"]))
        }
    }

    pub fn was_opened(&self) -> bool {
        self.open_called
    }

    pub fn was_closed(&self) -> bool {
        self.close_called
    }
}

impl Executor for MockExecutor {
    fn open(&mut self) -> DbResult<()> {
        self.open_called = true;
        match self.open_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn has_next(&mut self) -> DbResult<bool> {
        if let Some(err) = self.next_error.take() {
            return Err(err);
        }
        Ok(!self.tuples.is_empty())
    }

    fn next(&mut self) -> DbResult<Tuple> {
        self.tuples.pop_front().ok_or(DbError::NoMoreElements)
    }

    fn rewind(&mut self) -> DbResult<()> {
        Ok(())
    }

    fn close(&mut self) -> DbResult<()> {
        self.close_called = true;
        Ok(())
    }

    fn schema(&self) -> &TupleDesc {
        &self.schema
    }
}

/// Wrap `catalog` with a small buffer pool.
pub fn create_context_from_catalog(catalog: Arc<Catalog>) -> (ExecutionContext, Arc<BufferPool>) {
    let pool = Arc::new(BufferPool::new(catalog.clone(), 8));
    (ExecutionContext::new(catalog, pool.clone()), pool)
}

/// A table `nums(v INT)` holding `values` densely, two per page.
pub fn setup_test_context(values: &[i32]) -> (ExecutionContext, TestContext, common::TableId) {
    let mut ctx = TestContext::with_page_size(TWO_INT_PAGE).unwrap();
    let desc = int_desc(&["v"]);
    let tuples = values.iter().map(|&v| int_tuple(&desc, &[v])).collect();
    let table = ctx
        .create_table("nums", desc, &dense_pages(tuples, 2))
        .unwrap();
    let (exec_ctx, _pool) = create_context_from_catalog(ctx.catalog());
    (exec_ctx, ctx, table)
}

/// Pull one tuple per expected value and compare the first column.
pub fn assert_next_ints(exec: &mut dyn Executor, expected: &[i32]) {
    for &value in expected {
        assert!(exec.has_next().unwrap(), "expected {value}, executor exhausted");
        let tuple = exec.next().unwrap();
        assert_eq!(first_ints([&tuple]), vec![value]);
    }
}

pub fn assert_exhausted(exec: &mut dyn Executor) {
    assert!(!exec.has_next().unwrap());
    assert!(matches!(exec.next(), Err(DbError::NoMoreElements)));
}
