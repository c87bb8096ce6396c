//! Sequential scan: every tuple of a table, with alias-qualified column names.

use crate::{ExecutionContext, Executor};
use catalog::Catalog;
use common::{DbResult, ExecutionStats, TableId, TdItem, TransactionId, Tuple, TupleDesc};
use log::debug;
use std::{sync::Arc, time::Instant};
use storage::HeapFileIterator;

/// Sequential scan operator - iterates all tuples of a table.
///
/// Pages are requested read-only through the context's page cache, in file
/// order, and tuples within a page in slot order. The tuples themselves keep
/// the table's schema; only [`Executor::schema`] shows the `alias.field`
/// names.
pub struct SeqScanExec {
    catalog: Arc<Catalog>,
    table_id: TableId,
    alias: Option<String>,
    schema: TupleDesc,
    iter: HeapFileIterator,
    stats: ExecutionStats,
    pages_before_open: u64,
}

impl SeqScanExec {
    /// Create a scan of `table_id` for `tid`, labelling columns with `alias`.
    pub fn new(
        ctx: &ExecutionContext,
        tid: TransactionId,
        table_id: TableId,
        alias: Option<&str>,
    ) -> DbResult<Self> {
        let iter = ctx.table_iterator(tid, table_id)?;
        let alias = alias.map(str::to_string);
        let schema = qualified_schema(&ctx.catalog, table_id, alias.as_deref())?;
        Ok(Self {
            catalog: ctx.catalog.clone(),
            table_id,
            alias,
            schema,
            iter,
            stats: ExecutionStats::default(),
            pages_before_open: 0,
        })
    }

    /// Create a scan aliased by the table's own name.
    pub fn with_table_name(
        ctx: &ExecutionContext,
        tid: TransactionId,
        table_id: TableId,
    ) -> DbResult<Self> {
        let name = ctx.catalog.table_name(table_id)?.to_string();
        Self::new(ctx, tid, table_id, Some(&name))
    }

    /// Relabel the scan. The underlying iterator and its position are kept.
    pub fn reset(&mut self, table_id: TableId, alias: Option<&str>) -> DbResult<()> {
        self.schema = qualified_schema(&self.catalog, table_id, alias)?;
        self.table_id = table_id;
        self.alias = alias.map(str::to_string);
        Ok(())
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// Catalog name of the scanned table.
    pub fn table_name(&self) -> DbResult<&str> {
        self.catalog.table_name(self.table_id)
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    fn record_pages(&mut self) {
        self.stats.pages_scanned = self.iter.pages_visited() - self.pages_before_open;
    }
}

/// The table's schema with every name rewritten to `alias.name`.
fn qualified_schema(
    catalog: &Catalog,
    table_id: TableId,
    alias: Option<&str>,
) -> DbResult<TupleDesc> {
    let desc = catalog.tuple_desc(table_id)?;
    let prefix = alias.unwrap_or("null");
    let items = desc
        .items()
        .map(|item| TdItem {
            ty: item.ty,
            name: Some(format!(
                "{prefix}.{}",
                item.name.as_deref().unwrap_or("null")
            )),
        })
        .collect();
    TupleDesc::from_items(items)
}

impl Executor for SeqScanExec {
    fn open(&mut self) -> DbResult<()> {
        let start = Instant::now();
        self.stats = ExecutionStats::default();
        self.pages_before_open = self.iter.pages_visited();
        self.iter.open()?;
        self.record_pages();
        debug!(
            "seq scan of table {} opened as '{}'",
            self.table_id.0,
            self.alias.as_deref().unwrap_or("null")
        );
        self.stats.open_time = start.elapsed();
        Ok(())
    }

    fn has_next(&mut self) -> DbResult<bool> {
        let start = Instant::now();
        let pending = self.iter.has_next();
        self.stats.total_next_time += start.elapsed();
        self.record_pages();
        pending
    }

    fn next(&mut self) -> DbResult<Tuple> {
        let start = Instant::now();
        let tuple = self.iter.next();
        self.stats.total_next_time += start.elapsed();
        self.record_pages();

        let tuple = tuple?;
        self.stats.rows_produced += 1;
        Ok(tuple)
    }

    fn rewind(&mut self) -> DbResult<()> {
        self.iter.rewind()
    }

    fn close(&mut self) -> DbResult<()> {
        let start = Instant::now();
        self.iter.close();
        debug!(
            "seq scan of table {} closed after {} rows",
            self.table_id.0, self.stats.rows_produced
        );
        self.stats.close_time = start.elapsed();
        Ok(())
    }

    fn schema(&self) -> &TupleDesc {
        &self.schema
    }

    fn stats(&self) -> Option<&ExecutionStats> {
        Some(&self.stats)
    }
}
