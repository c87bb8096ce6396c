//! Integration tests demonstrating testsupport usage end to end:
//! schema file -> catalog -> buffer pool -> sequential scan.

use std::{fs, sync::Arc};

use buffer::BufferPool;
use catalog::Catalog;
use common::{Config, DbError, Tuple, TransactionId};
use executor::{ExecutionContext, Executor, SeqScanExec, execute_scan};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use testsupport::{prelude::*, proptest_generators::arb_pages};
use types::Field;

fn scan_all(ctx: &TestContext, table: common::TableId) -> Vec<Tuple> {
    let catalog = ctx.catalog();
    let pool = Arc::new(BufferPool::new(catalog.clone(), 4));
    let exec_ctx = ExecutionContext::new(catalog, pool);
    let mut scan = SeqScanExec::with_table_name(&exec_ctx, TransactionId::next(), table).unwrap();
    execute_scan(&mut scan).unwrap()
}

#[test]
fn test_schema_file_drives_a_scan() {
    let ctx = TestContext::new().unwrap();
    let desc = emp_desc();
    write_heap_file(
        &ctx.path("emp.dat"),
        &desc,
        ctx.config().page_size,
        &[vec![
            Some(emp_tuple(&desc, 1, "Alice", 30)),
            None,
            Some(emp_tuple(&desc, 2, "Bob", 25)),
        ]],
    )
    .unwrap();
    fs::write(
        ctx.path("schema.json"),
        r#"{ "tables": [ { "name": "emp", "columns": [
            { "name": "id", "type": "int" },
            { "name": "name", "type": "string" },
            { "name": "age", "type": "int" }
        ] } ] }"#,
    )
    .unwrap();

    let config = Config::builder()
        .data_dir(ctx.data_dir().to_path_buf())
        .buffer_pool_pages(2)
        .build();
    let mut catalog = Catalog::new();
    catalog.load_schema(&ctx.path("schema.json"), &config).unwrap();
    let catalog = Arc::new(catalog);
    let pool = Arc::new(BufferPool::from_config(catalog.clone(), &config));
    let exec_ctx = ExecutionContext::new(catalog.clone(), pool.clone());

    let table = catalog.table_id("emp").unwrap();
    let tid = TransactionId::next();
    let mut scan = SeqScanExec::new(&exec_ctx, tid, table, Some("e")).unwrap();
    let tuples = execute_scan(&mut scan).unwrap();

    assert_rows(
        &tuples,
        &[
            vec![Field::Int(1), Field::from("Alice"), Field::Int(30)],
            vec![Field::Int(2), Field::from("Bob"), Field::Int(25)],
        ],
    );
    assert_eq!(scan.schema().field_name(1).unwrap(), Some("e.name"));
    assert_eq!(
        tuples.iter().map(|t| t.record_id().unwrap().slot).collect::<Vec<_>>(),
        vec![0, 2]
    );

    let pid = tuples[0].record_id().unwrap().page_id;
    assert!(pool.holds_lock(tid, pid).unwrap());
    pool.transaction_complete(tid).unwrap();
    assert!(!pool.holds_lock(tid, pid).unwrap());
}

#[test]
fn test_context_isolation() {
    let mut ctx1 = TestContext::new().unwrap();
    let ctx2 = TestContext::new().unwrap();
    let desc = int_desc(&["a"]);
    ctx1.create_table("t", desc, &[]).unwrap();

    assert!(ctx1.catalog().table_id("t").is_ok());
    assert!(ctx2.catalog().table_id("t").is_err());
    assert_ne!(ctx1.data_dir(), ctx2.data_dir());
}

#[test]
fn test_writer_conflict_aborts_scan() {
    let mut ctx = TestContext::new().unwrap();
    let desc = int_desc(&["a"]);
    let table = ctx
        .create_table("t", desc.clone(), &[vec![Some(int_tuple(&desc, &[1]))]])
        .unwrap();
    let catalog = ctx.catalog();
    let pool = Arc::new(BufferPool::new(catalog.clone(), 4));
    let exec_ctx = ExecutionContext::new(catalog, pool.clone());

    let writer = TransactionId::next();
    let page = common::PageId::new(table, 0);
    storage::PageCache::get_page(pool.as_ref(), writer, page, common::Permissions::ReadWrite)
        .unwrap();

    let reader = TransactionId::next();
    let mut scan = SeqScanExec::new(&exec_ctx, reader, table, None).unwrap();
    assert!(matches!(
        scan.open(),
        Err(DbError::TransactionAborted(t)) if t == reader
    ));

    pool.transaction_complete(writer).unwrap();
    scan.open().unwrap();
    assert!(scan.has_next().unwrap());
}

#[test]
fn test_error_assertions() {
    let ctx = TestContext::new().unwrap();
    assert_error_contains(ctx.catalog().table_id("missing"), "unknown table 'missing'");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// A scan yields exactly the occupied slots, page by page, slot by slot.
    #[test]
    fn prop_scan_matches_occupied_slots(pages in arb_pages(emp_desc(), 7, 4)) {
        // 1024-byte pages hold 7 emp tuples.
        let mut ctx = TestContext::with_page_size(1024).unwrap();
        let table = ctx.create_table("emp", emp_desc(), &pages).unwrap();

        let expected: Vec<Vec<Field>> = pages
            .iter()
            .flatten()
            .flatten()
            .map(|t| t.fields().to_vec())
            .collect();
        let scanned = scan_all(&ctx, table);
        prop_assert_eq!(field_rows(&scanned), expected);
    }
}
