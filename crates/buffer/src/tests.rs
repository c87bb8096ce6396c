use super::*;
use common::{TableId, Tuple};
use pretty_assertions::assert_eq;
use testsupport::prelude::*;

const TINY_PAGE: usize = 12;

/// Three two-slot pages of ints: [0, 1], [2, 3], [4, 5].
fn setup(capacity: usize) -> (TestContext, BufferPool, TableId) {
    let mut ctx = TestContext::with_page_size(TINY_PAGE).unwrap();
    let desc = int_desc(&["v"]);
    let tuples: Vec<Tuple> = (0..6).map(|v| int_tuple(&desc, &[v])).collect();
    let table = ctx.create_table("nums", desc, &dense_pages(tuples, 2)).unwrap();
    let pool = BufferPool::new(ctx.catalog(), capacity);
    (ctx, pool, table)
}

fn pid(table: TableId, page_no: u64) -> PageId {
    PageId::new(table, page_no)
}

#[test]
fn miss_loads_page_from_heap_file() {
    let (_ctx, pool, table) = setup(4);
    let tid = TransactionId::next();

    let page = pool.get_page(tid, pid(table, 1), Permissions::ReadOnly).unwrap();
    assert_eq!(page.id(), pid(table, 1));
    assert_eq!(first_ints(page.iter()), vec![2, 3]);
    assert_eq!(pool.cached_pages().unwrap(), vec![pid(table, 1)]);
}

#[test]
fn hit_returns_the_same_page() {
    let (_ctx, pool, table) = setup(4);
    let tid = TransactionId::next();

    let first = pool.get_page(tid, pid(table, 0), Permissions::ReadOnly).unwrap();
    let second = pool.get_page(tid, pid(table, 0), Permissions::ReadOnly).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn lru_evicts_least_recently_used() {
    let (_ctx, pool, table) = setup(2);
    let tid = TransactionId::next();

    pool.get_page(tid, pid(table, 0), Permissions::ReadOnly).unwrap();
    pool.get_page(tid, pid(table, 1), Permissions::ReadOnly).unwrap();
    // Touch page 0 so page 1 becomes the eviction victim.
    pool.get_page(tid, pid(table, 0), Permissions::ReadOnly).unwrap();
    pool.get_page(tid, pid(table, 2), Permissions::ReadOnly).unwrap();

    assert_eq!(
        pool.cached_pages().unwrap(),
        vec![pid(table, 2), pid(table, 0)]
    );
}

#[test]
fn eviction_does_not_write_back() {
    let (ctx, pool, table) = setup(1);
    let tid = TransactionId::next();
    let path = ctx.path("nums.dat");
    let before = std::fs::read(&path).unwrap();

    for page_no in 0..3 {
        pool.get_page(tid, pid(table, page_no), Permissions::ReadOnly).unwrap();
    }
    assert_eq!(pool.cached_pages().unwrap().len(), 1);
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn discard_page_drops_cache_entry() {
    let (_ctx, pool, table) = setup(4);
    let tid = TransactionId::next();
    pool.get_page(tid, pid(table, 0), Permissions::ReadOnly).unwrap();

    pool.discard_page(pid(table, 0)).unwrap();
    assert!(pool.cached_pages().unwrap().is_empty());
    // Discarding something not resident is fine.
    pool.discard_page(pid(table, 7)).unwrap();
}

#[test]
fn shared_locks_coexist() {
    let (_ctx, pool, table) = setup(4);
    let (t1, t2) = (TransactionId::next(), TransactionId::next());

    pool.get_page(t1, pid(table, 0), Permissions::ReadOnly).unwrap();
    pool.get_page(t2, pid(table, 0), Permissions::ReadOnly).unwrap();
    assert!(pool.holds_lock(t1, pid(table, 0)).unwrap());
    assert!(pool.holds_lock(t2, pid(table, 0)).unwrap());
}

#[test]
fn conflicting_requests_abort_the_requester() {
    let (_ctx, pool, table) = setup(4);
    let (t1, t2) = (TransactionId::next(), TransactionId::next());

    pool.get_page(t1, pid(table, 0), Permissions::ReadWrite).unwrap();
    let err = pool.get_page(t2, pid(table, 0), Permissions::ReadOnly).unwrap_err();
    assert!(matches!(err, DbError::TransactionAborted(t) if t == t2));
    assert!(!pool.holds_lock(t2, pid(table, 0)).unwrap());

    pool.get_page(t2, pid(table, 1), Permissions::ReadOnly).unwrap();
    let err = pool.get_page(t1, pid(table, 1), Permissions::ReadWrite).unwrap_err();
    assert!(matches!(err, DbError::TransactionAborted(t) if t == t1));
}

#[test]
fn sole_reader_can_upgrade() {
    let (_ctx, pool, table) = setup(4);
    let (t1, t2) = (TransactionId::next(), TransactionId::next());

    pool.get_page(t1, pid(table, 0), Permissions::ReadOnly).unwrap();
    pool.get_page(t1, pid(table, 0), Permissions::ReadWrite).unwrap();
    assert!(pool.get_page(t2, pid(table, 0), Permissions::ReadOnly).is_err());
    // Re-requesting a weaker lock keeps the exclusive one.
    pool.get_page(t1, pid(table, 0), Permissions::ReadOnly).unwrap();
    assert!(pool.get_page(t2, pid(table, 0), Permissions::ReadOnly).is_err());
}

#[test]
fn release_and_complete_free_locks() {
    let (_ctx, pool, table) = setup(4);
    let (t1, t2) = (TransactionId::next(), TransactionId::next());

    pool.get_page(t1, pid(table, 0), Permissions::ReadWrite).unwrap();
    pool.get_page(t1, pid(table, 1), Permissions::ReadWrite).unwrap();

    pool.release_page(t1, pid(table, 0)).unwrap();
    assert!(!pool.holds_lock(t1, pid(table, 0)).unwrap());
    pool.get_page(t2, pid(table, 0), Permissions::ReadWrite).unwrap();

    pool.transaction_complete(t1).unwrap();
    assert!(!pool.holds_lock(t1, pid(table, 1)).unwrap());
    pool.get_page(t2, pid(table, 1), Permissions::ReadWrite).unwrap();
}

#[test]
fn failed_load_releases_the_lock() {
    let (_ctx, pool, table) = setup(4);
    let tid = TransactionId::next();

    let err = pool.get_page(tid, pid(table, 9), Permissions::ReadOnly).unwrap_err();
    assert!(matches!(err, DbError::Storage(_)));
    assert!(!pool.holds_lock(tid, pid(table, 9)).unwrap());

    let err = pool.get_page(tid, pid(TableId(404), 0), Permissions::ReadOnly).unwrap_err();
    assert!(matches!(err, DbError::Catalog(_)));
}

#[test]
fn failed_reload_keeps_a_lock_already_held() {
    let (ctx, pool, table) = setup(4);
    let tid = TransactionId::next();
    pool.get_page(tid, pid(table, 0), Permissions::ReadWrite).unwrap();

    pool.discard_page(pid(table, 0)).unwrap();
    std::fs::File::create(ctx.path("nums.dat")).unwrap();
    assert!(pool.get_page(tid, pid(table, 0), Permissions::ReadOnly).is_err());

    assert!(pool.holds_lock(tid, pid(table, 0)).unwrap());
    let other = TransactionId::next();
    assert!(matches!(
        pool.get_page(other, pid(table, 0), Permissions::ReadOnly),
        Err(DbError::TransactionAborted(t)) if t == other
    ));
}

#[test]
fn failed_upgrade_falls_back_to_shared() {
    let (ctx, pool, table) = setup(4);
    let tid = TransactionId::next();
    pool.get_page(tid, pid(table, 0), Permissions::ReadOnly).unwrap();

    pool.discard_page(pid(table, 0)).unwrap();
    std::fs::File::create(ctx.path("nums.dat")).unwrap();
    assert!(pool.get_page(tid, pid(table, 0), Permissions::ReadWrite).is_err());

    assert!(pool.holds_lock(tid, pid(table, 0)).unwrap());
    // Shared again: another reader gets in, a writer does not.
    let (reader, writer) = (TransactionId::next(), TransactionId::next());
    assert!(matches!(
        pool.get_page(reader, pid(table, 0), Permissions::ReadOnly),
        Err(DbError::Storage(_))
    ));
    assert!(!pool.holds_lock(reader, pid(table, 0)).unwrap());
    assert!(matches!(
        pool.get_page(writer, pid(table, 0), Permissions::ReadWrite),
        Err(DbError::TransactionAborted(t)) if t == writer
    ));
}

#[test]
fn pool_drives_a_full_file_scan() {
    let (ctx, pool, table) = setup(2);
    let pool: Arc<dyn PageCache> = Arc::new(pool);
    let file = ctx.catalog().file(table).unwrap();
    let tid = TransactionId::next();

    let mut iter = file.iterator(tid, pool);
    iter.open().unwrap();
    let mut seen = Vec::new();
    while iter.has_next().unwrap() {
        seen.push(iter.next().unwrap());
    }
    assert_eq!(first_ints(&seen), vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(iter.pages_visited(), 3);
}

#[test]
fn from_config_uses_configured_capacity() {
    let ctx = TestContext::new().unwrap();
    let pool = BufferPool::from_config(ctx.catalog(), ctx.config());
    assert_eq!(pool.capacity(), ctx.config().buffer_pool_pages);
}
