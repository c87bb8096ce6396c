//! Buffer pool: the page cache scans read through.
//!
//! The buffer pool sits between heap files and the executor, providing:
//! - An LRU cache of decoded pages, shared out as `Arc<HeapPage>`
//! - Lazy loading from the owning table's heap file on a miss
//! - Page-level shared/exclusive locks with a no-wait conflict policy
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use buffer::BufferPool;
//! use catalog::Catalog;
//! use common::{Config, PageId, Permissions, TableId, TransactionId};
//! use storage::PageCache;
//!
//! let pool = BufferPool::from_config(Arc::new(Catalog::new()), &Config::default());
//! let tid = TransactionId::next();
//! let page = pool
//!     .get_page(tid, PageId::new(TableId(1), 0), Permissions::ReadOnly)
//!     .unwrap();
//! println!("{} tuples", page.num_used_slots());
//! pool.transaction_complete(tid).unwrap();
//! ```

#[cfg(test)]
mod tests;

use std::{
    num::NonZeroUsize,
    sync::{Arc, Mutex, MutexGuard},
};

use catalog::Catalog;
use common::{Config, DbError, DbResult, PageId, Permissions, TransactionId};
use hashbrown::{HashMap, HashSet};
use log::{debug, trace};
use lru::LruCache;
use storage::{HeapPage, PageCache};

/// Lock currently granted on a page.
#[derive(Clone, Debug, PartialEq, Eq)]
enum PageLock {
    Shared(HashSet<TransactionId>),
    Exclusive(TransactionId),
}

impl PageLock {
    fn is_held_by(&self, tid: TransactionId) -> bool {
        match self {
            PageLock::Shared(holders) => holders.contains(&tid),
            PageLock::Exclusive(holder) => *holder == tid,
        }
    }
}

#[derive(Debug)]
struct PoolState {
    cache: LruCache<PageId, Arc<HeapPage>>,
    locks: HashMap<PageId, PageLock>,
    held: HashMap<TransactionId, HashSet<PageId>>,
}

/// What a successful `acquire` changed, so a failed load can undo exactly that.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LockChange {
    Granted,
    Upgraded,
    AlreadyHeld,
}

impl PoolState {
    /// Grant `perm` on `pid` to `tid`, or refuse without waiting.
    fn acquire(
        &mut self,
        tid: TransactionId,
        pid: PageId,
        perm: Permissions,
    ) -> DbResult<LockChange> {
        let change = match (self.locks.get_mut(&pid), perm) {
            (None, Permissions::ReadOnly) => {
                self.locks
                    .insert(pid, PageLock::Shared(HashSet::from_iter([tid])));
                Some(LockChange::Granted)
            }
            (None, Permissions::ReadWrite) => {
                self.locks.insert(pid, PageLock::Exclusive(tid));
                Some(LockChange::Granted)
            }
            (Some(PageLock::Exclusive(holder)), _) => {
                (*holder == tid).then_some(LockChange::AlreadyHeld)
            }
            (Some(PageLock::Shared(holders)), Permissions::ReadOnly) => {
                if holders.insert(tid) {
                    Some(LockChange::Granted)
                } else {
                    Some(LockChange::AlreadyHeld)
                }
            }
            (Some(lock), Permissions::ReadWrite) => {
                let sole_holder = matches!(
                    lock,
                    PageLock::Shared(holders) if holders.len() == 1 && holders.contains(&tid)
                );
                if sole_holder {
                    *lock = PageLock::Exclusive(tid);
                }
                sole_holder.then_some(LockChange::Upgraded)
            }
        };

        let Some(change) = change else {
            debug!("{tid} aborted: {perm:?} lock on {pid:?} conflicts");
            return Err(DbError::TransactionAborted(tid));
        };
        self.held.entry(tid).or_default().insert(pid);
        Ok(change)
    }

    /// Revert the effect of an `acquire` that returned `change`.
    fn undo(&mut self, tid: TransactionId, pid: PageId, change: LockChange) {
        match change {
            LockChange::Granted => self.release(tid, pid),
            LockChange::Upgraded => {
                self.locks
                    .insert(pid, PageLock::Shared(HashSet::from_iter([tid])));
            }
            LockChange::AlreadyHeld => {}
        }
    }

    fn release(&mut self, tid: TransactionId, pid: PageId) {
        let now_free = match self.locks.get_mut(&pid) {
            Some(PageLock::Shared(holders)) => {
                holders.remove(&tid);
                holders.is_empty()
            }
            Some(PageLock::Exclusive(holder)) => *holder == tid,
            None => false,
        };
        if now_free {
            self.locks.remove(&pid);
        }
        if let Some(pages) = self.held.get_mut(&tid) {
            pages.remove(&pid);
            if pages.is_empty() {
                self.held.remove(&tid);
            }
        }
    }
}

/// LRU cache of decoded heap pages with page-level locking.
#[derive(Debug)]
pub struct BufferPool {
    catalog: Arc<Catalog>,
    capacity: usize,
    state: Mutex<PoolState>,
}

impl BufferPool {
    /// Create a pool caching at most `capacity` pages of the tables in `catalog`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(catalog: Arc<Catalog>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).expect("buffer pool capacity must be > 0");
        Self {
            catalog,
            capacity: capacity.get(),
            state: Mutex::new(PoolState {
                cache: LruCache::new(capacity),
                locks: HashMap::new(),
                held: HashMap::new(),
            }),
        }
    }

    pub fn from_config(catalog: Arc<Catalog>, config: &Config) -> Self {
        Self::new(catalog, config.buffer_pool_pages)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    fn state(&self) -> DbResult<MutexGuard<'_, PoolState>> {
        self.state
            .lock()
            .map_err(|_| DbError::Storage("buffer pool state poisoned".into()))
    }

    /// Whether `tid` currently holds any lock on `pid`.
    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> DbResult<bool> {
        let state = self.state()?;
        Ok(state
            .locks
            .get(&pid)
            .is_some_and(|lock| lock.is_held_by(tid)))
    }

    /// Release the lock `tid` holds on `pid`, if any.
    pub fn release_page(&self, tid: TransactionId, pid: PageId) -> DbResult<()> {
        self.state()?.release(tid, pid);
        Ok(())
    }

    /// Release every lock held by `tid`.
    pub fn transaction_complete(&self, tid: TransactionId) -> DbResult<()> {
        let mut state = self.state()?;
        let pages: Vec<_> = state
            .held
            .get(&tid)
            .map(|pages| pages.iter().copied().collect())
            .unwrap_or_default();
        for pid in &pages {
            state.release(tid, *pid);
        }
        debug!("{tid} complete, released {} page locks", pages.len());
        Ok(())
    }

    /// Drop `pid` from the cache without writing it.
    pub fn discard_page(&self, pid: PageId) -> DbResult<()> {
        self.state()?.cache.pop(&pid);
        Ok(())
    }

    /// Identifiers of the resident pages, most recently used first.
    pub fn cached_pages(&self) -> DbResult<Vec<PageId>> {
        Ok(self.state()?.cache.iter().map(|(pid, _)| *pid).collect())
    }

    fn load_page(&self, pid: PageId) -> DbResult<HeapPage> {
        let file = self.catalog.file(pid.table)?;
        file.read_page(pid.page_no)
    }
}

impl PageCache for BufferPool {
    fn get_page(
        &self,
        tid: TransactionId,
        pid: PageId,
        perm: Permissions,
    ) -> DbResult<Arc<HeapPage>> {
        let mut state = self.state()?;
        let change = state.acquire(tid, pid, perm)?;

        if let Some(page) = state.cache.get(&pid) {
            trace!("buffer hit {pid:?}");
            return Ok(page.clone());
        }

        let page = match self.load_page(pid) {
            Ok(page) => Arc::new(page),
            Err(err) => {
                state.undo(tid, pid, change);
                return Err(err);
            }
        };
        debug!("buffer miss {pid:?}, loaded from disk");
        if let Some((evicted, _)) = state.cache.push(pid, page.clone())
            && evicted != pid
        {
            debug!("evicted {evicted:?}");
        }
        Ok(page)
    }
}
