use crate::{HeapPage, HeapPageLayout, PageCache, PageTuples};
use common::{DbError, DbResult, PageId, Permissions, TableId, TransactionId, Tuple, TupleDesc};
use log::{debug, trace};
use std::{
    fs::{self, File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    iter::Peekable,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Table storage: a flat file of fixed-size heap pages with no header or trailer.
///
/// Page `n` occupies bytes `[n * page_size, (n + 1) * page_size)`. Trailing
/// bytes that do not fill a whole page are ignored.
#[derive(Debug)]
pub struct HeapFile {
    path: PathBuf,
    id: TableId,
    desc: Arc<TupleDesc>,
    layout: HeapPageLayout,
}

impl HeapFile {
    /// Open an existing heap file.
    pub fn open(
        path: impl AsRef<Path>,
        desc: Arc<TupleDesc>,
        page_size: usize,
    ) -> DbResult<Self> {
        let layout = HeapPageLayout::for_desc(page_size, &desc)?;
        let path = std::path::absolute(path.as_ref())?;
        if !path.is_file() {
            return Err(DbError::Storage(format!(
                "heap file {} does not exist",
                path.display()
            )));
        }
        let id = table_id_for_path(&path);
        debug!(
            "opened heap file {} as table {} ({} slots/page)",
            path.display(),
            id.0,
            layout.num_slots()
        );
        Ok(Self {
            path,
            id,
            desc,
            layout,
        })
    }

    /// Create (or truncate) a heap file with zero pages.
    pub fn create(
        path: impl AsRef<Path>,
        desc: Arc<TupleDesc>,
        page_size: usize,
    ) -> DbResult<Self> {
        File::create(path.as_ref())?;
        Self::open(path, desc, page_size)
    }

    /// Stable identifier derived from the absolute path of the backing file.
    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn page_size(&self) -> usize {
        self.layout.page_size()
    }

    pub fn layout(&self) -> HeapPageLayout {
        self.layout
    }

    pub fn num_pages(&self) -> DbResult<u64> {
        let len = fs::metadata(&self.path)?.len();
        Ok(len / self.page_size() as u64)
    }

    /// Read and decode one page straight from disk.
    ///
    /// This is the page cache's miss path; scans go through a [`PageCache`].
    pub fn read_page(&self, page_no: u64) -> DbResult<HeapPage> {
        let num_pages = self.num_pages()?;
        if page_no >= num_pages {
            return Err(DbError::Storage(format!(
                "page {page_no} beyond end of {} ({num_pages} pages)",
                self.path.display()
            )));
        }

        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(page_no * self.page_size() as u64))?;
        let mut buf = vec![0u8; self.page_size()];
        file.read_exact(&mut buf)?;
        trace!("read page {page_no} of table {}", self.id.0);

        HeapPage::from_bytes(
            PageId::new(self.id, page_no),
            self.desc.clone(),
            self.page_size(),
            &buf,
        )
    }

    /// Write `page` at its offset. A page may only extend the file by one.
    pub fn write_page(&self, page: &HeapPage) -> DbResult<()> {
        let pid = page.id();
        if pid.table != self.id {
            return Err(DbError::Storage(format!(
                "page belongs to table {}, not {}",
                pid.table.0, self.id.0
            )));
        }
        if page.layout() != self.layout || **page.tuple_desc() != *self.desc {
            return Err(DbError::Storage(
                "page layout does not match heap file".into(),
            ));
        }
        let num_pages = self.num_pages()?;
        if pid.page_no > num_pages {
            return Err(DbError::Storage(format!(
                "cannot write page {} past end of file ({num_pages} pages)",
                pid.page_no
            )));
        }

        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(pid.page_no * self.page_size() as u64))?;
        file.write_all(&page.to_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Lazy scan over every tuple in the file, page by page through `cache`.
    pub fn iterator(
        self: &Arc<Self>,
        tid: TransactionId,
        cache: Arc<dyn PageCache>,
    ) -> HeapFileIterator {
        HeapFileIterator {
            file: Arc::clone(self),
            cache,
            tid,
            state: None,
            pages_visited: 0,
        }
    }
}

fn table_id_for_path(path: &Path) -> TableId {
    // Different paths may collide; ids are only compared, never trusted as unique.
    TableId(u64::from(crc32fast::hash(path.as_os_str().as_encoded_bytes())))
}

/// Cursor over a heap file's tuples.
///
/// Must be opened before use; `rewind` is equivalent to reopening. Only the
/// page currently being walked is held.
pub struct HeapFileIterator {
    file: Arc<HeapFile>,
    cache: Arc<dyn PageCache>,
    tid: TransactionId,
    state: Option<ScanState>,
    pages_visited: u64,
}

struct ScanState {
    num_pages: u64,
    page_no: u64,
    tuples: Option<Peekable<PageTuples>>,
}

impl HeapFileIterator {
    pub fn open(&mut self) -> DbResult<()> {
        let num_pages = self.file.num_pages()?;
        let tuples = if num_pages > 0 {
            self.pages_visited += 1;
            Some(fetch_tuples(&self.file, self.cache.as_ref(), self.tid, 0)?)
        } else {
            None
        };
        debug!(
            "scan of table {} opened by {} over {num_pages} pages",
            self.file.id().0,
            self.tid
        );
        self.state = Some(ScanState {
            num_pages,
            page_no: 0,
            tuples,
        });
        Ok(())
    }

    pub fn has_next(&mut self) -> DbResult<bool> {
        let Some(state) = self.state.as_mut() else {
            return Ok(false);
        };
        loop {
            if let Some(tuples) = state.tuples.as_mut()
                && tuples.peek().is_some()
            {
                return Ok(true);
            }
            let next_page = state.page_no + 1;
            if next_page >= state.num_pages {
                return Ok(false);
            }
            let tuples = fetch_tuples(&self.file, self.cache.as_ref(), self.tid, next_page)?;
            self.pages_visited += 1;
            state.page_no = next_page;
            state.tuples = Some(tuples);
        }
    }

    pub fn next(&mut self) -> DbResult<Tuple> {
        if !self.has_next()? {
            return Err(DbError::NoMoreElements);
        }
        self.state
            .as_mut()
            .and_then(|state| state.tuples.as_mut())
            .and_then(Iterator::next)
            .ok_or(DbError::NoMoreElements)
    }

    pub fn rewind(&mut self) -> DbResult<()> {
        self.open()
    }

    pub fn close(&mut self) {
        self.state = None;
    }

    /// Pages requested from the cache since this iterator was created.
    pub fn pages_visited(&self) -> u64 {
        self.pages_visited
    }

    pub fn file(&self) -> &Arc<HeapFile> {
        &self.file
    }
}

fn fetch_tuples(
    file: &HeapFile,
    cache: &dyn PageCache,
    tid: TransactionId,
    page_no: u64,
) -> DbResult<Peekable<PageTuples>> {
    let pid = PageId::new(file.id(), page_no);
    let page = cache.get_page(tid, pid, Permissions::ReadOnly)?;
    Ok(page.tuples().peekable())
}
