//! Isolated test environments.
//!
//! Every context owns a temporary data directory and a catalog of the tables
//! created in it. Files are removed when the context is dropped.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use catalog::Catalog;
use common::{Config, DbResult, TableId, Tuple, TupleDesc};
use tempfile::TempDir;

use crate::fixtures::write_heap_file;

/// A test context with isolated temporary storage.
///
/// # Example
///
/// ```
/// use testsupport::prelude::*;
///
/// let mut ctx = TestContext::with_page_size(64).unwrap();
/// let desc = int_desc(&["x"]);
/// let id = ctx
///     .create_table("t", desc.clone(), &[vec![Some(int_tuple(&desc, &[1])), None]])
///     .unwrap();
/// assert_eq!(ctx.catalog().file(id).unwrap().num_pages().unwrap(), 1);
/// ```
pub struct TestContext {
    temp_dir: TempDir,
    catalog: Catalog,
    config: Config,
}

impl TestContext {
    /// Create a context with the default page size.
    pub fn new() -> DbResult<Self> {
        let temp_dir = tempfile::tempdir()?;
        let config = Config::builder()
            .data_dir(temp_dir.path().to_path_buf())
            .buffer_pool_pages(16)
            .build();
        Ok(Self {
            temp_dir,
            catalog: Catalog::new(),
            config,
        })
    }

    /// Create a context whose tables use `page_size`-byte pages.
    pub fn with_page_size(page_size: usize) -> DbResult<Self> {
        let mut ctx = Self::new()?;
        ctx.config.page_size = page_size;
        Ok(ctx)
    }

    pub fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.temp_dir.path().join(file_name)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Write `pages` to `<name>.dat` and register the table.
    pub fn create_table(
        &mut self,
        name: &str,
        desc: Arc<TupleDesc>,
        pages: &[Vec<Option<Tuple>>],
    ) -> DbResult<TableId> {
        let path = self.path(&format!("{name}.dat"));
        let file = write_heap_file(&path, &desc, self.config.page_size, pages)?;
        Ok(self.catalog.add_table(Arc::new(file), name, None))
    }

    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    /// Snapshot of the catalog as it stands now.
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::new(self.catalog.clone())
    }
}
