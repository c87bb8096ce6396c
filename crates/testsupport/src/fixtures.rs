//! Common test fixtures: schemas, tuple builders and heap-file writers.

use std::{path::Path, sync::Arc};

use common::{DbResult, PageId, Tuple, TupleDesc};
use storage::{HeapFile, HeapPage};
use types::{Field, Type};

/// Schema with one named `Int` column per entry.
///
/// # Example
///
/// ```
/// use testsupport::prelude::*;
///
/// let desc = int_desc(&["a", "b"]);
/// assert_eq!(desc.num_fields(), 2);
/// ```
pub fn int_desc(names: &[&str]) -> Arc<TupleDesc> {
    let types = vec![Type::Int; names.len()];
    let names = names.iter().map(|n| Some(n.to_string())).collect();
    Arc::new(TupleDesc::try_new(types, names).expect("valid int schema"))
}

/// The `(id INT, name STRING, age INT)` schema used throughout the tests.
pub fn emp_desc() -> Arc<TupleDesc> {
    Arc::new(
        TupleDesc::try_new(
            vec![Type::Int, Type::String, Type::Int],
            vec![Some("id".into()), Some("name".into()), Some("age".into())],
        )
        .expect("valid emp schema"),
    )
}

/// Build a tuple of integers for `desc`.
pub fn int_tuple(desc: &Arc<TupleDesc>, values: &[i32]) -> Tuple {
    let fields = values.iter().copied().map(Field::Int).collect();
    Tuple::new(desc.clone(), fields).expect("tuple matches int schema")
}

/// Build an `emp_desc` tuple.
pub fn emp_tuple(desc: &Arc<TupleDesc>, id: i32, name: &str, age: i32) -> Tuple {
    Tuple::new(desc.clone(), vec![id.into(), name.into(), age.into()])
        .expect("tuple matches emp schema")
}

/// A tuple of zero values, used to hold slots that are cleared afterwards.
pub fn placeholder_tuple(desc: &Arc<TupleDesc>) -> Tuple {
    let fields = desc
        .types()
        .map(|ty| match ty {
            Type::Int => Field::Int(0),
            Type::String => Field::String(String::new()),
        })
        .collect();
    Tuple::new(desc.clone(), fields).expect("placeholder matches schema")
}

/// Build a page whose slot `i` holds `slots[i]`; `None` entries stay free.
pub fn build_page(
    pid: PageId,
    desc: &Arc<TupleDesc>,
    page_size: usize,
    slots: &[Option<Tuple>],
) -> DbResult<HeapPage> {
    let mut page = HeapPage::empty(pid, desc.clone(), page_size)?;
    let mut holes = Vec::new();
    for slot in slots {
        match slot {
            Some(tuple) => {
                page.insert_tuple(tuple.clone())?;
            }
            None => {
                let rid = page.insert_tuple(placeholder_tuple(desc))?;
                holes.push(placeholder_tuple(desc).with_record_id(rid));
            }
        }
    }
    for mut hole in holes {
        page.delete_tuple(&mut hole)?;
    }
    Ok(page)
}

/// Create a heap file at `path` holding one page per entry of `pages`.
pub fn write_heap_file(
    path: &Path,
    desc: &Arc<TupleDesc>,
    page_size: usize,
    pages: &[Vec<Option<Tuple>>],
) -> DbResult<HeapFile> {
    let file = HeapFile::create(path, desc.clone(), page_size)?;
    for (page_no, slots) in pages.iter().enumerate() {
        let page = build_page(
            PageId::new(file.id(), page_no as u64),
            desc,
            page_size,
            slots,
        )?;
        file.write_page(&page)?;
    }
    Ok(file)
}

/// Lay `tuples` out densely, `per_page` tuples to a page.
pub fn dense_pages(tuples: Vec<Tuple>, per_page: usize) -> Vec<Vec<Option<Tuple>>> {
    tuples
        .chunks(per_page.max(1))
        .map(|chunk| chunk.iter().cloned().map(Some).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::TableId;

    #[test]
    fn build_page_respects_holes() {
        let desc = int_desc(&["x"]);
        let page = build_page(
            PageId::new(TableId(1), 0),
            &desc,
            64,
            &[None, Some(int_tuple(&desc, &[5])), None, Some(int_tuple(&desc, &[6]))],
        )
        .unwrap();

        let used: Vec<_> = (0..4).map(|s| page.is_slot_used(s).unwrap()).collect();
        assert_eq!(used, vec![false, true, false, true]);
        assert_eq!(page.num_used_slots(), 2);
    }

    #[test]
    fn dense_pages_chunks_tuples() {
        let desc = int_desc(&["x"]);
        let tuples = (0..5).map(|v| int_tuple(&desc, &[v])).collect();
        let pages = dense_pages(tuples, 2);
        assert_eq!(pages.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 2, 1]);
    }
}
