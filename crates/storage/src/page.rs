//! Slotted heap page: occupancy bitmap, fixed-length tuple slots, zero padding.
//!
//! ```text
//! +------------------+----------+----------+-----+----------+---------+
//! | header (H bytes) | slot 0   | slot 1   | ... | slot S-1 | padding |
//! +------------------+----------+----------+-----+----------+---------+
//! ```
//!
//! For a page of `P` bytes and records of `L` bytes, `S = floor(8P / (8L + 1))`
//! and `H = ceil(S / 8)`. Bit `i` of the header lives in byte `i / 8` at
//! position `i % 8`, counted from the least-significant bit.

use bytes::{Buf, BufMut};
use common::{DbError, DbResult, PageId, RecordId, TransactionId, Tuple, TupleDesc};
use log::trace;
use std::sync::Arc;

/// Slot capacity and header size for one (page size, record length) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeapPageLayout {
    page_size: usize,
    record_len: usize,
    num_slots: usize,
    header_len: usize,
}

impl HeapPageLayout {
    pub fn try_new(page_size: usize, record_len: usize) -> DbResult<Self> {
        if record_len == 0 {
            return Err(DbError::InvalidSchema("record length must be nonzero".into()));
        }
        let num_slots = (page_size * 8) / (record_len * 8 + 1);
        if num_slots == 0 {
            return Err(DbError::InvalidSchema(format!(
                "{record_len}-byte records do not fit in a {page_size}-byte page"
            )));
        }
        let header_len = num_slots.div_ceil(8);
        assert!(
            header_len + num_slots * record_len <= page_size,
            "page layout overflows: {header_len} header bytes + {num_slots} x {record_len} > {page_size}"
        );
        Ok(Self {
            page_size,
            record_len,
            num_slots,
            header_len,
        })
    }

    pub fn for_desc(page_size: usize, desc: &TupleDesc) -> DbResult<Self> {
        Self::try_new(page_size, desc.byte_size())
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn record_len(&self) -> usize {
        self.record_len
    }

    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    pub fn header_len(&self) -> usize {
        self.header_len
    }

    /// Bytes after the last slot that carry no data.
    pub fn padding_len(&self) -> usize {
        self.page_size - self.header_len - self.num_slots * self.record_len
    }
}

fn bit_is_set(bitmap: &[u8], i: usize) -> bool {
    (bitmap[i / 8] >> (i % 8)) & 1 == 1
}

fn set_bit(bitmap: &mut [u8], i: usize, value: bool) {
    let mask = 1u8 << (i % 8);
    if value {
        bitmap[i / 8] |= mask;
    } else {
        bitmap[i / 8] &= !mask;
    }
}

/// Decoded view of one page of a heap file.
///
/// Pages handed out by a page cache are shared behind an `Arc`; the mutating
/// methods operate on a caller-owned copy.
#[derive(Clone, Debug)]
pub struct HeapPage {
    pid: PageId,
    desc: Arc<TupleDesc>,
    layout: HeapPageLayout,
    header: Vec<u8>,
    tuples: Vec<Option<Tuple>>,
    before_image: Arc<[u8]>,
    dirtied_by: Option<TransactionId>,
}

impl HeapPage {
    /// Decode a page from exactly `page_size` bytes.
    pub fn from_bytes(
        pid: PageId,
        desc: Arc<TupleDesc>,
        page_size: usize,
        data: &[u8],
    ) -> DbResult<Self> {
        let layout = HeapPageLayout::for_desc(page_size, &desc)?;
        if data.len() != page_size {
            return Err(DbError::Format(format!(
                "page {} is {} bytes, expected {page_size}",
                pid.page_no,
                data.len()
            )));
        }

        let mut buf = data;
        let header = buf[..layout.header_len].to_vec();
        buf.advance(layout.header_len);

        let mut tuples = Vec::with_capacity(layout.num_slots);
        for slot in 0..layout.num_slots {
            if !bit_is_set(&header, slot) {
                buf.advance(layout.record_len);
                tuples.push(None);
                continue;
            }
            let tuple = read_tuple(&desc, &mut buf).map_err(|err| {
                DbError::Format(format!("page {} slot {slot}: {err}", pid.page_no))
            })?;
            tuples.push(Some(tuple.with_record_id(RecordId::new(pid, slot))));
        }

        let mut page = Self {
            pid,
            desc,
            layout,
            header,
            tuples,
            before_image: Arc::from(Vec::new()),
            dirtied_by: None,
        };
        page.set_before_image();
        trace!(
            "decoded page {:?} with {}/{} slots used",
            pid,
            page.num_used_slots(),
            layout.num_slots
        );
        Ok(page)
    }

    /// A page with every slot free.
    pub fn empty(pid: PageId, desc: Arc<TupleDesc>, page_size: usize) -> DbResult<Self> {
        Self::from_bytes(pid, desc, page_size, &vec![0u8; page_size])
    }

    pub fn id(&self) -> PageId {
        self.pid
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn layout(&self) -> HeapPageLayout {
        self.layout
    }

    /// Encode the page back into exactly `page_size` bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.layout.page_size);
        buf.put_slice(&self.header);
        for (slot, tuple) in self.tuples.iter().enumerate() {
            match tuple {
                Some(tuple) if self.slot_used(slot) => {
                    for field in tuple.fields() {
                        field.encode(&mut buf);
                    }
                }
                _ => buf.put_bytes(0, self.layout.record_len),
            }
        }
        buf.resize(self.layout.page_size, 0);
        buf
    }

    /// The page as it was when decoded (or when the snapshot was last taken).
    pub fn before_image(&self) -> DbResult<HeapPage> {
        HeapPage::from_bytes(
            self.pid,
            self.desc.clone(),
            self.layout.page_size,
            &self.before_image,
        )
    }

    pub fn before_image_bytes(&self) -> &[u8] {
        &self.before_image
    }

    /// Replace the snapshot with the page's current encoding.
    pub fn set_before_image(&mut self) {
        self.before_image = Arc::from(self.to_bytes());
    }

    pub fn num_slots(&self) -> usize {
        self.layout.num_slots
    }

    pub fn is_slot_used(&self, slot: usize) -> DbResult<bool> {
        self.check_slot(slot)?;
        Ok(self.slot_used(slot))
    }

    pub fn num_used_slots(&self) -> usize {
        (0..self.layout.num_slots)
            .filter(|slot| self.slot_used(*slot))
            .count()
    }

    pub fn num_empty_slots(&self) -> usize {
        self.layout.num_slots - self.num_used_slots()
    }

    /// The tuple stored in `slot`, if the slot is occupied.
    pub fn tuple(&self, slot: usize) -> DbResult<Option<&Tuple>> {
        self.check_slot(slot)?;
        if !self.slot_used(slot) {
            return Ok(None);
        }
        Ok(self.tuples[slot].as_ref())
    }

    /// Occupied tuples in slot order. Clone the iterator to walk the page again.
    pub fn iter(&self) -> Tuples<'_> {
        Tuples {
            page: self,
            next_slot: 0,
        }
    }

    /// Owning variant of [`HeapPage::iter`] that yields cloned tuples.
    pub fn tuples(self: Arc<Self>) -> PageTuples {
        PageTuples {
            page: self,
            next_slot: 0,
        }
    }

    /// Place `tuple` in the lowest free slot and return its new location.
    pub fn insert_tuple(&mut self, tuple: Tuple) -> DbResult<RecordId> {
        if **tuple.tuple_desc() != *self.desc {
            return Err(DbError::InvalidSchema(format!(
                "tuple schema [{}] does not match page schema [{}]",
                tuple.tuple_desc(),
                self.desc
            )));
        }
        let slot = (0..self.layout.num_slots)
            .find(|slot| !self.slot_used(*slot))
            .ok_or_else(|| DbError::Storage(format!("page {} full", self.pid.page_no)))?;

        let rid = RecordId::new(self.pid, slot);
        set_bit(&mut self.header, slot, true);
        self.tuples[slot] = Some(tuple.with_record_id(rid));
        Ok(rid)
    }

    /// Free the slot `tuple` occupies on this page and detach it.
    pub fn delete_tuple(&mut self, tuple: &mut Tuple) -> DbResult<()> {
        let rid = tuple
            .record_id()
            .ok_or_else(|| DbError::Storage("tuple has no record id".into()))?;
        if rid.page_id != self.pid {
            return Err(DbError::Storage(format!(
                "tuple lives on page {:?}, not {:?}",
                rid.page_id, self.pid
            )));
        }
        if !self.is_slot_used(rid.slot)? {
            return Err(DbError::Storage(format!("slot {} already empty", rid.slot)));
        }
        set_bit(&mut self.header, rid.slot, false);
        self.tuples[rid.slot] = None;
        tuple.set_record_id(None);
        Ok(())
    }

    pub fn mark_dirty(&mut self, dirty: bool, tid: TransactionId) {
        self.dirtied_by = dirty.then_some(tid);
    }

    /// Transaction that last dirtied the page, if it is dirty.
    pub fn dirtied_by(&self) -> Option<TransactionId> {
        self.dirtied_by
    }

    fn slot_used(&self, slot: usize) -> bool {
        bit_is_set(&self.header, slot)
    }

    fn check_slot(&self, slot: usize) -> DbResult<()> {
        if slot >= self.layout.num_slots {
            return Err(DbError::IndexOutOfRange {
                index: slot,
                len: self.layout.num_slots,
            });
        }
        Ok(())
    }

    fn next_used_slot(&self, from: usize) -> Option<usize> {
        (from..self.layout.num_slots).find(|slot| self.slot_used(*slot))
    }
}

fn read_tuple(desc: &Arc<TupleDesc>, buf: &mut &[u8]) -> DbResult<Tuple> {
    let fields = desc
        .types()
        .map(|ty| ty.decode(&mut *buf))
        .collect::<Result<Vec<_>, _>>()?;
    Tuple::new(desc.clone(), fields)
}

/// Borrowing iterator over a page's occupied tuples.
#[derive(Clone, Debug)]
pub struct Tuples<'a> {
    page: &'a HeapPage,
    next_slot: usize,
}

impl<'a> Iterator for Tuples<'a> {
    type Item = &'a Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.page.next_used_slot(self.next_slot)?;
        self.next_slot = slot + 1;
        self.page.tuples[slot].as_ref()
    }
}

/// Iterator over a shared page's occupied tuples.
#[derive(Clone, Debug)]
pub struct PageTuples {
    page: Arc<HeapPage>,
    next_slot: usize,
}

impl Iterator for PageTuples {
    type Item = Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.page.next_used_slot(self.next_slot)?;
        self.next_slot = slot + 1;
        self.page.tuples[slot].clone()
    }
}
