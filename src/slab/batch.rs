//! Batch of equally sized slots backed by one heap block

use crate::error::{Error, Result};
use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// One contiguous block of `slot_count` slots of `slot_size` bytes
///
/// The block is allocated on creation and released on drop. It never moves
/// or changes size in between.
#[derive(Debug)]
pub struct Batch {
    base: NonNull<u8>,
    layout: Layout,
}

impl Batch {
    /// Allocate a new batch aligned to `align`
    pub fn new(slot_size: usize, slot_count: usize, align: usize) -> Result<Self> {
        let bytes = slot_size
            .checked_mul(slot_count)
            .filter(|&bytes| bytes > 0)
            .ok_or(Error::OutOfMemory { bytes: usize::MAX })?;
        let layout = Layout::from_size_align(bytes, align)
            .map_err(|_| Error::OutOfMemory { bytes })?;

        // SAFETY: layout has a non-zero size
        let ptr = unsafe { alloc::alloc(layout) };
        let base = NonNull::new(ptr).ok_or(Error::OutOfMemory { bytes })?;

        Ok(Self { base, layout })
    }

    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// Size of the block in bytes
    pub fn size_bytes(&self) -> usize {
        self.layout.size()
    }

    /// Whether `addr` falls inside this block
    pub fn contains(&self, addr: usize) -> bool {
        let start = self.base.as_ptr() as usize;
        addr >= start && addr < start + self.size_bytes()
    }

    /// Offset of `addr` from the block start, if it lies inside
    pub fn offset_of(&self, addr: usize) -> Option<usize> {
        self.contains(addr)
            .then(|| addr - self.base.as_ptr() as usize)
    }

    /// Address `offset` bytes into the block
    pub fn ptr_at(&self, offset: usize) -> Option<NonNull<u8>> {
        if offset >= self.size_bytes() {
            return None;
        }
        // SAFETY: offset < size keeps the pointer inside the block
        let ptr = unsafe { self.base.as_ptr().add(offset) };
        NonNull::new(ptr)
    }
}

impl Drop for Batch {
    fn drop(&mut self) {
        // SAFETY: base was returned by alloc::alloc with this layout
        unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) };
    }
}
