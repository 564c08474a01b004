//! Size class management for slab allocator

use super::batch::Batch;
use super::bitmap::{bytes_for_bits, BitVector};
use super::slot::SlotId;
use crate::error::{Error, Result};
use std::ptr::NonNull;
use tracing::debug;

/// A size class manages slots of a specific size
///
/// Slots live in an append-only chain of batches. One bit vector covers the
/// whole chain: bit `i` is 1 while global slot `i` is free and 0 while it is
/// in use. Padding bits past the last real slot stay 0.
#[derive(Debug)]
pub struct SizeClass {
    /// Size of slots in this class (bytes)
    pub slot_size: usize,
    slots_per_batch: usize,
    align: usize,
    batches: Vec<Batch>,
    free_slots: BitVector,
}

impl SizeClass {
    /// Create a new size class with one batch of free slots
    pub fn new(slot_size: usize, slots_per_batch: usize, align: usize) -> Result<Self> {
        let batch = Batch::new(slot_size, slots_per_batch, align)?;
        let mut free_slots = BitVector::new(bytes_for_bits(slots_per_batch), false)?;
        free_slots.set_range(0..slots_per_batch)?;

        debug!(slot_size, slots_per_batch, "Created size class");

        Ok(Self {
            slot_size,
            slots_per_batch,
            align,
            batches: vec![batch],
            free_slots,
        })
    }

    /// Bytes of bitmap added per batch
    fn bitmap_bytes_per_batch(&self) -> usize {
        bytes_for_bits(self.slots_per_batch)
    }

    /// Allocate a slot from this size class
    ///
    /// Grows the class by one batch when every slot is taken.
    pub fn allocate(&mut self) -> Result<(SlotId, NonNull<u8>)> {
        let global = match self.free_slots.find_first(true)? {
            Some(index) => index,
            None => self.grow()?,
        };

        let id = SlotId::from_global(self.slot_size, global, self.slots_per_batch);
        let ptr = self.slot_ptr(id)?;
        self.free_slots.clear(global)?;

        Ok((id, ptr))
    }

    /// Append one batch and return the global index of its first slot
    fn grow(&mut self) -> Result<usize> {
        let batch = Batch::new(self.slot_size, self.slots_per_batch, self.align)?;
        self.free_slots
            .try_grow(self.bitmap_bytes_per_batch(), false)?;

        let first = self.batches.len() * self.slots_per_batch;
        self.batches.push(batch);
        self.free_slots
            .set_range(first..first + self.slots_per_batch)?;

        debug!(
            slot_size = self.slot_size,
            batch_count = self.batches.len(),
            bitmap_bytes = self.free_slots.len_bytes(),
            "Grew size class by one batch"
        );

        Ok(first)
    }

    fn slot_ptr(&self, id: SlotId) -> Result<NonNull<u8>> {
        self.batches
            .get(id.batch)
            .and_then(|batch| batch.ptr_at(id.byte_offset()))
            .ok_or(Error::BitOutOfRange {
                pos: id.global_index(self.slots_per_batch),
                len_bits: self.total_slots(),
            })
    }

    /// Resolve `addr` to a slot of this class
    ///
    /// Returns `None` when no batch of this class contains `addr`, and
    /// `Some(Err(Error::Misaligned))` when it points inside a batch but not
    /// at a slot boundary.
    pub fn resolve(&self, addr: usize) -> Option<Result<SlotId>> {
        self.batches
            .iter()
            .enumerate()
            .find_map(|(index, batch)| batch.offset_of(addr).map(|offset| (index, offset)))
            .map(|(batch, offset)| {
                if offset % self.slot_size != 0 {
                    return Err(Error::Misaligned {
                        addr,
                        slot_size: self.slot_size,
                    });
                }
                Ok(SlotId::new(self.slot_size, batch, offset / self.slot_size))
            })
    }

    /// Free a slot by flipping its bit back to free
    pub fn free(&mut self, id: SlotId, addr: usize) -> Result<()> {
        let global = id.global_index(self.slots_per_batch);
        if self.free_slots.test(global)? {
            return Err(Error::DoubleFree { addr });
        }
        self.free_slots.set(global)
    }

    /// Whether the slot is currently free
    pub fn is_free(&self, id: SlotId) -> Result<bool> {
        self.free_slots.test(id.global_index(self.slots_per_batch))
    }

    /// Get the number of batches
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    pub fn batches(&self) -> impl Iterator<Item = &Batch> {
        self.batches.iter()
    }

    pub fn bitmap(&self) -> &BitVector {
        &self.free_slots
    }

    /// Get the number of free slots
    pub fn free_count(&self) -> usize {
        self.free_slots.count_ones()
    }

    /// Get the total number of slots across all batches
    pub fn total_slots(&self) -> usize {
        self.batches.len() * self.slots_per_batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_class_allocation() -> Result<()> {
        let mut sc = SizeClass::new(64, 8, 16)?;
        let base = sc.batches().next().unwrap().base().as_ptr() as usize;

        let (id0, p0) = sc.allocate()?;
        let (id1, p1) = sc.allocate()?;
        let (_, p2) = sc.allocate()?;

        assert_eq!(id0.slot, 0);
        assert_eq!(id1.slot, 1);
        assert_eq!(p0.as_ptr() as usize, base);
        assert_eq!(p1.as_ptr() as usize, base + 64);
        assert_eq!(p2.as_ptr() as usize, base + 128);

        assert_eq!(sc.total_slots(), 8);
        assert_eq!(sc.free_count(), 5);
        Ok(())
    }

    #[test]
    fn test_size_class_reuse() -> Result<()> {
        let mut sc = SizeClass::new(16, 8, 16)?;

        let (id0, p0) = sc.allocate()?;
        let _second = sc.allocate()?;

        sc.free(id0, p0.as_ptr() as usize)?;
        assert_eq!(sc.free_count(), 7);

        // Next allocation should reuse the freed slot
        let (id, p) = sc.allocate()?;
        assert_eq!(id, id0);
        assert_eq!(p, p0);

        // New allocation continues from where we left off
        let (id, _) = sc.allocate()?;
        assert_eq!(id.slot, 2);
        Ok(())
    }

    #[test]
    fn test_growth_by_one_batch() -> Result<()> {
        let mut sc = SizeClass::new(16, 8, 16)?;
        for _ in 0..8 {
            sc.allocate()?;
        }
        assert_eq!(sc.batch_count(), 1);
        assert_eq!(sc.bitmap().len_bytes(), 1);

        let (id, ptr) = sc.allocate()?;
        assert_eq!(sc.batch_count(), 2);
        assert_eq!(sc.bitmap().len_bytes(), 2);
        assert_eq!((id.batch, id.slot), (1, 0));
        assert_eq!(sc.free_count(), 7);

        let second = sc.batches().nth(1).unwrap().base();
        assert_eq!(ptr, second);
        Ok(())
    }

    #[test]
    fn test_failed_growth_links_nothing() -> Result<()> {
        let mut sc = SizeClass::new(16, 8, 16)?;
        for _ in 0..8 {
            sc.allocate()?;
        }

        // A slot size this large makes the next batch unallocatable
        sc.slot_size = usize::MAX / 2;
        assert!(matches!(sc.allocate(), Err(Error::OutOfMemory { .. })));
        assert_eq!(sc.batch_count(), 1);
        assert_eq!(sc.bitmap().len_bytes(), 1);
        assert_eq!(sc.bitmap().as_bytes(), &[0x00]);
        assert_eq!(sc.total_slots(), 8);

        // The class keeps working once memory is available again
        sc.slot_size = 16;
        let (id, _) = sc.allocate()?;
        assert_eq!((id.batch, id.slot), (1, 0));
        assert_eq!(sc.batch_count(), 2);
        assert_eq!(sc.bitmap().len_bytes(), 2);
        Ok(())
    }

    #[test]
    fn test_padding_bits_never_handed_out() -> Result<()> {
        // 5 slots per batch leaves 3 padding bits in each bitmap byte
        let mut sc = SizeClass::new(16, 5, 16)?;
        assert_eq!(sc.free_count(), 5);

        let mut seen = Vec::new();
        for _ in 0..11 {
            let (id, _) = sc.allocate()?;
            assert!(id.slot < 5);
            seen.push(id);
        }
        assert_eq!(sc.batch_count(), 3);
        assert_eq!(sc.bitmap().len_bytes(), 3);
        assert_eq!(sc.free_count(), 4);

        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 11);
        Ok(())
    }

    #[test]
    fn test_resolve_and_double_free() -> Result<()> {
        let mut sc = SizeClass::new(32, 8, 16)?;
        let (id, ptr) = sc.allocate()?;
        let addr = ptr.as_ptr() as usize;

        assert_eq!(sc.resolve(addr).unwrap()?, id);
        assert!(matches!(
            sc.resolve(addr + 8),
            Some(Err(Error::Misaligned { slot_size: 32, .. }))
        ));
        assert!(sc.resolve(addr + 32 * 8).is_none());

        sc.free(id, addr)?;
        assert!(sc.is_free(id)?);
        assert!(matches!(sc.free(id, addr), Err(Error::DoubleFree { .. })));
        assert!(sc.is_free(id)?);
        Ok(())
    }
}
