//! Slot identification for the slab allocator

use std::fmt;

/// Position of one slot inside the allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId {
    /// Slot size of the owning size class (bytes)
    pub slot_size: usize,
    /// Batch index within the size class, in creation order
    pub batch: usize,
    /// Slot offset within the batch
    pub slot: usize,
}

impl SlotId {
    /// Create a new slot ID
    pub fn new(slot_size: usize, batch: usize, slot: usize) -> Self {
        Self {
            slot_size,
            batch,
            slot,
        }
    }

    /// Build a slot ID from a global slot index
    pub fn from_global(slot_size: usize, global: usize, slots_per_batch: usize) -> Self {
        Self::new(slot_size, global / slots_per_batch, global % slots_per_batch)
    }

    /// Slot index across the whole batch chain of the size class
    pub fn global_index(&self, slots_per_batch: usize) -> usize {
        self.batch * slots_per_batch + self.slot
    }

    /// Byte offset of the slot from its batch start
    pub fn byte_offset(&self) -> usize {
        self.slot * self.slot_size
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Slot(size={}, batch={}, slot={})",
            self.slot_size, self.batch, self.slot
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_id_from_global() {
        let id = SlotId::from_global(32, 19, 8);
        assert_eq!(id.batch, 2);
        assert_eq!(id.slot, 3);
        assert_eq!(id.global_index(8), 19);
        assert_eq!(id.byte_offset(), 96);
    }

    #[test]
    fn test_slot_id_display() {
        let id = SlotId::new(16, 1, 7);
        assert_eq!(id.to_string(), "Slot(size=16, batch=1, slot=7)");
    }
}
