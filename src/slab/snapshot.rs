//! Human-readable dump of allocator state

use super::allocator::SlabAllocator;
use std::fmt;

/// Display adapter printing every size class, its bitmap and its batches
pub struct Snapshot<'a>(pub &'a SlabAllocator);

impl fmt::Display for Snapshot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "============== Memory snapshot ===============")?;

        for class in self.0.size_classes() {
            let bitmap = class.bitmap();
            writeln!(
                f,
                "size_class slot_size {} batch_count {} free_slots {}/{}",
                class.slot_size,
                class.batch_count(),
                class.free_count(),
                class.total_slots()
            )?;
            writeln!(f, "bitmap size {} bytes: {}", bitmap.len_bytes(), bitmap)?;

            for (index, batch) in class.batches().enumerate() {
                writeln!(f, "\t batch {} batch_mem {:p}", index, batch.base())?;
            }
        }

        writeln!(f, "==============================================")
    }
}

impl SlabAllocator {
    /// Render the current state as text
    pub fn snapshot(&self) -> String {
        Snapshot(self).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;

    #[test]
    fn test_snapshot_lists_classes_in_order() -> Result<()> {
        let mut allocator = SlabAllocator::with_defaults()?;
        allocator.allocate(80)?;
        allocator.allocate(16)?;
        allocator.allocate(48)?;

        let text = allocator.snapshot();
        let sizes: Vec<&str> = text
            .lines()
            .filter_map(|line| line.strip_prefix("size_class slot_size "))
            .filter_map(|rest| rest.split_whitespace().next())
            .collect();
        assert_eq!(sizes, vec!["16", "48", "80"]);
        Ok(())
    }

    #[test]
    fn test_snapshot_shows_bitmap_and_batches() -> Result<()> {
        let mut allocator = SlabAllocator::with_defaults()?;
        allocator.allocate(16)?;

        let text = allocator.snapshot();
        assert!(text.contains("slot_size 16 batch_count 1 free_slots 7/8"));
        assert!(text.contains("bitmap size 1 bytes: 0111  1111  "));
        assert_eq!(text.matches("\t batch ").count(), 1);
        assert!(text.starts_with("=============="));
        Ok(())
    }
}
