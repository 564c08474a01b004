//! Slab allocator implementation

use super::config::SlabConfig;
use super::size_class::SizeClass;
use super::slot::SlotId;
use crate::error::{Error, Result};
use crate::metrics;
use std::ptr::NonNull;
use tracing::{debug, info};

/// Segregated slot allocator
///
/// Keeps one [`SizeClass`] per distinct slot size, sorted by slot size.
/// Size classes are created lazily on first request, except the base class
/// at the alignment boundary which exists from the start.
///
/// The allocator is single-threaded: every mutating operation takes
/// `&mut self`. Wrap it in a lock (see [`crate::slab::pool`]) to share it.
pub struct SlabAllocator {
    config: SlabConfig,
    /// Size classes (sorted by size)
    size_classes: Vec<SizeClass>,
}

// SAFETY: the allocator exclusively owns every batch it points into, and
// never hands out references tied to its own lifetime.
unsafe impl Send for SlabAllocator {}

impl SlabAllocator {
    /// Create a new slab allocator
    pub fn new(config: SlabConfig) -> Result<Self> {
        config.validate()?;

        let base = SizeClass::new(config.alignment, config.slots_per_batch, config.alignment)?;
        metrics::record_batch(base.slot_size);

        info!(
            alignment = config.alignment,
            slots_per_batch = config.slots_per_batch,
            max_request = config.max_request(),
            "Initializing slab allocator"
        );

        Ok(Self {
            config,
            size_classes: vec![base],
        })
    }

    /// Create an allocator with the default configuration
    pub fn with_defaults() -> Result<Self> {
        Self::new(SlabConfig::default())
    }

    pub fn config(&self) -> &SlabConfig {
        &self.config
    }

    /// Allocate a slot large enough for `size` bytes
    ///
    /// Requests of 0 bytes or more than the configured maximum are rejected
    /// without touching any size class.
    pub fn allocate(&mut self, size: usize) -> Result<NonNull<u8>> {
        let max = self.config.max_request();
        if size == 0 || size > max {
            let err = Error::InvalidSize { size, max };
            metrics::record_error(err.kind());
            return Err(err);
        }

        let slot_size = self.config.slot_size_for(size);
        let index = self.find_or_create_class(slot_size)?;
        let class = &mut self.size_classes[index];

        let batches_before = class.batch_count();
        let (slot_id, ptr) = class
            .allocate()
            .inspect_err(|e| metrics::record_error(e.kind()))?;
        if class.batch_count() > batches_before {
            metrics::record_batch(slot_size);
        }

        metrics::record_allocation(slot_size);
        debug!("Allocated {} bytes at {} ({:p})", size, slot_id, ptr);

        Ok(ptr)
    }

    /// Index of the size class for `slot_size`, creating it in sorted
    /// position if it does not exist yet
    fn find_or_create_class(&mut self, slot_size: usize) -> Result<usize> {
        match self
            .size_classes
            .binary_search_by_key(&slot_size, |sc| sc.slot_size)
        {
            Ok(index) => Ok(index),
            Err(index) => {
                let class = SizeClass::new(
                    slot_size,
                    self.config.slots_per_batch,
                    self.config.alignment,
                )
                .inspect_err(|e| metrics::record_error(e.kind()))?;
                self.size_classes.insert(index, class);
                metrics::record_batch(slot_size);
                Ok(index)
            }
        }
    }

    /// Resolve an address to the slot that contains it
    ///
    /// Scans size classes in size order and their batches in creation order.
    pub fn locate(&self, ptr: *const u8) -> Option<Result<SlotId>> {
        let addr = ptr as usize;
        self.size_classes
            .iter()
            .find_map(|class| class.resolve(addr))
    }

    /// Free a previously allocated slot
    ///
    /// A null pointer is a no-op. Misaligned, double and foreign frees are
    /// reported as errors and leave the allocator untouched.
    pub fn release(&mut self, ptr: *mut u8) -> Result<()> {
        if ptr.is_null() {
            return Ok(());
        }
        let addr = ptr as usize;

        self.release_addr(addr)
            .inspect_err(|e| metrics::record_error(e.kind()))
    }

    fn release_addr(&mut self, addr: usize) -> Result<()> {
        for class in &mut self.size_classes {
            let Some(resolved) = class.resolve(addr) else {
                continue;
            };
            let slot_id = resolved?;
            class.free(slot_id, addr)?;

            metrics::record_release(class.slot_size);
            debug!("Freed slot {} ({:#x})", slot_id, addr);
            return Ok(());
        }

        Err(Error::Unmanaged { addr })
    }

    /// Whether the slot at `ptr` is currently allocated
    pub fn is_allocated(&self, ptr: *const u8) -> Result<bool> {
        let slot_id = self
            .locate(ptr)
            .ok_or(Error::Unmanaged { addr: ptr as usize })??;
        let class = self.class(slot_id.slot_size).ok_or(Error::Unmanaged {
            addr: ptr as usize,
        })?;
        Ok(!class.is_free(slot_id)?)
    }

    /// Size class with exactly `slot_size`
    pub fn class(&self, slot_size: usize) -> Option<&SizeClass> {
        self.size_classes
            .binary_search_by_key(&slot_size, |sc| sc.slot_size)
            .ok()
            .map(|index| &self.size_classes[index])
    }

    /// All size classes in increasing slot size
    pub fn size_classes(&self) -> &[SizeClass] {
        &self.size_classes
    }

    /// Get statistics about the allocator
    pub fn stats(&self) -> SlabStats {
        let mut stats = SlabStats::default();

        for (i, sc) in self.size_classes.iter().enumerate() {
            let free_slots = sc.free_count();
            let class_stats = SizeClassStats {
                index: i,
                slot_size: sc.slot_size,
                batch_count: sc.batch_count(),
                total_slots: sc.total_slots(),
                free_slots,
                allocated_slots: sc.total_slots() - free_slots,
            };
            stats.size_classes.push(class_stats);
            stats.total_allocated += class_stats.allocated_slots * sc.slot_size;
            stats.total_reserved += class_stats.total_slots * sc.slot_size;
        }

        stats
    }
}

impl Drop for SlabAllocator {
    fn drop(&mut self) {
        debug!(
            size_classes = self.size_classes.len(),
            "Releasing slab allocator"
        );
    }
}

/// Statistics for the slab allocator
#[derive(Debug, Default)]
pub struct SlabStats {
    pub size_classes: Vec<SizeClassStats>,
    /// Bytes handed out to callers (in slot granularity)
    pub total_allocated: usize,
    /// Bytes held in batches
    pub total_reserved: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct SizeClassStats {
    pub index: usize,
    pub slot_size: usize,
    pub batch_count: usize,
    pub total_slots: usize,
    pub free_slots: usize,
    pub allocated_slots: usize,
}
