//! Slab Allocator
//!
//! Serves small allocations out of fixed-size slots grouped by size class.
//! Each size class owns a chain of batches and a bit vector tracking which
//! of its slots are free.
//!
//! # Architecture
//!
//! ```text
//! SlabAllocator
//!   ├─→ SizeClass(16B)  → Batches: [B0, B1]  Bitmap: 0000 0000  1111 1110
//!   ├─→ SizeClass(48B)  → Batches: [B0]      Bitmap: 0111 1111
//!   └─→ SizeClass(80B)  → Batches: [B0]      Bitmap: 0011 1111
//! ```
//!
//! A request is rounded up to the alignment boundary and served from the
//! matching size class, which grows by one batch when its bitmap has no
//! free bit left. Release scans the batches for the one containing the
//! address and flips its bit back.

pub mod allocator;
pub mod batch;
pub mod bitmap;
pub mod config;
pub mod pool;
pub mod size_class;
pub mod slot;
pub mod snapshot;

pub use allocator::{SizeClassStats, SlabAllocator, SlabStats};
pub use batch::Batch;
pub use bitmap::BitVector;
pub use config::{SlabConfig, ALIGNMENT, MAX_REQUEST, SLOTS_PER_BATCH};
pub use size_class::SizeClass;
pub use slot::SlotId;
pub use snapshot::Snapshot;
