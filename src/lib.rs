// slabmem - Segregated slot allocator
// Fixed-size slots per size class, occupancy tracked in bit vectors

#![warn(rust_2018_idioms)]

pub mod metrics;
pub mod slab;

// Re-exports for convenience
pub use slab::{SlabAllocator, SlabConfig, SlotId, ALIGNMENT, MAX_REQUEST, SLOTS_PER_BATCH};

/// slabmem error types
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Bitmap is empty")]
        EmptyBitmap,

        #[error("Bit position {pos} out of range for {len_bits}-bit bitmap")]
        BitOutOfRange { pos: usize, len_bits: usize },

        #[error("Invalid request size {size} (must be 1..={max})")]
        InvalidSize { size: usize, max: usize },

        #[error("Invalid configuration: {0}")]
        InvalidConfig(String),

        #[error("Out of memory allocating {bytes} bytes")]
        OutOfMemory { bytes: usize },

        #[error("Invalid pointer {addr:#x}: not aligned to {slot_size}-byte slot boundary")]
        Misaligned { addr: usize, slot_size: usize },

        #[error("Double free detected at {addr:#x}")]
        DoubleFree { addr: usize },

        #[error("Invalid pointer {addr:#x}: not managed by slab allocator")]
        Unmanaged { addr: usize },

        #[error("Slab pool is not initialized")]
        Uninitialized,

        #[error("Configuration error: {0}")]
        Config(#[from] config::ConfigError),

        #[error("TOML error: {0}")]
        Toml(#[from] toml::de::Error),
    }

    impl Error {
        /// Caller passed a pointer the allocator cannot release
        pub fn is_misuse(&self) -> bool {
            matches!(
                self,
                Error::Misaligned { .. } | Error::DoubleFree { .. } | Error::Unmanaged { .. }
            )
        }

        /// Short label for the `kind` metric dimension
        pub fn kind(&self) -> &'static str {
            match self {
                Error::EmptyBitmap | Error::BitOutOfRange { .. } => "bitmap",
                Error::InvalidSize { .. } => "invalid_size",
                Error::InvalidConfig(_) | Error::Config(_) | Error::Toml(_) => "config",
                Error::OutOfMemory { .. } => "out_of_memory",
                Error::Misaligned { .. } => "misaligned",
                Error::DoubleFree { .. } => "double_free",
                Error::Unmanaged { .. } => "unmanaged",
                Error::Uninitialized => "uninitialized",
            }
        }
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
