//! Process-wide allocator pool
//!
//! A single [`SlabAllocator`] behind a lock, with an explicit
//! [`init`]/[`teardown`] lifecycle. This is the surface an interception shim
//! calls into. Misuse errors from [`release`] are logged here before being
//! handed back.

use super::allocator::SlabAllocator;
use super::config::SlabConfig;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::ptr::NonNull;
use tracing::{info, warn};

static POOL: Mutex<Option<SlabAllocator>> = parking_lot::const_mutex(None);

/// Create the pool, replacing any existing one
pub fn init(config: SlabConfig) -> Result<()> {
    let allocator = SlabAllocator::new(config)?;
    let previous = POOL.lock().replace(allocator);
    if previous.is_some() {
        warn!("Slab pool re-initialized; previous pool released");
    }
    info!("Slab pool initialized");
    Ok(())
}

/// Create the pool with the default configuration
pub fn init_default() -> Result<()> {
    init(SlabConfig::default())
}

/// Release every batch and size class
pub fn teardown() -> Result<()> {
    let allocator = POOL.lock().take().ok_or(Error::Uninitialized)?;
    drop(allocator);
    info!("Slab pool torn down");
    Ok(())
}

pub fn is_initialized() -> bool {
    POOL.lock().is_some()
}

/// Run `f` against the live pool
pub fn with_pool<T>(f: impl FnOnce(&mut SlabAllocator) -> Result<T>) -> Result<T> {
    let mut guard = POOL.lock();
    let allocator = guard.as_mut().ok_or(Error::Uninitialized)?;
    f(allocator)
}

pub fn allocate(size: usize) -> Result<NonNull<u8>> {
    with_pool(|allocator| allocator.allocate(size))
}

pub fn release(ptr: *mut u8) -> Result<()> {
    with_pool(|allocator| allocator.release(ptr)).inspect_err(|e| {
        if e.is_misuse() {
            warn!("Release rejected: {}", e);
        }
    })
}

pub fn snapshot() -> Result<String> {
    with_pool(|allocator| Ok(allocator.snapshot()))
}
