//! Process-wide pool lifecycle
//!
//! The pool is global state, so everything runs inside one test.

use slabmem::error::Error;
use slabmem::slab::pool;
use slabmem::SlabConfig;

#[test]
fn test_pool_lifecycle() {
    assert!(!pool::is_initialized());
    assert!(matches!(pool::allocate(16), Err(Error::Uninitialized)));
    assert!(matches!(pool::release(std::ptr::null_mut()), Err(Error::Uninitialized)));
    assert!(matches!(pool::teardown(), Err(Error::Uninitialized)));

    pool::init_default().unwrap();
    assert!(pool::is_initialized());

    let snapshot = pool::snapshot().unwrap();
    assert!(snapshot.contains("slot_size 16 batch_count 1"));

    // Requests 80, 16, 48 end up ordered by slot size
    pool::allocate(80).unwrap();
    let b = pool::allocate(16).unwrap();
    pool::allocate(48).unwrap();
    let snapshot = pool::snapshot().unwrap();
    let p16 = snapshot.find("slot_size 16 ").unwrap();
    let p48 = snapshot.find("slot_size 48 ").unwrap();
    let p80 = snapshot.find("slot_size 80 ").unwrap();
    assert!(p16 < p48 && p48 < p80);

    pool::release(b.as_ptr()).unwrap();
    assert!(matches!(pool::release(b.as_ptr()), Err(Error::DoubleFree { .. })));
    pool::release(std::ptr::null_mut()).unwrap();

    // Re-initializing drops the previous pool and starts over
    pool::init(SlabConfig {
        slots_per_batch: 32,
        ..SlabConfig::default()
    })
    .unwrap();
    let snapshot = pool::snapshot().unwrap();
    assert!(!snapshot.contains("slot_size 48"));
    assert!(snapshot.contains("bitmap size 4 bytes"));

    pool::teardown().unwrap();
    assert!(!pool::is_initialized());
    assert!(matches!(pool::snapshot(), Err(Error::Uninitialized)));
}
