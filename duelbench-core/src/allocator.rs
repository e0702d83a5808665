//! Allocation Tracking
//!
//! `TrackingAllocator` wraps the system allocator and counts every allocation
//! in process-wide counters. Install it as the `#[global_allocator]` of the
//! harness binary; without it the counters stay at zero and steps report 0 bytes.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

static ALLOCATED_BYTES: AtomicU64 = AtomicU64::new(0);
static ALLOCATION_COUNT: AtomicU64 = AtomicU64::new(0);
static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Global allocator that counts bytes and allocations.
///
/// ```ignore
/// #[global_allocator]
/// static GLOBAL: duelbench::TrackingAllocator = duelbench::TrackingAllocator;
/// ```
pub struct TrackingAllocator;

impl TrackingAllocator {
    #[inline]
    fn register(size: usize) {
        // Relaxed is enough: the counters are only read between steps on the same thread.
        ALLOCATED_BYTES.fetch_add(size as u64, Ordering::Relaxed);
        ALLOCATION_COUNT.fetch_add(1, Ordering::Relaxed);
        if !INSTALLED.load(Ordering::Relaxed) {
            INSTALLED.store(true, Ordering::Relaxed);
        }
    }
}

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        Self::register(layout.size());
        // SAFETY: forwarded unchanged to the system allocator.
        unsafe { System.alloc(layout) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        Self::register(layout.size());
        // SAFETY: forwarded unchanged to the system allocator.
        unsafe { System.alloc_zeroed(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: `ptr` was produced by `System` through one of the methods above.
        unsafe { System.dealloc(ptr, layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // Only growth counts as newly allocated memory.
        if new_size > layout.size() {
            ALLOCATED_BYTES.fetch_add((new_size - layout.size()) as u64, Ordering::Relaxed);
        }
        ALLOCATION_COUNT.fetch_add(1, Ordering::Relaxed);
        // SAFETY: `ptr`/`layout` describe a live block obtained from `System`.
        unsafe { System.realloc(ptr, layout, new_size) }
    }
}

/// Bytes and allocation count recorded since the last reset
#[inline]
pub fn current_allocation() -> (u64, u64) {
    (
        ALLOCATED_BYTES.load(Ordering::Relaxed),
        ALLOCATION_COUNT.load(Ordering::Relaxed),
    )
}

/// Zero the allocation counters
#[inline]
pub fn reset_allocation_counter() {
    ALLOCATED_BYTES.store(0, Ordering::Relaxed);
    ALLOCATION_COUNT.store(0, Ordering::Relaxed);
}

/// Whether `TrackingAllocator` has served at least one allocation in this process
pub fn allocation_tracking_active() -> bool {
    INSTALLED.load(Ordering::Relaxed)
}
