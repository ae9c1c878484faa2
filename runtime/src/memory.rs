//! Raw allocation helpers for the C-ABI heap values.
//!
//! All sizes are tracked by the owning structs (`cap` fields), so the
//! matching deallocation always knows its layout.

use std::alloc::{alloc_zeroed, dealloc, Layout};

/// Allocate a zeroed array of `count` elements. Returns null for zero
/// counts; the free side tolerates exactly that.
pub unsafe fn allocate<T>(count: usize) -> *mut T {
    if count == 0 {
        return std::ptr::null_mut();
    }
    let layout = Layout::array::<T>(count).expect("Allokation zu groß");
    let ptr = alloc_zeroed(layout) as *mut T;
    if ptr.is_null() {
        std::alloc::handle_alloc_error(layout);
    }
    ptr
}

/// Free an array previously produced by [`allocate`] with the same count.
pub unsafe fn deallocate<T>(ptr: *mut T, count: usize) {
    if ptr.is_null() || count == 0 {
        return;
    }
    let layout = Layout::array::<T>(count).expect("Allokation zu groß");
    dealloc(ptr as *mut u8, layout);
}

/// Allocate a single zeroed value.
pub unsafe fn allocate_one<T>() -> *mut T {
    allocate::<T>(1)
}

/// Free a single value.
pub unsafe fn deallocate_one<T>(ptr: *mut T) {
    deallocate(ptr, 1);
}
