//! The refcount pool: a bump-and-bitmap allocator for the 64-bit
//! reference-count cells attached to every heap value.
//!
//! The pool is a doubly linked list of 64-slot blocks, each with a
//! bitmap of occupied slots. Allocation scans from the tail backwards to
//! the first block with a free slot; a fully freed block is unlinked and
//! parked in a small cache for reuse before it goes back to the system
//! allocator.
//!
//! All bit operations use 64-bit constants (`1u64 << index`); an
//! off-by-bit here silently corrupts arbitrary allocations.

use crate::memory::{allocate_one, deallocate_one};
use std::ptr::{addr_of_mut, null_mut};

pub const BLOCK_SLOTS: usize = 64;
const ALL_FREE: u64 = 0u64;
const ALL_USED: u64 = !0u64;
/// how many empty blocks are retained for reuse
const BLOCK_CACHE_SIZE: usize = 16;

#[repr(C)]
struct RefcBlock {
    prev: *mut RefcBlock,
    next: *mut RefcBlock,
    used: u64,
    refcounts: [i64; BLOCK_SLOTS],
}

struct Pool {
    root: *mut RefcBlock,
    tail: *mut RefcBlock,
    cache: [*mut RefcBlock; BLOCK_CACHE_SIZE],
    cache_len: usize,
}

// the emitted programs and the compiler are single-threaded; the pool is
// process-global state initialized lazily on first allocation
static mut POOL: Pool =
    Pool { root: null_mut(), tail: null_mut(), cache: [null_mut(); BLOCK_CACHE_SIZE], cache_len: 0 };

unsafe fn pool() -> &'static mut Pool {
    &mut *addr_of_mut!(POOL)
}

unsafe fn new_block(pool: &mut Pool) -> *mut RefcBlock {
    let block = if pool.cache_len > 0 {
        pool.cache_len -= 1;
        pool.cache[pool.cache_len]
    } else {
        allocate_one::<RefcBlock>()
    };
    (*block).prev = pool.tail;
    (*block).next = null_mut();
    (*block).used = ALL_FREE;
    (*block).refcounts = [0; BLOCK_SLOTS];
    if pool.tail.is_null() {
        pool.root = block;
    } else {
        (*pool.tail).next = block;
    }
    pool.tail = block;
    block
}

/// the hindmost block with free capacity, appending one if necessary
unsafe fn block_with_capacity(pool: &mut Pool) -> *mut RefcBlock {
    let mut it = pool.tail;
    while !it.is_null() {
        if (*it).used != ALL_USED {
            return it;
        }
        it = (*it).prev;
    }
    new_block(pool)
}

unsafe fn block_of_refc(pool: &mut Pool, refc: *mut i64) -> *mut RefcBlock {
    let mut it = pool.root;
    while !it.is_null() {
        let start = (*it).refcounts.as_ptr() as usize;
        let end = start + BLOCK_SLOTS * std::mem::size_of::<i64>();
        let addr = refc as usize;
        if addr >= start && addr < end {
            return it;
        }
        it = (*it).next;
    }
    null_mut()
}

unsafe fn unlink(pool: &mut Pool, block: *mut RefcBlock) {
    if block == pool.root {
        pool.root = (*block).next;
    }
    if block == pool.tail {
        pool.tail = (*block).prev;
    }
    if !(*block).prev.is_null() {
        (*(*block).prev).next = (*block).next;
    }
    if !(*block).next.is_null() {
        (*(*block).next).prev = (*block).prev;
    }
}

/// Returns a fresh refcount cell.
#[no_mangle]
pub extern "C" fn ddp_allocate_refcount() -> *mut i64 {
    unsafe {
        let pool = pool();
        let block = block_with_capacity(pool);
        let first_zero = (!(*block).used).trailing_zeros() as usize;
        (*block).used |= 1u64 << first_zero;
        (*block).refcounts[first_zero] = 0;
        (*block).refcounts.as_mut_ptr().add(first_zero)
    }
}

/// Frees the given refcount cell.
#[no_mangle]
pub extern "C" fn ddp_free_refcount(refc: *mut i64) {
    unsafe {
        let pool = pool();
        let block = block_of_refc(pool, refc);
        if block.is_null() {
            crate::operators::runtime_error(&format!(
                "Der Referenzzähler {:p} gehört zu keinem Block",
                refc
            ));
        }
        let index = refc.offset_from((*block).refcounts.as_ptr()) as usize;
        (*block).used &= !(1u64 << index);

        if (*block).used == ALL_FREE {
            unlink(pool, block);
            if pool.cache_len < BLOCK_CACHE_SIZE {
                pool.cache[pool.cache_len] = block;
                pool.cache_len += 1;
            } else {
                deallocate_one(block);
            }
        }
    }
}

/// Tears down all pool memory. Called exactly once at process exit.
#[no_mangle]
pub extern "C" fn ddp_free_refc_blocks() {
    unsafe {
        let pool = pool();
        let mut it = pool.root;
        while !it.is_null() {
            let to_free = it;
            it = (*it).next;
            deallocate_one(to_free);
        }
        pool.root = null_mut();
        pool.tail = null_mut();
        for i in 0..pool.cache_len {
            deallocate_one(pool.cache[i]);
        }
        pool.cache_len = 0;
    }
}

/// Test support: the slot index of a cell inside its block and whether
/// its used bit is set.
#[cfg(test)]
pub(crate) fn slot_state(refc: *mut i64) -> Option<(usize, bool)> {
    unsafe {
        let pool = pool();
        let block = block_of_refc(pool, refc);
        if block.is_null() {
            return None;
        }
        let index = refc.offset_from((*block).refcounts.as_ptr()) as usize;
        Some((index, (*block).used & (1u64 << index) != 0))
    }
}
