use crate::lists::*;
use crate::refcount::{ddp_allocate_refcount, ddp_free_refcount, slot_state, BLOCK_SLOTS};
use crate::string::*;
use std::ffi::CString;
use std::sync::Mutex;

// The pool and the heap values are process-global, single-threaded state;
// the test harness runs in parallel threads, so every test serializes on
// this lock.
static RUNTIME_LOCK: Mutex<()> = Mutex::new(());

fn lock() -> std::sync::MutexGuard<'static, ()> {
    RUNTIME_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

unsafe fn string_from(text: &str) -> *mut DdpString {
    let c_string = CString::new(text).unwrap();
    _ddp_string_from_constant(c_string.as_ptr())
}

unsafe fn string_contents(string: *mut DdpString) -> String {
    String::from_utf8(string_bytes(string).to_vec()).unwrap()
}

// ---------------------------------------------------------------------
// refcount pool
// ---------------------------------------------------------------------

#[test]
fn refcount_allocation_sets_used_bit() {
    let _guard = lock();
    let refc = ddp_allocate_refcount();
    let (index, used) = slot_state(refc).expect("Zelle muss in einem Block liegen");
    assert!(index < BLOCK_SLOTS);
    assert!(used);
    ddp_free_refcount(refc);
}

#[test]
fn refcount_free_clears_used_bit() {
    let _guard = lock();
    // the second cell keeps the block alive after the first is freed
    let keep_alive = ddp_allocate_refcount();
    let refc = ddp_allocate_refcount();
    ddp_free_refcount(refc);
    let (_, used) = slot_state(refc).expect("Block lebt durch die zweite Zelle weiter");
    assert!(!used);
    ddp_free_refcount(keep_alive);
}

#[test]
fn refcount_cells_are_distinct_and_writable() {
    let _guard = lock();
    let cells: Vec<*mut i64> = (0..BLOCK_SLOTS + 3).map(|_| ddp_allocate_refcount()).collect();
    for (i, &cell) in cells.iter().enumerate() {
        unsafe { *cell = i as i64 };
    }
    for (i, &cell) in cells.iter().enumerate() {
        assert_eq!(unsafe { *cell }, i as i64);
    }
    let mut unique = cells.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), cells.len());
    for cell in cells {
        ddp_free_refcount(cell);
    }
}

#[test]
fn refcount_blocks_are_reused_after_draining() {
    let _guard = lock();
    // drain a whole block, freeing in reverse order, then allocate again;
    // the cached block must be handed back instead of fresh memory
    let cells: Vec<*mut i64> = (0..BLOCK_SLOTS).map(|_| ddp_allocate_refcount()).collect();
    for &cell in cells.iter().rev() {
        ddp_free_refcount(cell);
    }
    let again = ddp_allocate_refcount();
    let (index, used) = slot_state(again).unwrap();
    assert_eq!(index, 0);
    assert!(used);
    ddp_free_refcount(again);
}

// ---------------------------------------------------------------------
// strings
// ---------------------------------------------------------------------

#[test]
fn string_is_null_terminated_at_cap() {
    let _guard = lock();
    unsafe {
        let s = string_from("Hallo");
        assert_eq!((*s).cap, 6);
        assert_eq!(*(*s).str_.add((*s).cap as usize - 1), 0);
        _ddp_free_string(s);
    }
}

#[test]
fn deep_copy_is_independent_of_the_original() {
    let _guard = lock();
    unsafe {
        let original = string_from("unabhängig");
        let copy = _ddp_deep_copy_string(original);
        _ddp_free_string(original);
        assert_eq!(string_contents(copy), "unabhängig");
        _ddp_free_string(copy);
    }
}

#[test]
fn string_length_counts_unicode_scalars() {
    let _guard = lock();
    unsafe {
        let s = string_from("äöüß");
        assert_eq!(_ddp_string_length(s), 4);
        assert_eq!((*s).cap, 9); // two bytes per umlaut plus terminator
        _ddp_free_string(s);
    }
}

#[test]
fn string_index_is_one_based() {
    let _guard = lock();
    unsafe {
        let s = string_from("Straße");
        assert_eq!(_ddp_string_index(s, 1), 'S' as u32);
        assert_eq!(_ddp_string_index(s, 5), 'ß' as u32);
        assert_eq!(_ddp_string_index(s, 6), 'e' as u32);
        _ddp_free_string(s);
    }
}

#[test]
fn replace_char_handles_width_changes() {
    let _guard = lock();
    unsafe {
        let s = string_from("Masse");
        _ddp_replace_char_in_string(s, 'ß' as u32, 3);
        assert_eq!(string_contents(s), "Maße");
        assert_eq!(*(*s).str_.add((*s).cap as usize - 1), 0);
        _ddp_replace_char_in_string(s, 's' as u32, 3);
        assert_eq!(string_contents(s), "Mase");
        _ddp_free_string(s);
    }
}

#[test]
fn slice_of_full_range_is_identity() {
    let _guard = lock();
    unsafe {
        let s = string_from("abcdef");
        let sliced = _ddp_string_slice(s, 1, 6);
        assert!(_ddp_string_equal(s, sliced));
        _ddp_free_string(sliced);
        _ddp_free_string(s);
    }
}

#[test]
fn slice_is_inclusive_on_both_ends() {
    let _guard = lock();
    unsafe {
        let s = string_from("abcdef");
        let sliced = _ddp_string_slice(s, 2, 4);
        assert_eq!(string_contents(sliced), "bcd");
        _ddp_free_string(sliced);
        _ddp_free_string(s);
    }
}

#[test]
fn concatenation_copies_both_operands_in_order() {
    let _guard = lock();
    unsafe {
        let a = string_from("Hallo, ");
        let b = string_from("Welt!");
        let joined = _ddp_string_string_verkettet(a, b);
        assert_eq!(string_contents(joined), "Hallo, Welt!");
        // operands stay untouched, the caller releases them afterwards
        assert_eq!(string_contents(a), "Hallo, ");
        assert_eq!(string_contents(b), "Welt!");
        _ddp_free_string(a);
        _ddp_free_string(b);
        _ddp_free_string(joined);
    }
}

#[test]
fn concatenation_is_associative() {
    let _guard = lock();
    unsafe {
        let a = string_from("aa");
        let b = string_from("bb");
        let c = string_from("cc");
        let ab = _ddp_string_string_verkettet(a, b);
        let ab_c = _ddp_string_string_verkettet(ab, c);
        let bc = _ddp_string_string_verkettet(b, c);
        let a_bc = _ddp_string_string_verkettet(a, bc);
        assert!(_ddp_string_equal(ab_c, a_bc));
        for s in [a, b, c, ab, ab_c, bc, a_bc] {
            _ddp_free_string(s);
        }
    }
}

#[test]
fn char_concatenation_produces_text() {
    let _guard = lock();
    unsafe {
        let s = string_from("bc");
        let prefixed = _ddp_char_string_verkettet('a' as u32, s);
        let suffixed = _ddp_string_char_verkettet(prefixed, 'd' as u32);
        assert_eq!(string_contents(suffixed), "abcd");
        _ddp_free_string(s);
        _ddp_free_string(prefixed);
        _ddp_free_string(suffixed);
    }
}

#[test]
fn text_zahl_round_trip() {
    let _guard = lock();
    unsafe {
        for value in [0i64, 1, -1, 42, i64::MAX, i64::MIN] {
            let text = _ddp_int_to_string(value);
            assert_eq!(_ddp_string_to_int(text), value);
            _ddp_free_string(text);
        }
    }
}

#[test]
fn float_conversions_use_comma_and_point() {
    let _guard = lock();
    unsafe {
        let comma = string_from("3,5");
        assert_eq!(_ddp_string_to_float(comma), 3.5);
        _ddp_free_string(comma);

        let printed = _ddp_float_to_string(1.5);
        assert_eq!(string_contents(printed), "1.5");
        _ddp_free_string(printed);

        let integral = _ddp_float_to_string(2.0);
        assert_eq!(string_contents(integral), "2.0");
        _ddp_free_string(integral);
    }
}

#[test]
fn bool_and_char_to_string() {
    let _guard = lock();
    unsafe {
        let wahr = _ddp_bool_to_string(true);
        assert_eq!(string_contents(wahr), "wahr");
        _ddp_free_string(wahr);

        let umlaut = _ddp_char_to_string('ö' as u32);
        assert_eq!(string_contents(umlaut), "ö");
        _ddp_free_string(umlaut);
    }
}

// ---------------------------------------------------------------------
// lists
// ---------------------------------------------------------------------

#[test]
fn int_list_from_constants_is_zeroed() {
    let _guard = lock();
    unsafe {
        let list = _ddp_ddpintlist_from_constants(3);
        assert_eq!((*list).len, 3);
        assert!((*list).cap >= (*list).len);
        for i in 0..3 {
            assert_eq!(*(*list).data.add(i), 0);
        }
        _ddp_free_ddpintlist(list);
    }
}

#[test]
fn int_list_concatenation_copies_a_then_b() {
    let _guard = lock();
    unsafe {
        let a = _ddp_ddpintlist_from_constants(2);
        *(*a).data = 1;
        *(*a).data.add(1) = 2;
        let b = _ddp_ddpintlist_from_constants(2);
        *(*b).data = 3;
        *(*b).data.add(1) = 4;

        let joined = _ddp_ddpintlist_ddpintlist_verkettet(a, b);
        assert_eq!((*joined).len, 4);
        let values: Vec<i64> = (0..4).map(|i| *(*joined).data.add(i)).collect();
        assert_eq!(values, [1, 2, 3, 4]);

        _ddp_free_ddpintlist(a);
        _ddp_free_ddpintlist(b);
        _ddp_free_ddpintlist(joined);
    }
}

#[test]
fn element_concatenation_builds_two_element_list() {
    let _guard = lock();
    unsafe {
        let list = _ddp_ddpint_ddpint_verkettet(7, 9);
        assert_eq!((*list).len, 2);
        assert_eq!(*(*list).data, 7);
        assert_eq!(*(*list).data.add(1), 9);

        let prefixed = _ddp_ddpint_ddpintlist_verkettet(5, list);
        assert_eq!((*prefixed).len, 3);
        assert_eq!(*(*prefixed).data, 5);

        let appended = _ddp_ddpintlist_ddpint_verkettet(prefixed, 11);
        assert_eq!((*appended).len, 4);
        assert_eq!(*(*appended).data.add(3), 11);

        _ddp_free_ddpintlist(list);
        _ddp_free_ddpintlist(prefixed);
        _ddp_free_ddpintlist(appended);
    }
}

#[test]
fn list_equality_compares_length_and_elements() {
    let _guard = lock();
    unsafe {
        let a = _ddp_ddpintlist_from_constants(2);
        *(*a).data = 1;
        *(*a).data.add(1) = 2;
        let b = _ddp_deep_copy_ddpintlist(a);
        assert!(_ddp_ddpintlist_equal(a, b));
        *(*b).data.add(1) = 3;
        assert!(!_ddp_ddpintlist_equal(a, b));
        let shorter = _ddp_ddpintlist_from_constants(1);
        *(*shorter).data = 1;
        assert!(!_ddp_ddpintlist_equal(a, shorter));
        _ddp_free_ddpintlist(a);
        _ddp_free_ddpintlist(b);
        _ddp_free_ddpintlist(shorter);
    }
}

#[test]
fn list_slice_is_one_based_and_inclusive() {
    let _guard = lock();
    unsafe {
        let list = _ddp_ddpintlist_from_constants(5);
        for i in 0..5 {
            *(*list).data.add(i) = (i as i64 + 1) * 10;
        }
        let sliced = _ddp_ddpintlist_slice(list, 2, 4);
        assert_eq!((*sliced).len, 3);
        let values: Vec<i64> = (0..3).map(|i| *(*sliced).data.add(i)).collect();
        assert_eq!(values, [20, 30, 40]);
        _ddp_free_ddpintlist(list);
        _ddp_free_ddpintlist(sliced);
    }
}

#[test]
fn string_list_deep_copy_copies_the_strings() {
    let _guard = lock();
    unsafe {
        let list = _ddp_ddpstringlist_from_constants(0);
        let hallo = string_from("hallo");
        let with_elem = _ddp_ddpstringlist_ddpstring_verkettet(list, hallo);
        assert_eq!((*with_elem).len, 1);

        let copy = _ddp_deep_copy_ddpstringlist(with_elem);
        _ddp_free_ddpstringlist(with_elem);
        _ddp_free_string(hallo);

        assert_eq!((*copy).len, 1);
        assert_eq!(string_contents(*(*copy).data), "hallo");
        _ddp_free_ddpstringlist(copy);
    }
}

#[test]
fn list_to_string_uses_semicolons() {
    let _guard = lock();
    unsafe {
        let list = _ddp_ddpintlist_from_constants(3);
        for i in 0..3 {
            *(*list).data.add(i) = (i as i64 + 1) * 10;
        }
        let text = _ddp_ddpintlist_to_string(list);
        assert_eq!(string_contents(text), "[10; 20; 30]");
        _ddp_free_string(text);
        _ddp_free_ddpintlist(list);

        let bools = _ddp_ddpbool_ddpbool_verkettet(true, false);
        let text = _ddp_ddpboollist_to_string(bools);
        assert_eq!(string_contents(text), "[wahr; falsch]");
        _ddp_free_string(text);
        _ddp_free_ddpboollist(bools);
    }
}

#[test]
fn char_list_round_trip_through_text() {
    let _guard = lock();
    unsafe {
        let chars = _ddp_ddpchar_ddpchar_verkettet('ä' as u32, 'x' as u32);
        assert_eq!((*chars).len, 2);
        assert_eq!(*(*chars).data, 'ä' as u32);
        let text = _ddp_ddpcharlist_to_string(chars);
        assert_eq!(string_contents(text), "[ä; x]");
        _ddp_free_string(text);
        _ddp_free_ddpcharlist(chars);
    }
}

#[test]
fn empty_list_has_null_data() {
    let _guard = lock();
    unsafe {
        let list = _ddp_ddpfloatlist_from_constants(0);
        assert_eq!((*list).len, 0);
        let copy = _ddp_deep_copy_ddpfloatlist(list);
        assert!(_ddp_ddpfloatlist_equal(list, copy));
        _ddp_free_ddpfloatlist(list);
        _ddp_free_ddpfloatlist(copy);
    }
}
