//! The five list heap values.
//!
//! Every variant is `{ T* data; int64 len; int64 cap }` plus the
//! runtime-private refcount cell. The emitted IR indexes `data` and
//! reads `len` directly, everything else goes through the C ABI below.
//! All variants share one generic core so their semantics cannot drift
//! apart; text elements are deep-copied and released recursively.

use crate::memory::{allocate, allocate_one, deallocate, deallocate_one};
use crate::operators::out_of_bounds;
use crate::refcount::{ddp_allocate_refcount, ddp_free_refcount};
use crate::string::{
    format_float, make_string, string_bytes, DdpString, _ddp_deep_copy_string, _ddp_free_string,
    _ddp_string_equal,
};

#[repr(C)]
pub struct DdpList<T> {
    pub data: *mut T,
    pub len: i64,
    pub cap: i64,
    refc: *mut i64,
}

pub type DdpIntList = DdpList<i64>;
pub type DdpFloatList = DdpList<f64>;
pub type DdpBoolList = DdpList<bool>;
pub type DdpCharList = DdpList<u32>;
pub type DdpStringList = DdpList<*mut DdpString>;

/// Per-element behavior that differs between scalar and text lists.
pub trait ListElement: Copy {
    unsafe fn copy_element(self) -> Self;
    unsafe fn free_element(self);
    unsafe fn elements_equal(self, other: Self) -> bool;
    unsafe fn format_element(self, out: &mut String);
}

macro_rules! scalar_element {
    ($ty:ty, |$value:ident, $out:ident| $fmt:expr) => {
        impl ListElement for $ty {
            unsafe fn copy_element(self) -> Self {
                self
            }
            unsafe fn free_element(self) {}
            unsafe fn elements_equal(self, other: Self) -> bool {
                self == other
            }
            unsafe fn format_element(self, $out: &mut String) {
                let $value = self;
                $fmt
            }
        }
    };
}

scalar_element!(i64, |value, out| out.push_str(&value.to_string()));
scalar_element!(f64, |value, out| out.push_str(&format_float(value)));
scalar_element!(bool, |value, out| out.push_str(if value { "wahr" } else { "falsch" }));
scalar_element!(u32, |value, out| {
    out.push(char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER))
});

impl ListElement for *mut DdpString {
    unsafe fn copy_element(self) -> Self {
        _ddp_deep_copy_string(self)
    }
    unsafe fn free_element(self) {
        _ddp_free_string(self);
    }
    unsafe fn elements_equal(self, other: Self) -> bool {
        _ddp_string_equal(self, other)
    }
    unsafe fn format_element(self, out: &mut String) {
        out.push_str(std::str::from_utf8_unchecked(string_bytes(self)));
    }
}

// ---------------------------------------------------------------------
// generic core
// ---------------------------------------------------------------------

unsafe fn list_from_count<T: ListElement>(count: i64) -> *mut DdpList<T> {
    let count = count.max(0);
    let list = allocate_one::<DdpList<T>>();
    (*list).data = allocate::<T>(count as usize);
    (*list).len = count;
    (*list).cap = count;
    (*list).refc = ddp_allocate_refcount();
    *(*list).refc = 1;
    list
}

unsafe fn elements<'a, T>(list: *mut DdpList<T>) -> &'a [T] {
    if (*list).data.is_null() {
        &[]
    } else {
        std::slice::from_raw_parts((*list).data, (*list).len as usize)
    }
}

unsafe fn free_list<T: ListElement>(list: *mut DdpList<T>) {
    for i in 0..(*list).len as usize {
        (*(*list).data.add(i)).free_element();
    }
    deallocate((*list).data, (*list).cap as usize);
    ddp_free_refcount((*list).refc);
    deallocate_one(list);
}

unsafe fn deep_copy_list<T: ListElement>(list: *mut DdpList<T>) -> *mut DdpList<T> {
    let copy = list_from_count::<T>((*list).len);
    for (i, element) in elements(list).iter().enumerate() {
        *(*copy).data.add(i) = element.copy_element();
    }
    copy
}

unsafe fn lists_equal<T: ListElement>(a: *mut DdpList<T>, b: *mut DdpList<T>) -> bool {
    if (*a).len != (*b).len {
        return false;
    }
    elements(a)
        .iter()
        .zip(elements(b))
        .all(|(x, y)| x.elements_equal(*y))
}

/// The inclusive 1-based sub-list from `index1` to `index2`.
unsafe fn slice_list<T: ListElement>(
    list: *mut DdpList<T>,
    index1: i64,
    index2: i64,
) -> *mut DdpList<T> {
    let len = (*list).len;
    if index1 < 1 || index1 > len {
        out_of_bounds(index1, len);
    }
    if index2 < index1 || index2 > len {
        out_of_bounds(index2, len);
    }
    let sliced = list_from_count::<T>(index2 - index1 + 1);
    for i in 0..(*sliced).len as usize {
        let element = *(*list).data.add(index1 as usize - 1 + i);
        *(*sliced).data.add(i) = element.copy_element();
    }
    sliced
}

unsafe fn list_to_string<T: ListElement>(list: *mut DdpList<T>) -> *mut DdpString {
    let mut out = String::from("[");
    for (i, element) in elements(list).iter().enumerate() {
        if i > 0 {
            out.push_str("; ");
        }
        element.format_element(&mut out);
    }
    out.push(']');
    make_string(out.as_bytes())
}

unsafe fn concat_lists<T: ListElement>(a: *mut DdpList<T>, b: *mut DdpList<T>) -> *mut DdpList<T> {
    let result = list_from_count::<T>((*a).len + (*b).len);
    for (i, element) in elements(a).iter().chain(elements(b)).enumerate() {
        *(*result).data.add(i) = element.copy_element();
    }
    result
}

unsafe fn concat_list_element<T: ListElement>(list: *mut DdpList<T>, element: T) -> *mut DdpList<T> {
    let result = list_from_count::<T>((*list).len + 1);
    for (i, old) in elements(list).iter().enumerate() {
        *(*result).data.add(i) = old.copy_element();
    }
    *(*result).data.add((*list).len as usize) = element.copy_element();
    result
}

unsafe fn concat_element_list<T: ListElement>(element: T, list: *mut DdpList<T>) -> *mut DdpList<T> {
    let result = list_from_count::<T>((*list).len + 1);
    *(*result).data = element.copy_element();
    for (i, old) in elements(list).iter().enumerate() {
        *(*result).data.add(i + 1) = old.copy_element();
    }
    result
}

unsafe fn concat_elements<T: ListElement>(a: T, b: T) -> *mut DdpList<T> {
    let result = list_from_count::<T>(2);
    *(*result).data = a.copy_element();
    *(*result).data.add(1) = b.copy_element();
    result
}

// ---------------------------------------------------------------------
// the C ABI consumed by emitted modules
// ---------------------------------------------------------------------

macro_rules! list_abi {
    ($list:ty, $elem:ty,
     $from:ident, $free:ident, $copy:ident, $eq:ident, $slice:ident, $tostr:ident,
     $ll:ident, $le:ident, $el:ident $(, $ee:ident)?) => {
        #[no_mangle]
        pub unsafe extern "C" fn $from(count: i64) -> *mut $list {
            list_from_count(count)
        }
        #[no_mangle]
        pub unsafe extern "C" fn $free(list: *mut $list) {
            free_list(list)
        }
        #[no_mangle]
        pub unsafe extern "C" fn $copy(list: *mut $list) -> *mut $list {
            deep_copy_list(list)
        }
        #[no_mangle]
        pub unsafe extern "C" fn $eq(a: *mut $list, b: *mut $list) -> bool {
            lists_equal(a, b)
        }
        #[no_mangle]
        pub unsafe extern "C" fn $slice(list: *mut $list, index1: i64, index2: i64) -> *mut $list {
            slice_list(list, index1, index2)
        }
        #[no_mangle]
        pub unsafe extern "C" fn $tostr(list: *mut $list) -> *mut DdpString {
            list_to_string(list)
        }
        #[no_mangle]
        pub unsafe extern "C" fn $ll(a: *mut $list, b: *mut $list) -> *mut $list {
            concat_lists(a, b)
        }
        #[no_mangle]
        pub unsafe extern "C" fn $le(list: *mut $list, element: $elem) -> *mut $list {
            concat_list_element(list, element)
        }
        #[no_mangle]
        pub unsafe extern "C" fn $el(element: $elem, list: *mut $list) -> *mut $list {
            concat_element_list(element, list)
        }
        $(
            #[no_mangle]
            pub unsafe extern "C" fn $ee(a: $elem, b: $elem) -> *mut $list {
                concat_elements(a, b)
            }
        )?
    };
}

list_abi!(
    DdpIntList,
    i64,
    _ddp_ddpintlist_from_constants,
    _ddp_free_ddpintlist,
    _ddp_deep_copy_ddpintlist,
    _ddp_ddpintlist_equal,
    _ddp_ddpintlist_slice,
    _ddp_ddpintlist_to_string,
    _ddp_ddpintlist_ddpintlist_verkettet,
    _ddp_ddpintlist_ddpint_verkettet,
    _ddp_ddpint_ddpintlist_verkettet,
    _ddp_ddpint_ddpint_verkettet
);

list_abi!(
    DdpFloatList,
    f64,
    _ddp_ddpfloatlist_from_constants,
    _ddp_free_ddpfloatlist,
    _ddp_deep_copy_ddpfloatlist,
    _ddp_ddpfloatlist_equal,
    _ddp_ddpfloatlist_slice,
    _ddp_ddpfloatlist_to_string,
    _ddp_ddpfloatlist_ddpfloatlist_verkettet,
    _ddp_ddpfloatlist_ddpfloat_verkettet,
    _ddp_ddpfloat_ddpfloatlist_verkettet,
    _ddp_ddpfloat_ddpfloat_verkettet
);

list_abi!(
    DdpBoolList,
    bool,
    _ddp_ddpboollist_from_constants,
    _ddp_free_ddpboollist,
    _ddp_deep_copy_ddpboollist,
    _ddp_ddpboollist_equal,
    _ddp_ddpboollist_slice,
    _ddp_ddpboollist_to_string,
    _ddp_ddpboollist_ddpboollist_verkettet,
    _ddp_ddpboollist_ddpbool_verkettet,
    _ddp_ddpbool_ddpboollist_verkettet,
    _ddp_ddpbool_ddpbool_verkettet
);

list_abi!(
    DdpCharList,
    u32,
    _ddp_ddpcharlist_from_constants,
    _ddp_free_ddpcharlist,
    _ddp_deep_copy_ddpcharlist,
    _ddp_ddpcharlist_equal,
    _ddp_ddpcharlist_slice,
    _ddp_ddpcharlist_to_string,
    _ddp_ddpcharlist_ddpcharlist_verkettet,
    _ddp_ddpcharlist_ddpchar_verkettet,
    _ddp_ddpchar_ddpcharlist_verkettet,
    _ddp_ddpchar_ddpchar_verkettet
);

// text ⊕ text concatenates to a text, so the string list carries no
// element-element helper
list_abi!(
    DdpStringList,
    *mut DdpString,
    _ddp_ddpstringlist_from_constants,
    _ddp_free_ddpstringlist,
    _ddp_deep_copy_ddpstringlist,
    _ddp_ddpstringlist_equal,
    _ddp_ddpstringlist_slice,
    _ddp_ddpstringlist_to_string,
    _ddp_ddpstringlist_ddpstringlist_verkettet,
    _ddp_ddpstringlist_ddpstring_verkettet,
    _ddp_ddpstring_ddpstringlist_verkettet
);
