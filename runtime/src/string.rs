//! The ddpstring heap value and its inbuilt operations.
//!
//! A text is `{ char* str; int64 cap }` with null-terminated UTF-8
//! contents; `cap` is the byte length including the terminator. Indices
//! at the language level are 1-based and count unicode scalars, not
//! bytes. The trailing `refc` field is runtime-private; emitted IR only
//! ever touches the two declared fields.

use crate::memory::{allocate, allocate_one, deallocate, deallocate_one};
use crate::operators::{out_of_bounds, runtime_error};
use crate::refcount::{ddp_allocate_refcount, ddp_free_refcount};
use std::os::raw::c_char;

#[repr(C)]
pub struct DdpString {
    pub str_: *mut c_char,
    /// byte length including the null terminator
    pub cap: i64,
    refc: *mut i64,
}

/// Build a new ddpstring holding `bytes` (without terminator).
pub unsafe fn make_string(bytes: &[u8]) -> *mut DdpString {
    let cap = bytes.len() + 1;
    let buffer = allocate::<u8>(cap);
    std::ptr::copy_nonoverlapping(bytes.as_ptr(), buffer, bytes.len());
    *buffer.add(bytes.len()) = 0;

    let string = allocate_one::<DdpString>();
    (*string).str_ = buffer as *mut c_char;
    (*string).cap = cap as i64;
    (*string).refc = ddp_allocate_refcount();
    *(*string).refc = 1;
    string
}

/// The content bytes of a string, terminator excluded.
pub unsafe fn string_bytes<'a>(string: *const DdpString) -> &'a [u8] {
    let len = (*string).cap as usize - 1;
    std::slice::from_raw_parts((*string).str_ as *const u8, len)
}

unsafe fn string_str<'a>(string: *const DdpString) -> &'a str {
    // the runtime only ever stores valid utf8
    std::str::from_utf8_unchecked(string_bytes(string))
}

/// Creates a ddpstring from a constant C string in the emitted module.
#[no_mangle]
pub unsafe extern "C" fn _ddp_string_from_constant(str_: *const c_char) -> *mut DdpString {
    let bytes = std::ffi::CStr::from_ptr(str_).to_bytes();
    make_string(bytes)
}

#[no_mangle]
pub unsafe extern "C" fn _ddp_free_string(string: *mut DdpString) {
    deallocate((*string).str_ as *mut u8, (*string).cap as usize);
    ddp_free_refcount((*string).refc);
    deallocate_one(string);
}

#[no_mangle]
pub unsafe extern "C" fn _ddp_deep_copy_string(string: *mut DdpString) -> *mut DdpString {
    make_string(string_bytes(string))
}

#[no_mangle]
pub unsafe extern "C" fn _ddp_string_equal(a: *mut DdpString, b: *mut DdpString) -> bool {
    string_bytes(a) == string_bytes(b)
}

/// Length in unicode scalars.
#[no_mangle]
pub unsafe extern "C" fn _ddp_string_length(string: *mut DdpString) -> i64 {
    string_str(string).chars().count() as i64
}

/// The 1-based `index`th unicode scalar; traps when out of bounds.
#[no_mangle]
pub unsafe extern "C" fn _ddp_string_index(string: *mut DdpString, index: i64) -> u32 {
    let s = string_str(string);
    if index < 1 {
        out_of_bounds(index, s.chars().count() as i64);
    }
    match s.chars().nth(index as usize - 1) {
        Some(ch) => ch as u32,
        None => out_of_bounds(index, s.chars().count() as i64),
    }
}

/// Replace the 1-based `index`th scalar in place. The replacement may
/// have a different UTF-8 width, so the buffer is rebuilt when needed.
#[no_mangle]
pub unsafe extern "C" fn _ddp_replace_char_in_string(string: *mut DdpString, ch: u32, index: i64) {
    let s = string_str(string);
    let length = s.chars().count() as i64;
    if index < 1 || index > length {
        out_of_bounds(index, length);
    }
    let Some(ch) = char::from_u32(ch) else {
        runtime_error(&format!("{} ist kein gültiger Buchstabe", ch));
    };

    let mut replaced = String::with_capacity(s.len() + ch.len_utf8());
    for (i, old) in s.chars().enumerate() {
        replaced.push(if i as i64 == index - 1 { ch } else { old });
    }

    let old_cap = (*string).cap as usize;
    let bytes = replaced.as_bytes();
    if bytes.len() + 1 == old_cap {
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), (*string).str_ as *mut u8, bytes.len());
    } else {
        deallocate((*string).str_ as *mut u8, old_cap);
        let cap = bytes.len() + 1;
        let buffer = allocate::<u8>(cap);
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), buffer, bytes.len());
        *buffer.add(bytes.len()) = 0;
        (*string).str_ = buffer as *mut c_char;
        (*string).cap = cap as i64;
    }
}

/// The inclusive 1-based sub-text from `index1` to `index2`.
#[no_mangle]
pub unsafe extern "C" fn _ddp_string_slice(
    string: *mut DdpString,
    index1: i64,
    index2: i64,
) -> *mut DdpString {
    let s = string_str(string);
    let length = s.chars().count() as i64;
    if index1 < 1 || index1 > length {
        out_of_bounds(index1, length);
    }
    if index2 < index1 || index2 > length {
        out_of_bounds(index2, length);
    }
    let sliced: String =
        s.chars().skip(index1 as usize - 1).take((index2 - index1 + 1) as usize).collect();
    make_string(sliced.as_bytes())
}

#[no_mangle]
pub unsafe extern "C" fn _ddp_string_string_verkettet(
    a: *mut DdpString,
    b: *mut DdpString,
) -> *mut DdpString {
    let mut bytes = Vec::with_capacity(string_bytes(a).len() + string_bytes(b).len());
    bytes.extend_from_slice(string_bytes(a));
    bytes.extend_from_slice(string_bytes(b));
    make_string(&bytes)
}

#[no_mangle]
pub unsafe extern "C" fn _ddp_string_char_verkettet(
    string: *mut DdpString,
    ch: u32,
) -> *mut DdpString {
    let mut text = string_str(string).to_string();
    text.push(char::from_u32(ch).unwrap_or(char::REPLACEMENT_CHARACTER));
    make_string(text.as_bytes())
}

#[no_mangle]
pub unsafe extern "C" fn _ddp_char_string_verkettet(
    ch: u32,
    string: *mut DdpString,
) -> *mut DdpString {
    let mut text = String::new();
    text.push(char::from_u32(ch).unwrap_or(char::REPLACEMENT_CHARACTER));
    text.push_str(string_str(string));
    make_string(text.as_bytes())
}

/// Text to Zahl; an invalid number is a runtime error.
#[no_mangle]
pub unsafe extern "C" fn _ddp_string_to_int(string: *mut DdpString) -> i64 {
    let text = string_str(string).trim();
    match text.parse::<i64>() {
        Ok(value) => value,
        Err(_) => runtime_error(&format!("'{}' ist keine gültige Zahl", text)),
    }
}

/// Text to Kommazahl; the comma is the decimal separator.
#[no_mangle]
pub unsafe extern "C" fn _ddp_string_to_float(string: *mut DdpString) -> f64 {
    let text = string_str(string).trim().replace(',', ".");
    match text.parse::<f64>() {
        Ok(value) => value,
        Err(_) => runtime_error(&format!("'{}' ist keine gültige Kommazahl", text)),
    }
}

#[no_mangle]
pub unsafe extern "C" fn _ddp_int_to_string(value: i64) -> *mut DdpString {
    make_string(value.to_string().as_bytes())
}

#[no_mangle]
pub unsafe extern "C" fn _ddp_float_to_string(value: f64) -> *mut DdpString {
    make_string(format_float(value).as_bytes())
}

#[no_mangle]
pub unsafe extern "C" fn _ddp_bool_to_string(value: bool) -> *mut DdpString {
    make_string(if value { b"wahr" } else { b"falsch" })
}

#[no_mangle]
pub unsafe extern "C" fn _ddp_char_to_string(ch: u32) -> *mut DdpString {
    let ch = char::from_u32(ch).unwrap_or(char::REPLACEMENT_CHARACTER);
    let mut buffer = [0u8; 4];
    make_string(ch.encode_utf8(&mut buffer).as_bytes())
}

/// Kommazahlen print with a decimal point even when integral.
pub fn format_float(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains(['.', 'e', 'E']) {
        format!("{}.0", text)
    } else {
        text
    }
}
