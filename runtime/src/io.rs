//! The inbuilt write functions and the process entry stub.
//!
//! `Schreibe <wert>` resolves to one of the typed write functions below;
//! the `Zeile` variants append a newline. Output goes through an
//! explicit flush because the emitted program exits via the C runtime,
//! not through Rust's own main.

// the exported symbols carry their DDP surface names
#![allow(non_snake_case)]

use crate::string::{format_float, string_bytes, DdpString};
use std::io::Write;

fn write_out(text: &[u8]) {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text).ok();
    stdout.flush().ok();
}

#[no_mangle]
pub extern "C" fn Schreibe_Zahl(wert: i64) {
    write_out(wert.to_string().as_bytes());
}

#[no_mangle]
pub extern "C" fn Schreibe_Kommazahl(wert: f64) {
    write_out(format_float(wert).as_bytes());
}

#[no_mangle]
pub extern "C" fn Schreibe_Boolean(wert: bool) {
    write_out(if wert { b"wahr".as_slice() } else { b"falsch".as_slice() });
}

#[no_mangle]
pub extern "C" fn Schreibe_Buchstabe(wert: u32) {
    let ch = char::from_u32(wert).unwrap_or(char::REPLACEMENT_CHARACTER);
    let mut buffer = [0u8; 4];
    write_out(ch.encode_utf8(&mut buffer).as_bytes());
}

#[no_mangle]
pub unsafe extern "C" fn Schreibe_Text(wert: *mut DdpString) {
    write_out(string_bytes(wert));
}

#[no_mangle]
pub extern "C" fn Schreibe_Zahl_Zeile(wert: i64) {
    write_out(format!("{}\n", wert).as_bytes());
}

#[no_mangle]
pub extern "C" fn Schreibe_Kommazahl_Zeile(wert: f64) {
    write_out(format!("{}\n", format_float(wert)).as_bytes());
}

#[no_mangle]
pub extern "C" fn Schreibe_Boolean_Zeile(wert: bool) {
    write_out(if wert { b"wahr\n".as_slice() } else { b"falsch\n".as_slice() });
}

#[no_mangle]
pub extern "C" fn Schreibe_Buchstabe_Zeile(wert: u32) {
    let ch = char::from_u32(wert).unwrap_or(char::REPLACEMENT_CHARACTER);
    write_out(format!("{}\n", ch).as_bytes());
}

#[no_mangle]
pub unsafe extern "C" fn Schreibe_Text_Zeile(wert: *mut DdpString) {
    let mut bytes = string_bytes(wert).to_vec();
    bytes.push(b'\n');
    write_out(&bytes);
}

#[cfg(not(test))]
extern "C" {
    fn _ddp_ddpmain() -> i64;
}

/// The C entry point of compiled programs: run the program, then tear
/// down the refcount pool exactly once.
#[cfg(not(test))]
#[no_mangle]
pub unsafe extern "C" fn main(_argc: i32, _argv: *const *const std::os::raw::c_char) -> i32 {
    let code = _ddp_ddpmain();
    std::io::stdout().flush().ok();
    crate::refcount::ddp_free_refc_blocks();
    code as i32
}
