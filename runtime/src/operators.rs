//! Inbuilt operator helpers and the runtime error paths.

/// Bounds violation trap: reports the 1-based index and the logical
/// length, then terminates the process. Emitted code branches here
/// instead of touching memory out of range; no cleanup runs on this
/// path.
#[no_mangle]
pub extern "C" fn out_of_bounds(index: i64, len: i64) -> ! {
    eprintln!("Laufzeitfehler: Der Index {} liegt außerhalb der Listen Länge {}", index, len);
    std::process::exit(1)
}

/// Unrecoverable runtime error (invalid numeric conversion and friends).
pub fn runtime_error(msg: &str) -> ! {
    eprintln!("Laufzeitfehler: {}", msg);
    std::process::exit(1)
}

// trigonometric helpers referenced by the emitted module

#[no_mangle]
pub extern "C" fn _ddp_sin(f: f64) -> f64 {
    f.sin()
}

#[no_mangle]
pub extern "C" fn _ddp_cos(f: f64) -> f64 {
    f.cos()
}

#[no_mangle]
pub extern "C" fn _ddp_tan(f: f64) -> f64 {
    f.tan()
}

#[no_mangle]
pub extern "C" fn _ddp_asin(f: f64) -> f64 {
    f.asin()
}

#[no_mangle]
pub extern "C" fn _ddp_acos(f: f64) -> f64 {
    f.acos()
}

#[no_mangle]
pub extern "C" fn _ddp_atan(f: f64) -> f64 {
    f.atan()
}

#[no_mangle]
pub extern "C" fn _ddp_sinh(f: f64) -> f64 {
    f.sinh()
}

#[no_mangle]
pub extern "C" fn _ddp_cosh(f: f64) -> f64 {
    f.cosh()
}

#[no_mangle]
pub extern "C" fn _ddp_tanh(f: f64) -> f64 {
    f.tanh()
}
