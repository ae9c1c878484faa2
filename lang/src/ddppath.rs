//! Discovery of the DDP installation directory.
//!
//! The `DDPPATH` environment variable points at the installation root; if
//! it is unset the root is derived from the folder of the running
//! executable. `bin`, `lib` and `Duden` live beneath it.

use std::path::PathBuf;
use std::sync::OnceLock;

static INSTALL_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Path to the DDP installation root.
pub fn install_dir() -> &'static PathBuf {
    INSTALL_DIR.get_or_init(|| {
        if let Some(path) = std::env::var_os("DDPPATH") {
            return PathBuf::from(path);
        }
        // fallback: the executable lives in <root>/bin
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().and_then(|bin| bin.parent()).map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Path to the Duden directory (the standard library modules).
pub fn duden() -> PathBuf {
    install_dir().join("Duden")
}

/// Path to the bin directory (contains kddp).
pub fn bin() -> PathBuf {
    install_dir().join("bin")
}

/// Path to the lib directory (contains the runtime archive).
pub fn lib() -> PathBuf {
    install_dir().join("lib")
}

/// Checks that the installation layout is present.
pub fn validate_installation() -> Result<(), String> {
    for dir in [bin(), lib(), duden()] {
        if !dir.is_dir() {
            return Err(format!("Das DDP Installations-Verzeichnis '{}' fehlt", dir.display()));
        }
    }
    Ok(())
}
