//! Host platform detection for choosing tool binaries, flags and output patterns.

use serde::Serialize;

/// The two command-line dialects the probes know how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Posix,
}

impl Platform {
    /// Platform of the running binary.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Windows => write!(f, "windows"),
            Platform::Posix => write!(f, "posix"),
        }
    }
}
