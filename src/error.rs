//! Crate-level error type. Boundary failures only — the CPU and Invaders
//! machine core are total and never produce one (see §7 of the design doc).

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum EmuError {
    /// A program image could not be loaded: bad path, non-regular file,
    /// empty file, or too large for the target region.
    Load { path: PathBuf, reason: String },
    /// The presenter backend (window/graphics toolkit) failed to start.
    PresenterInit(String),
    /// A CP/M image could not be prepared (too large for the 0x0100-offset
    /// load region).
    Cpm(String),
}

impl fmt::Display for EmuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmuError::Load { path, reason } => {
                write!(f, "failed to load '{}': {reason}", path.display())
            }
            EmuError::PresenterInit(reason) => write!(f, "presenter init failed: {reason}"),
            EmuError::Cpm(reason) => write!(f, "cp/m image error: {reason}"),
        }
    }
}

impl std::error::Error for EmuError {}
