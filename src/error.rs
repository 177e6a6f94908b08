use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong around the machine. The interpreter loop
/// itself has no failure modes; these all come from loading or from the
/// devices on the far side of the frame port.
#[derive(Debug, Error)]
pub enum BytePusherError {
    #[error("rom is {len} bytes but the address space only holds {max}")]
    RomTooLarge { len: usize, max: usize },

    #[error("frame must be {expected} bytes, got {actual}")]
    FrameSize { expected: usize, actual: usize },

    #[error("i/o unavailable: {0}")]
    IoUnavailable(#[from] io::Error),

    #[error("sound device: {0}")]
    Sound(String),

    #[error("no rom found in {0}")]
    NoRom(PathBuf),
}
