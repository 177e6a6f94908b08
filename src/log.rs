//! Levelled logging to stderr.
//!
//! The terminal display owns stdout, so everything diagnostic goes to
//! stderr. While the display is up and stderr is that same terminal, the log
//! is muted; redirect it (`2>bytepusher.log`) to keep it.

use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum Level {
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => write!(f, "INFO"),
            Level::Warn => write!(f, "WARN"),
            Level::Error => write!(f, "ERROR"),
        }
    }
}

static MUTED: AtomicBool = AtomicBool::new(false);
static MIN_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

/// drop anything quieter than `level`
pub fn set_min_level(level: Level) {
    MIN_LEVEL.store(level as u8, Ordering::Relaxed);
}

/// drop everything, whatever the level
pub fn set_muted(muted: bool) {
    MUTED.store(muted, Ordering::Relaxed);
}

pub fn enabled(level: Level) -> bool {
    allows(
        level,
        MIN_LEVEL.load(Ordering::Relaxed),
        MUTED.load(Ordering::Relaxed),
    )
}

fn allows(level: Level, min_level: u8, muted: bool) -> bool {
    !muted && level as u8 >= min_level
}

/// hh:mm:ss.mmm since midnight UTC
fn timestamp(since_epoch_ms: u128) -> String {
    let ms = since_epoch_ms % 1000;
    let secs = since_epoch_ms / 1000;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        (secs / 3600) % 24,
        (secs / 60) % 60,
        secs % 60,
        ms
    )
}

/// Use the `info!`, `warn!` and `error!` macros rather than calling this.
#[doc(hidden)]
pub fn log(level: Level, message: &str) {
    if !enabled(level) {
        return;
    }
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let mut spec = ColorSpec::new();
    match level {
        Level::Warn => {
            spec.set_fg(Some(Color::Yellow)).set_bold(true);
        }
        Level::Error => {
            spec.set_fg(Some(Color::Red)).set_bold(true);
        }
        Level::Info => {}
    }
    let _ = stderr.set_color(&spec);

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let _ = write!(stderr, "{} [{:5}] ", timestamp(now.as_millis()), level);
    let _ = writeln!(stderr, "{}", message);
    let _ = stderr.reset();
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {{
        if cfg!(not(test)) {
            $crate::log::log($crate::log::Level::Info, &format!($($arg)*));
        }
    }};
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {{
        if cfg!(not(test)) {
            $crate::log::log($crate::log::Level::Warn, &format!($($arg)*));
        }
    }};
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {{
        if cfg!(not(test)) {
            $crate::log::log($crate::log::Level::Error, &format!($($arg)*));
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
    }

    #[test]
    fn test_level_display() {
        assert_eq!(Level::Info.to_string(), "INFO");
        assert_eq!(Level::Warn.to_string(), "WARN");
        assert_eq!(Level::Error.to_string(), "ERROR");
    }

    #[test]
    fn test_timestamp() {
        // 1970-01-02 01:02:03.004
        let ms = ((24 + 1) * 3600 + 2 * 60 + 3) * 1000 + 4;
        assert_eq!(timestamp(ms), "01:02:03.004");
    }

    #[test]
    fn test_min_level_filters() {
        set_min_level(Level::Warn);
        assert!(!enabled(Level::Info));
        assert!(enabled(Level::Warn));
        assert!(enabled(Level::Error));
        set_min_level(Level::Info);
        assert!(enabled(Level::Info));
    }

    #[test]
    fn test_muted_drops_every_level() {
        let min = Level::Info as u8;
        assert!(!allows(Level::Info, min, true));
        assert!(!allows(Level::Error, min, true));
        assert!(allows(Level::Error, min, false));
        assert!(!allows(Level::Info, Level::Error as u8, false));
    }
}
