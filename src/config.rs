//! Runtime configuration.

use crate::log::Level;
use std::path::PathBuf;
use std::time::Duration;

/// frames per second the host aims for, and the bounds of speed control
pub const DEFAULT_FRAME_RATE: u32 = 60;
pub const MIN_FRAME_RATE: u32 = 1;
pub const MAX_FRAME_RATE: u32 = 60;

/// where roms are looked for when none is named
pub const DEFAULT_ROM_DIR: &str = "roms";

/// frames run by a headless session unless told otherwise
pub const DEFAULT_HEADLESS_FRAMES: u32 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct BytePusherConfig {
    /// rom to start with; otherwise the first one in `rom_dir`
    pub rom: Option<PathBuf>,
    pub rom_dir: PathBuf,
    /// target frames per second, kept within 1..=60
    pub frame_rate: u32,
    /// run without terminal devices
    pub headless: bool,
    /// frames to run when headless
    pub frames: u32,
    /// key mask fed to every frame when headless
    pub input: u16,
    pub mute: bool,
    pub show_help: bool,
    pub show_info: bool,
    pub log_level: Level,
}

impl Default for BytePusherConfig {
    fn default() -> Self {
        BytePusherConfig {
            rom: None,
            rom_dir: PathBuf::from(DEFAULT_ROM_DIR),
            frame_rate: DEFAULT_FRAME_RATE,
            headless: false,
            frames: DEFAULT_HEADLESS_FRAMES,
            input: 0,
            mute: false,
            show_help: false,
            show_info: true,
            log_level: Level::Info,
        }
    }
}

impl BytePusherConfig {
    /// clamp a requested frame rate into range
    pub fn clamp_frame_rate(rate: u32) -> u32 {
        rate.clamp(MIN_FRAME_RATE, MAX_FRAME_RATE)
    }

    pub fn with_frame_rate(mut self, rate: u32) -> Self {
        self.frame_rate = Self::clamp_frame_rate(rate);
        self
    }

    /// how long one frame should take at the configured rate
    pub fn frame_duration(&self) -> Duration {
        frame_duration(self.frame_rate)
    }
}

pub fn frame_duration(frame_rate: u32) -> Duration {
    Duration::from_secs_f64(1.0 / BytePusherConfig::clamp_frame_rate(frame_rate) as f64)
}

/// parse a key mask written in decimal or as 0x-prefixed hex
pub fn parse_key_mask(s: &str) -> Result<u16, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse::<u16>(),
    };
    parsed.map_err(|e| format!("invalid key mask {:?}: {}", s, e))
}
