//! The roms the host can flick between.

use crate::error::BytePusherError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// file extensions recognised as roms, compared case-insensitively
pub const ROM_EXTENSIONS: [&str; 2] = ["bytepusher", "bp"];

pub fn is_rom_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| ROM_EXTENSIONS.iter().any(|r| e.eq_ignore_ascii_case(r)))
        .unwrap_or(false)
}

/// Sorted list of roms with a cursor. Moving past either end stays put.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomLibrary {
    paths: Vec<PathBuf>,
    index: usize,
}

impl RomLibrary {
    pub fn from_paths(mut paths: Vec<PathBuf>) -> Self {
        paths.sort();
        RomLibrary { paths, index: 0 }
    }

    /// every rom file directly inside `dir`; a missing directory is empty
    pub fn scan(dir: &Path) -> Result<Self, io::Error> {
        if !dir.is_dir() {
            return Ok(Self::from_paths(Vec::new()));
        }
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && is_rom_path(&path) {
                paths.push(path);
            }
        }
        Ok(Self::from_paths(paths))
    }

    /// the library for `dir` with the cursor on `rom`; `rom` is added if the
    /// scan didn't find it
    pub fn starting_at(dir: &Path, rom: &Path) -> Result<Self, io::Error> {
        let mut library = Self::scan(dir)?;
        if !library.paths.iter().any(|p| p == rom) {
            library.paths.push(rom.to_path_buf());
            library.paths.sort();
        }
        library.index = library.paths.iter().position(|p| p == rom).unwrap_or(0);
        Ok(library)
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn current(&self) -> Option<&Path> {
        self.paths.get(self.index).map(PathBuf::as_path)
    }

    pub fn select_next(&mut self) -> Option<&Path> {
        if self.index + 1 < self.paths.len() {
            self.index += 1;
        }
        self.current()
    }

    pub fn select_previous(&mut self) -> Option<&Path> {
        self.index = self.index.saturating_sub(1);
        self.current()
    }

    /// read the current rom off disk
    pub fn read_current(&self, dir: &Path) -> Result<(PathBuf, Vec<u8>), BytePusherError> {
        let path = self
            .current()
            .ok_or_else(|| BytePusherError::NoRom(dir.to_path_buf()))?;
        let bytes = fs::read(path)?;
        Ok((path.to_path_buf(), bytes))
    }
}
