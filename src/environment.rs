//! # environment
//!
//! Sets everything up and runs the main loop. The interpreter does no timing
//! of its own, so everything to do with cadence lives here: the target frame
//! rate, pausing, and flicking between roms. None of it is visible to the
//! machine; it only changes how often `run` gets called and with what memory.
use crate::config::{self, BytePusherConfig, DEFAULT_FRAME_RATE};
use crate::display::Display;
use crate::error::BytePusherError;
use crate::input::{HostCommand, Input};
use crate::interpreter::{BytePusherInterpreter, INSTRUCTIONS_PER_FRAME};
use crate::port::{self, AudioFrame, FramePort, HeadlessPort, VideoFrame};
use crate::rom::RomLibrary;
use crate::sound::Sound;
use crate::{error, info, warn};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

const HELP: [&str; 12] = [
    "0-9 A-F      BytePusher keys",
    "Left arrow   previous rom",
    "Right arrow  next rom",
    "P            pause",
    "H            toggle help",
    "I            toggle info",
    "Page Up      faster",
    "Page Down    slower",
    "R            reset speed",
    "Q / Esc      quit",
    "",
    "roms are read from the rom directory (*.BytePusher, *.bp)",
];

/// Devices behind the frame port. Audio trouble is reported once and then
/// the sound device is left alone; the picture carries on.
pub struct IoDriver<'a> {
    input: &'a mut dyn Input,
    sound: &'a mut dyn Sound,
    display: &'a mut dyn Display,
    sound_ok: bool,
    last_video: Option<VideoFrame>,
}

impl<'a> IoDriver<'a> {
    pub fn new(
        input: &'a mut dyn Input,
        sound: &'a mut dyn Sound,
        display: &'a mut dyn Display,
    ) -> Self {
        IoDriver {
            input,
            sound,
            display,
            sound_ok: true,
            last_video: None,
        }
    }

    /// draw the last frame again, e.g. when paused and the overlay changed
    pub fn redraw(&mut self) -> Result<(), BytePusherError> {
        let blank;
        let frame = match &self.last_video {
            Some(frame) => frame,
            None => {
                blank = VideoFrame::blank();
                &blank
            }
        };
        self.display.draw(frame)?;
        Ok(())
    }

    /// silence the speaker, e.g. on pause or shutdown
    pub fn stop_sound(&mut self) -> Result<(), BytePusherError> {
        self.sound
            .stop()
            .map_err(|e| BytePusherError::Sound(e.to_string()))
    }
}

impl FramePort for IoDriver<'_> {
    fn poll_input(&mut self) -> Result<u16, BytePusherError> {
        Ok(self.input.poll_keys()?)
    }

    fn present_audio(&mut self, frame: AudioFrame) -> Result<(), BytePusherError> {
        if !self.sound_ok {
            return Ok(());
        }
        if let Err(e) = self.sound.play(&frame) {
            warn!("sound disabled: {}", e);
            self.sound_ok = false;
        }
        Ok(())
    }

    fn present_video(&mut self, frame: VideoFrame) -> Result<(), BytePusherError> {
        self.display.draw(&frame)?;
        self.last_video = Some(frame);
        Ok(())
    }
}

/// counts frames over one-second windows
#[derive(Debug)]
pub struct FrameCounter {
    window_start: Instant,
    frames: u32,
    rate: u32,
}

impl FrameCounter {
    pub fn new(now: Instant) -> Self {
        FrameCounter {
            window_start: now,
            frames: 0,
            rate: 0,
        }
    }

    pub fn tick(&mut self, now: Instant) {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed >= Duration::from_secs(1) {
            self.rate = self.frames;
            self.frames = 0;
            self.window_start = now;
        }
    }

    /// frames counted in the last complete window
    pub fn rate(&self) -> u32 {
        self.rate
    }
}

pub struct Environment<'a> {
    interpreter: BytePusherInterpreter,
    driver: IoDriver<'a>,
    library: RomLibrary,
    config: BytePusherConfig,
    rom_name: Option<String>,
    status: Option<String>,
    frame_rate: u32,
    paused: bool,
    show_help: bool,
    show_info: bool,
    quit: bool,
    counter: FrameCounter,
}

impl<'a> Environment<'a> {
    pub fn new(
        config: BytePusherConfig,
        input: &'a mut dyn Input,
        sound: &'a mut dyn Sound,
        display: &'a mut dyn Display,
    ) -> Result<Self, BytePusherError> {
        let library = match &config.rom {
            Some(rom) => RomLibrary::starting_at(rom_dir_for(&config, rom), rom)?,
            None => RomLibrary::scan(&config.rom_dir)?,
        };
        let mut env = Environment {
            interpreter: BytePusherInterpreter::new(),
            driver: IoDriver::new(input, sound, display),
            frame_rate: BytePusherConfig::clamp_frame_rate(config.frame_rate),
            show_help: config.show_help,
            show_info: config.show_info,
            library,
            config,
            rom_name: None,
            status: None,
            paused: false,
            quit: false,
            counter: FrameCounter::new(Instant::now()),
        };
        if env.library.is_empty() {
            warn!(
                "no roms in {}; running a blank machine",
                env.config.rom_dir.display()
            );
        } else {
            env.load_current_rom()?;
        }
        env.update_overlay();
        Ok(env)
    }

    pub fn interpreter(&self) -> &BytePusherInterpreter {
        &self.interpreter
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// the rom the machine is running, which isn't always the one the
    /// library points at
    pub fn rom_name(&self) -> Option<&str> {
        self.rom_name.as_deref()
    }

    /// the last host event, shown in the info overlay
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Host events go to the overlay. The log line only reaches the screen
    /// when stderr isn't the terminal being drawn on.
    fn notify(&mut self, message: String) {
        info!("{}", message);
        self.status = Some(message);
    }

    /// Load whatever the library points at. A rom that doesn't fit is
    /// reported and the machine carries on with what it had.
    fn load_current_rom(&mut self) -> Result<(), BytePusherError> {
        let (path, bytes) = self.library.read_current(&self.config.rom_dir)?;
        match self.interpreter.load_rom(&bytes) {
            Ok(()) => {
                let name = file_name(&path);
                self.notify(format!("loaded {} ({} bytes)", name, bytes.len()));
                self.rom_name = Some(name);
                Ok(())
            }
            Err(e @ BytePusherError::RomTooLarge { .. }) => {
                error!("skipped {}: {}", path.display(), e);
                let running = self.rom_name.as_deref().unwrap_or("(none)");
                self.status = Some(format!(
                    "skipped {} (too large), still running {}",
                    file_name(&path),
                    running
                ));
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn change_rom(&mut self, forward: bool) -> Result<(), BytePusherError> {
        if self.library.is_empty() {
            return Ok(());
        }
        if forward {
            self.library.select_next();
        } else {
            self.library.select_previous();
        }
        if let Err(e) = self.load_current_rom() {
            error!("couldn't load rom: {}", e);
            self.status = Some(format!("couldn't load rom: {}", e));
        }
        Ok(())
    }

    fn set_frame_rate(&mut self, rate: u32) {
        let rate = BytePusherConfig::clamp_frame_rate(rate);
        if rate != self.frame_rate {
            self.notify(format!("frame rate {} -> {}", self.frame_rate, rate));
            self.frame_rate = rate;
        }
    }

    pub fn handle(&mut self, cmd: HostCommand) -> Result<(), BytePusherError> {
        match cmd {
            HostCommand::NextRom => self.change_rom(true)?,
            HostCommand::PreviousRom => self.change_rom(false)?,
            HostCommand::TogglePause => {
                self.paused = !self.paused;
                self.notify(String::from(if self.paused { "paused" } else { "resumed" }));
                if self.paused {
                    self.driver.stop_sound()?;
                }
            }
            HostCommand::FasterFrameRate => self.set_frame_rate(self.frame_rate + 1),
            HostCommand::SlowerFrameRate => self.set_frame_rate(self.frame_rate.saturating_sub(1)),
            HostCommand::ResetFrameRate => self.set_frame_rate(DEFAULT_FRAME_RATE),
            HostCommand::ToggleHelp => self.show_help = !self.show_help,
            HostCommand::ToggleInfo => self.show_info = !self.show_info,
            HostCommand::Quit => self.quit = true,
        }
        Ok(())
    }

    /// info and help text for the display
    pub fn overlay_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if self.show_info {
            let fps = self.counter.rate();
            lines.push(format!("rom: {}", self.rom_name.as_deref().unwrap_or("(none)")));
            lines.push(format!(
                "cpu: {} fps / {} ips",
                fps,
                fps as usize * INSTRUCTIONS_PER_FRAME
            ));
            lines.push(format!(
                "target: {} fps{}",
                self.frame_rate,
                if self.paused { " (paused)" } else { "" }
            ));
            if let Some(status) = &self.status {
                lines.push(status.clone());
            }
        }
        if self.show_help {
            if !lines.is_empty() {
                lines.push(String::new());
            }
            lines.extend(HELP.iter().map(|l| l.to_string()));
        }
        lines
    }

    fn update_overlay(&mut self) {
        let lines = self.overlay_lines();
        self.driver.display.set_overlay(lines);
    }

    /// Handle pending host keys, then run one frame unless paused.
    pub fn tick(&mut self, now: Instant) -> Result<(), BytePusherError> {
        for cmd in self.driver.input.take_commands()? {
            self.handle(cmd)?;
        }
        if self.quit {
            return Ok(());
        }
        self.update_overlay();
        if self.paused {
            return self.driver.redraw();
        }
        self.interpreter.run_frame(&mut self.driver)?;
        self.counter.tick(now);
        Ok(())
    }

    /// run until asked to quit, one frame per frame duration
    pub fn main_loop(&mut self) -> Result<(), BytePusherError> {
        while !self.quit {
            let start = Instant::now();
            self.tick(start)?;
            let target = config::frame_duration(self.frame_rate);
            if let Some(remaining) = target.checked_sub(start.elapsed()) {
                spin_sleep::sleep(remaining);
            }
        }
        self.driver.stop_sound()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// a named rom's library is its own directory, unless it sits in rom_dir
fn rom_dir_for<'c>(config: &'c BytePusherConfig, rom: &'c Path) -> &'c Path {
    match rom.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => &config.rom_dir,
    }
}

/// What a headless session did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessSummary {
    pub rom: Option<String>,
    pub frames: u64,
    pub instructions: u64,
    pub program_counter: u32,
    pub video_digest: u64,
    pub audio_digest: u64,
}

impl fmt::Display for HeadlessSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rom={} frames={} instructions={} pc={:06x} video={:016x} audio={:016x}",
            self.rom.as_deref().unwrap_or("(none)"),
            self.frames,
            self.instructions,
            self.program_counter,
            self.video_digest,
            self.audio_digest
        )
    }
}

/// Run the configured rom for `config.frames` frames with no devices at all.
pub fn run_headless(config: &BytePusherConfig) -> Result<HeadlessSummary, BytePusherError> {
    let library = match &config.rom {
        Some(rom) => RomLibrary::from_paths(vec![rom.clone()]),
        None => RomLibrary::scan(&config.rom_dir)?,
    };
    let path = library
        .current()
        .ok_or_else(|| BytePusherError::NoRom(config.rom_dir.clone()))?;
    let mut vm = BytePusherInterpreter::new();
    vm.load_program(&mut fs::File::open(path)?)?;
    info!("loaded {}", path.display());

    let mut port = HeadlessPort::new(config.input);
    for _ in 0..config.frames {
        vm.run_frame(&mut port)?;
    }

    Ok(HeadlessSummary {
        rom: Some(file_name(path)),
        frames: port.frames(),
        instructions: port.frames() * INSTRUCTIONS_PER_FRAME as u64,
        program_counter: vm.program_counter(),
        video_digest: port.last_video().map_or(0, |v| port::digest(v.as_bytes())),
        audio_digest: port.last_audio().map_or(0, |a| port::digest(a.as_bytes())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DummyDisplay;
    use crate::input::DummyInput;
    use crate::sound::Mute;
    use std::fs;
    use std::path::PathBuf;

    fn no_roms() -> BytePusherConfig {
        BytePusherConfig {
            rom_dir: PathBuf::from("/definitely/not/a/rom/dir"),
            ..BytePusherConfig::default()
        }
    }

    #[test]
    fn test_blank_machine_draws_frames() -> Result<(), BytePusherError> {
        let mut input = DummyInput::new(0, &[]);
        let mut sound = Mute::new();
        let mut display = DummyDisplay::new();
        {
            let mut env = Environment::new(no_roms(), &mut input, &mut sound, &mut display)?;
            let now = Instant::now();
            env.tick(now)?;
            env.tick(now)?;
            assert_eq!(env.interpreter().frames_run(), 2);
            assert_eq!(env.rom_name(), None);
        }
        assert_eq!(display.frames_drawn, 2);
        Ok(())
    }

    #[test]
    fn test_pause_stops_running_but_redraws() -> Result<(), BytePusherError> {
        let mut input = DummyInput::new(0, &[HostCommand::TogglePause]);
        let mut sound = Mute::new();
        let mut display = DummyDisplay::new();
        {
            let mut env = Environment::new(no_roms(), &mut input, &mut sound, &mut display)?;
            env.tick(Instant::now())?;
            assert!(env.is_paused());
            assert_eq!(env.interpreter().frames_run(), 0);
            env.handle(HostCommand::TogglePause)?;
            env.tick(Instant::now())?;
            assert_eq!(env.interpreter().frames_run(), 1);
        }
        assert_eq!(display.frames_drawn, 2);
        Ok(())
    }

    #[test]
    fn test_frame_rate_controls() -> Result<(), BytePusherError> {
        let mut input = DummyInput::new(0, &[]);
        let mut sound = Mute::new();
        let mut display = DummyDisplay::new();
        let mut env = Environment::new(no_roms(), &mut input, &mut sound, &mut display)?;
        env.handle(HostCommand::FasterFrameRate)?;
        assert_eq!(env.frame_rate(), 60);
        assert_eq!(env.status(), None);
        env.handle(HostCommand::SlowerFrameRate)?;
        env.handle(HostCommand::SlowerFrameRate)?;
        assert_eq!(env.frame_rate(), 58);
        assert_eq!(env.status(), Some("frame rate 59 -> 58"));
        env.handle(HostCommand::ResetFrameRate)?;
        assert_eq!(env.frame_rate(), 60);
        for _ in 0..100 {
            env.handle(HostCommand::SlowerFrameRate)?;
        }
        assert_eq!(env.frame_rate(), 1);
        Ok(())
    }

    #[test]
    fn test_quit_skips_frame() -> Result<(), BytePusherError> {
        let mut input = DummyInput::new(0, &[HostCommand::Quit]);
        let mut sound = Mute::new();
        let mut display = DummyDisplay::new();
        let mut env = Environment::new(no_roms(), &mut input, &mut sound, &mut display)?;
        env.main_loop()?;
        assert!(env.should_quit());
        assert_eq!(env.interpreter().frames_run(), 0);
        Ok(())
    }

    #[test]
    fn test_overlay_lines() -> Result<(), BytePusherError> {
        let mut input = DummyInput::new(0, &[]);
        let mut sound = Mute::new();
        let mut display = DummyDisplay::new();
        {
            let mut env = Environment::new(no_roms(), &mut input, &mut sound, &mut display)?;
            let lines = env.overlay_lines();
            assert_eq!(lines[0], "rom: (none)");
            assert_eq!(lines.len(), 3);
            env.handle(HostCommand::TogglePause)?;
            assert_eq!(env.overlay_lines()[3], "paused");
            env.handle(HostCommand::TogglePause)?;
            env.handle(HostCommand::ToggleHelp)?;
            env.handle(HostCommand::ToggleInfo)?;
            assert_eq!(env.overlay_lines().len(), HELP.len());
            env.tick(Instant::now())?;
        }
        assert_eq!(display.overlay[0], HELP[0]);
        Ok(())
    }

    #[test]
    fn test_frame_counter() {
        let start = Instant::now();
        let mut c = FrameCounter::new(start);
        for i in 1..=30 {
            c.tick(start + Duration::from_millis(i * 30));
        }
        assert_eq!(c.rate(), 0);
        c.tick(start + Duration::from_millis(1000));
        assert_eq!(c.rate(), 31);
    }

    /// write a rom that parks pc at 8 and copies 0x42 into the video page
    fn write_test_rom(path: &Path) -> Result<(), BytePusherError> {
        let mut rom = vec![0u8; 0x200];
        rom[2..5].copy_from_slice(&[0x00, 0x00, 0x08]);
        rom[5] = 0x01; // video page 0x010000
        rom[8..17].copy_from_slice(&[0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x08]);
        rom[0x100] = 0x42;
        fs::write(path, rom)?;
        Ok(())
    }

    #[test]
    fn test_headless_run() -> Result<(), BytePusherError> {
        let dir = std::env::temp_dir().join(format!("bytepusher-headless-{}", std::process::id()));
        fs::create_dir_all(&dir)?;
        let rom = dir.join("pixel.BytePusher");
        write_test_rom(&rom)?;

        let config = BytePusherConfig {
            rom: Some(rom),
            frames: 3,
            ..BytePusherConfig::default()
        };
        let summary = run_headless(&config)?;
        assert_eq!(summary.rom.as_deref(), Some("pixel.BytePusher"));
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.instructions, 3 * 65536);
        assert_eq!(summary.program_counter, 8);

        let mut expected = vec![0u8; port::VIDEO_FRAME_BYTES];
        expected[0] = 0x42;
        assert_eq!(summary.video_digest, port::digest(&expected));

        // same rom, same input, same answer
        assert_eq!(run_headless(&config)?, summary);
        fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[test]
    fn test_environment_loads_named_rom() -> Result<(), BytePusherError> {
        let dir = std::env::temp_dir().join(format!("bytepusher-env-{}", std::process::id()));
        fs::create_dir_all(&dir)?;
        write_test_rom(&dir.join("a.bp"))?;
        write_test_rom(&dir.join("b.bp"))?;

        let config = BytePusherConfig {
            rom: Some(dir.join("b.bp")),
            ..BytePusherConfig::default()
        };
        let mut input = DummyInput::new(0, &[]);
        let mut sound = Mute::new();
        let mut display = DummyDisplay::new();
        {
            let mut env = Environment::new(config, &mut input, &mut sound, &mut display)?;
            assert_eq!(env.rom_name(), Some("b.bp"));
            assert_eq!(env.status(), Some("loaded b.bp (512 bytes)"));
            env.handle(HostCommand::PreviousRom)?;
            assert_eq!(env.rom_name(), Some("a.bp"));
            env.handle(HostCommand::PreviousRom)?;
            assert_eq!(env.rom_name(), Some("a.bp"));
        }
        fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[test]
    fn test_headless_without_rom_fails() {
        assert!(matches!(
            run_headless(&no_roms()),
            Err(BytePusherError::NoRom(_))
        ));
    }

    #[test]
    fn test_oversized_rom_is_skipped_and_reported() -> Result<(), BytePusherError> {
        let dir = std::env::temp_dir().join(format!("bytepusher-big-{}", std::process::id()));
        fs::create_dir_all(&dir)?;
        write_test_rom(&dir.join("a.bp"))?;
        fs::write(dir.join("b.bp"), vec![0u8; crate::memory::MEMORY_SIZE + 1])?;

        let config = BytePusherConfig {
            rom_dir: dir.clone(),
            ..BytePusherConfig::default()
        };
        let mut input = DummyInput::new(0, &[]);
        let mut sound = Mute::new();
        let mut display = DummyDisplay::new();
        {
            let mut env = Environment::new(config, &mut input, &mut sound, &mut display)?;
            assert_eq!(env.rom_name(), Some("a.bp"));
            env.handle(HostCommand::NextRom)?;
            // the old rom is still what's running, and the overlay says so
            assert_eq!(env.rom_name(), Some("a.bp"));
            assert_eq!(
                env.status(),
                Some("skipped b.bp (too large), still running a.bp")
            );
            assert!(env
                .overlay_lines()
                .iter()
                .any(|l| l == "skipped b.bp (too large), still running a.bp"));
            env.tick(Instant::now())?;
            assert_eq!(env.interpreter().program_counter(), 8);
            env.handle(HostCommand::PreviousRom)?;
            assert_eq!(env.status(), Some("loaded a.bp (512 bytes)"));
        }
        fs::remove_dir_all(&dir)?;
        Ok(())
    }
}
