use std::error::Error;
use std::io;
use std::path::PathBuf;

use bytepusher::config::{self, BytePusherConfig};
use bytepusher::display::TermDisplay;
use bytepusher::environment::{self, Environment};
use bytepusher::input::KeyboardInput;
use bytepusher::log::{self, Level};
use bytepusher::sound::{Mute, SimpleBeep, Sound};
use bytepusher::{error, info};
use clap::Parser;
use crossterm::tty::IsTty;

/// BytePusher virtual machine in a terminal
#[derive(Parser, Debug)]
#[command(name = "bytepusher", version)]
struct Cli {
    /// rom to run; defaults to the first rom in --rom-dir
    rom: Option<PathBuf>,

    /// directory to browse for *.BytePusher / *.bp roms
    #[arg(long, default_value = config::DEFAULT_ROM_DIR)]
    rom_dir: PathBuf,

    /// target frames per second (1-60)
    #[arg(long, default_value_t = config::DEFAULT_FRAME_RATE)]
    fps: u32,

    /// run without a terminal and print a summary
    #[arg(long)]
    headless: bool,

    /// frames to run when headless
    #[arg(long, default_value_t = config::DEFAULT_HEADLESS_FRAMES)]
    frames: u32,

    /// key mask held down for every headless frame (decimal or 0x hex)
    #[arg(long, default_value = "0", value_parser = config::parse_key_mask)]
    input: u16,

    /// no sound
    #[arg(long)]
    mute: bool,

    /// start with the help overlay showing
    #[arg(long)]
    help_overlay: bool,

    /// start without the info overlay
    #[arg(long)]
    no_info: bool,

    #[arg(long, value_enum, default_value_t = Level::Info)]
    log_level: Level,
}

impl From<Cli> for BytePusherConfig {
    fn from(cli: Cli) -> Self {
        BytePusherConfig {
            rom: cli.rom,
            rom_dir: cli.rom_dir,
            frame_rate: cli.fps,
            headless: cli.headless,
            frames: cli.frames,
            input: cli.input,
            mute: cli.mute,
            show_help: cli.help_overlay,
            show_info: !cli.no_info,
            log_level: cli.log_level,
        }
        .with_frame_rate(cli.fps)
    }
}

fn run_terminal(config: BytePusherConfig) -> Result<(), Box<dyn Error>> {
    let mut beeper = SimpleBeep::new();
    let mut mute = Mute::new();
    let sound: &mut dyn Sound = if config.mute { &mut mute } else { &mut beeper };

    // input first so raw mode is on before the screen is taken over
    let mut input = KeyboardInput::new()?;
    let mut display = TermDisplay::new()?;

    // log lines on the terminal being drawn would land inside the picture
    log::set_muted(io::stderr().is_tty());
    let result = Environment::new(config, &mut input, sound, &mut display)
        .and_then(|mut env| env.main_loop());
    log::set_muted(false);
    Ok(result?)
}

fn main() -> Result<(), Box<dyn Error>> {
    let config = BytePusherConfig::from(Cli::parse());
    log::set_min_level(config.log_level);

    if config.headless {
        let summary = environment::run_headless(&config)?;
        info!("{}", summary);
        println!("{}", summary);
        return Ok(());
    }

    if let Err(e) = run_terminal(config) {
        error!("{}", e);
        return Err(e);
    }
    Ok(())
}
