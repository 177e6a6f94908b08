use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal;
use std::io;
use std::time::Duration;

/// Terminals report presses but never releases, so a key counts as held for
/// this many polls after it was last seen. Autorepeat keeps it topped up.
pub const KEY_HOLD_POLLS: u8 = 8;

/// things the host does that the machine never sees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    NextRom,
    PreviousRom,
    TogglePause,
    FasterFrameRate,
    SlowerFrameRate,
    ResetFrameRate,
    ToggleHelp,
    ToggleInfo,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// one of the machine's 16 keys, as a bit number
    Machine(u8),
    Host(HostCommand),
    Unmapped,
}

/// map a terminal key to what it does. '0'-'9' are bits 0-9 and 'a'-'f' are
/// bits 10-15 of the machine's key mask
pub fn map_key(code: KeyCode) -> KeyAction {
    match code {
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            d @ '0'..='9' => KeyAction::Machine(d as u8 - b'0'),
            h @ 'a'..='f' => KeyAction::Machine(h as u8 - b'a' + 10),
            'p' => KeyAction::Host(HostCommand::TogglePause),
            'r' => KeyAction::Host(HostCommand::ResetFrameRate),
            'h' => KeyAction::Host(HostCommand::ToggleHelp),
            'i' => KeyAction::Host(HostCommand::ToggleInfo),
            'q' => KeyAction::Host(HostCommand::Quit),
            _ => KeyAction::Unmapped,
        },
        KeyCode::Right => KeyAction::Host(HostCommand::NextRom),
        KeyCode::Left => KeyAction::Host(HostCommand::PreviousRom),
        KeyCode::PageUp => KeyAction::Host(HostCommand::FasterFrameRate),
        KeyCode::PageDown => KeyAction::Host(HostCommand::SlowerFrameRate),
        KeyCode::Esc => KeyAction::Host(HostCommand::Quit),
        _ => KeyAction::Unmapped,
    }
}

/// remembers recently pressed machine keys
#[derive(Debug, Default)]
pub struct KeyLatch {
    held: [u8; 16],
}

impl KeyLatch {
    pub fn press(&mut self, bit: u8) {
        self.held[bit as usize & 0x0f] = KEY_HOLD_POLLS;
    }

    /// the mask of held keys, then age every key by one poll
    pub fn poll(&mut self) -> u16 {
        let mut mask = 0u16;
        for (bit, remaining) in self.held.iter_mut().enumerate() {
            if *remaining > 0 {
                mask |= 1 << bit;
                *remaining -= 1;
            }
        }
        mask
    }
}

/// reads keypresses
pub trait Input {
    /// bitmask of machine keys currently held
    fn poll_keys(&mut self) -> Result<u16, io::Error>;

    /// host commands pressed since the last call
    fn take_commands(&mut self) -> Result<Vec<HostCommand>, io::Error>;
}

/// simple implementation of Input, using the terminal in raw mode
pub struct KeyboardInput {
    latch: KeyLatch,
    commands: Vec<HostCommand>,
}

impl KeyboardInput {
    pub fn new() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(KeyboardInput {
            latch: KeyLatch::default(),
            commands: Vec::new(),
        })
    }

    fn handle_key(&mut self, key: KeyEvent) {
        // raw mode swallows ^C, so treat it as quit
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.commands.push(HostCommand::Quit);
            return;
        }
        match map_key(key.code) {
            KeyAction::Machine(bit) => self.latch.press(bit),
            KeyAction::Host(cmd) => self.commands.push(cmd),
            // stray keys are common; stay quiet about them
            KeyAction::Unmapped => {}
        }
    }

    fn read_events(&mut self) -> Result<(), io::Error> {
        while poll(Duration::from_millis(0))? {
            if let Event::Key(key) = read()? {
                self.handle_key(key);
            }
        }
        Ok(())
    }
}

impl Drop for KeyboardInput {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

impl Input for KeyboardInput {
    fn poll_keys(&mut self) -> Result<u16, io::Error> {
        self.read_events()?;
        Ok(self.latch.poll())
    }

    fn take_commands(&mut self) -> Result<Vec<HostCommand>, io::Error> {
        self.read_events()?;
        Ok(std::mem::take(&mut self.commands))
    }
}

/// dummy Input implementation for testing
pub struct DummyInput {
    mask: u16,
    commands: Vec<HostCommand>,
}

impl DummyInput {
    pub fn new(mask: u16, commands: &[HostCommand]) -> Self {
        DummyInput {
            mask,
            commands: Vec::from(commands),
        }
    }
}

impl Input for DummyInput {
    fn poll_keys(&mut self) -> Result<u16, io::Error> {
        Ok(self.mask)
    }

    fn take_commands(&mut self) -> Result<Vec<HostCommand>, io::Error> {
        Ok(std::mem::take(&mut self.commands))
    }
}
