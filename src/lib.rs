//! BytePusher virtual machine
//!
//! ## Design
//!
//! * the machine is BytePusher: 16MiB of memory, one instruction (copy a
//!   byte, jump), 65536 instructions per frame, 60 frames a second
//! * the interpreter does no timing; the host calls it once per frame
//! * memory is reached only through a trait, so it can be wrapped (e.g. to
//!   count copies in tests)
//! * every address is masked to 24 bits: running off the top of memory wraps
//!   to the bottom rather than faulting
//! * abstract display, input and sound so can plug alternatives; starting
//!   with a terminal via TUI and crossterm
//!
//! Model
//!
//! ```text
//! Environment
//!  |-- display, input, sound, config, rom library
//!  |-- io driver(display, input, sound) -- implements the frame port
//!  |-- interpreter(memory)
//!  |    |-- latch keys into memory
//!  |    |-- 65536 x copy-and-jump
//!  |    `-- copy audio and video pages out
//!  `-- main loop
//!       |-- handle host keys (pause, speed, next/previous rom)
//!       |-- interpreter.run_frame(io driver)
//!       `-- sleep out the rest of the frame
//! ```
pub mod config;
pub mod display;
pub mod environment;
pub mod error;
pub mod input;
pub mod interpreter;
pub mod log;
pub mod memory;
pub mod port;
pub mod rom;
pub mod sound;

pub use error::BytePusherError;
pub use interpreter::BytePusherInterpreter;
pub use memory::{BytePusherMemory, MemoryMap};
pub use port::{AudioFrame, FramePort, VideoFrame};
