//! # interpreter
//!
//! The machine has one instruction and no registers. Everything it knows
//! lives in memory, including where to start each frame:
//!  0x000000-0x000001  key mask, latched by us before every frame
//!  0x000002-0x000004  program counter the frame starts from
//!  0x000005           video page: frame is read from (value << 16)
//!  0x000006-0x000007  audio page: frame is read from (value << 8)
//!
//! An instruction is the 9 bytes at the program counter: 3 bytes of source
//! address, 3 of destination, 3 of next program counter. Copy one byte,
//! jump, repeat. Branching is done by programs writing their own jump
//! targets.
//!
//! A frame is exactly 65536 instructions. There's no halt and no early exit,
//! so every frame costs the same. Output is only read once the whole frame
//! has run, so a presenter never sees a half-finished picture.
use crate::error::BytePusherError;
use crate::memory::{wrap_address, BytePusherMemory, MemoryMap};
use crate::port::{AudioFrame, FramePort, VideoFrame, AUDIO_FRAME_BYTES, VIDEO_FRAME_BYTES};
use std::io;

/// instructions executed per frame
pub const INSTRUCTIONS_PER_FRAME: usize = 0x10000;

/// memory-mapped locations
pub const INPUT_ADDR: u32 = 0x000000;
pub const PROGRAM_COUNTER_ADDR: u32 = 0x000002;
pub const VIDEO_PAGE_ADDR: u32 = 0x000005;
pub const AUDIO_PAGE_ADDR: u32 = 0x000006;

/// width of every address field
const ADDRESS_BYTES: usize = 3;

pub struct BytePusherInterpreter<M: MemoryMap = BytePusherMemory> {
    memory: M,
    frames_run: u64,
}

impl BytePusherInterpreter<BytePusherMemory> {
    /// a machine with zeroed memory, ready to run (doing nothing)
    pub fn new() -> Self {
        Self::with_memory(BytePusherMemory::new())
    }
}

impl Default for BytePusherInterpreter<BytePusherMemory> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: MemoryMap> BytePusherInterpreter<M> {
    pub fn with_memory(memory: M) -> Self {
        BytePusherInterpreter {
            memory,
            frames_run: 0,
        }
    }

    /// reset memory and load a rom at address 0
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<(), BytePusherError> {
        self.memory.load(rom)
    }

    /// load a rom of unknown length
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<(), BytePusherError> {
        self.memory.load_program(reader)
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    /// frames completed since construction
    pub fn frames_run(&self) -> u64 {
        self.frames_run
    }

    /// where the next frame will start executing
    pub fn program_counter(&self) -> u32 {
        self.memory.read_be(PROGRAM_COUNTER_ADDR, ADDRESS_BYTES)
    }

    /// execute one instruction at `pc`, returning the next pc
    #[inline]
    fn step(&mut self, pc: u32) -> u32 {
        let src = self.memory.read_be(pc, ADDRESS_BYTES);
        let dst = self.memory.read_be(wrap_address(pc + 3), ADDRESS_BYTES);
        self.memory.copy_byte(src, dst);
        self.memory.read_be(wrap_address(pc + 6), ADDRESS_BYTES)
    }

    /// Run one frame against `input` and pull out its audio and video.
    /// Can't fail: every byte pattern is a legal instruction and every
    /// address wraps.
    pub fn execute_frame(&mut self, input: u16) -> (AudioFrame, VideoFrame) {
        self.memory.write_be(INPUT_ADDR, 2, input as u32);

        let mut pc = self.program_counter();
        for _ in 0..INSTRUCTIONS_PER_FRAME {
            pc = self.step(pc);
        }
        self.frames_run += 1;

        (self.audio_frame(), self.video_frame())
    }

    /// Run one frame and hand its output to `port`, audio first.
    pub fn run(&mut self, input: u16, port: &mut dyn FramePort) -> Result<(), BytePusherError> {
        let (audio, video) = self.execute_frame(input);
        port.present_audio(audio)?;
        port.present_video(video)
    }

    /// poll `port` for keys, then [`run`](Self::run)
    pub fn run_frame(&mut self, port: &mut dyn FramePort) -> Result<(), BytePusherError> {
        let input = port.poll_input()?;
        self.run(input, port)
    }

    fn audio_frame(&self) -> AudioFrame {
        let base = self.memory.read_be(AUDIO_PAGE_ADDR, 2) << 8;
        AudioFrame::from_page(self.memory.copy_range(base, AUDIO_FRAME_BYTES))
    }

    fn video_frame(&self) -> VideoFrame {
        let base = self.memory.read_be(VIDEO_PAGE_ADDR, 1) << 16;
        VideoFrame::from_page(self.memory.copy_range(base, VIDEO_FRAME_BYTES))
    }
}
