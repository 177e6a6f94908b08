//! # frame port
//!
//! The narrow boundary between the machine and whatever presents it. Once per
//! frame the host asks the port for the key mask, the interpreter runs, and
//! then the port is handed one audio frame followed by one video frame.
//! Both frames are owned copies, so a presenter can hang on to them (or hand
//! them to another thread) while the next frame is computed.
use crate::error::BytePusherError;

/// signed 8-bit mono samples per frame
pub const AUDIO_FRAME_BYTES: usize = 256;

/// 256x256 pixels, 1 byte per pixel
pub const SCREEN_WIDTH: usize = 256;
pub const SCREEN_HEIGHT: usize = 256;
pub const VIDEO_FRAME_BYTES: usize = SCREEN_WIDTH * SCREEN_HEIGHT;

/// nominal frames per second
pub const FRAMES_PER_SECOND: u32 = 60;

/// 256 samples x 60 frames
pub const SAMPLE_RATE_HZ: u32 = AUDIO_FRAME_BYTES as u32 * FRAMES_PER_SECOND;

fn check_len(expected: usize, actual: usize) -> Result<(), BytePusherError> {
    if expected == actual {
        Ok(())
    } else {
        Err(BytePusherError::FrameSize { expected, actual })
    }
}

/// One frame of audio: 256 signed 8-bit PCM samples at 15360Hz
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame(Box<[u8]>);

impl AudioFrame {
    pub fn silent() -> Self {
        AudioFrame(vec![0; AUDIO_FRAME_BYTES].into_boxed_slice())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// wrap a page copied straight out of memory; the copy is always
    /// `AUDIO_FRAME_BYTES` long
    pub(crate) fn from_page(bytes: Vec<u8>) -> Self {
        debug_assert!(
            bytes.len() == AUDIO_FRAME_BYTES,
            "audio page copy is {} bytes",
            bytes.len()
        );
        AudioFrame(bytes.into_boxed_slice())
    }

    /// the raw bytes reinterpreted as signed samples
    pub fn samples(&self) -> impl Iterator<Item = i8> + '_ {
        self.0.iter().map(|&b| b as i8)
    }
}

impl TryFrom<Vec<u8>> for AudioFrame {
    type Error = BytePusherError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        check_len(AUDIO_FRAME_BYTES, bytes.len())?;
        Ok(AudioFrame(bytes.into_boxed_slice()))
    }
}

/// One frame of video: 256x256 row-major palette indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame(Box<[u8]>);

impl VideoFrame {
    pub fn blank() -> Self {
        VideoFrame(vec![0; VIDEO_FRAME_BYTES].into_boxed_slice())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub(crate) fn from_page(bytes: Vec<u8>) -> Self {
        debug_assert!(
            bytes.len() == VIDEO_FRAME_BYTES,
            "video page copy is {} bytes",
            bytes.len()
        );
        VideoFrame(bytes.into_boxed_slice())
    }

    pub fn pixel(&self, x: u8, y: u8) -> u8 {
        self.0[y as usize * SCREEN_WIDTH + x as usize]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.0.chunks_exact(SCREEN_WIDTH)
    }
}

impl TryFrom<Vec<u8>> for VideoFrame {
    type Error = BytePusherError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        check_len(VIDEO_FRAME_BYTES, bytes.len())?;
        Ok(VideoFrame(bytes.into_boxed_slice()))
    }
}

/// What the interpreter needs from the outside world, and nothing more.
pub trait FramePort {
    /// bitmask of up to 16 pressed keys; the bit layout is the driver's
    /// business
    fn poll_input(&mut self) -> Result<u16, BytePusherError>;

    /// one frame of audio, always delivered before the matching video frame
    fn present_audio(&mut self, frame: AudioFrame) -> Result<(), BytePusherError>;

    /// one frame of video
    fn present_video(&mut self, frame: VideoFrame) -> Result<(), BytePusherError>;
}

/// record of one call into a [`HeadlessPort`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortEvent {
    Poll,
    Audio,
    Video,
}

/// A port with no devices behind it: returns a fixed key mask and keeps the
/// most recent frames. Used for headless runs and for testing.
pub struct HeadlessPort {
    input: u16,
    events: Vec<PortEvent>,
    frames: u64,
    last_audio: Option<AudioFrame>,
    last_video: Option<VideoFrame>,
}

impl HeadlessPort {
    pub fn new(input: u16) -> Self {
        HeadlessPort {
            input,
            events: Vec::new(),
            frames: 0,
            last_audio: None,
            last_video: None,
        }
    }

    /// every call made so far, in order
    pub fn events(&self) -> &[PortEvent] {
        &self.events
    }

    /// how many video frames have been presented
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last_audio(&self) -> Option<&AudioFrame> {
        self.last_audio.as_ref()
    }

    pub fn last_video(&self) -> Option<&VideoFrame> {
        self.last_video.as_ref()
    }
}

impl FramePort for HeadlessPort {
    fn poll_input(&mut self) -> Result<u16, BytePusherError> {
        self.events.push(PortEvent::Poll);
        Ok(self.input)
    }

    fn present_audio(&mut self, frame: AudioFrame) -> Result<(), BytePusherError> {
        self.events.push(PortEvent::Audio);
        self.last_audio = Some(frame);
        Ok(())
    }

    fn present_video(&mut self, frame: VideoFrame) -> Result<(), BytePusherError> {
        self.events.push(PortEvent::Video);
        self.frames += 1;
        self.last_video = Some(frame);
        Ok(())
    }
}

/// 64-bit FNV-1a, for summarising frames in logs
pub fn digest(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, &b| {
        (hash ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3)
    })
}
