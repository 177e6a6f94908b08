use crate::port::{AudioFrame, AUDIO_FRAME_BYTES, SAMPLE_RATE_HZ};
use beep::beep;
use std::error::Error;

pub trait Sound {
    fn play(&mut self, frame: &AudioFrame) -> Result<(), Box<dyn Error>>;
    fn stop(&mut self) -> Result<(), Box<dyn Error>>;
}

/// peaks this small are silence
const SILENCE_THRESHOLD: i16 = 4;

/// the speaker can't do much outside this
const MIN_PITCH: u16 = 20;
const MAX_PITCH: u16 = (SAMPLE_RATE_HZ / 2) as u16;

/// Guess the dominant pitch of a frame from its zero crossings: a full cycle
/// crosses twice, and a frame lasts 256 / 15360 seconds.
pub fn estimate_pitch(frame: &AudioFrame) -> Option<u16> {
    let peak = frame.samples().map(|s| (s as i16).abs()).max().unwrap_or(0);
    if peak < SILENCE_THRESHOLD {
        return None;
    }
    let mut crossings = 0u32;
    let mut last_sign = 0i8;
    for s in frame.samples() {
        let sign = s.signum();
        if sign != 0 {
            if last_sign != 0 && sign != last_sign {
                crossings += 1;
            }
            last_sign = sign;
        }
    }
    if crossings == 0 {
        return None;
    }
    let hz = crossings * SAMPLE_RATE_HZ / (2 * AUDIO_FRAME_BYTES as u32);
    Some((hz as u16).clamp(MIN_PITCH, MAX_PITCH))
}

/// plays the pitch of each frame as a square tone on the PC speaker
pub struct SimpleBeep {
    pitch: Option<u16>,
}

impl SimpleBeep {
    pub fn new() -> Self {
        SimpleBeep { pitch: None }
    }
}

impl Default for SimpleBeep {
    fn default() -> Self {
        Self::new()
    }
}

impl Sound for SimpleBeep {
    fn play(&mut self, frame: &AudioFrame) -> Result<(), Box<dyn Error>> {
        let pitch = estimate_pitch(frame);
        if pitch != self.pitch {
            beep(pitch.unwrap_or(0))?;
            self.pitch = pitch;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        beep(0)?;
        self.pitch = None;
        Ok(())
    }
}

pub struct Mute {}
impl Mute {
    pub fn new() -> Self {
        Mute {}
    }
}
impl Default for Mute {
    fn default() -> Self {
        Self::new()
    }
}
impl Sound for Mute {
    fn play(&mut self, _frame: &AudioFrame) -> Result<(), Box<dyn Error>> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_wave(half_period: usize, amplitude: i8) -> AudioFrame {
        let bytes = (0..AUDIO_FRAME_BYTES)
            .map(|i| {
                if (i / half_period) % 2 == 0 {
                    amplitude as u8
                } else {
                    (-amplitude) as u8
                }
            })
            .collect::<Vec<_>>();
        AudioFrame::try_from(bytes).unwrap()
    }

    #[test]
    fn test_silence_has_no_pitch() {
        assert_eq!(estimate_pitch(&AudioFrame::silent()), None);
        assert_eq!(estimate_pitch(&square_wave(16, 2)), None);
    }

    #[test]
    fn test_square_wave_pitch() {
        // 16 samples up, 16 down: 15 sign changes in 256 samples
        assert_eq!(estimate_pitch(&square_wave(16, 64)), Some(450));
    }

    #[test]
    fn test_dc_offset_has_no_pitch() {
        let frame = AudioFrame::try_from(vec![50u8; AUDIO_FRAME_BYTES]).unwrap();
        assert_eq!(estimate_pitch(&frame), None);
    }

    #[test]
    fn test_pitch_range_edges() {
        // alternating every sample: 255 crossings -> 7650Hz, under the cap
        assert_eq!(estimate_pitch(&square_wave(1, 100)), Some(7650));
        // a single crossing is 30Hz, above the floor
        assert_eq!(estimate_pitch(&square_wave(128, 100)), Some(30));
    }

    #[test]
    fn test_mute() -> Result<(), Box<dyn Error>> {
        let mut m = Mute::new();
        m.play(&square_wave(16, 64))?;
        m.stop()
    }
}
