//! Audible cue for new activity.
//!
//! [`Alerter::play_alert`] is the collapse point for audio failures: a
//! missing output device, a blocked context or a failed resume all end in
//! silence and a `debug!` line, never an error.

#[cfg(feature = "audio")]
pub mod output;

use std::io::Write;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Gain for audible steps. Rests are scheduled at zero gain.
pub const TONE_GAIN: f32 = 0.15;
/// Frequency the oscillator holds during a rest.
pub const REST_FREQUENCY_HZ: f32 = 440.0;
/// Duration used for a step given as 0 ms.
pub const DEFAULT_STEP_MS: u32 = 120;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("audio output unavailable: {0}")]
    Unavailable(String),
    #[error("resume failed: {0}")]
    Resume(String),
    #[error("playback failed: {0}")]
    Playback(String),
}

/// One step of a chime; a frequency of 0 is a rest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f32, u32)", into = "(f32, u32)")]
pub struct Tone {
    pub frequency_hz: f32,
    pub duration_ms: u32,
}

impl Tone {
    pub const fn new(frequency_hz: f32, duration_ms: u32) -> Self {
        Self {
            frequency_hz,
            duration_ms,
        }
    }
}

impl From<(f32, u32)> for Tone {
    fn from((frequency_hz, duration_ms): (f32, u32)) -> Self {
        Self::new(frequency_hz, duration_ms)
    }
}

impl From<Tone> for (f32, u32) {
    fn from(t: Tone) -> Self {
        (t.frequency_hz, t.duration_ms)
    }
}

pub const DEFAULT_CHIME: [Tone; 3] = [
    Tone::new(880.0, 120),
    Tone::new(0.0, 60),
    Tone::new(660.0, 160),
];

/// Oscillator setting applied from `at` (context seconds) onwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledStep {
    pub at: f64,
    pub frequency_hz: f32,
    pub gain: f32,
}

/// A single sine oscillator's timeline: started at `start`, retuned at each
/// step, stopped at `stop_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToneProgram {
    pub start: f64,
    pub steps: Vec<ScheduledStep>,
    pub stop_at: f64,
}

impl ToneProgram {
    pub fn schedule(start: f64, pattern: &[Tone]) -> Self {
        let mut t = start;
        let mut steps = Vec::with_capacity(pattern.len());
        for tone in pattern {
            let audible = tone.frequency_hz > 0.0;
            steps.push(ScheduledStep {
                at: t,
                frequency_hz: if audible {
                    tone.frequency_hz
                } else {
                    REST_FREQUENCY_HZ
                },
                gain: if audible { TONE_GAIN } else { 0.0 },
            });
            let ms = if tone.duration_ms == 0 {
                DEFAULT_STEP_MS
            } else {
                tone.duration_ms
            };
            t += f64::from(ms) / 1000.0;
        }
        Self {
            start,
            steps,
            stop_at: t,
        }
    }

    /// Frequency and gain in effect at `t`; silent outside `[start, stop_at)`.
    pub fn at(&self, t: f64) -> (f32, f32) {
        if t < self.start || t >= self.stop_at {
            return (0.0, 0.0);
        }
        self.steps
            .iter()
            .rev()
            .find(|s| s.at <= t)
            .map_or((0.0, 0.0), |s| (s.frequency_hz, s.gain))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Running,
    Suspended,
}

/// An acquired audio output, created at most once per agent.
#[async_trait]
pub trait AudioContext: Send {
    fn state(&self) -> ContextState;
    async fn resume(&mut self) -> Result<(), AudioError>;
    /// Context clock in seconds.
    fn current_time(&self) -> f64;
    fn play(&mut self, program: ToneProgram) -> Result<(), AudioError>;
}

/// Source of audio contexts; creation may be refused.
pub trait AudioBackend: Send + Sync {
    fn create_context(&self) -> Result<Box<dyn AudioContext>, AudioError>;
}

/// Backend for hosts without sound.
#[derive(Debug, Default)]
pub struct NullAudio;

impl AudioBackend for NullAudio {
    fn create_context(&self) -> Result<Box<dyn AudioContext>, AudioError> {
        Err(AudioError::Unavailable("sound disabled".into()))
    }
}

/// Rings the terminal bell once per chime.
#[derive(Debug, Default)]
pub struct BellAudio;

struct BellContext {
    started: std::time::Instant,
}

#[async_trait]
impl AudioContext for BellContext {
    fn state(&self) -> ContextState {
        ContextState::Running
    }

    async fn resume(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn play(&mut self, program: ToneProgram) -> Result<(), AudioError> {
        if program.steps.iter().all(|s| s.gain == 0.0) {
            return Ok(());
        }
        let mut out = std::io::stdout();
        out.write_all(b"\x07")
            .and_then(|_| out.flush())
            .map_err(|e| AudioError::Playback(e.to_string()))
    }
}

impl AudioBackend for BellAudio {
    fn create_context(&self) -> Result<Box<dyn AudioContext>, AudioError> {
        Ok(Box::new(BellContext {
            started: std::time::Instant::now(),
        }))
    }
}

pub struct Alerter {
    backend: Box<dyn AudioBackend>,
    context: Option<Box<dyn AudioContext>>,
}

impl Alerter {
    pub fn new(backend: Box<dyn AudioBackend>) -> Self {
        Self {
            backend,
            context: None,
        }
    }

    /// Play `pattern`. Never fails; see the module docs.
    pub async fn play_alert(&mut self, pattern: &[Tone]) {
        if let Err(e) = self.try_play(pattern).await {
            debug!(error=%e, "alert chime skipped");
        }
    }

    async fn try_play(&mut self, pattern: &[Tone]) -> Result<(), AudioError> {
        let ctx = self.ensure_context().await?;
        let program = ToneProgram::schedule(ctx.current_time(), pattern);
        ctx.play(program)
    }

    async fn ensure_context(&mut self) -> Result<&mut Box<dyn AudioContext>, AudioError> {
        let ctx = match self.context.take() {
            Some(ctx) => ctx,
            None => self.backend.create_context()?,
        };
        let ctx = self.context.insert(ctx);
        if ctx.state() == ContextState::Suspended {
            if let Err(e) = ctx.resume().await {
                debug!(error=%e, "audio context resume failed");
            }
        }
        Ok(ctx)
    }
}

/// Backend selected by the `sound` setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundMode {
    #[default]
    Auto,
    Cpal,
    Bell,
    Off,
}

pub fn backend_for(mode: SoundMode) -> Box<dyn AudioBackend> {
    match mode {
        SoundMode::Off => Box::new(NullAudio),
        SoundMode::Bell => Box::new(BellAudio),
        #[cfg(feature = "audio")]
        SoundMode::Auto | SoundMode::Cpal => Box::new(output::CpalAudio),
        #[cfg(not(feature = "audio"))]
        SoundMode::Auto => Box::new(BellAudio),
        #[cfg(not(feature = "audio"))]
        SoundMode::Cpal => {
            tracing::warn!("built without the `audio` feature; chime disabled");
            Box::new(NullAudio)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chime_schedule() {
        let p = ToneProgram::schedule(1.0, &DEFAULT_CHIME);
        assert_eq!(p.steps.len(), 3);
        assert_eq!(p.steps[0].frequency_hz, 880.0);
        assert_eq!(p.steps[0].gain, TONE_GAIN);
        assert_eq!(p.steps[1].frequency_hz, REST_FREQUENCY_HZ);
        assert_eq!(p.steps[1].gain, 0.0);
        assert!((p.steps[1].at - 1.12).abs() < 1e-9);
        assert!((p.steps[2].at - 1.18).abs() < 1e-9);
        assert!((p.stop_at - 1.34).abs() < 1e-9);
    }

    #[test]
    fn zero_duration_uses_default_step() {
        let p = ToneProgram::schedule(0.0, &[Tone::new(500.0, 0)]);
        assert!((p.stop_at - 0.12).abs() < 1e-9);
        assert_eq!(p.at(0.05), (500.0, TONE_GAIN));
        assert_eq!(p.at(0.2), (0.0, 0.0));
    }

    #[tokio::test]
    async fn missing_audio_is_silent() {
        let mut alerter = Alerter::new(Box::new(NullAudio));
        alerter.play_alert(&DEFAULT_CHIME).await;
        alerter.play_alert(&DEFAULT_CHIME).await;
        assert!(alerter.context.is_none());
    }
}
