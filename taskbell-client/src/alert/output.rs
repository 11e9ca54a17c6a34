//! Sine chime on the default output device via `cpal`.
//!
//! The stream lives on its own thread (streams are not `Send` on every
//! host); the context talks to it through a command channel and a shared
//! program slot that the audio callback reads. The context clock counts
//! rendered frames, so scheduled times line up with what has been played.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, mpsc};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::oneshot;
use tracing::debug;

use super::{AudioBackend, AudioContext, AudioError, ContextState, ToneProgram};

#[derive(Debug, Default)]
pub struct CpalAudio;

impl AudioBackend for CpalAudio {
    fn create_context(&self) -> Result<Box<dyn AudioContext>, AudioError> {
        Ok(Box::new(CpalContext::open()?))
    }
}

struct Shared {
    frames: AtomicU64,
    program: Mutex<Option<ToneProgram>>,
}

enum Command {
    Resume(oneshot::Sender<Result<(), String>>),
}

struct CpalContext {
    shared: Arc<Shared>,
    sample_rate: f64,
    state: ContextState,
    commands: mpsc::Sender<Command>,
}

impl CpalContext {
    fn open() -> Result<Self, AudioError> {
        let shared = Arc::new(Shared {
            frames: AtomicU64::new(0),
            program: Mutex::new(None),
        });
        let (ready_tx, ready_rx) = mpsc::channel();
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let thread_shared = shared.clone();
        std::thread::Builder::new()
            .name("taskbell-audio".into())
            .spawn(move || {
                let (stream, sample_rate) = match build_stream(thread_shared) {
                    Ok(v) => v,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // Hosts that refuse to start output before user activity
                // leave the stream paused; report it as suspended.
                let state = match stream.play() {
                    Ok(()) => ContextState::Running,
                    Err(e) => {
                        debug!(error=%e, "audio stream did not start; suspended");
                        ContextState::Suspended
                    }
                };
                if ready_tx.send(Ok((state, sample_rate))).is_err() {
                    return;
                }
                while let Ok(cmd) = cmd_rx.recv() {
                    match cmd {
                        Command::Resume(reply) => {
                            let _ = reply.send(stream.play().map_err(|e| e.to_string()));
                        }
                    }
                }
            })
            .map_err(|e| AudioError::Unavailable(format!("spawn audio thread: {e}")))?;

        let (state, sample_rate) = ready_rx
            .recv()
            .map_err(|_| AudioError::Unavailable("audio thread exited".into()))??;
        Ok(Self {
            shared,
            sample_rate,
            state,
            commands: cmd_tx,
        })
    }
}

fn build_stream(shared: Arc<Shared>) -> Result<(cpal::Stream, f64), AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AudioError::Unavailable("no default output device".into()))?;
    let supported = device
        .default_output_config()
        .map_err(|e| AudioError::Unavailable(e.to_string()))?;
    if supported.sample_format() != cpal::SampleFormat::F32 {
        return Err(AudioError::Unavailable(format!(
            "unsupported sample format {:?}",
            supported.sample_format()
        )));
    }
    let sample_rate = f64::from(supported.sample_rate());
    let config: cpal::StreamConfig = supported.into();
    let channels = usize::from(config.channels).max(1);

    let mut phase = 0f64;
    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                // Never block the audio thread; a contended slot renders silence.
                let guard = shared.program.try_lock().ok();
                let program = guard.as_ref().and_then(|g| (**g).as_ref());
                let mut frame = shared.frames.load(Ordering::Relaxed);
                for out in data.chunks_mut(channels) {
                    let t = frame as f64 / sample_rate;
                    let (freq, gain) = program.map_or((0.0, 0.0), |p| p.at(t));
                    phase = (phase + std::f64::consts::TAU * f64::from(freq) / sample_rate)
                        % std::f64::consts::TAU;
                    let sample = if gain > 0.0 {
                        gain * phase.sin() as f32
                    } else {
                        0.0
                    };
                    out.fill(sample);
                    frame += 1;
                }
                shared.frames.store(frame, Ordering::Relaxed);
            },
            |e| debug!(error=%e, "audio stream error"),
            None,
        )
        .map_err(|e| AudioError::Unavailable(e.to_string()))?;
    Ok((stream, sample_rate))
}

#[async_trait]
impl AudioContext for CpalContext {
    fn state(&self) -> ContextState {
        self.state
    }

    async fn resume(&mut self) -> Result<(), AudioError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Resume(tx))
            .map_err(|_| AudioError::Resume("audio thread gone".into()))?;
        rx.await
            .map_err(|_| AudioError::Resume("audio thread gone".into()))?
            .map_err(AudioError::Resume)?;
        self.state = ContextState::Running;
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.shared.frames.load(Ordering::Relaxed) as f64 / self.sample_rate
    }

    fn play(&mut self, program: ToneProgram) -> Result<(), AudioError> {
        let mut slot = self
            .shared
            .program
            .lock()
            .map_err(|_| AudioError::Playback("program slot poisoned".into()))?;
        *slot = Some(program);
        Ok(())
    }
}
