//! Repeating frame loop for the animated waveform overlay.
//!
//! A loop runs on its own worker until its [`LoopHandle`] is cancelled or
//! dropped. Callers that replace the loop must stop the previous handle first;
//! [`crate::session::Session`] does this for every new analysis.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::canvas::Canvas;
use super::frame::FrameRenderer;
use crate::audio::features::SampleBuffer;

/// Phase advance per frame, in pixels.
const PHASE_STEP: f64 = 2.0;

/// Receives rendered frames in order.
pub trait FrameSink: Send {
    fn write_frame(&mut self, index: u64, frame: &Canvas) -> Result<()>;

    /// Called once after the last frame, including after cancellation.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Phase counter for the sweep: 0, 2, 4, ...
#[derive(Clone, Debug, Default)]
pub struct FrameClock {
    frame: u64,
    phase: f64,
}

impl FrameClock {
    /// Returns the index and phase for the current frame, then advances.
    pub fn tick(&mut self) -> (u64, f64) {
        let current = (self.frame, self.phase);
        self.frame += 1;
        self.phase += PHASE_STEP;
        current
    }

    pub fn frames(&self) -> u64 {
        self.frame
    }
}

#[derive(Clone, Debug, Default)]
pub struct LoopOptions {
    /// Pace the loop at this rate; `None` renders as fast as the sink accepts
    pub fps: Option<u32>,
    /// Stop on its own after this many frames; `None` runs until cancelled
    pub max_frames: Option<u64>,
}

pub struct LoopHandle {
    cancelled: Arc<AtomicBool>,
    rendered: Arc<AtomicU64>,
    worker: Option<JoinHandle<Result<u64>>>,
}

impl LoopHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, |w| w.is_finished())
    }

    pub fn frames_rendered(&self) -> u64 {
        self.rendered.load(Ordering::Acquire)
    }

    /// Block until the loop ends on its own (frame limit or sink error).
    pub fn wait(mut self) -> Result<u64> {
        self.join()
    }

    /// Cancel and wait for the worker to exit.
    pub fn stop(mut self) -> Result<u64> {
        self.cancel();
        self.join()
    }

    fn join(&mut self) -> Result<u64> {
        match self.worker.take() {
            Some(worker) => worker
                .join()
                .map_err(|_| anyhow::anyhow!("Animation worker panicked"))?,
            None => Ok(self.frames_rendered()),
        }
    }
}

impl Drop for LoopHandle {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.cancel();
            if let Err(e) = self.join() {
                log::warn!("Animation loop ended with error: {}", e);
            }
        }
    }
}

/// Start rendering animated frames of `buffer` into `sink`.
pub fn spawn(
    renderer: FrameRenderer,
    buffer: Arc<SampleBuffer>,
    mut sink: Box<dyn FrameSink>,
    options: LoopOptions,
) -> LoopHandle {
    let cancelled = Arc::new(AtomicBool::new(false));
    let rendered = Arc::new(AtomicU64::new(0));

    let worker = {
        let cancelled = Arc::clone(&cancelled);
        let rendered = Arc::clone(&rendered);
        std::thread::spawn(move || -> Result<u64> {
            let interval = options
                .fps
                .filter(|&fps| fps > 0)
                .map(|fps| Duration::from_secs_f64(1.0 / fps as f64));
            let mut clock = FrameClock::default();
            let mut deadline = Instant::now();

            log::debug!(
                "Animation loop started ({}x{}, fps={:?}, limit={:?})",
                renderer.width,
                renderer.height,
                options.fps,
                options.max_frames
            );

            let outcome = (|| -> Result<()> {
                while !cancelled.load(Ordering::Acquire) {
                    if options.max_frames.is_some_and(|max| clock.frames() >= max) {
                        break;
                    }

                    let (index, phase) = clock.tick();
                    let frame = renderer.render_animated(buffer.samples(), phase);
                    sink.write_frame(index, &frame)?;
                    rendered.fetch_add(1, Ordering::AcqRel);

                    if let Some(interval) = interval {
                        deadline += interval;
                        let now = Instant::now();
                        if deadline > now {
                            std::thread::sleep(deadline - now);
                        } else {
                            deadline = now;
                        }
                    }
                }
                Ok(())
            })();

            let finished = sink.finish();
            outcome?;
            finished?;

            log::debug!("Animation loop stopped after {} frames", clock.frames());
            Ok(clock.frames())
        })
    };

    LoopHandle {
        cancelled,
        rendered,
        worker: Some(worker),
    }
}
