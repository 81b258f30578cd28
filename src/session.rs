//! Per-view state: the loaded buffer, its report and the running animation.

use anyhow::Result;
use std::sync::Arc;

use crate::audio::analysis;
use crate::audio::decode;
use crate::audio::features::SampleBuffer;
use crate::error::AnalysisError;
use crate::present::report::Report;
use crate::render::animation::{self, FrameSink, LoopHandle, LoopOptions};
use crate::render::canvas::Canvas;
use crate::render::frame::FrameRenderer;

pub struct Session {
    renderer: FrameRenderer,
    buffer: Option<Arc<SampleBuffer>>,
    report: Option<Report>,
    animation: Option<LoopHandle>,
}

impl Session {
    pub fn new(renderer: FrameRenderer) -> Self {
        Self {
            renderer,
            buffer: None,
            report: None,
            animation: None,
        }
    }

    /// Decode and analyze a new file, replacing whatever was loaded before.
    ///
    /// The running animation is stopped first. On failure the session is left
    /// empty so no stale results remain visible.
    pub fn analyze(&mut self, file_name: Option<&str>, bytes: &[u8]) -> Result<&Report, AnalysisError> {
        self.reset();
        let buffer = decode::decode_bytes(bytes)?;
        Ok(self.load(file_name, buffer))
    }

    /// Install an already decoded buffer.
    pub fn load(&mut self, file_name: Option<&str>, buffer: SampleBuffer) -> &Report {
        self.reset();
        let metrics = analysis::analyze(&buffer);
        self.buffer = Some(Arc::new(buffer));
        self.report.insert(Report::new(metrics, file_name.map(str::to_string)))
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    pub fn render_static(&self) -> Option<Canvas> {
        self.buffer
            .as_ref()
            .map(|b| self.renderer.render_static(b.samples()))
    }

    /// Start the animated overlay for the loaded buffer, replacing any running loop.
    pub fn start_animation(&mut self, sink: Box<dyn FrameSink>, options: LoopOptions) -> Result<(), AnalysisError> {
        self.cancel_animation();
        let buffer = self.buffer.clone().ok_or(AnalysisError::EmptyBuffer)?;
        self.animation = Some(animation::spawn(self.renderer.clone(), buffer, sink, options));
        Ok(())
    }

    pub fn is_animating(&self) -> bool {
        self.animation
            .as_ref()
            .is_some_and(|h| !h.is_cancelled() && !h.is_finished())
    }

    pub fn frames_rendered(&self) -> u64 {
        self.animation.as_ref().map_or(0, |h| h.frames_rendered())
    }

    /// Cancel the running loop, returning how many frames it produced.
    pub fn stop_animation(&mut self) -> Option<Result<u64>> {
        self.animation.take().map(LoopHandle::stop)
    }

    /// Wait for a bounded loop to finish on its own.
    pub fn wait_animation(&mut self) -> Option<Result<u64>> {
        self.animation.take().map(LoopHandle::wait)
    }

    fn cancel_animation(&mut self) {
        if let Some(Err(e)) = self.stop_animation() {
            log::warn!("Previous animation ended with error: {}", e);
        }
    }

    fn reset(&mut self) {
        self.cancel_animation();
        self.buffer = None;
        self.report = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decode::tests::wav_bytes;
    use crate::render::animation::tests::RecordingSink;
    use crate::render::frame::WaveformStyle;
    use std::time::Duration;

    fn session() -> Session {
        Session::new(FrameRenderer::new(32, 16, WaveformStyle::default()))
    }

    fn square_wav() -> Vec<u8> {
        let frames: Vec<Vec<i16>> = (0..4096)
            .map(|i| vec![if i % 2 == 0 { i16::MAX } else { -i16::MAX }])
            .collect();
        wav_bytes(&frames, 44100)
    }

    #[test]
    fn analyze_produces_report() {
        let mut s = session();
        let report = s.analyze(Some("square.wav"), &square_wav()).unwrap();
        assert_eq!(report.file_name.as_deref(), Some("square.wav"));
        assert!(report.metrics.clarity > 99.0);
        assert_eq!(report.metrics.bitrate, 1411);
        assert!(s.render_static().is_some());
    }

    #[test]
    fn failed_analysis_clears_previous_results() {
        let mut s = session();
        s.analyze(Some("square.wav"), &square_wav()).unwrap();

        let err = s.analyze(Some("broken.wav"), b"RIFF garbage").unwrap_err();
        assert!(matches!(err, AnalysisError::Decode(_)));
        assert!(s.report().is_none());
        assert!(s.render_static().is_none());
    }

    #[test]
    fn animation_requires_a_loaded_buffer() {
        let mut s = session();
        let (sink, _log) = RecordingSink::new();
        let err = s.start_animation(Box::new(sink), LoopOptions::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyBuffer));
        assert!(!s.is_animating());
    }

    #[test]
    fn new_analysis_cancels_running_loop() {
        let mut s = session();
        s.analyze(None, &square_wav()).unwrap();

        let (sink, log) = RecordingSink::new();
        s.start_animation(Box::new(sink), LoopOptions { fps: Some(200), max_frames: None })
            .unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert!(s.is_animating());

        s.analyze(None, &square_wav()).unwrap();
        assert!(!s.is_animating());

        let count = log.lock().unwrap().indices.len();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(log.lock().unwrap().indices.len(), count);
        assert_eq!(log.lock().unwrap().finished, 1);
    }

    #[test]
    fn restarting_animation_replaces_previous_loop() {
        let mut s = session();
        s.analyze(None, &square_wav()).unwrap();

        let (first, first_log) = RecordingSink::new();
        s.start_animation(Box::new(first), LoopOptions { fps: Some(200), max_frames: None })
            .unwrap();
        let (second, second_log) = RecordingSink::new();
        s.start_animation(Box::new(second), LoopOptions { fps: None, max_frames: Some(3) })
            .unwrap();

        assert_eq!(first_log.lock().unwrap().finished, 1);
        assert_eq!(s.wait_animation().unwrap().unwrap(), 3);
        assert_eq!(second_log.lock().unwrap().indices, vec![0, 1, 2]);
    }

    #[test]
    fn stop_without_loop_is_noop() {
        let mut s = session();
        assert!(s.stop_animation().is_none());
        assert!(s.wait_animation().is_none());
    }
}
