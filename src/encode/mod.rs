pub mod ffmpeg;
pub mod png;

use anyhow::Result;
use std::path::Path;

use crate::render::animation::FrameSink;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "webm"];

pub fn is_video_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Pick a sink from the output path: video files go through ffmpeg, anything
/// else is treated as a directory of numbered PNG frames.
pub fn sink_for(output: &Path, audio: Option<&Path>, settings: &ffmpeg::VideoSettings) -> Result<Box<dyn FrameSink>> {
    if is_video_path(output) {
        Ok(Box::new(ffmpeg::FfmpegEncoder::new(output, audio, settings)?))
    } else {
        Ok(Box::new(png::PngSequence::create(output)?))
    }
}
