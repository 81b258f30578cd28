use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use crate::render::animation::FrameSink;
use crate::render::canvas::Canvas;

#[derive(Clone, Debug)]
pub struct VideoSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub codec: String,
    pub pix_fmt: String,
    pub crf: u32,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            width: 800,
            height: 200,
            fps: 60,
            codec: "libx264".into(),
            pix_fmt: "yuv420p".into(),
            crf: 18,
        }
    }
}

/// Pipes raw RGBA frames into an `ffmpeg` child process.
pub struct FfmpegEncoder {
    child: Option<Child>,
    frame_bytes: usize,
}

pub(crate) fn ffmpeg_args(output_path: &Path, input_audio: Option<&Path>, settings: &VideoSettings) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-f".into(), "rawvideo".into(),
        "-pixel_format".into(), "rgba".into(),
        "-video_size".into(), format!("{}x{}", settings.width, settings.height),
        "-framerate".into(), settings.fps.to_string(),
        "-i".into(), "pipe:0".into(),
    ];

    if let Some(audio) = input_audio {
        args.extend(["-i".to_string(), audio.display().to_string()]);
    }

    args.extend([
        "-c:v".to_string(), settings.codec.clone(),
        "-pix_fmt".into(), settings.pix_fmt.clone(),
        "-crf".into(), settings.crf.to_string(),
        "-preset".into(), "medium".into(),
    ]);

    if input_audio.is_some() {
        args.extend([
            "-c:a".to_string(), "aac".into(),
            "-b:a".into(), "192k".into(),
            "-shortest".into(),
        ]);
    }

    args.push(output_path.display().to_string());
    args
}

impl FfmpegEncoder {
    pub fn new(output_path: &Path, input_audio: Option<&Path>, settings: &VideoSettings) -> Result<Self> {
        let args = ffmpeg_args(output_path, input_audio, settings);

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn ffmpeg. Is ffmpeg installed?")?;

        log::info!(
            "FFmpeg encoder started: {}x{} @ {}fps, codec={}",
            settings.width, settings.height, settings.fps, settings.codec
        );

        Ok(Self {
            child: Some(child),
            frame_bytes: (settings.width as usize) * (settings.height as usize) * 4,
        })
    }
}

impl FrameSink for FfmpegEncoder {
    fn write_frame(&mut self, _index: u64, frame: &Canvas) -> Result<()> {
        if frame.pixels().len() != self.frame_bytes {
            anyhow::bail!(
                "Frame is {}x{}, encoder expects {} bytes per frame",
                frame.width(),
                frame.height(),
                self.frame_bytes
            );
        }
        let stdin = self
            .child
            .as_mut()
            .and_then(|c| c.stdin.as_mut())
            .context("FFmpeg stdin not available")?;
        stdin.write_all(frame.pixels()).context("Failed to write frame to ffmpeg")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        // Close stdin to signal EOF
        drop(child.stdin.take());

        let output = child.wait_with_output().context("Failed to wait for ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("FFmpeg exited with error:\n{}", stderr);
        }

        log::info!("FFmpeg encoding complete");
        Ok(())
    }
}
