use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::render::animation::FrameSink;
use crate::render::canvas::Canvas;

/// Writes each frame as `frame_00000.png`, `frame_00001.png`, ...
pub struct PngSequence {
    dir: PathBuf,
    written: u64,
}

impl PngSequence {
    pub fn create(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create frame directory: {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: 0,
        })
    }

    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("frame_{:05}.png", index))
    }
}

impl FrameSink for PngSequence {
    fn write_frame(&mut self, index: u64, frame: &Canvas) -> Result<()> {
        frame.save_png(&self.frame_path(index))?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        log::info!("Wrote {} frames to {}", self.written, self.dir.display());
        Ok(())
    }
}
