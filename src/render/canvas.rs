use anyhow::{Context, Result};
use std::path::Path;

/// Straight RGBA color with alpha in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    fn lerp(self, other: Rgba, t: f32) -> Rgba {
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgba {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: self.a + (other.a - self.a) * t,
        }
    }
}

/// CPU raster in RGBA8, row-major, top-left origin.
#[derive(Clone, Debug)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width as usize) * (height as usize) * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = pixel_offset(self.width, x, y) * 4;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }

    pub fn clear(&mut self, color: [u8; 4]) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&color);
        }
    }

    /// Top-to-bottom linear gradient, composited source-over.
    pub fn fill_vertical_gradient(&mut self, top: Rgba, bottom: Rgba) {
        if self.height == 0 {
            return;
        }
        for y in 0..self.height {
            let t = (y as f32 + 0.5) / self.height as f32;
            let color = top.lerp(bottom, t);
            for x in 0..self.width {
                self.blend(x, y, color, 1.0);
            }
        }
    }

    /// Solid stroke through `points` with an anti-aliased edge.
    pub fn stroke_polyline(&mut self, points: &[(f32, f32)], color: Rgba, line_width: f32) {
        let half = line_width / 2.0;
        let mask = self.coverage_mask(points, half + 1.0, |d| (half + 0.5 - d).clamp(0.0, 1.0));
        self.apply_mask(&mask, color);
    }

    /// Soft halo around `points`, fading out over `radius` pixels.
    pub fn glow_polyline(&mut self, points: &[(f32, f32)], color: Rgba, radius: f32) {
        if radius <= 0.0 {
            return;
        }
        let mask = self.coverage_mask(points, radius, |d| {
            let falloff = (1.0 - d / radius).clamp(0.0, 1.0);
            falloff * falloff
        });
        self.apply_mask(&mask, color);
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        let img = image::RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .context("Canvas size does not match its pixel buffer")?;
        img.save(path)
            .with_context(|| format!("Failed to write PNG: {}", path.display()))?;
        Ok(())
    }

    /// Per-pixel max coverage over all segments, so joints are not blended twice.
    fn coverage_mask(&self, points: &[(f32, f32)], reach: f32, coverage: impl Fn(f32) -> f32) -> Vec<f32> {
        let mut mask = vec![0.0f32; (self.width as usize) * (self.height as usize)];
        if self.width == 0 || self.height == 0 {
            return mask;
        }

        let segments: Vec<((f32, f32), (f32, f32))> = match points {
            [] => Vec::new(),
            [p] => vec![(*p, *p)],
            _ => points.windows(2).map(|w| (w[0], w[1])).collect(),
        };

        let max_x = self.width as f32 - 1.0;
        let max_y = self.height as f32 - 1.0;

        for (a, b) in segments {
            let x0 = (a.0.min(b.0) - reach).floor().clamp(0.0, max_x) as u32;
            let x1 = (a.0.max(b.0) + reach).ceil().clamp(0.0, max_x) as u32;
            let y0 = (a.1.min(b.1) - reach).floor().clamp(0.0, max_y) as u32;
            let y1 = (a.1.max(b.1) + reach).ceil().clamp(0.0, max_y) as u32;

            for y in y0..=y1 {
                for x in x0..=x1 {
                    let d = distance_to_segment((x as f32 + 0.5, y as f32 + 0.5), a, b);
                    if d > reach {
                        continue;
                    }
                    let c = coverage(d);
                    let slot = &mut mask[pixel_offset(self.width, x, y)];
                    if c > *slot {
                        *slot = c;
                    }
                }
            }
        }

        mask
    }

    fn apply_mask(&mut self, mask: &[f32], color: Rgba) {
        for y in 0..self.height {
            for x in 0..self.width {
                let c = mask[pixel_offset(self.width, x, y)];
                if c > 0.0 {
                    self.blend(x, y, color, c);
                }
            }
        }
    }

    fn blend(&mut self, x: u32, y: u32, color: Rgba, coverage: f32) {
        let src_a = (color.a * coverage).clamp(0.0, 1.0);
        if src_a <= 0.0 {
            return;
        }
        let idx = pixel_offset(self.width, x, y) * 4;
        let dst_a = self.pixels[idx + 3] as f32 / 255.0;
        let out_a = src_a + dst_a * (1.0 - src_a);
        if out_a <= 0.0 {
            return;
        }

        let src = [color.r, color.g, color.b];
        for (i, &channel) in src.iter().enumerate() {
            let dst = self.pixels[idx + i] as f32;
            let value = (channel as f32 * src_a + dst * dst_a * (1.0 - src_a)) / out_a;
            self.pixels[idx + i] = value.round().clamp(0.0, 255.0) as u8;
        }
        self.pixels[idx + 3] = (out_a * 255.0).round() as u8;
    }
}

/// Row-major pixel index, computed in `usize` so large canvases cannot wrap.
fn pixel_offset(width: u32, x: u32, y: u32) -> usize {
    y as usize * width as usize + x as usize
}

fn distance_to_segment(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq > 0.0 {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
    ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt()
}
