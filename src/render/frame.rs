use super::canvas::{Canvas, Rgba};

/// Horizontal frequency of the animated distortion, in radians per pixel.
const SWEEP_RATE: f64 = 0.01;

#[derive(Clone, Debug)]
pub struct WaveformStyle {
    /// Base fill under the translucent gradient
    pub background: [u8; 4],
    pub gradient_top: Rgba,
    pub gradient_bottom: Rgba,
    pub stroke: Rgba,
    pub line_width: f32,
    /// Halo radius in pixels; 0 disables the glow pass
    pub glow_radius: f32,
}

impl Default for WaveformStyle {
    fn default() -> Self {
        Self {
            background: [0, 0, 0, 0],
            gradient_top: Rgba::new(0, 212, 255, 0.1),
            gradient_bottom: Rgba::new(255, 0, 102, 0.1),
            stroke: Rgba::new(0, 212, 255, 1.0),
            line_width: 2.0,
            glow_radius: 10.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FrameRenderer {
    pub width: u32,
    pub height: u32,
    pub style: WaveformStyle,
}

impl FrameRenderer {
    pub fn new(width: u32, height: u32, style: WaveformStyle) -> Self {
        Self { width, height, style }
    }

    /// One point per pixel column. With `phase`, each offset from the center
    /// line is scaled by `sin((x + phase) * 0.01)`.
    pub fn waveform_points(&self, samples: &[f32], phase: Option<f64>) -> Vec<(f32, f32)> {
        if samples.is_empty() || self.width == 0 {
            return Vec::new();
        }

        let half = self.height as f64 / 2.0;
        let step = samples.len() as f64 / self.width as f64;

        (0..self.width)
            .map(|x| {
                let idx = ((x as f64 * step).floor() as usize).min(samples.len() - 1);
                let mut offset = samples[idx] as f64 * half;
                if let Some(phase) = phase {
                    offset *= ((x as f64 + phase) * SWEEP_RATE).sin();
                }
                (x as f32, (half + offset) as f32)
            })
            .collect()
    }

    pub fn render_static(&self, samples: &[f32]) -> Canvas {
        self.draw(&self.waveform_points(samples, None))
    }

    pub fn render_animated(&self, samples: &[f32], phase: f64) -> Canvas {
        self.draw(&self.waveform_points(samples, Some(phase)))
    }

    fn draw(&self, points: &[(f32, f32)]) -> Canvas {
        let mut canvas = Canvas::new(self.width, self.height);
        canvas.clear(self.style.background);
        canvas.fill_vertical_gradient(self.style.gradient_top, self.style.gradient_bottom);

        let glow = Rgba {
            a: self.style.stroke.a * 0.35,
            ..self.style.stroke
        };
        canvas.glow_polyline(points, glow, self.style.glow_radius);
        canvas.stroke_polyline(points, self.style.stroke, self.style.line_width);
        canvas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer(width: u32, height: u32) -> FrameRenderer {
        FrameRenderer::new(width, height, WaveformStyle::default())
    }

    #[test]
    fn points_map_columns_to_sample_indices() {
        let samples: Vec<f32> = (0..1000).map(|i| if i < 500 { 0.5 } else { -0.5 }).collect();
        let points = renderer(100, 200).waveform_points(&samples, None);

        assert_eq!(points.len(), 100);
        assert_eq!(points[0], (0.0, 150.0));
        assert_eq!(points[49], (49.0, 150.0));
        assert_eq!(points[50], (50.0, 50.0));
    }

    #[test]
    fn points_upsample_short_buffers() {
        let points = renderer(8, 10).waveform_points(&[1.0, -1.0], None);
        let ys: Vec<f32> = points.iter().map(|p| p.1).collect();
        assert_eq!(ys, vec![10.0, 10.0, 10.0, 10.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn animated_points_scale_by_sine() {
        let samples = vec![1.0f32; 400];
        let r = renderer(400, 100);
        let points = r.waveform_points(&samples, Some(0.0));

        // sin(0) flattens the first column onto the center line
        assert_eq!(points[0].1, 50.0);
        let x = 157usize;
        let expected = 50.0 + 50.0 * ((x as f64) * 0.01).sin();
        assert!((points[x].1 as f64 - expected).abs() < 1e-4);
    }

    #[test]
    fn phase_shifts_the_sweep() {
        let samples = vec![1.0f32; 400];
        let r = renderer(400, 100);
        let a = r.waveform_points(&samples, Some(2.0));
        let b = r.waveform_points(&samples, Some(0.0));
        assert_eq!(a[0].1, b[2].1);
    }

    #[test]
    fn zero_width_has_no_points() {
        assert!(renderer(0, 100).waveform_points(&[0.1, 0.2], None).is_empty());
    }

    #[test]
    fn static_frame_draws_stroke_on_center_line() {
        let canvas = renderer(64, 32).render_static(&[0.0; 256]);
        assert_eq!((canvas.width(), canvas.height()), (64, 32));
        let on_line = canvas.pixel(10, 16);
        assert_eq!(&on_line[..3], &[0, 212, 255]);
        assert_eq!(on_line[3], 255);
    }

    #[test]
    fn background_keeps_gradient_translucent() {
        let canvas = renderer(64, 64).render_static(&[0.0; 64]);
        // far from the line only the 10% gradient is present
        assert_eq!(canvas.pixel(5, 1)[3], 26);
    }

    #[test]
    fn animated_frames_differ_by_phase() {
        let samples: Vec<f32> = (0..2048).map(|i| ((i as f32) * 0.05).sin()).collect();
        let r = renderer(128, 64);
        let a = r.render_animated(&samples, 0.0);
        let b = r.render_animated(&samples, 100.0);
        assert_ne!(a.pixels(), b.pixels());
    }
}
