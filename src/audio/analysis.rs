//! Heuristic quality metrics over a single decoded channel.
//!
//! Every function here is pure and deterministic. The constants are part of
//! the contract: identical buffers must produce bit-identical metrics.

use super::features::{QualityMetrics, SampleBuffer, SpectrumEstimate, SPECTRUM_BINS};

/// Window used by both the spectrum and the dynamic range heuristics.
const BLOCK_SIZE: usize = 1024;
/// Reference span for the dynamic range figure (dB relative to 0.1 peak-to-peak).
const RANGE_REFERENCE: f64 = 0.1;
const BASS_CUTOFF_HZ: f64 = 200.0;
const TREBLE_START_HZ: f64 = 2000.0;
const BAND_SCALE: f64 = 1000.0;
/// Every sample is counted as a 32-bit float regardless of the source encoding.
const BYTES_PER_SAMPLE: f64 = 4.0;

const WEIGHT_CLARITY: f64 = 0.25;
const WEIGHT_BASS: f64 = 0.20;
const WEIGHT_TREBLE: f64 = 0.20;
const WEIGHT_DYNAMIC_RANGE: f64 = 0.20;
const WEIGHT_RMS: f64 = 0.15;

pub fn analyze(buffer: &SampleBuffer) -> QualityMetrics {
    let samples = buffer.samples();
    let sample_rate = buffer.sample_rate();
    let duration = buffer.duration_secs();

    let rms = rms(samples);
    let spectrum = spectrum(samples);
    if spectrum.is_silent() {
        log::debug!("Spectrum is empty ({} samples, block size {})", buffer.len(), BLOCK_SIZE);
    }
    let dynamic_range = dynamic_range(samples);
    let bass_quality = bass_quality(&spectrum, sample_rate);
    let treble_quality = treble_quality(&spectrum, sample_rate);
    let clarity = clarity(samples);
    let bitrate = estimate_bitrate(buffer.len(), duration);
    let overall_quality = overall_quality(clarity, bass_quality, treble_quality, dynamic_range, rms);

    log::debug!(
        "Metrics: overall={:.2} clarity={:.1} bass={:.1} treble={:.1} dr={:.1}dB rms={:.4} bitrate={}kbps",
        overall_quality, clarity, bass_quality, treble_quality, dynamic_range, rms, bitrate
    );

    QualityMetrics {
        overall_quality,
        clarity,
        bass_quality,
        treble_quality,
        dynamic_range,
        bitrate,
        rms,
        duration,
    }
}

pub fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| s as f64 * s as f64).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

/// Block-accumulated magnitudes of every other sample.
///
/// Blocks start at `i` while `i < len - BLOCK_SIZE`, so the last full block of a
/// buffer whose length is an exact multiple of the block size is not counted.
pub fn spectrum(samples: &[f32]) -> SpectrumEstimate {
    let mut bins = vec![0.0f64; SPECTRUM_BINS];
    if samples.is_empty() {
        return SpectrumEstimate(bins);
    }

    let mut start = 0;
    while start + BLOCK_SIZE < samples.len() {
        let block = &samples[start..start + BLOCK_SIZE];
        for (j, bin) in bins.iter_mut().enumerate() {
            *bin += block[j * 2].abs() as f64;
        }
        start += BLOCK_SIZE;
    }

    let blocks = samples.len() as f64 / BLOCK_SIZE as f64;
    for bin in bins.iter_mut() {
        *bin /= blocks;
    }

    SpectrumEstimate(bins)
}

/// Peak-to-peak range across all blocks, in dB relative to 0.1.
///
/// A degenerate range (silence or a constant signal) reports 0 dB instead of
/// negative infinity.
pub fn dynamic_range(samples: &[f32]) -> f64 {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;

    for block in samples.chunks(BLOCK_SIZE) {
        let block_min = block.iter().copied().fold(f32::INFINITY, f32::min);
        let block_max = block.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        min = min.min(block_min);
        max = max.max(block_max);
    }

    if samples.is_empty() || max <= min {
        return 0.0;
    }

    20.0 * ((max as f64 - min as f64) / RANGE_REFERENCE).log10()
}

pub fn bass_quality(spectrum: &SpectrumEstimate, sample_rate: u32) -> f64 {
    let end = band_edge(spectrum.len(), BASS_CUTOFF_HZ, sample_rate);
    band_score(spectrum, 0, end)
}

pub fn treble_quality(spectrum: &SpectrumEstimate, sample_rate: u32) -> f64 {
    let start = band_edge(spectrum.len(), TREBLE_START_HZ, sample_rate);
    band_score(spectrum, start, spectrum.len())
}

/// `floor(bins * hz / nyquist)`, saturating at the bin count.
fn band_edge(bins: usize, hz: f64, sample_rate: u32) -> usize {
    if sample_rate == 0 {
        return 0;
    }
    let nyquist = sample_rate as f64 / 2.0;
    let edge = (bins as f64 * hz / nyquist).floor();
    (edge as usize).min(bins)
}

/// Mean of `bins[start..end]` scaled by 1000 and clamped to [0, 100]; 0 for an empty band.
fn band_score(spectrum: &SpectrumEstimate, start: usize, end: usize) -> f64 {
    if start >= end {
        return 0.0;
    }
    let energy: f64 = spectrum.bins()[start..end].iter().sum();
    let mean = energy / (end - start) as f64;
    (mean * BAND_SCALE).clamp(0.0, 100.0)
}

pub fn clarity(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().map(|&s| s as f64).sum::<f64>() / n;
    let variance = samples
        .iter()
        .map(|&s| {
            let d = s as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (variance.sqrt() * 100.0).min(100.0)
}

pub fn estimate_bitrate(sample_count: usize, duration_secs: f64) -> u32 {
    if sample_count == 0 || duration_secs <= 0.0 || !duration_secs.is_finite() {
        return 0;
    }
    let bytes_per_second = sample_count as f64 * BYTES_PER_SAMPLE / duration_secs;
    (bytes_per_second * 8.0 / 1000.0).round() as u32
}

pub fn overall_quality(clarity: f64, bass_quality: f64, treble_quality: f64, dynamic_range: f64, rms: f64) -> f64 {
    let mut score = 0.0;
    score += clarity / 100.0 * WEIGHT_CLARITY;
    score += bass_quality / 100.0 * WEIGHT_BASS;
    score += treble_quality / 100.0 * WEIGHT_TREBLE;
    score += (dynamic_range / 60.0).min(1.0) * WEIGHT_DYNAMIC_RANGE;
    score += (rms * 10.0).min(1.0) * WEIGHT_RMS;

    let score = score * 10.0;
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(samples: Vec<f32>) -> SampleBuffer {
        SampleBuffer::new(samples, 44100).unwrap()
    }

    fn alternating(len: usize, amplitude: f32) -> Vec<f32> {
        (0..len).map(|i| if i % 2 == 0 { amplitude } else { -amplitude }).collect()
    }

    fn noise(len: usize, seed: u32) -> Vec<f32> {
        // xorshift, enough spread for property checks
        let mut state = seed.max(1);
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect()
    }

    #[test]
    fn rms_of_silence_is_zero() {
        assert_eq!(rms(&[0.0; 2048]), 0.0);
    }

    #[test]
    fn rms_of_full_scale_square() {
        assert!((rms(&alternating(2048, 1.0)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rms_is_positive_for_any_nonzero_sample() {
        let mut samples = vec![0.0f32; 4096];
        samples[4095] = 1e-3;
        assert!(rms(&samples) > 0.0);
    }

    #[test]
    fn rms_empty_is_zero() {
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn spectrum_short_buffer_is_all_zero() {
        let s = spectrum(&vec![0.8; 500]);
        assert_eq!(s.len(), SPECTRUM_BINS);
        assert!(s.is_silent());
    }

    #[test]
    fn spectrum_single_exact_block_is_all_zero() {
        // The only block ends exactly at the buffer end, so nothing is accumulated.
        let s = spectrum(&vec![0.8; 1024]);
        assert_eq!(s.len(), SPECTRUM_BINS);
        assert!(s.is_silent());
        assert_eq!(bass_quality(&s, 44100), 0.0);

        // One extra sample admits the block.
        assert!(!spectrum(&vec![0.8; 1025]).is_silent());
    }

    #[test]
    fn spectrum_skips_trailing_full_block() {
        // 2048 samples: only the block at 0 is accumulated, then divided by 2.
        let s = spectrum(&vec![0.5; 2048]);
        assert!(s.bins().iter().all(|&b| (b - 0.25).abs() < 1e-12));
    }

    #[test]
    fn spectrum_reads_even_offsets_only() {
        let mut samples = vec![0.0f32; 2049];
        samples[0] = 1.0; // bin 0
        samples[1] = 1.0; // odd index, ignored
        samples[1022] = 0.5; // bin 511
        let s = spectrum(&samples);
        let blocks = 2049.0 / 1024.0;
        assert!((s.bins()[0] - 1.0 / blocks).abs() < 1e-12);
        assert_eq!(s.bins()[1], 0.0);
        assert!((s.bins()[511] - 0.5 / blocks).abs() < 1e-12);
    }

    #[test]
    fn dynamic_range_full_scale() {
        let dr = dynamic_range(&alternating(2048, 1.0));
        assert!((dr - 26.0206).abs() < 1e-3, "got {dr}");
    }

    #[test]
    fn dynamic_range_silence_is_zero() {
        assert_eq!(dynamic_range(&[0.0; 2048]), 0.0);
    }

    #[test]
    fn dynamic_range_constant_signal_is_zero() {
        assert_eq!(dynamic_range(&[0.3; 3000]), 0.0);
    }

    #[test]
    fn dynamic_range_small_span_is_negative() {
        let dr = dynamic_range(&alternating(2048, 0.01));
        assert!(dr < 0.0);
        assert!(dr.is_finite());
    }

    #[test]
    fn dynamic_range_includes_partial_block() {
        let mut samples = vec![0.0f32; 1500];
        samples[1400] = 1.0;
        let dr = dynamic_range(&samples);
        assert!((dr - 20.0).abs() < 1e-9);
    }

    #[test]
    fn band_edges_for_cd_rate() {
        assert_eq!(band_edge(512, BASS_CUTOFF_HZ, 44100), 4);
        assert_eq!(band_edge(512, TREBLE_START_HZ, 44100), 46);
    }

    #[test]
    fn bass_guarded_when_band_is_empty() {
        // 512 * 200 / 512000 < 1
        let s = SpectrumEstimate(vec![1.0; SPECTRUM_BINS]);
        assert_eq!(bass_quality(&s, 1_024_000), 0.0);
    }

    #[test]
    fn treble_guarded_when_band_starts_past_nyquist() {
        let s = SpectrumEstimate(vec![1.0; SPECTRUM_BINS]);
        assert_eq!(treble_quality(&s, 4000), 0.0);
        assert_eq!(treble_quality(&s, 3000), 0.0);
    }

    #[test]
    fn band_scores_clamp_at_hundred() {
        let s = SpectrumEstimate(vec![1.0; SPECTRUM_BINS]);
        assert_eq!(bass_quality(&s, 44100), 100.0);
        assert_eq!(treble_quality(&s, 44100), 100.0);
    }

    #[test]
    fn band_scores_scale_mean_energy() {
        let mut bins = vec![0.0; SPECTRUM_BINS];
        bins[0] = 0.02;
        bins[3] = 0.02;
        let s = SpectrumEstimate(bins);
        // (0.04 / 4) * 1000
        assert!((bass_quality(&s, 44100) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn clarity_uses_population_deviation() {
        assert!((clarity(&alternating(1000, 0.2)) - 20.0).abs() < 1e-5);
        assert_eq!(clarity(&alternating(1000, 1.0)), 100.0);
        assert_eq!(clarity(&[0.7; 100]), 0.0);
    }

    #[test]
    fn bitrate_treats_samples_as_float32() {
        assert_eq!(estimate_bitrate(44100, 1.0), 1411);
        assert_eq!(estimate_bitrate(48000 * 3, 3.0), 1536);
    }

    #[test]
    fn bitrate_guards_zero_duration() {
        assert_eq!(estimate_bitrate(100, 0.0), 0);
        assert_eq!(estimate_bitrate(0, 1.0), 0);
    }

    #[test]
    fn overall_uses_fixed_weights() {
        let q = overall_quality(100.0, 100.0, 100.0, 60.0, 0.1);
        assert!((q - 10.0).abs() < 1e-9);

        let q = overall_quality(50.0, 0.0, 0.0, 0.0, 0.0);
        assert!((q - 1.25).abs() < 1e-9);
    }

    #[test]
    fn overall_caps_dynamic_range_and_rms_terms() {
        let capped = overall_quality(0.0, 0.0, 0.0, 600.0, 5.0);
        assert!((capped - 3.5).abs() < 1e-9);
    }

    #[test]
    fn overall_clamps_negative_dynamic_range() {
        assert_eq!(overall_quality(0.0, 0.0, 0.0, -200.0, 0.0), 0.0);
    }

    #[test]
    fn silent_buffer_scenario() {
        let m = analyze(&buffer(vec![0.0; 2048]));
        assert_eq!(m.rms, 0.0);
        assert_eq!(m.clarity, 0.0);
        assert_eq!(m.bass_quality, 0.0);
        assert_eq!(m.treble_quality, 0.0);
        assert_eq!(m.dynamic_range, 0.0);
        assert!(m.overall_quality.is_finite());
        assert!(m.overall_quality >= 0.0);
        assert!((m.duration - 2048.0 / 44100.0).abs() < 1e-12);
    }

    #[test]
    fn full_scale_square_scenario() {
        let m = analyze(&buffer(alternating(2048, 1.0)));
        assert!((m.rms - 1.0).abs() < 1e-12);
        assert_eq!(m.clarity, 100.0);
        assert!((m.dynamic_range - 26.02).abs() < 0.01);
        assert_eq!(m.bitrate, 1411);
    }

    #[test]
    fn short_buffer_scenario() {
        let m = analyze(&buffer(noise(500, 7)));
        assert_eq!(m.bass_quality, 0.0);
        assert_eq!(m.treble_quality, 0.0);
    }

    #[test]
    fn metrics_are_idempotent() {
        let buf = buffer(noise(10_000, 42));
        let a = analyze(&buf);
        let b = analyze(&buf);
        assert_eq!(a.overall_quality.to_bits(), b.overall_quality.to_bits());
        assert_eq!(a.clarity.to_bits(), b.clarity.to_bits());
        assert_eq!(a.dynamic_range.to_bits(), b.dynamic_range.to_bits());
        assert_eq!(a, b);
    }

    #[test]
    fn overall_stays_in_range_for_varied_inputs() {
        for seed in 1..20u32 {
            let len = 300 + seed as usize * 997;
            let m = analyze(&buffer(noise(len, seed)));
            assert!((0.0..=10.0).contains(&m.overall_quality), "seed {seed}: {}", m.overall_quality);
            assert!(m.rms >= 0.0);
            assert!((0.0..=100.0).contains(&m.bass_quality));
            assert!((0.0..=100.0).contains(&m.treble_quality));
            assert!(m.clarity <= 100.0);
        }
    }
}
