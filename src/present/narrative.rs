use super::QualityLabel;
use crate::audio::features::QualityMetrics;

fn banner(overall_quality: f64) -> &'static str {
    if overall_quality >= 8.0 {
        "Excellent quality! This track has outstanding audio characteristics."
    } else if overall_quality >= 6.0 {
        "Good quality! This track has solid audio characteristics."
    } else if overall_quality >= 4.0 {
        "Average quality. This track could benefit from better encoding."
    } else {
        "Poor quality. This track has significant audio issues."
    }
}

/// Human-readable analysis summary. Detail lines show the raw, unclamped values.
pub fn build(metrics: &QualityMetrics, file_name: Option<&str>) -> String {
    let mut out = String::from("File Analysis Complete!\n\n");

    out.push_str(&format!("File: {}\n", file_name.unwrap_or("Unknown")));
    out.push_str(&format!("Duration: {:.2} seconds\n", metrics.duration));
    out.push_str(&format!("Bitrate: {} kbps\n\n", metrics.bitrate));

    out.push_str("Quality Assessment:\n");
    out.push_str(banner(metrics.overall_quality));
    out.push_str("\n\nDetailed Analysis:\n");

    out.push_str(&format!(
        "• Clarity: {:.1}% - {}\n",
        metrics.clarity,
        QualityLabel::for_score(metrics.clarity)
    ));
    out.push_str(&format!(
        "• Bass Quality: {:.1}% - {}\n",
        metrics.bass_quality,
        QualityLabel::for_score(metrics.bass_quality)
    ));
    out.push_str(&format!(
        "• Treble Quality: {:.1}% - {}\n",
        metrics.treble_quality,
        QualityLabel::for_score(metrics.treble_quality)
    ));
    out.push_str(&format!(
        "• Dynamic Range: {:.1} dB - {}",
        metrics.dynamic_range,
        QualityLabel::for_dynamic_range(metrics.dynamic_range)
    ));

    out
}
