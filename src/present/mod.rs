//! Maps raw metrics onto the values a results view displays.

pub mod narrative;
pub mod report;

use serde::Serialize;
use std::fmt;

use crate::audio::features::QualityMetrics;

pub const MAX_STARS: u8 = 5;
/// Dynamic range that fills the progress bar completely.
const FULL_SCALE_DB: f64 = 60.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum QualityLabel {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityLabel {
    /// Shared scale for clarity, bass and treble percentages.
    pub fn for_score(value: f64) -> Self {
        if value >= 80.0 {
            Self::Excellent
        } else if value >= 60.0 {
            Self::Good
        } else if value >= 40.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    pub fn for_dynamic_range(db: f64) -> Self {
        if db >= 50.0 {
            Self::Excellent
        } else if db >= 30.0 {
            Self::Good
        } else if db >= 20.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
        };
        f.write_str(s)
    }
}

/// Filled stars out of five: the overall score is rounded, then halved.
pub fn star_rating(overall_quality: f64) -> u8 {
    let rounded = overall_quality.round().clamp(0.0, 10.0) as u8;
    rounded / 2
}

pub fn progress_percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

pub fn dynamic_range_percent(db: f64) -> f64 {
    progress_percent((db / FULL_SCALE_DB * 100.0).min(100.0))
}

pub fn score_text(overall_quality: f64) -> String {
    format!("{:.1}/10", overall_quality)
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProgressBar {
    pub label: QualityLabel,
    /// Fill level in [0, 100]
    pub percent: f64,
    /// Rounded percentage as displayed next to the bar
    pub text: String,
}

impl ProgressBar {
    fn new(percent: f64, label: QualityLabel) -> Self {
        let percent = progress_percent(percent);
        Self {
            label,
            percent,
            text: format!("{}%", percent.round() as u32),
        }
    }
}

/// Everything a results view shows for one analysis. Rebuilt from scratch each time.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationState {
    pub stars: u8,
    pub score_text: String,
    pub clarity: ProgressBar,
    pub bass: ProgressBar,
    pub treble: ProgressBar,
    pub dynamic_range: ProgressBar,
    pub bitrate_text: String,
    pub narrative: String,
}

impl PresentationState {
    pub fn from_metrics(metrics: &QualityMetrics, file_name: Option<&str>) -> Self {
        Self {
            stars: star_rating(metrics.overall_quality),
            score_text: score_text(metrics.overall_quality),
            clarity: ProgressBar::new(metrics.clarity, QualityLabel::for_score(metrics.clarity)),
            bass: ProgressBar::new(metrics.bass_quality, QualityLabel::for_score(metrics.bass_quality)),
            treble: ProgressBar::new(metrics.treble_quality, QualityLabel::for_score(metrics.treble_quality)),
            dynamic_range: ProgressBar::new(
                dynamic_range_percent(metrics.dynamic_range),
                QualityLabel::for_dynamic_range(metrics.dynamic_range),
            ),
            bitrate_text: format!("{} kbps", metrics.bitrate),
            narrative: narrative::build(metrics, file_name),
        }
    }
}
