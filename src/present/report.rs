use serde::Serialize;

use super::{PresentationState, ProgressBar, MAX_STARS};
use crate::audio::features::QualityMetrics;

const BAR_WIDTH: usize = 30;

/// One finished analysis: the metrics and everything derived from them.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub file_name: Option<String>,
    pub metrics: QualityMetrics,
    pub presentation: PresentationState,
}

impl Report {
    pub fn new(metrics: QualityMetrics, file_name: Option<String>) -> Self {
        let presentation = PresentationState::from_metrics(&metrics, file_name.as_deref());
        Self {
            file_name,
            metrics,
            presentation,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_terminal(&self) -> String {
        let p = &self.presentation;
        let mut out = String::new();

        out.push_str(&format!("{}  {}\n", stars(p.stars), p.score_text));
        out.push_str(&bar_line("Clarity", &p.clarity));
        out.push_str(&bar_line("Bass", &p.bass));
        out.push_str(&bar_line("Treble", &p.treble));
        out.push_str(&bar_line("Dynamics", &p.dynamic_range));
        out.push_str(&format!("{:<10} {}\n\n", "Bitrate", p.bitrate_text));
        out.push_str(&p.narrative);
        out.push('\n');
        out
    }
}

fn stars(filled: u8) -> String {
    let filled = filled.min(MAX_STARS);
    let mut s = "★".repeat(filled as usize);
    s.push_str(&"☆".repeat((MAX_STARS - filled) as usize));
    s
}

fn bar_line(name: &str, bar: &ProgressBar) -> String {
    let filled = ((bar.percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!(
        "{:<10} [{}{}] {:>4}  {}\n",
        name,
        "=".repeat(filled),
        " ".repeat(BAR_WIDTH - filled),
        bar.text,
        bar.label
    )
}
