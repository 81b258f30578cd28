//! Client for the upload-and-analyze endpoint of a collaborator server.
//!
//! Understands both the collaborator's loose JSON and the `{ok, data, error}`
//! envelope of `beatbuddy serve`. Either may come from a server we do not
//! control, so every result is marked untrusted and must not be mixed with
//! local measurements.

use anyhow::{Context, Result};
use reqwest::blocking::multipart;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::audio::features::QualityMetrics;

const FIELD_NAME: &str = "audio";
const TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteReport {
    pub file_name: Option<String>,
    pub duration: Option<f64>,
    pub file_size: Option<u64>,
    pub estimated_bitrate: Option<u64>,
    pub quality: Option<RemoteQuality>,
    pub technical: Option<RemoteTechnical>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub error: Option<String>,
    /// Always false for anything deserialized from the wire
    #[serde(skip)]
    pub trusted: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteQuality {
    pub overall: Option<f64>,
    pub clarity: Option<f64>,
    pub bass_quality: Option<f64>,
    pub treble_quality: Option<f64>,
    pub dynamic_range: Option<f64>,
    #[serde(default)]
    pub frequency_response: Vec<FrequencyPoint>,
    pub harmonic_distortion: Option<f64>,
    pub noise_floor: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct FrequencyPoint {
    pub freq: f64,
    pub amplitude: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTechnical {
    pub sample_rate: Option<u32>,
    pub bit_depth: Option<u32>,
    pub channels: Option<u32>,
    pub encoding: Option<String>,
}

/// Reply of `beatbuddy serve`.
#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    data: Option<EnvelopeData>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeData {
    file_name: Option<String>,
    metrics: QualityMetrics,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Wire {
    Envelope(Envelope),
    Loose(RemoteReport),
}

impl From<Envelope> for RemoteReport {
    fn from(envelope: Envelope) -> Self {
        let mut report = RemoteReport {
            error: envelope.error,
            ..RemoteReport::default()
        };
        if let (true, Some(data)) = (envelope.ok, envelope.data) {
            let m = data.metrics;
            report.file_name = data.file_name;
            report.duration = Some(m.duration);
            report.estimated_bitrate = Some(m.bitrate as u64);
            report.quality = Some(RemoteQuality {
                overall: Some(m.overall_quality),
                clarity: Some(m.clarity),
                bass_quality: Some(m.bass_quality),
                treble_quality: Some(m.treble_quality),
                dynamic_range: Some(m.dynamic_range),
                ..RemoteQuality::default()
            });
        }
        report
    }
}

pub fn parse_report(body: &str) -> Result<RemoteReport> {
    let wire: Wire = serde_json::from_str(body).context("Unexpected response from analysis endpoint")?;
    let mut report = match wire {
        Wire::Envelope(envelope) => envelope.into(),
        Wire::Loose(report) => report,
    };
    report.trusted = false;
    Ok(report)
}

/// Upload `path` as multipart field `audio` and decode the answer.
pub fn fetch(url: &str, path: &Path) -> Result<RemoteReport> {
    let form = multipart::Form::new()
        .file(FIELD_NAME, path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    log::info!("Uploading {} to {}", path.display(), url);
    let client = reqwest::blocking::Client::builder()
        .timeout(TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;
    let response = client
        .post(url)
        .multipart(form)
        .send()
        .with_context(|| format!("Request to {} failed", url))?;

    let status = response.status();
    let body = response.text().context("Failed to read response body")?;
    let report = parse_report(&body)?;

    if !status.is_success() {
        anyhow::bail!(
            "Analysis endpoint returned {}: {}",
            status,
            report.error.as_deref().unwrap_or("no error message")
        );
    }
    Ok(report)
}

impl RemoteReport {
    pub fn render_terminal(&self) -> String {
        let mut out = String::new();
        out.push_str("WARNING: remote results are unverified and may be mock data.\n\n");

        if let Some(name) = &self.file_name {
            out.push_str(&format!("{:<18} {}\n", "File", name));
        }
        if let Some(secs) = self.duration {
            out.push_str(&format!("{:<18} {:.2} seconds\n", "Duration", secs));
        }
        if let Some(size) = self.file_size {
            out.push_str(&format!("{:<18} {} bytes\n", "File size", size));
        }
        if let Some(kbps) = self.estimated_bitrate {
            out.push_str(&format!("{:<18} {} kbps\n", "Est. bitrate", kbps));
        }
        if let Some(q) = &self.quality {
            push_value(&mut out, "Overall", q.overall, "/10");
            push_value(&mut out, "Clarity", q.clarity, "%");
            push_value(&mut out, "Bass", q.bass_quality, "%");
            push_value(&mut out, "Treble", q.treble_quality, "%");
            push_value(&mut out, "Dynamic range", q.dynamic_range, " dB");
            push_value(&mut out, "Harmonic dist.", q.harmonic_distortion, "%");
            push_value(&mut out, "Noise floor", q.noise_floor, " dB");
            if !q.frequency_response.is_empty() {
                out.push_str("\nFrequency response:\n");
                for point in &q.frequency_response {
                    out.push_str(&format!("  {:>7.0} Hz  {:>5.1}\n", point.freq, point.amplitude));
                }
            }
        }
        if let Some(t) = &self.technical {
            if let Some(rate) = t.sample_rate {
                out.push_str(&format!("{:<18} {} Hz\n", "Sample rate", rate));
            }
            if let Some(bits) = t.bit_depth {
                out.push_str(&format!("{:<18} {} bit\n", "Bit depth", bits));
            }
            if let Some(ch) = t.channels {
                out.push_str(&format!("{:<18} {}\n", "Channels", ch));
            }
            if let Some(enc) = &t.encoding {
                out.push_str(&format!("{:<18} {}\n", "Encoding", enc));
            }
        }
        if !self.recommendations.is_empty() {
            out.push_str("\nRecommendations:\n");
            for r in &self.recommendations {
                out.push_str(&format!("  - {}\n", r));
            }
        }
        out
    }
}

fn push_value(out: &mut String, label: &str, value: Option<f64>, unit: &str) {
    if let Some(v) = value {
        out.push_str(&format!("{:<18} {:.1}{}\n", label, v, unit));
    }
}
