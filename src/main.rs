mod audio;
mod cli;
mod config;
mod encode;
mod error;
mod present;
mod remote;
mod render;
mod serve;
mod session;
mod upload;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use audio::{analysis, decode};
use cli::{Cli, Command, Format};
use config::Config;
use encode::ffmpeg::VideoSettings;
use error::{AnalysisError, DecodeError};
use present::report::Report;
use render::animation::LoopOptions;
use render::frame::{FrameRenderer, WaveformStyle};
use session::Session;
use upload::UploadPolicy;

#[derive(Serialize)]
struct BatchEntry<'a> {
    path: String,
    report: Option<&'a Report>,
    error: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    // Explicit --config path, or auto-detect beatbuddy.toml / user config
    let config_path = cli.config.clone().or_else(config::discover);
    let cfg = match config_path {
        Some(ref path) => match config::load_config(path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };

    // Config values apply only when the CLI is at its default
    if cli.width == 800 { cli.width = cfg.render.width; }
    if cli.height == 200 { cli.height = cfg.render.height; }
    if cli.fps == 60 { cli.fps = cfg.render.fps; }
    if !cli.no_glow && !cfg.render.glow { cli.no_glow = true; }
    if cli.max_mb == 50 { cli.max_mb = cfg.upload.max_mb; }

    let policy = UploadPolicy::with_max_mb(cli.max_mb);

    match cli.command.take() {
        Some(Command::Serve { port }) => {
            let port = if port == 3000 { cfg.server.port } else { port };
            serve::start(port, policy)
        }
        Some(Command::Remote { url, file }) => {
            let report = remote::fetch(&url, &file)?;
            log::warn!("Remote analysis results are unverified and may be mock data");
            print!("{}", report.render_terminal());
            Ok(())
        }
        None => run_local(&cli, &policy),
    }
}

fn run_local(cli: &Cli, policy: &UploadPolicy) -> Result<()> {
    if cli.inputs.is_empty() {
        anyhow::bail!("No input files given. Pass one or more audio files, or run `beatbuddy serve`.");
    }

    log::info!("Analyzing {} file(s)", cli.inputs.len());
    let results = analyze_batch(&cli.inputs, policy)?;

    match cli.format {
        Format::Text => {
            for (path, result) in &results {
                if results.len() > 1 {
                    println!("== {} ==", path.display());
                }
                match result {
                    Ok(report) => println!("{}", report.render_terminal()),
                    Err(e) => println!("{}\n", e.user_message()),
                }
            }
        }
        Format::Json => {
            let entries: Vec<BatchEntry> = results
                .iter()
                .map(|(path, result)| BatchEntry {
                    path: path.display().to_string(),
                    report: result.as_ref().ok(),
                    error: result.as_ref().err().map(AnalysisError::user_message),
                })
                .collect();
            match results.as_slice() {
                [(_, Ok(report))] => println!("{}", report.to_json()?),
                _ => println!("{}", serde_json::to_string_pretty(&entries)?),
            }
        }
    }

    let failed: Vec<_> = results.iter().filter(|(_, r)| r.is_err()).collect();
    for (path, result) in &failed {
        if let Err(e) = result {
            log::error!("{}: {}", path.display(), e);
        }
    }

    if cli.waveform.is_some() || cli.animate.is_some() {
        render_outputs(cli, &cli.inputs[0])?;
    }

    if !failed.is_empty() {
        anyhow::bail!("{} of {} files could not be analyzed", failed.len(), results.len());
    }
    Ok(())
}

fn analyze_batch(inputs: &[PathBuf], policy: &UploadPolicy) -> Result<Vec<(PathBuf, Result<Report, AnalysisError>)>> {
    let pb = if inputs.len() > 1 {
        let pb = ProgressBar::new(inputs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files ({eta} remaining)")?
                .progress_chars("=>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let results: Vec<_> = inputs
        .par_iter()
        .map(|path| {
            let result = analyze_path(path, policy);
            pb.inc(1);
            (path.clone(), result)
        })
        .collect();

    pb.finish_and_clear();
    Ok(results)
}

fn analyze_path(path: &Path, policy: &UploadPolicy) -> Result<Report, AnalysisError> {
    let name = file_name(path);
    let size = std::fs::metadata(path).map_err(DecodeError::from)?.len();
    policy.validate(name.as_deref().unwrap_or_default(), None, size)?;

    let buffer = decode::decode_file(path)?;
    Ok(Report::new(analysis::analyze(&buffer), name))
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

fn render_outputs(cli: &Cli, input: &Path) -> Result<()> {
    let mut style = WaveformStyle::default();
    if cli.no_glow {
        style.glow_radius = 0.0;
    }
    let mut session = Session::new(FrameRenderer::new(cli.width, cli.height, style));

    let bytes = std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    session
        .analyze(file_name(input).as_deref(), &bytes)
        .with_context(|| format!("Failed to decode {}", input.display()))?;
    if let Some(report) = session.report() {
        log::info!(
            "Rendering waveform for {} ({:.2}s)",
            input.display(),
            report.metrics.duration
        );
    }

    if let Some(ref out) = cli.waveform {
        let canvas = session.render_static().context("No audio loaded")?;
        canvas.save_png(out)?;
        log::info!("Waveform written to {}", out.display());
    }

    if let Some(ref out) = cli.animate {
        let settings = VideoSettings {
            width: cli.width,
            height: cli.height,
            fps: cli.fps,
            ..VideoSettings::default()
        };
        let sink = encode::sink_for(out, Some(input), &settings)?;
        let options = LoopOptions {
            fps: cli.realtime.then_some(cli.fps),
            max_frames: Some(cli.frames),
        };

        log::info!(
            "Rendering {} frames at {}x{} @ {}fps",
            cli.frames, cli.width, cli.height, cli.fps
        );
        session.start_animation(sink, options)?;

        let pb = ProgressBar::new(cli.frames);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")?
                .progress_chars("=>-"),
        );
        while session.is_animating() {
            pb.set_position(session.frames_rendered());
            std::thread::sleep(Duration::from_millis(50));
        }

        let frames = session.wait_animation().context("Animation was not started")??;
        pb.set_position(frames);
        pb.finish_with_message("Rendering complete");
        log::info!("Done! Output: {}", out.display());
    }

    Ok(())
}
