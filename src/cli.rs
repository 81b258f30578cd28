use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "beatbuddy",
    about = "Audio quality estimator with waveform rendering",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Audio files to analyze (MP3, WAV, FLAC, M4A, AAC, OGG)
    pub inputs: Vec<PathBuf>,

    /// Config file (defaults to beatbuddy.toml or the user config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    /// Write the static waveform of the first input as PNG
    #[arg(long)]
    pub waveform: Option<PathBuf>,

    /// Export the animated waveform: a video file (.mp4, .mkv, .mov, .webm) or a frame directory
    #[arg(long)]
    pub animate: Option<PathBuf>,

    /// Number of animated frames to export
    #[arg(long, default_value_t = 300)]
    pub frames: u64,

    /// Pace the export in real time instead of rendering as fast as possible
    #[arg(long)]
    pub realtime: bool,

    /// Canvas width in pixels
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Canvas height in pixels
    #[arg(long, default_value_t = 200)]
    pub height: u32,

    /// Animation frames per second
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Disable the glow pass around the waveform stroke
    #[arg(long)]
    pub no_glow: bool,

    /// Maximum accepted file size in MB
    #[arg(long, default_value_t = 50)]
    pub max_mb: u64,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the analyzer over HTTP
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
    },
    /// Send a file to a remote analysis endpoint (returns unverified values)
    Remote {
        /// Endpoint URL, e.g. http://localhost:3000/analyze
        url: String,
        /// Audio file to upload
        file: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}
