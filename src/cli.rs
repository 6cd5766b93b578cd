use clap::{Parser, Subcommand, ValueEnum};
use reelforge_av::{ConcatMode, Resolution};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reelforge")]
#[command(author, version, about = "Probe, compare, concatenate and remix media files")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Copy,
    Reencode,
}

impl From<ModeArg> for ConcatMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Copy => ConcatMode::Copy,
            ModeArg::Reencode => ConcatMode::Reencode,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe a media file and display information
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare two files for lossless concatenation
    Compare {
        first: PathBuf,
        second: PathBuf,

        /// Allowed frame rate difference
        #[arg(long, default_value_t = reelforge_av::DEFAULT_FPS_TOLERANCE)]
        fps_tolerance: f64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether a set of files can be concatenated without re-encoding
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Concatenate two or more files
    Concat {
        #[arg(required = true, num_args = 2..)]
        inputs: Vec<PathBuf>,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Force a mode instead of detecting it
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Use copy mode unless --mode says otherwise
        #[arg(long)]
        no_auto_detect: bool,

        #[arg(long)]
        video_codec: Option<String>,

        #[arg(long)]
        video_bitrate: Option<String>,

        #[arg(long)]
        audio_codec: Option<String>,

        #[arg(long)]
        audio_bitrate: Option<String>,

        /// Target resolution for re-encoding, as WxH
        #[arg(long)]
        resolution: Option<Resolution>,

        /// Target frame rate for re-encoding
        #[arg(long)]
        fps: Option<f64>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a background audio track to a video
    Mix {
        video: PathBuf,
        audio: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Do not loop a background track shorter than the video
        #[arg(long)]
        no_loop: bool,

        /// Blend with the original audio instead of replacing it
        #[arg(long)]
        keep_original: bool,

        /// Background track volume
        #[arg(long, default_value_t = 1.0)]
        audio_volume: f64,

        /// Original track volume when blending
        #[arg(long, default_value_t = 0.0)]
        original_volume: f64,

        #[arg(long)]
        audio_codec: Option<String>,

        #[arg(long)]
        audio_bitrate: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
