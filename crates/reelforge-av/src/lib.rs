//! # reelforge-av
//!
//! Drives the `ffmpeg` and `ffprobe` command-line tools to inspect, compare,
//! concatenate and remix media files.
//!
//! This crate provides functionality for:
//! - Probing files into a typed [`MediaInfo`]
//! - Deciding whether files can be joined losslessly ([`compare`])
//! - Concatenating by stream copy or by re-encoding through a filter graph
//! - Replacing or blending a video's audio with a background track
//!
//! Every invocation runs through a [`ProcessRunner`] with a timeout; the
//! process is killed when the timeout expires.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::{Path, PathBuf};
//! use reelforge_av::{create_service, MixOptions};
//!
//! let service = create_service(None)?;
//!
//! let info = service.probe(Path::new("/path/to/video.mp4"))?;
//! println!("{} {} @ {:.2} fps", info.resolution(), info.video_codec.unwrap_or_default(), info.fps);
//!
//! let report = service.check_compatibility(&[
//!     PathBuf::from("/path/to/a.mp4"),
//!     PathBuf::from("/path/to/b.mp4"),
//! ])?;
//! println!("recommended: {}", report.recommended_mode);
//!
//! let result = service.mix_audio(
//!     Path::new("/path/to/video.mp4"),
//!     Path::new("/path/to/music.mp3"),
//!     Path::new("/path/to/out.mp4"),
//!     &MixOptions::default(),
//! );
//! assert!(result.success, "{:?}", result.error_message);
//! # Ok::<(), reelforge_av::Error>(())
//! ```

mod error;

pub mod actions;
pub mod client;
pub mod command;
pub mod compare;
pub mod config;
pub mod filter;
pub mod probe;
pub mod service;
pub mod tools;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use actions::{ConcatMode, ConcatResult, MixAudioResult, MixOptions, ReencodeOptions};
pub use client::FfmpegClient;
pub use command::{ProcessRunner, SystemRunner, ToolCommand, ToolOutput};
pub use compare::{compare, CompareResult, DEFAULT_FPS_TOLERANCE};
pub use config::{FfmpegConfig, FfmpegConfigBuilder, LogLevel};
pub use error::{Error, Result};
pub use filter::Resolution;
pub use probe::{parse_ffprobe_json, parse_frame_rate, FormatInfo, MediaInfo};
pub use service::{
    create_service, CompatibilityReport, DefaultService, MediaService, PairComparison,
};
pub use tools::{check_tools, ToolInfo};
pub use workspace::ConcatList;
