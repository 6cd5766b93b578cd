//! Media information types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Metadata for a media file, built fresh from every probe.
///
/// Only the first video and the first audio stream are described.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Path that was probed.
    pub path: PathBuf,
    /// Container duration in seconds.
    pub duration: f64,
    /// File size in bytes.
    pub size: u64,
    /// Overall bitrate in bits per second.
    pub bitrate: u64,

    pub video_codec: Option<String>,
    pub video_bitrate: u64,
    pub width: u32,
    pub height: u32,
    /// Frames per second.
    pub fps: f64,
    pub pixel_format: Option<String>,

    pub audio_codec: Option<String>,
    pub audio_bitrate: u64,
    pub sample_rate: u32,
    pub channels: u32,

    /// Container format name as reported by the probe tool.
    pub format_name: Option<String>,
}

impl MediaInfo {
    /// Resolution as `"{width}x{height}"`.
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    pub fn has_video(&self) -> bool {
        self.video_codec.is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.audio_codec.is_some()
    }
}

/// Container-level summary from a format-only probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatInfo {
    /// Container duration in seconds.
    pub duration: f64,
    pub size: u64,
    pub bitrate: u64,
}
