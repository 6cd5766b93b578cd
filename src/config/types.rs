use reelforge_av::{FfmpegConfig, LogLevel};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub ffmpeg: FfmpegSettings,
}

/// Executable locations. Unset paths fall back to the environment, then
/// a `PATH` search.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,
}

/// Encoding defaults and process limits.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FfmpegSettings {
    /// Transcode timeout in seconds (default: 3600)
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub video_codec: Option<String>,

    #[serde(default)]
    pub video_bitrate: Option<String>,

    #[serde(default)]
    pub audio_codec: Option<String>,

    #[serde(default)]
    pub audio_bitrate: Option<String>,

    /// Directory for concat list files (default: system temp dir)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    /// ffmpeg `-loglevel` (default: error)
    #[serde(default)]
    pub log_level: Option<LogLevel>,
}

impl Config {
    /// Resolve the library configuration, layering file values over the
    /// environment and built-in defaults.
    pub fn to_ffmpeg_config(&self) -> reelforge_av::Result<FfmpegConfig> {
        let mut builder = FfmpegConfig::builder();

        if let Some(ref path) = self.tools.ffmpeg_path {
            builder = builder.ffmpeg_path(expand(path));
        }
        if let Some(ref path) = self.tools.ffprobe_path {
            builder = builder.ffprobe_path(expand(path));
        }

        let ff = &self.ffmpeg;
        if let Some(secs) = ff.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(ref codec) = ff.video_codec {
            builder = builder.video_codec(codec);
        }
        if let Some(ref bitrate) = ff.video_bitrate {
            builder = builder.video_bitrate(bitrate);
        }
        if let Some(ref codec) = ff.audio_codec {
            builder = builder.audio_codec(codec);
        }
        if let Some(ref bitrate) = ff.audio_bitrate {
            builder = builder.audio_bitrate(bitrate);
        }
        if let Some(ref dir) = ff.temp_dir {
            builder = builder.temp_dir(expand(dir));
        }
        if let Some(level) = ff.log_level {
            builder = builder.log_level(level);
        }

        builder.build()
    }
}

fn expand(path: &std::path::Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).into_owned())
}
