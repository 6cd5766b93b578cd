//! Resolved settings for the external tools.
//!
//! [`FfmpegConfig`] is immutable once built. Every field is resolved at
//! construction time by [`FfmpegConfigBuilder::build`], in this order:
//!
//! 1. a value set explicitly on the builder,
//! 2. an environment variable ([`ENV_FFMPEG_PATH`], [`ENV_FFPROBE_PATH`],
//!    [`ENV_TEMP_DIR`]),
//! 3. a `PATH` search for bare executable names,
//! 4. the literal default.
//!
//! To pick up a changed environment, build a new config.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Environment variable overriding the ffmpeg executable.
pub const ENV_FFMPEG_PATH: &str = "FFMPEG_PATH";
/// Environment variable overriding the ffprobe executable.
pub const ENV_FFPROBE_PATH: &str = "FFPROBE_PATH";
/// Environment variable overriding the temp directory.
pub const ENV_TEMP_DIR: &str = "FFMPEG_TEMP_DIR";

/// Default timeout for transcode invocations: 1 hour.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

const DEFAULT_FFMPEG: &str = "ffmpeg";
const DEFAULT_FFPROBE: &str = "ffprobe";
const DEFAULT_VIDEO_CODEC: &str = "libx264";
const DEFAULT_VIDEO_BITRATE: &str = "5000k";
const DEFAULT_AUDIO_CODEC: &str = "aac";
const DEFAULT_AUDIO_BITRATE: &str = "192k";

/// Verbosity passed to ffmpeg via `-loglevel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Quiet,
    Panic,
    Fatal,
    #[default]
    Error,
    Warning,
    Info,
    Verbose,
    Debug,
}

impl LogLevel {
    /// The name ffmpeg expects on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Panic => "panic",
            LogLevel::Fatal => "fatal",
            LogLevel::Error => "error",
            LogLevel::Warning => "warning",
            LogLevel::Info => "info",
            LogLevel::Verbose => "verbose",
            LogLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quiet" => Ok(LogLevel::Quiet),
            "panic" => Ok(LogLevel::Panic),
            "fatal" => Ok(LogLevel::Fatal),
            "error" => Ok(LogLevel::Error),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "info" => Ok(LogLevel::Info),
            "verbose" => Ok(LogLevel::Verbose),
            "debug" => Ok(LogLevel::Debug),
            _ => Err(format!("Unknown ffmpeg log level: {}", s)),
        }
    }
}

/// Immutable tool configuration shared by every operation of a service.
#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegConfig {
    ffmpeg_path: PathBuf,
    ffprobe_path: PathBuf,
    timeout: Duration,
    video_codec: String,
    video_bitrate: String,
    audio_codec: String,
    audio_bitrate: String,
    temp_dir: Option<PathBuf>,
    log_level: LogLevel,
}

impl FfmpegConfig {
    /// Start building a configuration.
    pub fn builder() -> FfmpegConfigBuilder {
        FfmpegConfigBuilder::default()
    }

    /// Resolve a configuration purely from the environment and defaults.
    pub fn from_env() -> Result<Self> {
        Self::builder().build()
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg_path
    }

    pub fn ffprobe_path(&self) -> &Path {
        &self.ffprobe_path
    }

    /// Timeout applied to transcode invocations.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn video_codec(&self) -> &str {
        &self.video_codec
    }

    pub fn video_bitrate(&self) -> &str {
        &self.video_bitrate
    }

    pub fn audio_codec(&self) -> &str {
        &self.audio_codec
    }

    pub fn audio_bitrate(&self) -> &str {
        &self.audio_bitrate
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    /// The configured temp directory, if any.
    pub fn configured_temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_deref()
    }

    /// Directory for temporary artifacts, falling back to the system default.
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Builder for [`FfmpegConfig`].
///
/// # Example
///
/// ```no_run
/// use reelforge_av::FfmpegConfig;
///
/// let config = FfmpegConfig::builder()
///     .video_codec("libx265")
///     .video_bitrate("8000k")
///     .build()?;
/// assert_eq!(config.video_codec(), "libx265");
/// # Ok::<(), reelforge_av::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct FfmpegConfigBuilder {
    ffmpeg_path: Option<PathBuf>,
    ffprobe_path: Option<PathBuf>,
    timeout: Option<Duration>,
    video_codec: Option<String>,
    video_bitrate: Option<String>,
    audio_codec: Option<String>,
    audio_bitrate: Option<String>,
    temp_dir: Option<PathBuf>,
    log_level: Option<LogLevel>,
}

impl FfmpegConfigBuilder {
    pub fn ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = Some(path.into());
        self
    }

    pub fn ffprobe_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffprobe_path = Some(path.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn video_codec(mut self, codec: impl Into<String>) -> Self {
        self.video_codec = Some(codec.into());
        self
    }

    pub fn video_bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.video_bitrate = Some(bitrate.into());
        self
    }

    pub fn audio_codec(mut self, codec: impl Into<String>) -> Self {
        self.audio_codec = Some(codec.into());
        self
    }

    pub fn audio_bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.audio_bitrate = Some(bitrate.into());
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Resolve every field and produce the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured temp directory cannot be created.
    pub fn build(self) -> Result<FfmpegConfig> {
        let ffmpeg_path = resolve_executable(self.ffmpeg_path, ENV_FFMPEG_PATH, DEFAULT_FFMPEG);
        let ffprobe_path =
            resolve_executable(self.ffprobe_path, ENV_FFPROBE_PATH, DEFAULT_FFPROBE);

        let temp_dir = self.temp_dir.or_else(|| env_value(ENV_TEMP_DIR).map(PathBuf::from));
        if let Some(ref dir) = temp_dir {
            std::fs::create_dir_all(dir)?;
        }

        let config = FfmpegConfig {
            ffmpeg_path,
            ffprobe_path,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            video_codec: self
                .video_codec
                .unwrap_or_else(|| DEFAULT_VIDEO_CODEC.to_string()),
            video_bitrate: self
                .video_bitrate
                .unwrap_or_else(|| DEFAULT_VIDEO_BITRATE.to_string()),
            audio_codec: self
                .audio_codec
                .unwrap_or_else(|| DEFAULT_AUDIO_CODEC.to_string()),
            audio_bitrate: self
                .audio_bitrate
                .unwrap_or_else(|| DEFAULT_AUDIO_BITRATE.to_string()),
            temp_dir,
            log_level: self.log_level.unwrap_or_default(),
        };

        tracing::debug!(
            ffmpeg = %config.ffmpeg_path.display(),
            ffprobe = %config.ffprobe_path.display(),
            "resolved tool configuration"
        );

        Ok(config)
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Explicit > environment > literal default, then a `PATH` search for
/// anything that is not already absolute. An unresolvable name is kept
/// verbatim so the runner can report it.
fn resolve_executable(explicit: Option<PathBuf>, env_var: &str, default_name: &str) -> PathBuf {
    let candidate = explicit
        .or_else(|| env_value(env_var).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(default_name));

    if candidate.is_absolute() {
        return candidate;
    }

    which::which(&candidate).unwrap_or(candidate)
}
