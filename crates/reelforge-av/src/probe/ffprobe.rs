//! FFprobe-based media probing.
//!
//! Shells out to `ffprobe -v quiet -print_format json -show_format -show_streams`
//! and maps the JSON output into [`MediaInfo`].

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use super::types::{FormatInfo, MediaInfo};
use crate::command::{ProcessRunner, ToolCommand};
use crate::{Error, Result};

/// Timeout for probe invocations.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// A prober backed by the `ffprobe` CLI.
#[derive(Clone, Copy)]
pub struct FfprobeProber<'a> {
    ffprobe_path: &'a Path,
    runner: &'a dyn ProcessRunner,
}

impl<'a> FfprobeProber<'a> {
    /// Create a prober using the given ffprobe path and runner.
    pub fn new(ffprobe_path: &'a Path, runner: &'a dyn ProcessRunner) -> Self {
        Self {
            ffprobe_path,
            runner,
        }
    }

    /// Probe container and stream metadata.
    ///
    /// # Errors
    ///
    /// - [`Error::FileNotFound`] if `path` does not exist (ffprobe is not run).
    /// - [`Error::ProbeFailed`] if ffprobe exits non-zero.
    /// - [`Error::ParseError`] if its output is not a JSON object.
    pub fn probe(&self, path: &Path) -> Result<MediaInfo> {
        let stdout = self.run(path, true)?;
        parse_ffprobe_json(path, &stdout)
    }

    /// Probe container-level duration, size and bitrate only.
    pub fn probe_format(&self, path: &Path) -> Result<FormatInfo> {
        let stdout = self.run(path, false)?;
        let output = decode(&stdout)?;
        Ok(format_info(&output.format))
    }

    fn run(&self, path: &Path, with_streams: bool) -> Result<String> {
        if !path.exists() {
            return Err(Error::file_not_found(path));
        }

        let mut cmd = ToolCommand::new(self.ffprobe_path);
        cmd.args(["-v", "quiet", "-print_format", "json", "-show_format"]);
        if with_streams {
            cmd.arg("-show_streams");
        }
        cmd.path_arg(path).timeout(PROBE_TIMEOUT);

        let output = self.runner.run(&cmd)?;
        if !output.success() {
            let stderr = output.stderr.trim();
            let message = if stderr.is_empty() {
                format!("ffprobe exited with code {}", output.exit_code)
            } else {
                stderr.to_string()
            };
            return Err(Error::ProbeFailed {
                path: path.to_path_buf(),
                message,
            });
        }

        Ok(output.stdout)
    }
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<Numeric>,
    size: Option<Numeric>,
    bit_rate: Option<Numeric>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    bit_rate: Option<Numeric>,
    width: Option<Numeric>,
    height: Option<Numeric>,
    pix_fmt: Option<String>,
    r_frame_rate: Option<String>,
    sample_rate: Option<Numeric>,
    channels: Option<Numeric>,
}

/// ffprobe prints most numbers as strings (`"duration": "10.000000"`) but
/// some as JSON numbers (`"width": 1920`); accept both.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Numeric::Number(n) => *n,
            Numeric::Text(s) => s.trim().parse().ok()?,
        };
        value.is_finite().then_some(value)
    }

    fn as_u64(&self) -> Option<u64> {
        if let Numeric::Text(s) = self {
            if let Ok(v) = s.trim().parse::<u64>() {
                return Some(v);
            }
        }
        self.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64)
    }
}

fn f64_or_zero(value: &Option<Numeric>) -> f64 {
    value.as_ref().and_then(Numeric::as_f64).unwrap_or(0.0)
}

fn u64_or_zero(value: &Option<Numeric>) -> u64 {
    value.as_ref().and_then(Numeric::as_u64).unwrap_or(0)
}

fn u32_or_zero(value: &Option<Numeric>) -> u32 {
    u32::try_from(u64_or_zero(value)).unwrap_or(u32::MAX)
}

fn decode(stdout: &str) -> Result<FfprobeOutput> {
    let value: serde_json::Value = serde_json::from_str(stdout)
        .map_err(|e| Error::parse_error("ffprobe", format!("invalid JSON: {e}")))?;
    if !value.is_object() {
        return Err(Error::parse_error("ffprobe", "expected a JSON object"));
    }
    FfprobeOutput::deserialize(value)
        .map_err(|e| Error::parse_error("ffprobe", format!("unexpected structure: {e}")))
}

fn format_info(format: &FfprobeFormat) -> FormatInfo {
    FormatInfo {
        duration: f64_or_zero(&format.duration),
        size: u64_or_zero(&format.size),
        bitrate: u64_or_zero(&format.bit_rate),
    }
}

/// Parse the JSON printed by `ffprobe -print_format json -show_format
/// -show_streams` into a [`MediaInfo`] for `path`.
///
/// The first video stream and the first audio stream fill the video and
/// audio fields; later streams of the same type are ignored. Missing
/// numbers become `0`, missing strings `None`.
pub fn parse_ffprobe_json(path: &Path, stdout: &str) -> Result<MediaInfo> {
    let output = decode(stdout)?;
    let format = format_info(&output.format);

    let mut info = MediaInfo {
        path: path.to_path_buf(),
        duration: format.duration,
        size: format.size,
        bitrate: format.bitrate,
        format_name: output.format.format_name,
        ..Default::default()
    };

    let mut seen_video = false;
    let mut seen_audio = false;

    for stream in output.streams {
        match stream.codec_type.as_deref() {
            Some("video") if !seen_video => {
                seen_video = true;
                info.video_codec = stream.codec_name;
                info.video_bitrate = u64_or_zero(&stream.bit_rate);
                info.width = u32_or_zero(&stream.width);
                info.height = u32_or_zero(&stream.height);
                info.pixel_format = stream.pix_fmt;
                info.fps = parse_frame_rate(stream.r_frame_rate.as_deref().unwrap_or("0/1"));
            }
            Some("audio") if !seen_audio => {
                seen_audio = true;
                info.audio_codec = stream.codec_name;
                info.audio_bitrate = u64_or_zero(&stream.bit_rate);
                info.sample_rate = u32_or_zero(&stream.sample_rate);
                info.channels = u32_or_zero(&stream.channels);
            }
            _ => {}
        }
    }

    Ok(info)
}

/// Parse an ffprobe frame rate.
///
/// `"num/den"` yields `num / den`, with a zero denominator giving `0.0`.
/// A plain number is parsed directly. Anything unparseable or non-finite
/// yields `0.0`.
pub fn parse_frame_rate(rate: &str) -> f64 {
    let rate = rate.trim();
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let (Ok(num), Ok(den)) = (num.trim().parse::<f64>(), den.trim().parse::<f64>()) else {
                return 0.0;
            };
            if den > 0.0 {
                num / den
            } else {
                0.0
            }
        }
        None => rate.parse::<f64>().unwrap_or(0.0),
    };

    if value.is_finite() {
        value
    } else {
        0.0
    }
}
