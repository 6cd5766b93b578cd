//! Concatenation of two or more media files.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::{check_inputs, duration_secs, finish_output};
use crate::client::FfmpegClient;
use crate::command::ToolCommand;
use crate::filter::{Filter, FilterChain, FilterGraph, PadRef, Resolution};
use crate::probe::MediaInfo;
use crate::workspace::{ensure_parent_dir, ConcatList};
use crate::{Error, Result};

/// How inputs are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcatMode {
    /// Concat demuxer with stream copy; inputs must be compatible.
    #[default]
    Copy,
    /// Normalize through a filter graph and re-encode.
    Reencode,
}

impl ConcatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConcatMode::Copy => "copy",
            ConcatMode::Reencode => "reencode",
        }
    }
}

impl fmt::Display for ConcatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConcatMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "copy" => Ok(ConcatMode::Copy),
            "reencode" | "re-encode" => Ok(ConcatMode::Reencode),
            _ => Err(Error::InvalidInput(format!("unknown concat mode: {}", s))),
        }
    }
}

/// Outcome of a concatenation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcatResult {
    pub success: bool,
    /// Set only on success.
    pub output_path: Option<PathBuf>,
    pub mode: ConcatMode,
    /// Output duration in seconds (0 on failure).
    pub duration: f64,
    /// Output size in bytes (0 on failure).
    pub size: u64,
    pub error_message: Option<String>,
    #[serde(with = "duration_secs")]
    pub execution_time: Duration,
}

impl ConcatResult {
    fn from_outcome(
        mode: ConcatMode,
        output: &Path,
        outcome: Result<MediaInfo>,
        execution_time: Duration,
    ) -> Self {
        match outcome {
            Ok(info) => {
                tracing::info!(
                    mode = %mode,
                    output = %output.display(),
                    duration = info.duration,
                    elapsed_secs = execution_time.as_secs_f64(),
                    "concatenation finished"
                );
                Self {
                    success: true,
                    output_path: Some(output.to_path_buf()),
                    mode,
                    duration: info.duration,
                    size: info.size,
                    error_message: None,
                    execution_time,
                }
            }
            Err(e) => Self::failed(mode, &e, execution_time),
        }
    }

    pub(crate) fn failed(mode: ConcatMode, error: &Error, execution_time: Duration) -> Self {
        tracing::warn!(mode = %mode, error = %error, "concatenation failed");
        Self {
            success: false,
            output_path: None,
            mode,
            duration: 0.0,
            size: 0,
            error_message: Some(error.to_string()),
            execution_time,
        }
    }
}

/// Overrides for the re-encode path; unset fields fall back to the
/// configuration defaults, and no resolution or fps means no scaling or
/// rate conversion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReencodeOptions {
    pub video_codec: Option<String>,
    pub video_bitrate: Option<String>,
    pub audio_codec: Option<String>,
    pub audio_bitrate: Option<String>,
    pub resolution: Option<Resolution>,
    pub fps: Option<f64>,
}

/// `ffmpeg -y -loglevel <lvl> -f concat -safe 0 -i <list> -c copy <output>`
pub fn copy_command(client: &FfmpegClient, list: &Path, output: &Path) -> ToolCommand {
    let mut cmd = client.ffmpeg_command();
    cmd.args(["-f", "concat", "-safe", "0", "-i"])
        .path_arg(list)
        .args(["-c", "copy"])
        .path_arg(output);
    cmd
}

/// Per-input normalization chains followed by one `concat` node producing
/// `[outv]` and `[outa]`.
pub fn reencode_graph(inputs: usize, options: &ReencodeOptions) -> Result<FilterGraph> {
    if let Some(fps) = options.fps {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(Error::InvalidInput(format!("invalid frame rate: {}", fps)));
        }
    }

    let mut graph = FilterGraph::new();
    let mut joined = FilterChain::new();

    for i in 0..inputs {
        let mut video = FilterChain::new().input(PadRef::video(i));
        if let Some(res) = options.resolution {
            video = video
                .filter(Filter::Scale {
                    width: res.width,
                    height: res.height,
                })
                .filter(Filter::Pad {
                    width: res.width,
                    height: res.height,
                });
        }
        if let Some(fps) = options.fps {
            video = video.filter(Filter::Fps(fps));
        }
        if options.resolution.is_none() && options.fps.is_none() {
            video = video.filter(Filter::Null);
        }
        let (v, a) = (format!("v{}", i), format!("a{}", i));
        graph.push(video.output(v.as_str()))?;
        graph.push(
            FilterChain::new()
                .input(PadRef::audio(i))
                .filter(Filter::ANull)
                .output(a.as_str()),
        )?;
        joined = joined.input(PadRef::label(v)).input(PadRef::label(a));
    }

    graph.push(
        joined
            .filter(Filter::Concat {
                segments: inputs,
                video: 1,
                audio: 1,
            })
            .output("outv")
            .output("outa"),
    )?;
    Ok(graph)
}

/// The full re-encode invocation for `inputs`.
pub fn reencode_command(
    client: &FfmpegClient,
    inputs: &[PathBuf],
    output: &Path,
    options: &ReencodeOptions,
) -> Result<ToolCommand> {
    let graph = reencode_graph(inputs.len(), options)?;
    let config = client.config();

    let mut cmd = client.ffmpeg_command();
    for input in inputs {
        cmd.arg("-i").path_arg(input);
    }
    cmd.arg("-filter_complex")
        .arg(graph.to_string())
        .args(["-map", "[outv]", "-map", "[outa]"])
        .arg("-c:v")
        .arg(options.video_codec.as_deref().unwrap_or(config.video_codec()))
        .arg("-b:v")
        .arg(options.video_bitrate.as_deref().unwrap_or(config.video_bitrate()))
        .arg("-c:a")
        .arg(options.audio_codec.as_deref().unwrap_or(config.audio_codec()))
        .arg("-b:a")
        .arg(options.audio_bitrate.as_deref().unwrap_or(config.audio_bitrate()))
        .path_arg(output);
    Ok(cmd)
}

/// Join `inputs` with the concat demuxer, without re-encoding.
///
/// The list file is removed before returning, whatever the outcome.
pub fn concat_copy(client: &FfmpegClient, inputs: &[PathBuf], output: &Path) -> ConcatResult {
    let started = Instant::now();
    tracing::info!(inputs = inputs.len(), output = %output.display(), "concatenating by stream copy");

    let outcome = (|| {
        check_inputs(inputs)?;
        ensure_parent_dir(output)?;
        let list = ConcatList::create(&client.config().temp_dir(), inputs)?;
        client.run_ffmpeg(&copy_command(client, list.path(), output))?;
        drop(list);
        finish_output(client, output)
    })();

    ConcatResult::from_outcome(ConcatMode::Copy, output, outcome, started.elapsed())
}

/// Join `inputs` through a normalizing filter graph and re-encode.
pub fn concat_reencode(
    client: &FfmpegClient,
    inputs: &[PathBuf],
    output: &Path,
    options: &ReencodeOptions,
) -> ConcatResult {
    let started = Instant::now();
    tracing::info!(inputs = inputs.len(), output = %output.display(), "concatenating by re-encode");

    let outcome = (|| {
        check_inputs(inputs)?;
        let cmd = reencode_command(client, inputs, output, options)?;
        ensure_parent_dir(output)?;
        client.run_ffmpeg(&cmd)?;
        finish_output(client, output)
    })();

    ConcatResult::from_outcome(ConcatMode::Reencode, output, outcome, started.elapsed())
}
