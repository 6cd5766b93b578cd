//! Background-audio mixing.
//!
//! The video stream is always stream-copied; only audio is re-encoded.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::{check_exists, duration_secs, finish_output};
use crate::client::FfmpegClient;
use crate::command::ToolCommand;
use crate::filter::{Filter, FilterChain, FilterGraph, MixDuration, PadRef};
use crate::workspace::ensure_parent_dir;
use crate::{Error, Result};

/// Label of the mixed audio when the original track is dropped.
const REPLACE_LABEL: &str = "bgm";
/// Label of the mixed audio when both tracks are blended.
const BLEND_LABEL: &str = "aout";

/// Options for [`mix_audio`].
#[derive(Debug, Clone, PartialEq)]
pub struct MixOptions {
    /// Loop the background track when it is shorter than the video.
    pub loop_audio: bool,
    /// Drop the video's own audio.
    pub replace_original: bool,
    /// Gain applied to the background track.
    pub audio_volume: f64,
    /// Gain applied to the original track; `0.0` behaves like replacing.
    pub original_volume: f64,
    pub audio_codec: Option<String>,
    pub audio_bitrate: Option<String>,
}

impl Default for MixOptions {
    fn default() -> Self {
        Self {
            loop_audio: true,
            replace_original: true,
            audio_volume: 1.0,
            original_volume: 0.0,
            audio_codec: None,
            audio_bitrate: None,
        }
    }
}

impl MixOptions {
    /// Whether the original audio is discarded rather than blended.
    pub fn replaces_original(&self) -> bool {
        self.replace_original || self.original_volume == 0.0
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("audio volume", self.audio_volume),
            ("original volume", self.original_volume),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidInput(format!("invalid {}: {}", name, value)));
            }
        }
        Ok(())
    }
}

/// Outcome of a mix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixAudioResult {
    pub success: bool,
    /// Set only on success.
    pub output_path: Option<PathBuf>,
    pub duration: f64,
    pub size: u64,
    /// The background track was looped to cover the video.
    pub audio_looped: bool,
    pub error_message: Option<String>,
    #[serde(with = "duration_secs")]
    pub execution_time: Duration,
}

/// A background track needs looping when it is shorter than the video.
pub fn needs_loop(video_duration: f64, audio_duration: f64) -> bool {
    audio_duration < video_duration
}

/// Audio filter graph for `options`.
///
/// Replacing yields `[bgm]`; blending yields `[aout]` with the mix length
/// governed by the original track.
pub fn mix_graph(options: &MixOptions) -> Result<FilterGraph> {
    let mut graph = FilterGraph::new();
    if options.replaces_original() {
        graph.push(
            FilterChain::new()
                .input(PadRef::audio(1))
                .filter(Filter::Volume(options.audio_volume))
                .output(REPLACE_LABEL),
        )?;
    } else {
        graph
            .push(
                FilterChain::new()
                    .input(PadRef::audio(0))
                    .filter(Filter::Volume(options.original_volume))
                    .output("orig"),
            )?
            .push(
                FilterChain::new()
                    .input(PadRef::audio(1))
                    .filter(Filter::Volume(options.audio_volume))
                    .output(REPLACE_LABEL),
            )?
            .push(
                FilterChain::new()
                    .input(PadRef::label("orig"))
                    .input(PadRef::label(REPLACE_LABEL))
                    .filter(Filter::Amix {
                        inputs: 2,
                        duration: MixDuration::First,
                    })
                    .output(BLEND_LABEL),
            )?;
    }
    Ok(graph)
}

/// The full mix invocation, truncated to `video_duration` seconds.
pub fn mix_command(
    client: &FfmpegClient,
    video: &Path,
    audio: &Path,
    output: &Path,
    video_duration: f64,
    loop_audio_input: bool,
    options: &MixOptions,
) -> Result<ToolCommand> {
    let graph = mix_graph(options)?;
    let replace = options.replaces_original();
    let config = client.config();

    let mut cmd = client.ffmpeg_command();
    cmd.arg("-i").path_arg(video);
    if loop_audio_input {
        cmd.args(["-stream_loop", "-1"]);
    }
    cmd.arg("-i")
        .path_arg(audio)
        .arg("-filter_complex")
        .arg(graph.to_string())
        .args(["-map", "0:v", "-map"])
        .arg(format!("[{}]", if replace { REPLACE_LABEL } else { BLEND_LABEL }))
        .args(["-c:v", "copy", "-c:a"])
        .arg(options.audio_codec.as_deref().unwrap_or(config.audio_codec()))
        .arg("-b:a")
        .arg(options.audio_bitrate.as_deref().unwrap_or(config.audio_bitrate()));
    if replace {
        cmd.arg("-shortest");
    }
    cmd.arg("-t").arg(video_duration.to_string()).path_arg(output);
    Ok(cmd)
}

/// Lay `audio` under `video`, writing `output`.
///
/// The video is fully probed for its duration; the background track only
/// gets a format-level probe.
pub fn mix_audio(
    client: &FfmpegClient,
    video: &Path,
    audio: &Path,
    output: &Path,
    options: &MixOptions,
) -> MixAudioResult {
    let started = Instant::now();
    tracing::info!(
        video = %video.display(),
        audio = %audio.display(),
        replace = options.replaces_original(),
        "mixing background audio"
    );

    let mut audio_looped = false;
    let outcome = plan_mix(client, video, audio, output, options).and_then(|(cmd, looped)| {
        audio_looped = looped;
        ensure_parent_dir(output)?;
        client.run_ffmpeg(&cmd)?;
        finish_output(client, output)
    });

    match outcome {
        Ok(info) => {
            let execution_time = started.elapsed();
            tracing::info!(
                output = %output.display(),
                audio_looped,
                elapsed_secs = execution_time.as_secs_f64(),
                "audio mix finished"
            );
            MixAudioResult {
                success: true,
                output_path: Some(output.to_path_buf()),
                duration: info.duration,
                size: info.size,
                audio_looped,
                error_message: None,
                execution_time,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, audio_looped, "audio mix failed");
            MixAudioResult {
                success: false,
                output_path: None,
                duration: 0.0,
                size: 0,
                audio_looped,
                error_message: Some(e.to_string()),
                execution_time: started.elapsed(),
            }
        }
    }
}

/// Validate the inputs, probe both durations and build the command.
///
/// Also returns whether the background track will be looped.
fn plan_mix(
    client: &FfmpegClient,
    video: &Path,
    audio: &Path,
    output: &Path,
    options: &MixOptions,
) -> Result<(ToolCommand, bool)> {
    check_exists(video)?;
    check_exists(audio)?;
    options.validate()?;

    let video_duration = client.probe(video)?.duration;
    let audio_duration = client.probe_format(audio)?.duration;
    let looped = needs_loop(video_duration, audio_duration) && options.loop_audio;
    tracing::debug!(video_duration, audio_duration, looped, "resolved mix durations");

    let cmd = mix_command(client, video, audio, output, video_duration, looped, options)?;
    Ok((cmd, looped))
}
