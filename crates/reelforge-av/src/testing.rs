//! In-memory [`ProcessRunner`] used by unit tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::command::{ProcessRunner, ToolCommand, ToolOutput};
use crate::probe::MediaInfo;
use crate::Result;

pub(crate) const FAKE_VERSION_LINE: &str =
    "ffmpeg version 6.1-fake Copyright (c) 2000-2023 the FFmpeg developers";

/// Answers probe calls from a table of canned JSON and pretends to
/// transcode by writing a small output file.
#[derive(Default)]
pub(crate) struct ScriptedRunner {
    probes: HashMap<PathBuf, String>,
    output_probe: Option<String>,
    ffmpeg_failure: Option<(i32, String)>,
    skip_output: bool,
    produced: Mutex<HashMap<PathBuf, String>>,
    calls: Mutex<Vec<ToolCommand>>,
    list_files: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answer probes of `path` with `json`.
    pub(crate) fn with_probe(mut self, path: &Path, json: impl Into<String>) -> Self {
        self.probes.insert(path.to_path_buf(), json.into());
        self
    }

    /// Answer probes of any file ffmpeg writes with `json`.
    pub(crate) fn with_output_probe(mut self, json: impl Into<String>) -> Self {
        self.output_probe = Some(json.into());
        self
    }

    /// Make every ffmpeg invocation (including `-version`) exit non-zero.
    pub(crate) fn fail_ffmpeg(mut self, code: i32, stderr: &str) -> Self {
        self.ffmpeg_failure = Some((code, stderr.to_string()));
        self
    }

    /// Report success without writing the output file.
    pub(crate) fn without_output(mut self) -> Self {
        self.skip_output = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<ToolCommand> {
        self.calls.lock().clone()
    }

    /// Transcode invocations only (no probes, no version queries).
    pub(crate) fn ffmpeg_calls(&self) -> Vec<ToolCommand> {
        self.calls()
            .into_iter()
            .filter(|c| !is_probe(c) && !is_version(c))
            .collect()
    }

    /// Contents of concat list files, read while ffmpeg was "running".
    pub(crate) fn list_files(&self) -> Vec<String> {
        self.list_files.lock().clone()
    }
}

fn is_probe(cmd: &ToolCommand) -> bool {
    cmd.has_arg("-print_format")
}

fn is_version(cmd: &ToolCommand) -> bool {
    cmd.get_args().first().is_some_and(|a| a == "-version")
}

fn ok(stdout: impl Into<String>) -> ToolOutput {
    ToolOutput {
        exit_code: 0,
        stdout: stdout.into(),
        stderr: String::new(),
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, cmd: &ToolCommand) -> Result<ToolOutput> {
        self.calls.lock().push(cmd.clone());
        let args = cmd.get_args();
        let last = PathBuf::from(args.last().cloned().unwrap_or_default());

        if is_version(cmd) {
            return Ok(match &self.ffmpeg_failure {
                Some((code, stderr)) => ToolOutput {
                    exit_code: *code,
                    stdout: String::new(),
                    stderr: stderr.clone(),
                },
                None => ok(format!("{FAKE_VERSION_LINE}\nbuilt with fake gcc\n")),
            });
        }

        if is_probe(cmd) {
            let known = self
                .probes
                .get(&last)
                .cloned()
                .or_else(|| self.produced.lock().get(&last).cloned());
            return Ok(match known {
                Some(json) => ok(json),
                None => ToolOutput {
                    exit_code: 1,
                    stdout: String::new(),
                    stderr: format!("{}: Invalid data found when processing input", last.display()),
                },
            });
        }

        if cmd.has_option("-f", "concat") {
            if let Some(pos) = args.iter().position(|a| a == "-i") {
                let contents = std::fs::read_to_string(&args[pos + 1])?;
                self.list_files.lock().push(contents);
            }
        }

        if let Some((code, stderr)) = &self.ffmpeg_failure {
            return Ok(ToolOutput {
                exit_code: *code,
                stdout: String::new(),
                stderr: stderr.clone(),
            });
        }

        if !self.skip_output {
            std::fs::write(&last, b"fake media")?;
            if let Some(json) = &self.output_probe {
                self.produced.lock().insert(last, json.clone());
            }
        }

        Ok(ok(""))
    }
}

/// Render ffprobe-style JSON describing `info`.
pub(crate) fn media_json(info: &MediaInfo) -> String {
    let mut streams = Vec::new();
    if let Some(codec) = &info.video_codec {
        streams.push(serde_json::json!({
            "codec_type": "video",
            "codec_name": codec,
            "width": info.width,
            "height": info.height,
            "pix_fmt": info.pixel_format,
            "r_frame_rate": format!("{}/1", info.fps),
            "bit_rate": info.video_bitrate.to_string(),
        }));
    }
    if let Some(codec) = &info.audio_codec {
        streams.push(serde_json::json!({
            "codec_type": "audio",
            "codec_name": codec,
            "sample_rate": info.sample_rate.to_string(),
            "channels": info.channels,
            "bit_rate": info.audio_bitrate.to_string(),
        }));
    }
    serde_json::json!({
        "format": {
            "format_name": info.format_name,
            "duration": info.duration.to_string(),
            "size": info.size.to_string(),
            "bit_rate": info.bitrate.to_string(),
        },
        "streams": streams,
    })
    .to_string()
}

/// A 1080p30 H.264/AAC clip of the given duration.
pub(crate) fn h264_clip(duration: f64) -> MediaInfo {
    MediaInfo {
        duration,
        size: 1_000_000,
        bitrate: 800_000,
        video_codec: Some("h264".to_string()),
        width: 1920,
        height: 1080,
        fps: 30.0,
        pixel_format: Some("yuv420p".to_string()),
        audio_codec: Some("aac".to_string()),
        sample_rate: 48_000,
        channels: 2,
        format_name: Some("mov,mp4,m4a,3gp,3g2,mj2".to_string()),
        ..Default::default()
    }
}
