//! Shared test harness for integration tests.
//!
//! Provides [`FakeTools`], which installs stand-in `ffmpeg` and `ffprobe`
//! shell scripts into a temp directory. Media "files" are placeholders with
//! two sidecars: `<file>.json` (what ffprobe prints) and `<file>.dur` (the
//! duration fake ffmpeg adds up when it writes an output).

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use reelforge_av::{FfmpegConfig, MediaService};
use tempfile::TempDir;

const FAKE_FFMPEG: &str = r#"#!/bin/sh
dir=$(dirname "$0")
if [ "$1" = "-version" ]; then
  echo "ffmpeg version 6.1-fake Copyright (c) 2000-2023 the FFmpeg developers"
  echo "built with fake"
  exit 0
fi
printf '%s\n' "$*" >> "$dir/ffmpeg.log"
if [ -f "$dir/slow" ]; then
  sleep 3
  touch "$dir/woke"
  exit 0
fi
if [ -f "$dir/fail" ]; then
  cat "$dir/fail" >&2
  exit 1
fi

for out; do :; done
mode=filter
limit=""
inputs=""
prev=""
for arg in "$@"; do
  case "$prev" in
    -i) inputs="$inputs$arg
" ;;
    -f) [ "$arg" = concat ] && mode=copy ;;
    -t) limit="$arg" ;;
  esac
  prev="$arg"
done

sum_durations() {
  while IFS= read -r f; do
    [ -n "$f" ] && [ -f "$f.dur" ] && cat "$f.dur" && echo
  done | awk '{ s += $1 } END { printf "%g", s }'
}

if [ -n "$limit" ]; then
  total="$limit"
elif [ "$mode" = copy ]; then
  list=$(printf '%s' "$inputs" | head -n 1)
  total=$(sed -n "s/^file '\(.*\)'$/\1/p" "$list" | sum_durations)
else
  total=$(printf '%s' "$inputs" | sum_durations)
fi

[ -f "$dir/no-output" ] && exit 0

printf 'fake media' > "$out"
printf '%s' "$total" > "$out.dur"
cat > "$out.json" <<EOF
{"format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "$total", "size": "10", "bit_rate": "800000"},
 "streams": [
  {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080, "r_frame_rate": "30/1"},
  {"codec_type": "audio", "codec_name": "aac", "sample_rate": "48000", "channels": 2}
 ]}
EOF
exit 0
"#;

const FAKE_FFPROBE: &str = r#"#!/bin/sh
printf '%s\n' "$*" >> "$(dirname "$0")/ffprobe.log"
for target; do :; done
if [ -f "$target.json" ]; then
  cat "$target.json"
  exit 0
fi
echo "$target: Invalid data found when processing input" >&2
exit 1
"#;

/// Stream parameters of a fake media file.
#[derive(Debug, Clone)]
pub struct Clip {
    pub duration: f64,
    pub video: Option<(String, u32, u32, String)>,
    pub audio: Option<(String, u32, u32)>,
}

impl Clip {
    /// A 1080p30 H.264 / AAC stereo clip.
    pub fn h264(duration: f64) -> Self {
        Self {
            duration,
            video: Some(("h264".to_string(), 1920, 1080, "30/1".to_string())),
            audio: Some(("aac".to_string(), 48_000, 2)),
        }
    }

    /// An audio-only track.
    pub fn song(duration: f64) -> Self {
        Self {
            duration,
            video: None,
            audio: Some(("mp3".to_string(), 44_100, 2)),
        }
    }

    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        if let Some(ref mut v) = self.video {
            v.1 = width;
            v.2 = height;
        }
        self
    }

    pub fn codec(mut self, codec: &str) -> Self {
        if let Some(ref mut v) = self.video {
            v.0 = codec.to_string();
        }
        self
    }

    pub fn frame_rate(mut self, rate: &str) -> Self {
        if let Some(ref mut v) = self.video {
            v.3 = rate.to_string();
        }
        self
    }

    fn probe_json(&self) -> String {
        let mut streams = Vec::new();
        if let Some((ref codec, width, height, ref rate)) = self.video {
            streams.push(serde_json::json!({
                "codec_type": "video",
                "codec_name": codec,
                "width": width,
                "height": height,
                "pix_fmt": "yuv420p",
                "r_frame_rate": rate,
                "bit_rate": "700000",
            }));
        }
        if let Some((ref codec, rate, channels)) = self.audio {
            streams.push(serde_json::json!({
                "codec_type": "audio",
                "codec_name": codec,
                "sample_rate": rate.to_string(),
                "channels": channels,
                "bit_rate": "128000",
            }));
        }
        serde_json::json!({
            "format": {
                "format_name": "mov,mp4,m4a,3gp,3g2,mj2",
                "duration": format!("{:.6}", self.duration),
                "size": "1048576",
                "bit_rate": "828000",
            },
            "streams": streams,
        })
        .to_string()
    }
}

/// Fake `ffmpeg`/`ffprobe` installed in a private temp directory.
pub struct FakeTools {
    dir: TempDir,
}

impl FakeTools {
    pub fn install() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tools dir");
        write_script(&dir.path().join("ffmpeg"), FAKE_FFMPEG);
        write_script(&dir.path().join("ffprobe"), FAKE_FFPROBE);
        fs::create_dir_all(dir.path().join("media")).expect("failed to create media dir");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn ffmpeg(&self) -> PathBuf {
        self.root().join("ffmpeg")
    }

    pub fn ffprobe(&self) -> PathBuf {
        self.root().join("ffprobe")
    }

    /// Where concat list files go.
    pub fn temp_dir(&self) -> PathBuf {
        self.root().join("tmp")
    }

    pub fn config(&self) -> FfmpegConfig {
        FfmpegConfig::builder()
            .ffmpeg_path(self.ffmpeg())
            .ffprobe_path(self.ffprobe())
            .temp_dir(self.temp_dir())
            .build()
            .expect("failed to build config")
    }

    pub fn service(&self) -> MediaService {
        MediaService::new(self.config())
    }

    /// Create a fake media file under `media/`.
    pub fn media(&self, name: &str, clip: &Clip) -> PathBuf {
        let path = self.root().join("media").join(name);
        fs::write(&path, b"placeholder").unwrap();
        fs::write(sidecar(&path, "json"), clip.probe_json()).unwrap();
        fs::write(sidecar(&path, "dur"), clip.duration.to_string()).unwrap();
        path
    }

    /// A path under `media/` that does not exist.
    pub fn missing(&self, name: &str) -> PathBuf {
        self.root().join("media").join(name)
    }

    /// Make every transcode exit 1 with `stderr`.
    pub fn fail_with(&self, stderr: &str) {
        fs::write(self.root().join("fail"), stderr).unwrap();
    }

    /// Make every transcode hang in a child of the tool process.
    pub fn hang(&self) {
        fs::write(self.root().join("slow"), b"").unwrap();
    }

    /// Whether a hung transcode ever finished its sleep.
    pub fn hang_survived(&self) -> bool {
        self.root().join("woke").exists()
    }

    /// Make every transcode exit 0 without writing its output.
    pub fn skip_output(&self) {
        fs::write(self.root().join("no-output"), b"").unwrap();
    }

    /// Argument lines of every transcode invocation so far.
    pub fn ffmpeg_invocations(&self) -> Vec<String> {
        read_log(&self.root().join("ffmpeg.log"))
    }

    pub fn ffprobe_invocations(&self) -> Vec<String> {
        read_log(&self.root().join("ffprobe.log"))
    }

    /// Files left in the list-file directory.
    pub fn temp_entries(&self) -> usize {
        fs::read_dir(self.temp_dir()).map(|d| d.count()).unwrap_or(0)
    }

    /// Write a config file pointing at the fake tools.
    pub fn write_config(&self) -> PathBuf {
        let path = self.root().join("reelforge.toml");
        let content = format!(
            "[tools]\nffmpeg_path = {:?}\nffprobe_path = {:?}\n\n[ffmpeg]\ntemp_dir = {:?}\ntimeout_secs = 30\n",
            self.ffmpeg().display().to_string(),
            self.ffprobe().display().to_string(),
            self.temp_dir().display().to_string(),
        );
        fs::write(&path, content).unwrap();
        path
    }
}

fn sidecar(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}

fn read_log(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}
