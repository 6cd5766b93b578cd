//! Media file probing.
//!
//! Probing always goes through the `ffprobe` CLI; results are never cached.

mod ffprobe;
mod types;

pub use ffprobe::{parse_ffprobe_json, parse_frame_rate, FfprobeProber, PROBE_TIMEOUT};
pub use types::{FormatInfo, MediaInfo};
