//! Stream-parameter comparison between two probed files.

use serde::{Deserialize, Serialize};

use crate::probe::MediaInfo;

/// Default allowed frame-rate difference, in frames per second.
pub const DEFAULT_FPS_TOLERANCE: f64 = 0.1;

/// Outcome of comparing two files' stream parameters.
///
/// `is_compatible` is true iff all four sub-verdicts are true; in that
/// case `differences` is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompareResult {
    pub is_compatible: bool,
    pub codec_match: bool,
    pub resolution_match: bool,
    pub fps_match: bool,
    pub audio_match: bool,
    /// Human-readable mismatches, in codec, resolution, fps, audio order.
    pub differences: Vec<String>,
}

impl CompareResult {
    /// Whether the pair can be joined without re-encoding.
    pub fn can_concat_copy(&self) -> bool {
        self.is_compatible
    }
}

fn name_or_none(name: &Option<String>) -> &str {
    name.as_deref().unwrap_or("none")
}

/// Compare the parameters that must agree for lossless concatenation.
///
/// Video codec (case-sensitive, two absent codecs match), resolution, frame
/// rate within `fps_tolerance`, and the audio codec / sample rate / channel
/// count triplet.
pub fn compare(a: &MediaInfo, b: &MediaInfo, fps_tolerance: f64) -> CompareResult {
    let mut differences = Vec::new();

    let codec_match = a.video_codec == b.video_codec;
    if !codec_match {
        differences.push(format!(
            "video codec differs: {} vs {}",
            name_or_none(&a.video_codec),
            name_or_none(&b.video_codec)
        ));
    }

    let resolution_match = a.width == b.width && a.height == b.height;
    if !resolution_match {
        differences.push(format!(
            "resolution differs: {} vs {}",
            a.resolution(),
            b.resolution()
        ));
    }

    let fps_match = (a.fps - b.fps).abs() <= fps_tolerance;
    if !fps_match {
        differences.push(format!("frame rate differs: {:.2} vs {:.2}", a.fps, b.fps));
    }

    let audio_codec_match = a.audio_codec == b.audio_codec;
    let sample_rate_match = a.sample_rate == b.sample_rate;
    let channels_match = a.channels == b.channels;
    let audio_match = audio_codec_match && sample_rate_match && channels_match;

    if !audio_codec_match {
        differences.push(format!(
            "audio codec differs: {} vs {}",
            name_or_none(&a.audio_codec),
            name_or_none(&b.audio_codec)
        ));
    }
    if !sample_rate_match {
        differences.push(format!(
            "sample rate differs: {} vs {}",
            a.sample_rate, b.sample_rate
        ));
    }
    if !channels_match {
        differences.push(format!(
            "channel count differs: {} vs {}",
            a.channels, b.channels
        ));
    }

    CompareResult {
        is_compatible: codec_match && resolution_match && fps_match && audio_match,
        codec_match,
        resolution_match,
        fps_match,
        audio_match,
        differences,
    }
}
