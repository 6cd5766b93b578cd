//! Multi-step media operations.
//!
//! - Concatenation, by stream copy or by re-encoding
//! - Replacing or blending a video's audio with a background track
//!
//! Every operation reports failures inside its result value instead of
//! returning `Err`.

mod concat;
mod mix;

pub use concat::{
    concat_copy, concat_reencode, copy_command, reencode_command, reencode_graph, ConcatMode,
    ConcatResult, ReencodeOptions,
};
pub use mix::{mix_audio, mix_command, mix_graph, needs_loop, MixAudioResult, MixOptions};

use std::path::{Path, PathBuf};

use crate::client::FfmpegClient;
use crate::probe::MediaInfo;
use crate::{Error, Result};

/// Require at least two inputs, all of which exist.
pub(crate) fn check_inputs(inputs: &[PathBuf]) -> Result<()> {
    if inputs.len() < 2 {
        return Err(Error::InsufficientInputs {
            count: inputs.len(),
        });
    }
    inputs.iter().try_for_each(|p| check_exists(p))
}

pub(crate) fn check_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(Error::file_not_found(path))
    }
}

/// Confirm the tool produced `output` and probe it.
pub(crate) fn finish_output(client: &FfmpegClient, output: &Path) -> Result<MediaInfo> {
    if !output.exists() {
        return Err(Error::OutputMissing {
            path: output.to_path_buf(),
        });
    }
    client.probe(output)
}

/// Serde helper to serialize a `Duration` as fractional seconds.
pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
