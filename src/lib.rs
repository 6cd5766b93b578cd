//! Reelforge - probe, compare, concatenate and remix media files with ffmpeg
//!
//! This library crate exposes configuration loading for the binary and for
//! integration testing; the media operations live in `reelforge-av`.

pub mod config;

pub use reelforge_av as av;

use anyhow::{Context, Result};
use reelforge_av::MediaService;

/// Build a media service from a loaded configuration.
pub fn build_service(config: &config::Config) -> Result<MediaService> {
    let ffmpeg = config
        .to_ffmpeg_config()
        .context("Failed to resolve ffmpeg configuration")?;
    Ok(MediaService::new(ffmpeg))
}
