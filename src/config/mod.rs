mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./reelforge.toml",
        "~/.config/reelforge/config.toml",
        "/etc/reelforge/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.ffmpeg.timeout_secs == Some(0) {
        anyhow::bail!("ffmpeg timeout_secs cannot be 0");
    }

    let ff = &config.ffmpeg;
    let strings = [
        ("video_codec", &ff.video_codec),
        ("video_bitrate", &ff.video_bitrate),
        ("audio_codec", &ff.audio_codec),
        ("audio_bitrate", &ff.audio_bitrate),
    ];
    for (key, value) in strings {
        if matches!(value, Some(v) if v.trim().is_empty()) {
            anyhow::bail!("ffmpeg {} cannot be empty", key);
        }
    }

    for (key, path) in [
        ("ffmpeg_path", &config.tools.ffmpeg_path),
        ("ffprobe_path", &config.tools.ffprobe_path),
    ] {
        if let Some(p) = path {
            if p.as_os_str().is_empty() {
                anyhow::bail!("tools {} cannot be empty", key);
            }
            if p.is_absolute() && !p.exists() {
                tracing::warn!("Configured {} does not exist: {:?}", key, p);
            }
        }
    }

    Ok(())
}
