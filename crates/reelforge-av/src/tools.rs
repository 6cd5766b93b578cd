//! External tool detection.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::command::{ProcessRunner, ToolCommand};
use crate::config::FfmpegConfig;

/// Timeout for `-version` queries.
pub const VERSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Information about an external tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool answered a version query.
    pub available: bool,
    /// First line of the version output if available.
    pub version: Option<String>,
    /// Path the tool was resolved to.
    pub path: PathBuf,
}

/// Run `<tool> -version` and return the first line of its output.
///
/// Returns `None` if the tool cannot be run or exits non-zero.
pub fn query_version(runner: &dyn ProcessRunner, program: &Path) -> Option<String> {
    let mut cmd = ToolCommand::new(program);
    cmd.arg("-version").timeout(VERSION_TIMEOUT);

    match runner.run(&cmd) {
        Ok(output) if output.success() => output.stdout.lines().next().map(|s| s.to_string()),
        Ok(output) => {
            tracing::debug!(
                tool = %program.display(),
                exit_code = output.exit_code,
                "version query failed"
            );
            None
        }
        Err(e) => {
            tracing::debug!(tool = %program.display(), error = %e, "version query failed");
            None
        }
    }
}

/// Whether `<tool> -version` exits with code zero.
pub fn is_available(runner: &dyn ProcessRunner, program: &Path) -> bool {
    let mut cmd = ToolCommand::new(program);
    cmd.arg("-version").timeout(VERSION_TIMEOUT);
    matches!(runner.run(&cmd), Ok(output) if output.success())
}

/// Check a single tool.
pub fn check_tool(runner: &dyn ProcessRunner, name: &str, program: &Path) -> ToolInfo {
    let version = query_version(runner, program);
    ToolInfo {
        name: name.to_string(),
        available: version.is_some(),
        version,
        path: program.to_path_buf(),
    }
}

/// Check the transcode and probe tools named by a configuration.
pub fn check_tools(runner: &dyn ProcessRunner, config: &FfmpegConfig) -> Vec<ToolInfo> {
    vec![
        check_tool(runner, "ffmpeg", config.ffmpeg_path()),
        check_tool(runner, "ffprobe", config.ffprobe_path()),
    ]
}
