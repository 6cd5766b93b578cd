//! Low-level ffmpeg/ffprobe client bound to one configuration.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::command::{ProcessRunner, SystemRunner, ToolCommand, ToolOutput};
use crate::compare::{compare, CompareResult};
use crate::config::FfmpegConfig;
use crate::probe::{FfprobeProber, FormatInfo, MediaInfo};
use crate::tools::{self, ToolInfo};
use crate::{Error, Result};

/// Builds and runs tool invocations for one [`FfmpegConfig`].
///
/// Cloning is cheap; clones share the runner.
#[derive(Clone)]
pub struct FfmpegClient {
    config: FfmpegConfig,
    runner: Arc<dyn ProcessRunner>,
}

impl fmt::Debug for FfmpegClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FfmpegClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FfmpegClient {
    /// Create a client that spawns real processes.
    pub fn new(config: FfmpegConfig) -> Self {
        Self::with_runner(config, Arc::new(SystemRunner::new()))
    }

    /// Create a client with a custom process runner.
    pub fn with_runner(config: FfmpegConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &FfmpegConfig {
        &self.config
    }

    /// A transcode command with the common `-y -loglevel <level>` prefix
    /// and the configured timeout.
    pub fn ffmpeg_command(&self) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.config.ffmpeg_path());
        cmd.args(["-y", "-loglevel", self.config.log_level().as_str()])
            .timeout(self.config.timeout());
        cmd
    }

    /// Run a transcode command, turning a non-zero exit into
    /// [`Error::ToolExecutionFailed`].
    pub fn run_ffmpeg(&self, cmd: &ToolCommand) -> Result<ToolOutput> {
        let output = self.runner.run(cmd)?;
        if !output.success() {
            tracing::warn!(
                command = %cmd.describe(),
                exit_code = output.exit_code,
                stderr = %output.stderr.trim(),
                "ffmpeg exited with an error"
            );
            return Err(Error::tool_failed(
                cmd.program_name(),
                output.exit_code,
                output.stderr.trim(),
            ));
        }
        Ok(output)
    }

    fn prober(&self) -> FfprobeProber<'_> {
        FfprobeProber::new(self.config.ffprobe_path(), self.runner.as_ref())
    }

    /// Probe a file's container and stream metadata.
    pub fn probe(&self, path: &Path) -> Result<MediaInfo> {
        self.prober().probe(path)
    }

    /// Probe only a file's container-level duration, size and bitrate.
    pub fn probe_format(&self, path: &Path) -> Result<FormatInfo> {
        self.prober().probe_format(path)
    }

    /// Probe two files and compare their stream parameters.
    pub fn compare_files(&self, a: &Path, b: &Path, fps_tolerance: f64) -> Result<CompareResult> {
        let first = self.probe(a)?;
        let second = self.probe(b)?;
        Ok(compare(&first, &second, fps_tolerance))
    }

    /// Whether `ffmpeg -version` exits successfully.
    pub fn is_available(&self) -> bool {
        tools::is_available(self.runner.as_ref(), self.config.ffmpeg_path())
    }

    /// First line of `ffmpeg -version`, if the tool runs.
    pub fn version(&self) -> Option<String> {
        tools::query_version(self.runner.as_ref(), self.config.ffmpeg_path())
    }

    /// Availability report for both tools.
    pub fn check_tools(&self) -> Vec<ToolInfo> {
        tools::check_tools(self.runner.as_ref(), &self.config)
    }
}
