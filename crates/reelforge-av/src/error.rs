//! Error types for reelforge-av.

use std::path::PathBuf;
use std::time::Duration;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the external tools.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The executable could not be located or launched.
    #[error("executable not found: {}", path.display())]
    ExecutableNotFound { path: PathBuf },

    /// The process did not exit in time and was killed.
    #[error("command timed out after {}s: {command}", timeout.as_secs_f64())]
    Timeout { command: String, timeout: Duration },

    /// Spawning or talking to the process failed.
    #[error("failed to execute {command}: {source}")]
    ExecutionFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The external tool ran but exited with a non-zero status.
    #[error("{tool} failed (exit code {code}): {stderr}")]
    ToolExecutionFailed {
        tool: String,
        code: i32,
        stderr: String,
    },

    /// An input file does not exist.
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// The probe tool exited non-zero for a file.
    #[error("failed to probe {}: {message}", path.display())]
    ProbeFailed { path: PathBuf, message: String },

    /// Failed to parse tool output.
    #[error("failed to parse {tool} output: {message}")]
    ParseError { tool: String, message: String },

    /// An N-ary operation received fewer than two inputs.
    #[error("at least two input files are required, got {count}")]
    InsufficientInputs { count: usize },

    /// The tool exited successfully but the output file is missing.
    #[error("output file was not created: {}", path.display())]
    OutputMissing { path: PathBuf },

    /// Invalid input provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a parse error.
    pub fn parse_error(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a tool execution failed error from captured stderr.
    pub fn tool_failed(tool: impl Into<String>, code: i32, stderr: impl Into<String>) -> Self {
        Self::ToolExecutionFailed {
            tool: tool.into(),
            code,
            stderr: stderr.into(),
        }
    }

    /// Whether this error was caused by the timeout expiring.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
