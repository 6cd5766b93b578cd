//! Scoped temporary artifacts and output-path preparation.

use std::borrow::Cow;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tempfile::NamedTempFile;

use crate::Result;

/// A concat-demuxer list file that is deleted when dropped.
///
/// The file lives in the configured temp directory under a
/// timestamp-derived name, so concurrent operations never share one.
///
/// # Example
///
/// ```no_run
/// use std::path::{Path, PathBuf};
/// use reelforge_av::ConcatList;
///
/// let inputs = vec![PathBuf::from("a.mp4"), PathBuf::from("b.mp4")];
/// let list = ConcatList::create(Path::new("/tmp"), &inputs)?;
/// // ffmpeg -f concat -safe 0 -i <list.path()> ...
/// drop(list); // removed here
/// # Ok::<(), reelforge_av::Error>(())
/// ```
#[derive(Debug)]
pub struct ConcatList {
    file: NamedTempFile,
}

impl ConcatList {
    /// Write a list file for `inputs` into `dir`.
    pub fn create(dir: &Path, inputs: &[PathBuf]) -> Result<Self> {
        let contents = render_concat_list(inputs)?;
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        let mut file = tempfile::Builder::new()
            .prefix(&format!("concat_list_{}_", stamp))
            .suffix(".txt")
            .tempfile_in(dir)?;
        file.write_all(&contents)?;
        file.flush()?;

        tracing::debug!(list = %file.path().display(), entries = inputs.len(), "wrote concat list");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Escape single quotes for the concat demuxer's quoted-string syntax.
pub fn escape_concat_path(path: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(path.len());
    for &byte in path {
        if byte == b'\'' {
            out.extend_from_slice(b"'\\''");
        } else {
            out.push(byte);
        }
    }
    out
}

/// Render one `file '<absolute path>'` line per input.
///
/// Paths are written as raw bytes on unix, so names that are not valid
/// UTF-8 reach the demuxer unchanged.
pub fn render_concat_list(inputs: &[PathBuf]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for input in inputs {
        let absolute = std::path::absolute(input)?;
        out.extend_from_slice(b"file '");
        out.extend_from_slice(&escape_concat_path(&path_bytes(&absolute)?));
        out.extend_from_slice(b"'\n");
    }
    Ok(out)
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Result<Cow<'_, [u8]>> {
    use std::os::unix::ffi::OsStrExt;
    Ok(Cow::Borrowed(path.as_os_str().as_bytes()))
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Result<Cow<'_, [u8]>> {
    path.to_str()
        .map(|s| Cow::Borrowed(s.as_bytes()))
        .ok_or_else(|| {
            crate::Error::InvalidInput(format!("path is not valid UTF-8: {}", path.display()))
        })
}

/// Create the parent directory of `output` if it is missing.
pub fn ensure_parent_dir(output: &Path) -> Result<()> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
