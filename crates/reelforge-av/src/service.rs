//! High-level media operations bound to one configuration.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;

use crate::actions::{
    self, check_inputs, ConcatMode, ConcatResult, MixAudioResult, MixOptions, ReencodeOptions,
};
use crate::client::FfmpegClient;
use crate::command::ProcessRunner;
use crate::compare::{compare, CompareResult, DEFAULT_FPS_TOLERANCE};
use crate::config::FfmpegConfig;
use crate::probe::MediaInfo;
use crate::tools::ToolInfo;
use crate::Result;

/// One pairwise comparison inside a [`CompatibilityReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairComparison {
    pub first: PathBuf,
    pub second: PathBuf,
    pub compatible: bool,
    pub differences: Vec<String>,
}

/// Compatibility of a set of files, judged against the first one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompatibilityReport {
    pub compatible: bool,
    pub recommended_mode: ConcatMode,
    pub comparisons: Vec<PairComparison>,
    /// Union of every comparison's differences, deduplicated and sorted.
    pub all_differences: Vec<String>,
}

/// Probe, compare, concatenate and mix media files.
///
/// Holds no mutable state; share it freely across threads.
///
/// # Example
///
/// ```no_run
/// use std::path::{Path, PathBuf};
/// use reelforge_av::{FfmpegConfig, MediaService, ReencodeOptions};
///
/// let service = MediaService::new(FfmpegConfig::from_env()?);
/// let inputs = vec![PathBuf::from("a.mp4"), PathBuf::from("b.mp4")];
/// let result = service.concat(&inputs, Path::new("joined.mp4"), None, true, &ReencodeOptions::default());
/// println!("{} in {:?}", result.mode, result.execution_time);
/// # Ok::<(), reelforge_av::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct MediaService {
    client: FfmpegClient,
}

impl MediaService {
    pub fn new(config: FfmpegConfig) -> Self {
        Self {
            client: FfmpegClient::new(config),
        }
    }

    /// Create a service that runs commands through `runner`.
    pub fn with_runner(config: FfmpegConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            client: FfmpegClient::with_runner(config, runner),
        }
    }

    pub fn config(&self) -> &FfmpegConfig {
        self.client.config()
    }

    /// Probe a file. Failures surface as `Err`.
    pub fn probe(&self, path: &Path) -> Result<MediaInfo> {
        self.client.probe(path)
    }

    /// Compare two files with the default frame-rate tolerance.
    pub fn compare(&self, a: &Path, b: &Path) -> Result<CompareResult> {
        self.client.compare_files(a, b, DEFAULT_FPS_TOLERANCE)
    }

    pub fn compare_with_tolerance(
        &self,
        a: &Path,
        b: &Path,
        fps_tolerance: f64,
    ) -> Result<CompareResult> {
        self.client.compare_files(a, b, fps_tolerance)
    }

    /// Copy if the first input is compatible with every other input,
    /// otherwise re-encode.
    pub fn detect_concat_mode(&self, inputs: &[PathBuf]) -> Result<ConcatMode> {
        let Some((first, rest)) = inputs.split_first() else {
            return Ok(ConcatMode::Copy);
        };
        let reference = self.client.probe(first)?;
        for other in rest {
            let info = self.client.probe(other)?;
            let result = compare(&reference, &info, DEFAULT_FPS_TOLERANCE);
            if !result.is_compatible {
                tracing::info!(
                    first = %first.display(),
                    other = %other.display(),
                    differences = ?result.differences,
                    "inputs differ, re-encoding"
                );
                return Ok(ConcatMode::Reencode);
            }
        }
        Ok(ConcatMode::Copy)
    }

    /// Concatenate `inputs` into `output`.
    ///
    /// An explicit `mode` wins. Otherwise the mode is detected when
    /// `auto_detect` is set and defaults to copy when it is not.
    /// `options` only affects the re-encode path.
    pub fn concat(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        mode: Option<ConcatMode>,
        auto_detect: bool,
        options: &ReencodeOptions,
    ) -> ConcatResult {
        let started = Instant::now();
        let fallback_mode = mode.unwrap_or_default();

        if let Err(e) = check_inputs(inputs) {
            return ConcatResult::failed(fallback_mode, &e, started.elapsed());
        }

        let mode = match mode {
            Some(mode) => mode,
            None if auto_detect => match self.detect_concat_mode(inputs) {
                Ok(mode) => mode,
                Err(e) => return ConcatResult::failed(fallback_mode, &e, started.elapsed()),
            },
            None => ConcatMode::Copy,
        };

        let mut result = match mode {
            ConcatMode::Copy => self.concat_copy(inputs, output),
            ConcatMode::Reencode => self.concat_reencode(inputs, output, options),
        };
        result.execution_time = started.elapsed();
        result
    }

    pub fn concat_copy(&self, inputs: &[PathBuf], output: &Path) -> ConcatResult {
        actions::concat_copy(&self.client, inputs, output)
    }

    pub fn concat_reencode(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        options: &ReencodeOptions,
    ) -> ConcatResult {
        actions::concat_reencode(&self.client, inputs, output, options)
    }

    pub fn mix_audio(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        options: &MixOptions,
    ) -> MixAudioResult {
        actions::mix_audio(&self.client, video, audio, output, options)
    }

    /// Compare the first file against each of the others.
    ///
    /// Fewer than two files are trivially compatible.
    pub fn check_compatibility(&self, inputs: &[PathBuf]) -> Result<CompatibilityReport> {
        let mut report = CompatibilityReport {
            compatible: true,
            recommended_mode: ConcatMode::Copy,
            comparisons: Vec::new(),
            all_differences: Vec::new(),
        };
        if inputs.len() < 2 {
            return Ok(report);
        }

        let first = &inputs[0];
        let reference = self.client.probe(first)?;
        let mut differences = BTreeSet::new();

        for other in &inputs[1..] {
            let result = compare(&reference, &self.client.probe(other)?, DEFAULT_FPS_TOLERANCE);
            report.compatible &= result.is_compatible;
            differences.extend(result.differences.iter().cloned());
            report.comparisons.push(PairComparison {
                first: first.clone(),
                second: other.clone(),
                compatible: result.is_compatible,
                differences: result.differences,
            });
        }

        if !report.compatible {
            report.recommended_mode = ConcatMode::Reencode;
        }
        report.all_differences = differences.into_iter().collect();
        Ok(report)
    }

    pub fn is_available(&self) -> bool {
        self.client.is_available()
    }

    pub fn version(&self) -> Option<String> {
        self.client.version()
    }

    pub fn check_tools(&self) -> Vec<ToolInfo> {
        self.client.check_tools()
    }
}

/// Build a service from `config`, or from the environment when `None`.
///
/// Logs a warning if ffmpeg does not answer a version query; the service
/// is returned either way.
pub fn create_service(config: Option<FfmpegConfig>) -> Result<MediaService> {
    let config = match config {
        Some(config) => config,
        None => FfmpegConfig::from_env()?,
    };
    let service = MediaService::new(config);
    match service.version() {
        Some(version) => tracing::debug!(%version, "ffmpeg available"),
        None => tracing::warn!(
            ffmpeg = %service.config().ffmpeg_path().display(),
            "ffmpeg is not available"
        ),
    }
    Ok(service)
}

/// A caller-owned, lazily built shared service.
///
/// The first [`get`](Self::get) builds the service; later calls return the
/// same instance until [`reset`](Self::reset).
#[derive(Debug, Default)]
pub struct DefaultService {
    config: Option<FfmpegConfig>,
    slot: Mutex<Option<Arc<MediaService>>>,
}

impl DefaultService {
    /// A cache that builds its service from the environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache that builds its service from `config`.
    pub fn with_config(config: FfmpegConfig) -> Self {
        Self {
            config: Some(config),
            slot: Mutex::new(None),
        }
    }

    pub fn get(&self) -> Result<Arc<MediaService>> {
        let mut slot = self.slot.lock();
        if let Some(service) = slot.as_ref() {
            return Ok(Arc::clone(service));
        }
        let service = Arc::new(create_service(self.config.clone())?);
        *slot = Some(Arc::clone(&service));
        Ok(service)
    }

    /// Drop the cached instance; the next `get` builds a new one.
    pub fn reset(&self) {
        self.slot.lock().take();
    }

    pub fn is_initialized(&self) -> bool {
        self.slot.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{h264_clip, media_json, ScriptedRunner};

    struct Fixture {
        dir: tempfile::TempDir,
        runner: ScriptedRunner,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
                runner: ScriptedRunner::new(),
            }
        }

        fn clip(mut self, name: &str, info: &MediaInfo) -> Self {
            let path = self.path(name);
            std::fs::write(&path, b"").unwrap();
            self.runner = self.runner.with_probe(&path, media_json(info));
            self
        }

        fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        fn paths(&self, names: &[&str]) -> Vec<PathBuf> {
            names.iter().map(|n| self.path(n)).collect()
        }

        fn service(self) -> (MediaService, Arc<ScriptedRunner>, tempfile::TempDir) {
            let runner = Arc::new(self.runner.with_output_probe(media_json(&h264_clip(20.0))));
            let config = FfmpegConfig::builder()
                .ffmpeg_path("/usr/bin/ffmpeg")
                .ffprobe_path("/usr/bin/ffprobe")
                .temp_dir(self.dir.path().join("tmp"))
                .build()
                .unwrap();
            (
                MediaService::with_runner(config, runner.clone()),
                runner,
                self.dir,
            )
        }
    }

    fn codec(name: &str) -> MediaInfo {
        MediaInfo {
            video_codec: Some(name.to_string()),
            ..h264_clip(10.0)
        }
    }

    fn resolution(width: u32, height: u32) -> MediaInfo {
        MediaInfo {
            width,
            height,
            ..h264_clip(10.0)
        }
    }

    #[test]
    fn compatible_inputs_are_copied() {
        let fx = Fixture::new()
            .clip("a.mp4", &h264_clip(10.0))
            .clip("b.mp4", &h264_clip(10.0));
        let inputs = fx.paths(&["a.mp4", "b.mp4"]);
        let output = fx.path("out.mp4");
        let (service, runner, _dir) = fx.service();

        let result = service.concat(&inputs, &output, None, true, &ReencodeOptions::default());

        assert!(result.success, "{:?}", result.error_message);
        assert_eq!(result.mode, ConcatMode::Copy);
        assert!(runner.ffmpeg_calls()[0].has_option("-f", "concat"));
    }

    #[test]
    fn differing_resolution_is_reencoded() {
        let fx = Fixture::new()
            .clip("a.mp4", &h264_clip(10.0))
            .clip("b.mp4", &resolution(1280, 720));
        let inputs = fx.paths(&["a.mp4", "b.mp4"]);
        let output = fx.path("out.mp4");
        let (service, runner, _dir) = fx.service();

        let result = service.concat(&inputs, &output, None, true, &ReencodeOptions::default());

        assert!(result.success, "{:?}", result.error_message);
        assert_eq!(result.mode, ConcatMode::Reencode);
        let calls = runner.ffmpeg_calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].has_option("-map", "[outv]"));
    }

    #[test]
    fn without_auto_detect_defaults_to_copy() {
        let fx = Fixture::new()
            .clip("a.mp4", &h264_clip(10.0))
            .clip("b.mp4", &resolution(640, 480));
        let inputs = fx.paths(&["a.mp4", "b.mp4"]);
        let output = fx.path("out.mp4");
        let (service, runner, _dir) = fx.service();

        let result = service.concat(&inputs, &output, None, false, &ReencodeOptions::default());

        assert_eq!(result.mode, ConcatMode::Copy);
        // No detection probes: only the transcode and the output probe run.
        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn explicit_mode_skips_detection() {
        let fx = Fixture::new()
            .clip("a.mp4", &h264_clip(10.0))
            .clip("b.mp4", &h264_clip(10.0));
        let inputs = fx.paths(&["a.mp4", "b.mp4"]);
        let output = fx.path("out.mp4");
        let (service, _runner, _dir) = fx.service();

        let result = service.concat(
            &inputs,
            &output,
            Some(ConcatMode::Reencode),
            true,
            &ReencodeOptions::default(),
        );
        assert_eq!(result.mode, ConcatMode::Reencode);
    }

    #[test]
    fn missing_input_runs_no_process() {
        let fx = Fixture::new().clip("a.mp4", &h264_clip(10.0));
        let inputs = fx.paths(&["missing.mp4", "a.mp4"]);
        let output = fx.path("out.mp4");
        let (service, runner, _dir) = fx.service();

        let result = service.concat(&inputs, &output, None, true, &ReencodeOptions::default());

        assert!(!result.success);
        assert!(result.error_message.unwrap().contains("missing.mp4"));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn codec_only_difference_is_reported_once() {
        let fx = Fixture::new()
            .clip("a.mp4", &h264_clip(10.0))
            .clip("b.mp4", &codec("hevc"))
            .clip("c.mp4", &codec("hevc"));
        let inputs = fx.paths(&["a.mp4", "b.mp4", "c.mp4"]);
        let (service, _runner, _dir) = fx.service();

        let report = service.check_compatibility(&inputs).unwrap();

        assert!(!report.compatible);
        assert_eq!(report.recommended_mode, ConcatMode::Reencode);
        assert_eq!(report.comparisons.len(), 2);
        assert_eq!(report.all_differences, vec!["video codec differs: h264 vs hevc"]);
        assert_eq!(report.comparisons[1].second, inputs[2]);
    }

    #[test]
    fn mixed_report_tracks_each_pair() {
        let fx = Fixture::new()
            .clip("a.mp4", &h264_clip(10.0))
            .clip("b.mp4", &h264_clip(3.0))
            .clip("c.mp4", &codec("vp9"));
        let inputs = fx.paths(&["a.mp4", "b.mp4", "c.mp4"]);
        let (service, _runner, _dir) = fx.service();

        let report = service.check_compatibility(&inputs).unwrap();

        assert!(report.comparisons[0].compatible);
        assert!(!report.comparisons[1].compatible);
        assert!(!report.compatible);
    }

    #[test]
    fn single_file_is_trivially_compatible() {
        let fx = Fixture::new().clip("a.mp4", &h264_clip(10.0));
        let inputs = fx.paths(&["a.mp4"]);
        let (service, runner, _dir) = fx.service();

        let report = service.check_compatibility(&inputs).unwrap();

        assert!(report.compatible);
        assert_eq!(report.recommended_mode, ConcatMode::Copy);
        assert!(report.comparisons.is_empty());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn default_service_caches_until_reset() {
        let dir = tempfile::tempdir().unwrap();
        let config = FfmpegConfig::builder()
            .ffmpeg_path(dir.path().join("no-ffmpeg"))
            .ffprobe_path(dir.path().join("no-ffprobe"))
            .build()
            .unwrap();
        let cache = DefaultService::with_config(config);
        assert!(!cache.is_initialized());

        let first = cache.get().unwrap();
        let again = cache.get().unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        cache.reset();
        assert!(!cache.is_initialized());
        let fresh = cache.get().unwrap();
        assert!(!Arc::ptr_eq(&first, &fresh));
        assert!(!fresh.is_available());
    }
}
