mod cli;

use reelforge::{build_service, config};
use reelforge_av::{CompareResult, MediaInfo, MixOptions, ReencodeOptions};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "reelforge=trace,reelforge_av=trace".to_string()
        } else {
            "reelforge=info,reelforge_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Probe { file, json } => probe_file(&file, config_path, json),
        Commands::Compare {
            first,
            second,
            fps_tolerance,
            json,
        } => compare_files(&first, &second, fps_tolerance, config_path, json),
        Commands::Check { files, json } => check_files(&files, config_path, json),
        Commands::Concat {
            inputs,
            output,
            mode,
            no_auto_detect,
            video_codec,
            video_bitrate,
            audio_codec,
            audio_bitrate,
            resolution,
            fps,
            json,
        } => {
            let options = ReencodeOptions {
                video_codec,
                video_bitrate,
                audio_codec,
                audio_bitrate,
                resolution,
                fps,
            };
            concat_files(
                &inputs,
                &output,
                mode.map(Into::into),
                !no_auto_detect,
                &options,
                config_path,
                json,
            )
        }
        Commands::Mix {
            video,
            audio,
            output,
            no_loop,
            keep_original,
            audio_volume,
            original_volume,
            audio_codec,
            audio_bitrate,
            json,
        } => {
            let options = MixOptions {
                loop_audio: !no_loop,
                replace_original: !keep_original,
                audio_volume,
                original_volume,
                audio_codec,
                audio_bitrate,
            };
            mix_files(&video, &audio, &output, &options, config_path, json)
        }
        Commands::CheckTools => check_tools(config_path),
        Commands::Validate {
            config: validate_path,
        } => {
            let path = validate_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("reelforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn service(config_path: Option<&Path>) -> Result<reelforge_av::MediaService> {
    let config = config::load_config_or_default(config_path)?;
    build_service(&config)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_duration(secs: f64) -> String {
    let secs = secs.max(0.0);
    let total = secs as u64;
    format!(
        "{:02}:{:02}:{:02}.{:02}",
        total / 3600,
        (total / 60) % 60,
        total % 60,
        (secs.fract() * 100.0) as u64
    )
}

fn probe_file(file: &Path, config_path: Option<&Path>, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let info = service(config_path)?.probe(file)?;

    if json {
        return print_json(&info);
    }
    print_media_info(&info);
    Ok(())
}

fn print_media_info(info: &MediaInfo) {
    println!("File: {}", info.path.display());
    if let Some(ref format) = info.format_name {
        println!("Format: {}", format);
    }
    println!("Duration: {}", format_duration(info.duration));
    println!("Size: {} bytes", info.size);
    println!("Bitrate: {} kb/s", info.bitrate / 1000);

    match info.video_codec {
        Some(ref codec) => {
            print!("Video: {} {} {:.3} fps", codec, info.resolution(), info.fps);
            if let Some(ref pix) = info.pixel_format {
                print!(", {}", pix);
            }
            if info.video_bitrate > 0 {
                print!(", {} kb/s", info.video_bitrate / 1000);
            }
            println!();
        }
        None => println!("Video: none"),
    }

    match info.audio_codec {
        Some(ref codec) => {
            print!("Audio: {} {} Hz {}ch", codec, info.sample_rate, info.channels);
            if info.audio_bitrate > 0 {
                print!(", {} kb/s", info.audio_bitrate / 1000);
            }
            println!();
        }
        None => println!("Audio: none"),
    }
}

fn print_compare(result: &CompareResult) {
    let mark = |ok: bool| if ok { "✓" } else { "✗" };
    println!("{} codec", mark(result.codec_match));
    println!("{} resolution", mark(result.resolution_match));
    println!("{} frame rate", mark(result.fps_match));
    println!("{} audio", mark(result.audio_match));
    for diff in &result.differences {
        println!("  - {}", diff);
    }
}

fn compare_files(
    first: &Path,
    second: &Path,
    fps_tolerance: f64,
    config_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let result = service(config_path)?.compare_with_tolerance(first, second, fps_tolerance)?;

    if json {
        return print_json(&result);
    }
    print_compare(&result);
    println!();
    if result.is_compatible {
        println!("Compatible: files can be joined without re-encoding");
    } else {
        println!("Not compatible: joining requires re-encoding");
    }
    Ok(())
}

fn check_files(files: &[PathBuf], config_path: Option<&Path>, json: bool) -> Result<()> {
    let report = service(config_path)?.check_compatibility(files)?;

    if json {
        return print_json(&report);
    }
    for pair in &report.comparisons {
        let status = if pair.compatible { "✓" } else { "✗" };
        println!(
            "{} {} <-> {}",
            status,
            pair.first.display(),
            pair.second.display()
        );
        for diff in &pair.differences {
            println!("    - {}", diff);
        }
    }
    println!();
    println!("Compatible: {}", report.compatible);
    println!("Recommended mode: {}", report.recommended_mode);
    Ok(())
}

fn concat_files(
    inputs: &[PathBuf],
    output: &Path,
    mode: Option<reelforge_av::ConcatMode>,
    auto_detect: bool,
    options: &ReencodeOptions,
    config_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let result = service(config_path)?.concat(inputs, output, mode, auto_detect, options);

    if json {
        print_json(&result)?;
    } else if result.success {
        println!("Concatenated {} files ({})", inputs.len(), result.mode);
        println!("Output: {}", output.display());
        println!("Duration: {}", format_duration(result.duration));
        println!("Size: {} bytes", result.size);
        println!("Took {:.2}s", result.execution_time.as_secs_f64());
    }

    if !result.success {
        anyhow::bail!(
            "Concatenation failed: {}",
            result.error_message.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn mix_files(
    video: &Path,
    audio: &Path,
    output: &Path,
    options: &MixOptions,
    config_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let result = service(config_path)?.mix_audio(video, audio, output, options);

    if json {
        print_json(&result)?;
    } else if result.success {
        println!("Output: {}", output.display());
        println!("Duration: {}", format_duration(result.duration));
        println!("Size: {} bytes", result.size);
        if result.audio_looped {
            println!("Background audio was looped");
        }
        println!("Took {:.2}s", result.execution_time.as_secs_f64());
    }

    if !result.success {
        anyhow::bail!(
            "Audio mix failed: {}",
            result.error_message.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let tools = service(config_path)?.check_tools();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);
        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }
        println!(" - {}", tool.path.display());
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg to enable all features.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    let resolved = config.to_ffmpeg_config()?;
    println!("  ffmpeg: {}", resolved.ffmpeg_path().display());
    println!("  ffprobe: {}", resolved.ffprobe_path().display());
    println!("  Timeout: {}s", resolved.timeout().as_secs());
    println!(
        "  Video: {} @ {}",
        resolved.video_codec(),
        resolved.video_bitrate()
    );
    println!(
        "  Audio: {} @ {}",
        resolved.audio_codec(),
        resolved.audio_bitrate()
    );
    println!("  Temp dir: {}", resolved.temp_dir().display());
    println!("  Log level: {}", resolved.log_level());

    Ok(())
}
