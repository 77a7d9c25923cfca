use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use ffmpeg_next::util::log::Level as FfmpegLevel;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use serde_json::json;
use thumbstrip::{
    DecoderHandle, ExtractOptions, ExtractionDriver, FfmpegDecoder, LifecycleController,
    LifecycleState, ProgressCallback, ProgressInfo, ReferenceKind, TimestampGrid,
};

const CLI_AFTER_HELP: &str = "Examples:\n  thumbstrip extract input.mp4 --out thumbs\n  thumbstrip extract input.mp4 --out thumbs --interval 10 --progress --verbose\n  thumbstrip extract input.mp4 --out thumbs --json > manifest.json\n  thumbstrip completions zsh > _thumbstrip";

#[derive(Debug, Parser)]
#[command(
    name = "thumbstrip",
    version,
    about = "Extract a strip of thumbnails from a video at fixed intervals",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract thumbnails to an output directory.
    #[command(
        about = "Extract thumbnails",
        after_help = "Examples:\n  thumbstrip extract input.mp4 --out thumbs --interval 5\n  thumbstrip extract input.mp4 --out thumbs --timeout-ms 2000 --json"
    )]
    Extract {
        /// Input media path or URL.
        input: String,
        /// Output directory for thumbnail images.
        #[arg(long)]
        out: PathBuf,
        /// Seconds between thumbnails.
        #[arg(long, default_value_t = 5.0)]
        interval: f64,
        /// Per-thumbnail seek timeout in milliseconds.
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
        /// Delay between decoder readiness and extraction, in milliseconds.
        #[arg(long, default_value_t = 500)]
        settle_ms: u64,
        /// Give up if the decoder is not ready within this many milliseconds.
        #[arg(long, default_value_t = 30_000)]
        ready_timeout_ms: u64,
        /// Keep capturing after a permission failure instead of stopping.
        #[arg(long)]
        keep_going: bool,
        /// Print a machine-readable JSON manifest.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

/// Feeds capture progress into an indicatif bar.
struct BarProgress(ProgressBar);

impl ProgressCallback for BarProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.0.set_length(info.total);
        self.0.set_position(info.current);
        let outcome = match info.outcome {
            ReferenceKind::Frame => "frame",
            ReferenceKind::Skipped => "skipped",
            ReferenceKind::Error => "error",
        };
        self.0
            .set_message(format!("{:.1}s {outcome}", info.current_timestamp.as_secs_f64()));
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose)?;

    if let Some(level) = &cli.global.log_level {
        let level = parse_log_level(level).ok_or("Unsupported --log-level")?;
        ffmpeg_next::util::log::set_level(level);
    }

    match cli.command {
        Commands::Extract {
            input,
            out,
            interval,
            timeout_ms,
            settle_ms,
            ready_timeout_ms,
            keep_going,
            json,
        } => {
            let interval = parse_interval(interval)?;
            fs::create_dir_all(&out)?;

            let progress_bar = if cli.global.progress {
                let pb = ProgressBar::new(0);
                let style = ProgressStyle::with_template(
                    "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}",
                )?;
                pb.set_style(style.progress_chars("##-"));
                Some(pb)
            } else {
                None
            };

            let mut options = ExtractOptions::new()
                .with_interval(interval)
                .with_seek_timeout(Duration::from_millis(timeout_ms))
                .with_settle_delay(Duration::from_millis(settle_ms))
                .with_stop_on_permission_denied(!keep_going);
            if let Some(pb) = &progress_bar {
                options = options.with_progress(Arc::new(BarProgress(pb.clone())));
            }

            let decoder = FfmpegDecoder::open(input.as_str())?;
            // Refuse before extracting, not halfway through writing.
            if let Ok(grid) = TimestampGrid::new(decoder.duration(), interval) {
                ensure_outputs_writable(&out, grid.len(), cli.global.overwrite)?;
            }
            let driver = ExtractionDriver::new(options);
            let store = driver.store().clone();
            let controller = LifecycleController::new(decoder, driver);
            let teardown = controller.teardown();

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()?;
            let outcome = runtime.block_on(async move {
                let ready_timeout = Duration::from_millis(ready_timeout_ms);
                let watchdog = tokio::spawn(async move {
                    tokio::time::sleep(ready_timeout).await;
                    teardown.dispose();
                });
                let outcome = controller.run().await;
                watchdog.abort();
                outcome
            });

            if let Some(pb) = progress_bar {
                pb.finish_with_message("done");
            }

            if outcome.state == LifecycleState::Disposed {
                return Err(format!(
                    "decoder was not ready within {ready_timeout_ms} ms; nothing extracted"
                )
                .into());
            }
            let report = outcome
                .report
                .ok_or("decoder closed before it became ready")?;

            let snapshot = store.snapshot();
            let mut files = Vec::with_capacity(snapshot.results.len());
            for result in &snapshot.results {
                let path = thumbnail_path(&out, result.index);
                fs::write(&path, result.reference.bytes())?;
                if cli.global.verbose {
                    eprintln!(
                        "saved {:?} at {:.3}s -> {}",
                        result.reference.kind(),
                        result.timestamp.as_secs_f64(),
                        path.display()
                    );
                }
                files.push(path);
            }

            if json {
                let results: Vec<_> = snapshot
                    .results
                    .iter()
                    .zip(&files)
                    .map(|(result, path)| {
                        json!({
                            "index": result.index,
                            "timestamp": result.timestamp.as_secs_f64(),
                            "kind": format!("{:?}", result.reference.kind()).to_ascii_lowercase(),
                            "label": result.reference.label(),
                            "width": result.reference.width(),
                            "height": result.reference.height(),
                            "file": path.display().to_string(),
                        })
                    })
                    .collect();
                let payload = json!({
                    "input": input,
                    "status": format!("{:?}", snapshot.status),
                    "permission_denied": snapshot.permission_denied,
                    "grid_len": report.grid_len,
                    "frames": report.frames,
                    "skipped": report.skipped,
                    "errors": report.errors,
                    "stopped_early": report.stopped_early,
                    "invalid_duration": report.invalid_duration,
                    "invalid_interval": report.invalid_interval,
                    "results": results,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                if report.invalid_duration {
                    eprintln!(
                        "{} {}",
                        "warning:".yellow().bold(),
                        "media duration is unknown or zero; no thumbnails extracted".yellow()
                    );
                }
                if report.invalid_interval {
                    eprintln!(
                        "{} {}",
                        "warning:".yellow().bold(),
                        "interval is too small for this media; no thumbnails extracted".yellow()
                    );
                }
                if snapshot.permission_denied {
                    eprintln!(
                        "{} {}",
                        "warning:".yellow().bold(),
                        "frame pixels are not readable; extraction stopped early".yellow()
                    );
                }
                println!(
                    "{} {}",
                    "success:".green().bold(),
                    format!(
                        "Wrote {} thumbnail(s) to {} ({} frame(s), {} skipped, {} error(s))",
                        files.len(),
                        out.display(),
                        report.frames,
                        report.skipped,
                        report.errors
                    )
                    .green()
                );
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "thumbstrip", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .chain(std::io::stderr())
        .apply()
}

fn parse_log_level(value: &str) -> Option<FfmpegLevel> {
    match value.to_ascii_lowercase().as_str() {
        "quiet" => Some(FfmpegLevel::Quiet),
        "panic" => Some(FfmpegLevel::Panic),
        "fatal" => Some(FfmpegLevel::Fatal),
        "error" => Some(FfmpegLevel::Error),
        "warning" | "warn" => Some(FfmpegLevel::Warning),
        "info" => Some(FfmpegLevel::Info),
        "verbose" => Some(FfmpegLevel::Verbose),
        "debug" => Some(FfmpegLevel::Debug),
        "trace" => Some(FfmpegLevel::Trace),
        _ => None,
    }
}

fn parse_interval(seconds: f64) -> Result<Duration, String> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err("--interval must be a positive number of seconds".to_string());
    }
    match Duration::try_from_secs_f64(seconds) {
        Ok(interval) if !interval.is_zero() => Ok(interval),
        Ok(_) => Err(format!("--interval {seconds} rounds to zero")),
        Err(error) => Err(format!("--interval {seconds} is out of range: {error}")),
    }
}

fn thumbnail_path(out: &Path, index: usize) -> PathBuf {
    out.join(format!("thumb_{index:04}.png"))
}

fn ensure_outputs_writable(
    out: &Path,
    count: usize,
    overwrite: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    (0..count).try_for_each(|index| ensure_writable_path(&thumbnail_path(out, index), overwrite))
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() && !overwrite {
        return Err(format!(
            "output already exists: {} (use --overwrite to replace)",
            path.display()
        )
        .into());
    }
    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
