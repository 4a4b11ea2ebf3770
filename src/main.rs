//! Application entry point for the video transcriber.
//!
//! # Subcommands
//!
//! - `transcribe <file>`: runs one job in a child process and prints the
//!   JSON response.
//! - `job <input> <output> [--scratch-dir <dir>]`: the child side.  Loads the engine once, runs
//!   the pipeline and exits with the job's status code.
//! - `config [--init]`: prints the effective configuration, optionally
//!   writing it out on first run.
//!
//! # Startup sequence
//!
//! 1. Initialise logging (stderr, so the runner captures it from the child).
//! 2. Load [`AppConfig`] from `--config` or the platform settings file.
//! 3. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Dispatch the subcommand.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use video_transcriber::{
    audio::build_extractor,
    config::{AppConfig, AppPaths},
    error::ErrorKind,
    job::{JobCommand, TranscriptionRunner},
    pipeline::PipelineOrchestrator,
    stt::load_engine,
};

#[derive(Debug, Parser)]
#[command(name = "video-transcriber", version, about = "Transcribe the audio track of a video")]
struct Cli {
    /// Settings file to use instead of the platform default.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Transcribe a video in an isolated job and print the JSON response.
    Transcribe {
        /// Video file to transcribe.
        file: PathBuf,
        /// Declared filename; defaults to the file's own name.
        #[arg(long)]
        filename: Option<String>,
        /// Override `job.timeout_secs`.
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Run one job in this process.  Used by `transcribe`.
    #[command(hide = true)]
    Job {
        input: PathBuf,
        output: PathBuf,
        /// Override `job.scratch_dir`; the runner passes a per-job directory.
        #[arg(long, value_name = "DIR")]
        scratch_dir: Option<PathBuf>,
    },
    /// Print the effective configuration as TOML.
    Config {
        /// Write the defaults to the settings file if it does not exist yet.
        #[arg(long)]
        init: bool,
    },
}

fn main() {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // 2. Config
    let config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e:#}");
            std::process::exit(exit_code_for(ErrorKind::ConfigurationError));
        }
    };

    // 3. Runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("failed to build tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    // 4. Dispatch
    let code = match cli.command {
        Commands::Job {
            input,
            output,
            scratch_dir,
        } => rt.block_on(run_job(config, input, output, scratch_dir)),
        Commands::Transcribe {
            file,
            filename,
            timeout_secs,
        } => match rt.block_on(run_transcribe(
            config,
            cli.config.as_deref(),
            &file,
            filename,
            timeout_secs,
        )) {
            Ok(code) => code,
            Err(e) => {
                log::error!("{e:#}");
                1
            }
        },
        Commands::Config { init } => match print_config(&config, cli.config.as_deref(), init) {
            Ok(()) => 0,
            Err(e) => {
                log::error!("{e:#}");
                1
            }
        },
    };

    std::process::exit(code);
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(p) => AppConfig::load_from(p).with_context(|| format!("loading {}", p.display())),
        None => AppConfig::load().context("loading settings.toml"),
    }
}

fn exit_code_for(kind: ErrorKind) -> i32 {
    kind.exit_code().unwrap_or(1)
}

// ---------------------------------------------------------------------------
// job
// ---------------------------------------------------------------------------

async fn run_job(
    mut config: AppConfig,
    input: PathBuf,
    output: PathBuf,
    scratch_dir: Option<PathBuf>,
) -> i32 {
    if scratch_dir.is_some() {
        config.job.scratch_dir = scratch_dir;
    }

    let extractor = build_extractor(&config.extract);
    if let Err(e) = extractor.ensure_available() {
        log::error!("job: {e}");
        return exit_code_for(ErrorKind::ConfigurationError);
    }

    // Loaded once for this process and injected into the orchestrator.
    let engine = match load_engine(&config.stt) {
        Ok(engine) => engine,
        Err(e) => {
            log::error!("job: {e}");
            return exit_code_for(ErrorKind::ConfigurationError);
        }
    };

    let orchestrator = Arc::new(PipelineOrchestrator::new(
        extractor,
        engine,
        config.stt.language.clone(),
        config.job.scratch_dir(),
    ));

    let report = orchestrator.run_blocking(input, output).await;
    log::debug!("job: trail {:?}", report.trail);
    report.exit_code()
}

// ---------------------------------------------------------------------------
// transcribe
// ---------------------------------------------------------------------------

async fn run_transcribe(
    mut config: AppConfig,
    config_path: Option<&Path>,
    file: &Path,
    filename: Option<String>,
    timeout_secs: Option<u64>,
) -> Result<i32> {
    if let Some(secs) = timeout_secs {
        config.job.timeout_secs = secs;
    }

    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let filename = filename.unwrap_or_else(|| {
        file.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    let command = JobCommand::current_exe(config_path).context("locating own executable")?;
    let runner = TranscriptionRunner::new(command, config.job.clone());
    let response = runner.run(&bytes, &filename).await;

    println!("{}", response.to_json()?);
    Ok(if response.success { 0 } else { 1 })
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn print_config(config: &AppConfig, config_path: Option<&Path>, init: bool) -> Result<()> {
    let (settings_file, first_run) = match config_path {
        Some(p) => (p.to_path_buf(), !p.exists()),
        None => (AppPaths::new().settings_file, AppConfig::is_first_run()),
    };
    if first_run && init {
        match config_path {
            Some(p) => config.save_to(p)?,
            None => config.save()?,
        }
        log::info!("config: wrote {}", settings_file.display());
        println!("# {} (created)", settings_file.display());
    } else if first_run {
        println!("# {} (not found, using defaults)", settings_file.display());
    } else {
        println!("# {}", settings_file.display());
    }
    print!("{}", config.to_toml()?);
    Ok(())
}
