//! Step Counter Agent CLI
//!
//! Real-time accelerometer step counting with raw dataset collection.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use step_counter_agent::{
    config::{Config, PipelineMode},
    core::{extract_windows, StepCounter, StepCounterConfig, FEATURE_NAMES},
    forward::{RawForwarder, SinkConfig, TcpSink},
    pipeline::Pipeline,
    sensor::{
        replay::parse_recording, Accelerometer, EdgeDetector, ReplayAccelerometer, SampleSource,
        SamplerConfig, SimulatedAccelerometer,
    },
    session::{LogIndicator, SessionController, SessionLog, SessionTrigger},
    stats::{create_shared_stats_with_persistence, PersistedStats},
    sync::sample_queue,
    VERSION,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "step-counter")]
#[command(version = VERSION)]
#[command(about = "Real-time accelerometer step counter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the sampling pipeline and wait for session triggers
    Run {
        /// Pipeline to run
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Where accelerometer readings come from
        #[arg(long, value_enum, default_value = "simulated")]
        source: SourceArg,

        /// Recording to replay (with --source replay)
        #[arg(long)]
        replay_file: Option<PathBuf>,

        /// Sampling rate in Hz
        #[arg(long)]
        sample_rate: Option<u32>,

        /// Window duration in milliseconds
        #[arg(long)]
        window_ms: Option<u32>,

        /// Tag samples with step edges entered on stdin
        #[arg(long)]
        step_edge: bool,

        /// Dataset sink as host:port (collection mode)
        #[arg(long)]
        sink: Option<String>,

        /// Simulated walking cadence in steps per minute
        #[arg(long, default_value = "110")]
        cadence: f64,
    },

    /// Print one feature vector per window of a recorded dataset
    Features {
        /// Recording in `timestamp,x,y,z,stepEdge` format
        file: PathBuf,

        /// Output format (csv or json)
        #[arg(long, value_enum, default_value = "csv")]
        format: FormatArg,

        /// Samples per window (defaults to the configured window length)
        #[arg(long)]
        window_len: Option<usize>,
    },

    /// Show recorded sessions and cumulative statistics
    History,

    /// Show configuration
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Predict,
    Collect,
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceArg {
    Simulated,
    Replay,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
}

struct RunArgs {
    mode: Option<ModeArg>,
    source: SourceArg,
    replay_file: Option<PathBuf>,
    sample_rate: Option<u32>,
    window_ms: Option<u32>,
    step_edge: bool,
    sink: Option<String>,
    cadence: f64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            mode,
            source,
            replay_file,
            sample_rate,
            window_ms,
            step_edge,
            sink,
            cadence,
        } => cmd_run(RunArgs {
            mode,
            source,
            replay_file,
            sample_rate,
            window_ms,
            step_edge,
            sink,
            cadence,
        }),
        Commands::Features {
            file,
            format,
            window_len,
        } => cmd_features(&file, format, window_len),
        Commands::History => cmd_history(),
        Commands::Config => cmd_config(),
    }
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    println!("Step Counter Agent v{VERSION}");
    println!();

    let mut config = Config::load().context("Failed to load configuration")?;
    apply_overrides(&mut config, &args)?;
    config.validate()?;

    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    println!("Starting pipeline...");
    println!("  Mode: {}", config.mode);
    println!(
        "  Sampling: {} Hz, {} ms windows ({} samples)",
        config.sample_rate_hz,
        config.window_duration_ms,
        config.window_len()
    );
    println!("  Queue capacity: {}", config.queue_capacity);
    if config.mode == PipelineMode::Collection {
        println!("  Sink: {}", config.sink);
    }
    println!(
        "  Step edge detection: {}",
        if config.step_edge_detection {
            "enabled"
        } else {
            "disabled"
        }
    );

    let stats = create_shared_stats_with_persistence(config.stats_path());
    let (producer, consumer) = sample_queue(config.queue_capacity);
    let (fatal_tx, fatal_rx) = crossbeam_channel::unbounded();

    let sensor: Box<dyn Accelerometer + Send> = match args.source {
        SourceArg::Simulated => Box::new(SimulatedAccelerometer::new(
            config.sample_rate_hz,
            args.cadence,
        )),
        SourceArg::Replay => {
            let Some(ref path) = args.replay_file else {
                bail!("--source replay requires --replay-file");
            };
            let replay = ReplayAccelerometer::open(path)?;
            println!("  Replaying {} samples from {path:?}", replay.len());
            Box::new(replay)
        }
    };

    let edge = config.step_edge_detection.then(EdgeDetector::new);

    let source = SampleSource::spawn(
        sensor,
        producer,
        edge.clone(),
        SamplerConfig {
            sample_period: config.sample_period(),
            push_timeout: config.queue_timeout,
        },
        fatal_tx,
        stats.clone(),
    )?;

    let pipeline: Box<dyn Pipeline> = match config.mode {
        PipelineMode::Prediction => Box::new(StepCounter::spawn(
            consumer,
            config.model.clone(),
            StepCounterConfig {
                window_len: config.window_len(),
                pop_timeout: config.queue_timeout,
            },
            stats.clone(),
        )?),
        PipelineMode::Collection => Box::new(RawForwarder::spawn(
            consumer,
            TcpSink::default(),
            config.sink.clone(),
            config.queue_timeout,
            stats.clone(),
        )?),
    };

    let mut controller = SessionController::new(
        source,
        pipeline,
        Box::new(LogIndicator::new()),
        config.mode,
        stats.clone(),
    )
    .with_reporter(Box::new(SessionLog::new(config.sessions_path())));

    spawn_stdin_trigger(controller.trigger(), edge)?;

    println!();
    println!("Press Enter to start or stop a session");
    if config.step_edge_detection {
        println!("Type 's' and Enter to mark a step edge");
    }
    println!("Press Ctrl+C to exit");
    println!();

    let (interrupt_tx, interrupt_rx) = crossbeam_channel::bounded(1);
    ctrlc_handler(interrupt_tx);

    let outcome = controller.run(&interrupt_rx, &fatal_rx, |report| println!("{report}"));

    if let Err(e) = outcome {
        tracing::error!("Fatal pipeline error: {e}");
        if let Err(e) = stats.save() {
            eprintln!("Warning: Could not save statistics: {e}");
        }
        return Err(e).context("Pipeline stopped; restart required");
    }

    println!();
    println!("Pipeline stopped");

    if let Err(e) = stats.save() {
        eprintln!("Warning: Could not save statistics: {e}");
    }

    println!();
    println!("{}", stats.summary());
    Ok(())
}

fn apply_overrides(config: &mut Config, args: &RunArgs) -> anyhow::Result<()> {
    let window_len_before = config.window_len();

    if let Some(mode) = args.mode {
        config.mode = match mode {
            ModeArg::Predict => PipelineMode::Prediction,
            ModeArg::Collect => PipelineMode::Collection,
        };
    }
    if let Some(rate) = args.sample_rate {
        config.sample_rate_hz = rate;
    }
    if let Some(ms) = args.window_ms {
        config.window_duration_ms = ms;
    }
    if args.step_edge {
        config.step_edge_detection = true;
    }
    if let Some(ref sink) = args.sink {
        config.sink = SinkConfig::parse(sink)
            .with_context(|| format!("Invalid sink address {sink:?}, expected host:port"))?;
    }

    // The queue holds one window unless configured otherwise.
    if config.queue_capacity == window_len_before {
        config.queue_capacity = config.window_len();
    }
    Ok(())
}

/// Read stdin lines: an empty line is a trigger press, `s` marks a step edge.
fn spawn_stdin_trigger(trigger: SessionTrigger, edge: Option<EdgeDetector>) -> anyhow::Result<()> {
    std::thread::Builder::new()
        .name("trigger".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                match line.trim() {
                    "" => {
                        if !trigger.press() {
                            println!("Session is {}; try again", trigger.state());
                        }
                    }
                    "s" => match edge {
                        Some(ref edge) => {
                            edge.trigger();
                        }
                        None => println!("Step edge detection is disabled (use --step-edge)"),
                    },
                    other => println!("Unknown input {other:?}"),
                }
            }
        })
        .context("Failed to create trigger thread")?;
    Ok(())
}

fn cmd_features(file: &Path, format: FormatArg, window_len: Option<usize>) -> anyhow::Result<()> {
    let window_len = match window_len {
        Some(len) => len,
        None => Config::load().unwrap_or_default().window_len(),
    };

    let content =
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {file:?}"))?;
    let samples = parse_recording(&content).with_context(|| format!("Failed to parse {file:?}"))?;
    let rows = extract_windows(&samples, window_len)?;

    match format {
        FormatArg::Csv => {
            println!("window,{}", FEATURE_NAMES.join(","));
            for (index, row) in rows.iter().enumerate() {
                println!("{index},{}", row.to_csv());
            }
        }
        FormatArg::Json => {
            let windows: Vec<serde_json::Value> = rows
                .iter()
                .enumerate()
                .map(|(index, row)| serde_json::json!({ "window": index, "features": row }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&windows)?);
        }
    }

    eprintln!(
        "{} samples, {} complete windows of {window_len}",
        samples.len(),
        rows.len()
    );
    Ok(())
}

fn cmd_history() -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_default();

    println!("Step Counter Agent History");
    println!("==========================");
    println!();

    let reports = SessionLog::new(config.sessions_path())
        .load()
        .context("Failed to read session history")?;
    if reports.is_empty() {
        println!("No sessions recorded.");
    } else {
        for report in &reports {
            println!("{report}");
        }
    }
    println!();

    let stats_path = config.stats_path();
    if stats_path.exists() {
        let content = std::fs::read_to_string(&stats_path)
            .with_context(|| format!("Failed to read {stats_path:?}"))?;
        let stats: PersistedStats = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {stats_path:?}"))?;
        println!("Cumulative Statistics:");
        println!("  Samples produced: {}", stats.samples_produced);
        println!(
            "  Windows completed: {} ({} discarded)",
            stats.windows_completed, stats.windows_discarded
        );
        println!("  Predictions: {}", stats.predictions);
        println!("  Records forwarded: {}", stats.records_forwarded);
        println!("  Sessions completed: {}", stats.sessions_completed);
        println!(
            "  Last updated: {}",
            stats.last_updated.format("%Y-%m-%d %H:%M:%S")
        );
    } else {
        println!("No statistics recorded.");
    }
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!("Window length: {} samples", config.window_len());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(interrupt: crossbeam_channel::Sender<()>) {
    ctrlc::set_handler(move || {
        let _ = interrupt.try_send(());
    })
    .expect("Error setting Ctrl+C handler");
}
