//! gesture-detector: command line front end for the recognizer

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use imu_gesture_core::config::constants::sensor::CSV_HEADER;
use imu_gesture_core::config::{ConfigLoader, SystemConfig};
use imu_gesture_core::hal::{
    parse_sample_line, ImuSimulator, LineRead, SampleTransport, SensorLimits, SerialLineTransport,
    SimulatedMotion, SimulatorConfig,
};
use imu_gesture_core::recognizer::{
    DetectorRunner, EventDispatcher, GestureRecognizer, RunSummary, StopSignal,
};
use imu_gesture_core::templates::{
    BuilderConfig, GestureTemplate, TemplateBuilder, TemplateRecord, TemplateSet, TemplateStore,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "gesture-detector", version, about = "Streaming DTW gesture recognition for 6-axis IMUs")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct CommonArgs {
    /// Configuration file (defaults to the discovered system/user/local files)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Template directory, overrides the configuration
    #[arg(long, global = true)]
    templates: Option<PathBuf>,

    /// Stop after this many seconds
    #[arg(long, global = true)]
    duration_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Detect gestures on the configured serial device
    Detect {
        /// Device node, overrides the configuration
        #[arg(long)]
        port: Option<String>,
    },
    /// Detect gestures in a recorded CSV capture
    Replay { csv: PathBuf },
    /// Detect gestures in a synthetic stream
    Simulate {
        #[arg(long, default_value_t = 7)]
        seed: u64,
        #[arg(long, default_value_t = 2000)]
        records: u64,
        /// Comma separated motions: circle, flick, shake
        #[arg(long, default_value = "circle,flick,shake")]
        schedule: String,
        /// Build templates from the simulator's own motions instead of the store
        #[arg(long)]
        bootstrap: bool,
    },
    /// Build a template from a recorded CSV and save it
    Train { name: String, csv: PathBuf },
    /// List stored templates
    List,
    /// Print a stored template record summary as JSON
    Inspect { name: String },
    /// Capture samples from the serial device into a CSV file
    Record {
        output: PathBuf,
        #[arg(long, default_value_t = 600)]
        samples: usize,
        #[arg(long)]
        port: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imu_gesture_core=info,gesture_detector=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli.common)?;
    let stop = StopSignal::new();
    if let Some(secs) = cli.common.duration_secs {
        arm_stop_timer(stop.clone(), Duration::from_secs(secs));
    }

    match cli.command {
        Command::Detect { port } => {
            if let Some(port) = port {
                config.serial.port_name = port;
            }
            let templates = load_templates(&config)?;
            let transport = SerialLineTransport::open(&config.serial)?;
            report(run_detector(&config, templates, transport, stop)?);
        }
        Command::Replay { csv } => {
            let templates = load_templates(&config)?;
            let transport = SerialLineTransport::open_replay(&csv)?;
            report(run_detector(&config, templates, transport, stop)?);
        }
        Command::Simulate {
            seed,
            records,
            schedule,
            bootstrap,
        } => {
            let schedule = parse_schedule(&schedule)?;
            let sim_config = SimulatorConfig {
                seed,
                motion_samples: config.recognizer.template_length,
                schedule: schedule.clone(),
                max_records: Some(records),
                ..SimulatorConfig::default()
            };
            let templates = if bootstrap {
                bootstrap_templates(&config, &schedule, sim_config.amplitude)?
            } else {
                load_templates(&config)?
            };
            // simulated samples are produced, not waited for
            config.serial.idle_sleep_ms = 0;
            report(run_detector(&config, templates, ImuSimulator::new(sim_config), stop)?);
        }
        Command::Train { name, csv } => {
            let samples = TemplateBuilder::read_recording(&csv)?;
            let builder = TemplateBuilder::new(BuilderConfig::from(&config.recognizer));
            let template = builder.build(&name, &samples)?;
            let path = TemplateStore::from_config(&config.templates).save(&template)?;
            println!(
                "saved '{}' ({} variants, {} samples) to {}",
                name,
                template.variants().len(),
                template.metadata().samples_used,
                path.display()
            );
        }
        Command::List => {
            let store = TemplateStore::from_config(&config.templates);
            let names = store.list()?;
            if names.is_empty() {
                println!("no templates in {}", store.directory().display());
            }
            for name in names {
                match store.load(&name) {
                    Ok(t) => println!(
                        "{:<24} length={} variants={} activity={:.3}",
                        name,
                        t.template_length(),
                        t.variants().len(),
                        t.metadata().avg_activity
                    ),
                    Err(e) => println!("{:<24} unreadable: {}", name, e),
                }
            }
        }
        Command::Inspect { name } => {
            let template = TemplateStore::from_config(&config.templates).load(&name)?;
            let record = TemplateRecord::from_template(&template);
            let summary = serde_json::json!({
                "gesture_name": record.gesture_name,
                "feature_version": record.feature_version,
                "template_length": record.template_length,
                "sensor_columns": record.sensor_columns,
                "variants": record.variants.len(),
                "metadata": record.metadata,
                "checksum": format!("{:08x}", record.checksum),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Record { output, samples, port } => {
            if let Some(port) = port {
                config.serial.port_name = port;
            }
            let transport = SerialLineTransport::open(&config.serial)?;
            let written = record_csv(transport, &output, samples, &config, &stop)?;
            println!("recorded {} samples to {}", written, output.display());
        }
    }

    Ok(())
}

fn load_config(args: &CommonArgs) -> Result<SystemConfig> {
    let loader = match &args.config {
        Some(path) => {
            if !path.exists() {
                bail!("configuration file {} does not exist", path.display());
            }
            ConfigLoader::with_paths(vec![path.clone()])
        }
        None => ConfigLoader::new(),
    };
    let mut config = loader.load().context("loading configuration")?;
    if let Some(dir) = &args.templates {
        config.templates.directory = dir.clone();
    }
    info!(summary = ?config.summary(), "configuration loaded");
    Ok(config)
}

fn load_templates(config: &SystemConfig) -> Result<Arc<TemplateSet>> {
    let store = TemplateStore::from_config(&config.templates);
    let set = store
        .load_set(&config.templates.gestures)
        .with_context(|| format!("loading templates from {}", store.directory().display()))?;
    Ok(Arc::new(set))
}

fn bootstrap_templates(config: &SystemConfig, motions: &[SimulatedMotion], amplitude: f64) -> Result<Arc<TemplateSet>> {
    let builder = TemplateBuilder::new(BuilderConfig::from(&config.recognizer));
    let mut templates: Vec<GestureTemplate> = Vec::new();
    for motion in motions {
        if templates.iter().any(|t| t.name() == motion.name()) {
            continue;
        }
        let recording = motion.render(config.recognizer.template_length, amplitude);
        templates.push(builder.build(motion.name(), &recording)?);
    }
    Ok(Arc::new(TemplateSet::new(templates)?))
}

fn run_detector<T: SampleTransport>(
    config: &SystemConfig,
    templates: Arc<TemplateSet>,
    transport: T,
    stop: StopSignal,
) -> Result<RunSummary> {
    let recognizer = GestureRecognizer::new(config.recognizer.clone(), templates)?;

    let (mut dispatcher, history) =
        EventDispatcher::from_config(&config.events).context("starting event dispatcher")?;
    let publisher = dispatcher
        .publisher()
        .context("event dispatcher has no publisher")?;

    let mut runner = DetectorRunner::new(recognizer)
        .with_publisher(publisher)
        .with_stop_signal(stop)
        .with_idle_sleep(Duration::from_millis(config.serial.idle_sleep_ms));
    let result = runner.run(transport);

    drop(runner);
    let delivered = dispatcher.shutdown();
    let recent: Vec<String> = history.snapshot().into_iter().map(|e| e.gesture_name).collect();
    info!(delivered, history = history.len(), recent = ?recent, "event dispatcher drained");
    Ok(result?)
}

fn record_csv<T: SampleTransport>(
    transport: T,
    output: &Path,
    wanted: usize,
    config: &SystemConfig,
    stop: &StopSignal,
) -> Result<usize> {
    let mut transport = transport;
    let mut writer = BufWriter::new(
        File::create(output).with_context(|| format!("creating {}", output.display()))?,
    );
    writeln!(writer, "{}", CSV_HEADER)?;

    let limits = SensorLimits::default();
    let idle = Duration::from_millis(config.serial.idle_sleep_ms);
    let mut written = 0usize;
    let result = loop {
        if written >= wanted || stop.is_stopped() {
            break Ok(());
        }
        match transport.read_line() {
            Ok(LineRead::Line(line)) => match parse_sample_line(&line, Some(&limits)) {
                Ok(sample) => {
                    writeln!(writer, "{}", sample.to_csv_line())?;
                    written += 1;
                }
                Err(e) => warn!(error = %e, "skipping record"),
            },
            Ok(LineRead::Pending) => std::thread::sleep(idle),
            Ok(LineRead::Closed) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    if let Err(e) = transport.close() {
        warn!(error = %e, "closing transport failed");
    }
    writer.flush()?;
    result?;
    Ok(written)
}

fn parse_schedule(text: &str) -> Result<Vec<SimulatedMotion>> {
    let all = [SimulatedMotion::Circle, SimulatedMotion::Flick, SimulatedMotion::Shake];
    let mut schedule = Vec::new();
    for name in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match all.iter().find(|m| m.name().eq_ignore_ascii_case(name)) {
            Some(motion) => schedule.push(*motion),
            None => bail!("unknown motion '{}', expected circle, flick or shake", name),
        }
    }
    if schedule.is_empty() {
        bail!("empty motion schedule");
    }
    Ok(schedule)
}

fn arm_stop_timer(stop: StopSignal, after: Duration) {
    let spawned = std::thread::Builder::new()
        .name("stop-timer".to_string())
        .spawn(move || {
            std::thread::sleep(after);
            info!(secs = after.as_secs(), "duration elapsed, stopping");
            stop.stop();
        });
    if let Err(e) = spawned {
        warn!(error = %e, "could not start stop timer, running until the input ends");
    }
}

fn report(summary: RunSummary) {
    println!(
        "lines={} accepted={} rejected={} evaluations={} idle={} no_match={} ambiguous={} detections={} dropped_events={} ({:?})",
        summary.lines,
        summary.accepted,
        summary.rejected,
        summary.evaluations,
        summary.idle,
        summary.no_match,
        summary.ambiguous,
        summary.detections,
        summary.dropped_events,
        summary.reason,
    );
}
