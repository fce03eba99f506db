//! Fuzzie Probe - native diagnostics for the rendering governor
//!
//! `watch` runs the governor against this machine and prints every policy
//! update as a JSON line; `replay` runs a recorded trace through the same
//! rules; `classify` and `config` inspect the inputs.

mod version;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, Level};

use fuzzie_governor::{
    classify_device, MonitorDriver, PerformanceMonitor, SignalHost, SystemHost,
};
use fuzzie_probe::config::ProbeConfig;
use fuzzie_probe::replay::{replay, write_json_lines, Trace};
use version::BuildInfo;

#[derive(Parser, Debug)]
#[command(name = "fuzzie-probe", version, about = "Rendering governor diagnostics")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: <config dir>/fuzzie/governor.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Monitor this machine and print policy updates as JSON lines
    Watch(WatchArgs),
    /// Replay a JSON trace and print the resulting policy updates
    Replay(ReplayArgs),
    /// Print the device classification
    Classify(ClassifyArgs),
    /// Print the active configuration
    Config(ConfigArgs),
    /// Print build information and the default rule table
    Version(VersionArgs),
}

#[derive(Args, Debug)]
struct WatchArgs {
    /// Stop after this many seconds (default: run until Ctrl+C)
    #[arg(long)]
    duration_secs: Option<u64>,
    /// Sampling interval override (milliseconds)
    #[arg(long)]
    interval_ms: Option<u64>,
    /// Synthetic frame rate override (0 disables the frame pump)
    #[arg(long)]
    frame_rate: Option<u32>,
    /// Sample process memory against the heap budget
    #[arg(long)]
    memory: bool,
    /// Heap budget override (MB)
    #[arg(long)]
    heap_budget_mb: Option<u64>,
    /// Start with reduced motion preferred
    #[arg(long)]
    reduced_motion: bool,
    /// Log every snapshot and detected performance issues
    #[arg(long)]
    log_metrics: bool,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// Trace file (JSON)
    trace: PathBuf,
    /// Write JSON lines here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ClassifyArgs {
    /// Classify this core count instead of the host's
    #[arg(long)]
    cores: Option<usize>,
}

#[derive(Args, Debug)]
struct VersionArgs {
    /// Print as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Overwrite the config file with defaults
    #[arg(long)]
    reset: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging (stderr; stdout carries JSON lines)
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => ProbeConfig::load_from(path),
        None => ProbeConfig::load(),
    }
    .context("Failed to load configuration")?;

    match cli.command {
        Command::Watch(args) => watch(config, args).await,
        Command::Replay(args) => replay_trace(&config, args),
        Command::Classify(args) => classify(args),
        Command::Config(args) => show_config(config, args),
        Command::Version(args) => show_version(args),
    }
}

async fn watch(mut config: ProbeConfig, args: WatchArgs) -> Result<()> {
    info!("🚦 Starting {}", BuildInfo::current().banner());

    if let Some(interval_ms) = args.interval_ms {
        config.monitor.sample_interval_ms = interval_ms;
    }
    if let Some(frame_rate) = args.frame_rate {
        config.frame_rate = frame_rate;
    }
    if let Some(heap_budget_mb) = args.heap_budget_mb {
        config.heap_budget_mb = Some(heap_budget_mb);
    }
    config.monitor.enable_memory_monitoring |= args.memory;
    config.monitor.log_metrics |= args.log_metrics;
    config.prefers_reduced_motion |= args.reduced_motion;

    config.monitor
        .validate()
        .context("Invalid monitor options")?;

    let host = SystemHost::new()
        .with_heap_budget(config.heap_budget_bytes())
        .with_reduced_motion(config.prefers_reduced_motion);
    let monitor = PerformanceMonitor::new(host, config.monitor.clone(), config.thresholds.clone());
    let device = monitor.device_class();
    info!(
        "📋 {} logical cores, {} device",
        device.logical_cores,
        if device.low_end { "low-end" } else { "standard" }
    );

    let driver = MonitorDriver::new(monitor).with_frame_rate(config.frame_rate);
    driver.on_metrics(|update| match update.to_json_line() {
        Ok(line) => print!("{}", line),
        Err(e) => error!("Failed to serialize update: {}", e),
    });

    driver.start();
    info!(
        "🚀 Sampling every {}ms - press Ctrl+C to stop",
        config.monitor.sample_interval_ms
    );

    let deadline = async {
        match args.duration_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = deadline => {
            info!("⏱️ Watch duration elapsed");
        }
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl+C")?;
            info!("🛑 Received shutdown signal");
        }
    }

    driver.stop();

    let policy = driver.policy();
    info!(
        "Final policy: animations={} parallax={} particles={} images={:?}",
        policy.enable_animations,
        !policy.disable_parallax,
        policy.particle_budget,
        policy.image_quality()
    );
    Ok(())
}

fn replay_trace(config: &ProbeConfig, args: ReplayArgs) -> Result<()> {
    let trace = Trace::load(&args.trace)
        .with_context(|| format!("Failed to load trace {}", args.trace.display()))?;

    let updates = replay(&trace, config.thresholds.clone());

    match &args.output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_json_lines(&updates, io::BufWriter::new(file))
                .context("Failed to write replay output")?;
            info!("📝 Wrote {} updates to {}", updates.len(), path.display());
        }
        None => {
            write_json_lines(&updates, io::stdout().lock())
                .context("Failed to write replay output")?;
        }
    }

    Ok(())
}

fn classify(args: ClassifyArgs) -> Result<()> {
    let cores = match args.cores {
        Some(cores) => Some(cores),
        None => SystemHost::new().capabilities().logical_cores,
    };

    let device = classify_device(cores);
    println!(
        "{}",
        serde_json::to_string_pretty(&device).context("Failed to serialize device class")?
    );
    Ok(())
}

fn show_config(config: ProbeConfig, args: ConfigArgs) -> Result<()> {
    let config = if args.reset {
        let fresh = ProbeConfig {
            config_path: config.config_path,
            ..ProbeConfig::default()
        };
        fresh.save().context("Failed to reset config")?;
        info!("♻️ Config reset to defaults");
        fresh
    } else {
        config
    };

    println!("# {}", config.config_path.display());
    print!(
        "{}",
        toml::to_string_pretty(&config).context("Failed to serialize config")?
    );
    Ok(())
}

fn show_version(args: VersionArgs) -> Result<()> {
    let info = BuildInfo::current();
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&info).context("Failed to serialize build info")?
        );
    } else {
        print!("{}", info);
    }
    Ok(())
}
