use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};
use timeline::{
    format_time, EngineConfig, SimulatedMedia, Tick, TimelineCommand, TimelineEngine,
    TimelineEvent,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "timeline-cli")]
#[command(about = "Timeline CLI - Headless timeline editing engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a JSON command script to a fresh engine and report the result
    Replay {
        /// Script file: a JSON array of commands
        script: PathBuf,

        /// Seed for placeholder waveforms
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Keep going after a command fails
        #[arg(long)]
        keep_going: bool,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the playback loop in real time against a simulated media element
    Play {
        /// Media duration in seconds
        #[arg(long, default_value = "30")]
        duration: f64,

        /// Start position in seconds
        #[arg(long, default_value = "0")]
        start: f64,

        /// Wall-clock seconds to run for
        #[arg(long, default_value = "5")]
        seconds: f64,

        /// Animation frames per second
        #[arg(long, default_value = "60")]
        fps: u32,

        /// Playback rate of the simulated media element's own clock
        #[arg(long, default_value = "1.0")]
        media_rate: f64,

        /// Restart playback after it wraps at the end
        #[arg(long = "loop")]
        loop_playback: bool,
    },

    /// Write the default engine configuration
    Config {
        /// Output file path
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Replay {
            script,
            seed,
            keep_going,
            output,
        } => replay_command(config, script, seed, keep_going, output).await,
        Commands::Play {
            duration,
            start,
            seconds,
            fps,
            media_rate,
            loop_playback,
        } => play_command(config, duration, start, seconds, fps, media_rate, loop_playback).await,
        Commands::Config { output } => config_command(config, output).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            let config = EngineConfig::load(path)
                .with_context(|| format!("failed to load configuration from {:?}", path))?;
            info!("Loaded configuration: {:?}", path);
            Ok(config)
        }
        None => Ok(EngineConfig::default()),
    }
}

async fn replay_command(
    config: EngineConfig,
    script: PathBuf,
    seed: u64,
    keep_going: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let json = tokio::fs::read_to_string(&script)
        .await
        .with_context(|| format!("failed to read script {:?}", script))?;
    let commands: Vec<TimelineCommand> =
        serde_json::from_str(&json).with_context(|| format!("invalid script {:?}", script))?;
    info!("Replaying {} commands from {:?}", commands.len(), script);

    let mut engine = TimelineEngine::with_seed(config, seed)?;
    let events = Rc::new(RefCell::new(0usize));
    let counter = Rc::clone(&events);
    engine.subscribe(move |event| {
        *counter.borrow_mut() += 1;
        debug!("event: {:?}", event);
    });

    let mut steps = Vec::with_capacity(commands.len());
    let mut failures = 0;
    for (index, command) in commands.into_iter().enumerate() {
        let label = serde_json::to_value(&command)?;
        match engine.apply(command) {
            Ok(outcome) => {
                steps.push(serde_json::json!({ "index": index, "command": label, "outcome": outcome }));
            }
            Err(e) if keep_going => {
                warn!("Command {} failed: {}", index, e);
                failures += 1;
                steps.push(serde_json::json!({ "index": index, "command": label, "error": e.to_string() }));
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!("command {} failed", index)));
            }
        }
    }

    let validation = engine.validate();
    if let Err(problem) = &validation {
        warn!("Timeline invariants violated: {}", problem);
    }

    let report = serde_json::json!({
        "script": script,
        "steps": steps,
        "failures": failures,
        "events": *events.borrow(),
        "state": engine.snapshot(),
        "ruler": engine.ruler_ticks(),
        "valid": validation.is_ok(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    if let Some(output_path) = output {
        tokio::fs::write(&output_path, serde_json::to_string_pretty(&report)?).await?;
        info!("Report written to: {:?}", output_path);
    } else {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

async fn play_command(
    config: EngineConfig,
    duration: f64,
    start: f64,
    seconds: f64,
    fps: u32,
    media_rate: f64,
    loop_playback: bool,
) -> Result<()> {
    if fps == 0 {
        return Err(anyhow::anyhow!("fps must be at least 1"));
    }
    if !(seconds.is_finite() && seconds > 0.0) {
        return Err(anyhow::anyhow!("seconds must be positive, got {}", seconds));
    }

    let mut engine = TimelineEngine::new(config)?;
    engine.set_duration(duration)?;
    engine.mount();
    engine.seek(start);

    let scrolls = Rc::new(RefCell::new(0usize));
    let counter = Rc::clone(&scrolls);
    engine.subscribe(move |event| {
        if let TimelineEvent::ScrollChanged(x) = event {
            *counter.borrow_mut() += 1;
            debug!("auto-scroll to {:.0}px", x);
        }
    });

    let media = Rc::new(RefCell::new(SimulatedMedia::new()));
    engine.bind_media(Box::new(Rc::clone(&media)));

    info!(
        "Playing {} of {} for {:.1}s at {} fps (media rate {:.2})",
        format_time(start),
        format_time(duration),
        seconds,
        fps,
        media_rate
    );
    engine.play();

    let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / fps as f64));
    let began = Instant::now();
    let run_for = Duration::from_secs_f64(seconds);
    let mut last_elapsed = Duration::ZERO;
    let mut frames = 0u64;
    let mut wraps = 0u32;

    loop {
        interval.tick().await;
        let elapsed = began.elapsed();
        media
            .borrow_mut()
            .run_for((elapsed - last_elapsed).as_secs_f64() * media_rate);
        last_elapsed = elapsed;
        frames += 1;

        if let Tick::Wrapped = engine.frame(elapsed.as_secs_f64() * 1000.0) {
            wraps += 1;
            info!("Reached the end; playhead back at 00:00");
            if loop_playback {
                engine.play();
            } else {
                break;
            }
        }
        if elapsed >= run_for {
            break;
        }
    }

    engine.pause();
    engine.unmount();

    let media = media.borrow();
    info!(
        "Stopped at {} after {} frames: {} wrap(s), {} media resync(s), {} auto-scroll(s)",
        format_time(engine.current_time()),
        frames,
        wraps,
        media.seek_count,
        *scrolls.borrow()
    );
    Ok(())
}

async fn config_command(config: EngineConfig, output: PathBuf) -> Result<()> {
    config.save(&output)?;
    info!("Configuration written to: {:?}", output);
    Ok(())
}
