//! Headless party match runner.
//!
//! Plays a scripted scenario without graphics and writes phase events as
//! JSON lines on stdout. Designed for CI timing checks and determinism
//! verification.
//!
//! # Usage
//!
//! ```bash
//! # Run the built-in scenario
//! cargo run -p party_headless
//!
//! # Run a scenario file, stopping after two replay loops
//! cargo run -p party_headless -- run --scenario scenarios/gauntlet_duo.ron --replay-loops 2
//!
//! # Check a scenario file without running it
//! cargo run -p party_headless -- validate --scenario scenarios/gauntlet_duo.ron
//!
//! # Verify determinism
//! cargo run -p party_headless -- verify --runs 5
//! ```
//!
//! # Output
//!
//! Output (stdout): JSON records, one per line
//! Logs (stderr): Debug information

use std::io::{self, Write};
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use party_headless::{verify, HeadlessRunner, Output, Scenario};

#[derive(Parser)]
#[command(name = "party_headless")]
#[command(about = "Headless party match runner for scripting and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and stream its events
    Run {
        /// Scenario file to load (built-in scenario if omitted)
        #[arg(short, long)]
        scenario: Option<String>,

        /// Override the wall-time limit, in seconds
        #[arg(long)]
        max_seconds: Option<f64>,

        /// Override the number of replay loops to play
        #[arg(long)]
        replay_loops: Option<u64>,
    },

    /// Parse and check a scenario file
    Validate {
        /// Scenario file to check
        #[arg(short, long)]
        scenario: String,
    },

    /// Run a scenario several times and compare the results
    Verify {
        /// Scenario file to load (built-in scenario if omitted)
        #[arg(short, long)]
        scenario: Option<String>,

        /// Number of runs
        #[arg(short, long, default_value = "3")]
        runs: usize,
    },

    /// Time repeated runs of a scenario
    Benchmark {
        /// Scenario file to load (built-in scenario if omitted)
        #[arg(short, long)]
        scenario: Option<String>,

        /// Number of runs
        #[arg(short, long, default_value = "20")]
        runs: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for output records)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        Some(Commands::Run {
            scenario,
            max_seconds,
            replay_loops,
        }) => {
            cmd_run(scenario, max_seconds, replay_loops);
        }
        Some(Commands::Validate { scenario }) => {
            cmd_validate(&scenario);
        }
        Some(Commands::Verify { scenario, runs }) => {
            cmd_verify(scenario, runs);
        }
        Some(Commands::Benchmark { scenario, runs }) => {
            cmd_benchmark(scenario, runs);
        }
        None => {
            cmd_run(None, None, None);
        }
    }
}

/// Load a scenario file, or the built-in one. Exits on failure.
fn load_scenario(path: Option<String>) -> Scenario {
    let Some(path) = path else {
        return Scenario::gauntlet_duo();
    };
    tracing::info!("Using scenario: {}", path);
    match Scenario::load(&path) {
        Ok(s) => s,
        Err(e) => {
            let mut stdout = io::stdout();
            stdout
                .write_all(Output::error(e.to_string()).to_json_line().as_bytes())
                .ok();
            eprintln!("Failed to load scenario: {}", e);
            std::process::exit(1);
        }
    }
}

/// Run a single scenario
fn cmd_run(scenario: Option<String>, max_seconds: Option<f64>, replay_loops: Option<u64>) {
    let scenario = load_scenario(scenario);

    let mut limits = scenario.limits;
    if let Some(seconds) = max_seconds {
        if !seconds.is_finite() || seconds <= 0.0 {
            eprintln!("--max-seconds must be positive");
            std::process::exit(1);
        }
        limits.max_seconds = seconds;
    }
    if let Some(loops) = replay_loops {
        limits.replay_loops = loops;
    }

    let runner = HeadlessRunner::new(scenario).with_limits(limits);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = runner.run(&mut out) {
        out.write_all(Output::error(e.to_string()).to_json_line().as_bytes())
            .ok();
        eprintln!("Run failed: {}", e);
        std::process::exit(1);
    }
}

/// Check a scenario file
fn cmd_validate(path: &str) {
    match Scenario::load(path) {
        Ok(scenario) => {
            eprintln!("PASS: {}", scenario.name);
            eprintln!("  Players: {}", scenario.players.len());
            eprintln!("  Timeline: {} actions", scenario.timeline.len());
            eprintln!(
                "  Camera: {}",
                if scenario.camera.is_some() { "recorded" } else { "static" }
            );
        }
        Err(e) => {
            eprintln!("FAIL: {}", e);
            std::process::exit(1);
        }
    }
}

/// Verify determinism
fn cmd_verify(scenario: Option<String>, runs: usize) {
    let scenario = load_scenario(scenario);
    tracing::info!(
        "Verifying determinism: {} ({} runs)",
        scenario.name,
        runs
    );

    match verify(&scenario, runs) {
        Ok(report) if report.is_deterministic => {
            eprintln!(
                "PASS: All {} runs produced identical results",
                report.summaries.len()
            );
            if let Some(summary) = report.summaries.first() {
                eprintln!("  Event hash: {:016x}", summary.event_hash);
                eprintln!("  Pose hash:  {:016x}", summary.pose_hash);
            }
        }
        Ok(report) => {
            eprintln!("FAIL: Non-determinism detected!");
            if let Some(run) = report.first_mismatch() {
                eprintln!("  First differing run: {}", run);
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("FAIL: Error during verification: {}", e);
            std::process::exit(1);
        }
    }
}

/// Run benchmark
fn cmd_benchmark(scenario: Option<String>, runs: u32) {
    let scenario = load_scenario(scenario);
    let runner = HeadlessRunner::new(scenario);
    tracing::info!("Running {} benchmark runs", runs);

    let start = Instant::now();
    let mut ticks = 0u64;
    for _ in 0..runs {
        match runner.run(&mut io::sink()) {
            Ok(summary) => ticks += summary.ticks,
            Err(e) => {
                eprintln!("Run failed: {}", e);
                std::process::exit(1);
            }
        }
    }
    let elapsed = start.elapsed();

    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BENCHMARK RESULTS");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Runs: {}", runs);
    eprintln!("Ticks: {}", ticks);
    eprintln!("Duration: {:.3}s", elapsed.as_secs_f64());
    eprintln!(
        "Ticks/second: {:.1}",
        ticks as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
    );
}
