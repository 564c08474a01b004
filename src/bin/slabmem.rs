//! slabmem command-line driver
//!
//! Runs allocation workloads against the slab pool and prints the resulting
//! allocator state.
//!
//! # Examples
//!
//! ```bash
//! # Run the built-in workload and print snapshots
//! slabmem demo
//!
//! # Allocate a few sizes and show where they landed
//! slabmem alloc 80 16 48
//!
//! # Print the effective configuration
//! slabmem --config slab.toml config
//! ```

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use slabmem::slab::pool;
use slabmem::SlabConfig;
use std::path::PathBuf;
use std::ptr::NonNull;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// slabmem - segregated slot allocator driver
#[derive(Parser, Debug)]
#[command(name = "slabmem")]
#[command(version = slabmem::VERSION)]
#[command(about = "Segregated slot allocator driver", long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Allocator configuration file (TOML)
    #[arg(long, global = true, env = "SLABMEM_CONFIG")]
    config: Option<PathBuf>,

    /// Log directory path
    #[arg(long, global = true, default_value = "logs", env = "SLABMEM_LOG_DIR")]
    log_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Print Prometheus metrics after the command finishes
    #[arg(long, global = true)]
    metrics: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the built-in allocation workload
    Demo,

    /// Allocate the given sizes and print a snapshot
    Alloc(AllocArgs),

    /// Print the effective configuration
    Config,

    /// Show version
    Version,
}

#[derive(Args, Debug)]
struct AllocArgs {
    /// Request sizes in bytes
    #[arg(required = true)]
    sizes: Vec<usize>,

    /// Release every allocation before printing the final snapshot
    #[arg(long)]
    release: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(&cli)?;

    let config = SlabConfig::load(cli.config.as_deref())
        .context("Failed to load allocator configuration")?;

    match cli.command {
        Commands::Demo => demo_command(config)?,
        Commands::Alloc(ref args) => alloc_command(config, args)?,
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Version => {
            println!("slabmem {}", slabmem::VERSION);
        }
    }

    if cli.metrics {
        print!("{}", slabmem::metrics::export_metrics());
    }

    Ok(())
}

/// Setup logging with rolling files and console output
fn setup_logging(cli: &Cli) -> anyhow::Result<()> {
    std::fs::create_dir_all(&cli.log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &cli.log_dir, "slabmem.log");

    let log_level = cli
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!cli.no_color),
        )
        .with(fmt::layer().with_writer(file_appender).with_ansi(false))
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    Ok(())
}

/// Allocate `sizes`, print the snapshot, optionally release everything
fn alloc_command(config: SlabConfig, args: &AllocArgs) -> anyhow::Result<()> {
    pool::init(config)?;

    let mut live = Vec::new();
    for &size in &args.sizes {
        match pool::allocate(size) {
            Ok(ptr) => {
                println!("{:>6} bytes -> {:p}", size, ptr);
                live.push(ptr);
            }
            Err(e) => warn!("Allocation of {} bytes failed: {}", size, e),
        }
    }
    print!("{}", pool::snapshot()?);

    if args.release {
        release_all(&live);
        print!("{}", pool::snapshot()?);
    }

    pool::teardown()?;
    Ok(())
}

/// Workload covering reuse, growth, and rejected requests
fn demo_command(config: SlabConfig) -> anyhow::Result<()> {
    pool::init(config)?;
    let alignment = config.alignment;
    let max = config.max_request();

    info!("Basic allocation");
    let ptr = pool::allocate(alignment)?;
    print!("{}", pool::snapshot()?);
    pool::release(ptr.as_ptr())?;

    info!("Different sizes");
    let sizes: Vec<usize> = (1..=config.max_request_classes)
        .map(|n| n * alignment)
        .collect();
    let ptrs = sizes
        .iter()
        .map(|&size| pool::allocate(size))
        .collect::<Result<Vec<_>, _>>()?;
    print!("{}", pool::snapshot()?);
    release_all(&ptrs);

    info!("Rejected requests");
    for size in [0, max + 1] {
        if let Err(e) = pool::allocate(size) {
            println!("allocate({}) rejected: {}", size, e);
        }
    }
    let ptr = pool::allocate(alignment)?;
    pool::release(ptr.as_ptr())?;
    if let Err(e) = pool::release(ptr.as_ptr()) {
        println!("second release rejected: {}", e);
    }
    if let Err(e) = pool::release(0x1234_5678 as *mut u8) {
        println!("foreign release rejected: {}", e);
    }

    info!("Batch expansion");
    let batch_fill = config.slots_per_batch * 2 + config.slots_per_batch / 2;
    let ptrs = (0..batch_fill)
        .map(|_| pool::allocate(alignment))
        .collect::<Result<Vec<_>, _>>()?;
    print!("{}", pool::snapshot()?);
    release_all(&ptrs);

    pool::teardown()?;
    Ok(())
}

fn release_all(ptrs: &[NonNull<u8>]) {
    for ptr in ptrs {
        if let Err(e) = pool::release(ptr.as_ptr()) {
            error!("Release of {:p} failed: {}", ptr, e);
        }
    }
}
