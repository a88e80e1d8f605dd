//! FP8 Tile Cost Estimator
//!
//! Closed-form cycle estimates for FP8 x FP8 GEMM tiles and for the fused
//! attention softmax between the QK and AV multiplies, across hardware
//! generations. Nothing is executed on a GPU: every number comes from the
//! formulas in [`gemm`] and [`attention`] and the constants in [`profile`].

mod attention;
mod cli;
mod error;
mod gemm;
mod profile;
mod report;
mod sweep;


use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use attention::{attention_report, ModeFlags, TileShape};
use cli::Cli;
use gemm::{build_table, GemmTileConfig};
use profile::{Generation, IssueModel};
use report::{render_attention_report, render_gemm_table};
use sweep::{attention_sweep, SweepRow};

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    if args.presets {
        return run_presets(&args);
    }

    if args.demo {
        return run_demo(&args);
    }

    if args.gemm {
        return run_gemm(&args);
    }

    if args.sweep {
        return run_sweep(&args);
    }

    run_attention(&args)
}

/// Logs go to stderr so CSV and JSON on stdout stay clean.
fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_attention(args: &Cli) -> anyhow::Result<()> {
    let profile = args.to_profile()?;
    let shape = args.to_shape();
    let requested = args.to_flags();

    info!(generation = profile.generation.name(), qtile = shape.query_tile, kv_tile = shape.kv_tile, "attention estimate");

    let report = attention_report(shape, requested, &profile);
    if requested.packed && !report.flags.packed {
        info!("packed mode disabled under co-execution on {}", profile.generation.name());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_attention_report(&report));
    }
    Ok(())
}

fn run_gemm(args: &Cli) -> anyhow::Result<()> {
    let configs = args.parse_tiles()?;
    info!(tiles = configs.len(), "gemm tile table");
    print_gemm_table(&configs, args.json)
}

fn print_gemm_table(configs: &[GemmTileConfig], json: bool) -> anyhow::Result<()> {
    let table = build_table(configs).context("building GEMM tile table")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&table)?);
    } else {
        println!("=== FP8 x FP8 GEMM Tile Model ===\n");
        print!("{}", render_gemm_table(&table));
    }
    Ok(())
}

fn run_sweep(args: &Cli) -> anyhow::Result<()> {
    let profile = args.to_profile()?;
    let qtiles = args.parse_sweep_qtiles()?;
    let kv_tiles = args.parse_sweep_kv()?;

    info!(qtiles = qtiles.len(), kv_tiles = kv_tiles.len(), "attention sweep");
    let rows = attention_sweep(&profile, &qtiles, &kv_tiles, args.to_flags());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    // Output as CSV
    println!("{}", SweepRow::csv_header());
    for row in &rows {
        println!("{}", row.to_csv());
    }
    Ok(())
}

fn run_demo(args: &Cli) -> anyhow::Result<()> {
    let configs = [
        GemmTileConfig::new(64, 256, 128),
        GemmTileConfig::new(64, 512, 128),
        GemmTileConfig::new(64, 256, 256),
    ];
    print_gemm_table(&configs, args.json)?;

    let profile = args.to_profile()?;
    let cases = [
        (TileShape::new(48, 64), ModeFlags::new(false, false)),
        (TileShape::new(48, 32), ModeFlags::new(false, true)),
    ];
    for (shape, flags) in cases {
        let report = attention_report(shape, flags, &profile);
        if args.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print!("\n{}", render_attention_report(&report));
        }
    }
    Ok(())
}

fn run_presets(args: &Cli) -> anyhow::Result<()> {
    if args.json {
        let profiles: Vec<_> = Generation::ALL.iter().map(|g| g.profile()).collect();
        println!("{}", serde_json::to_string_pretty(&profiles)?);
        return Ok(());
    }

    println!("=== Hardware Generations ===\n");
    for gen in Generation::ALL {
        let p = gen.profile();
        println!("{} - {}", gen.name(), gen.description());
        println!("  Wave width:      {}", p.wave_width);
        println!("  Head size:       {}", p.head_size);
        println!("  MMA throughput:  {} elem/cycle", p.mma_throughput);
        match p.issue {
            IssueModel::Rate { vector, transcendental } => {
                println!("  Issue:           rate (vector {} / trans {} cycles)", vector, transcendental);
            }
            IssueModel::Fixed { issue_cycles } => {
                println!("  Issue:           fixed {} cycles (exp x4, cvt x2)", issue_cycles);
            }
        }
        println!("  Dequant stage:   {}", p.stages.dequant_score);
        println!("  Reshape stage:   {}", p.stages.reshape.is_some());
        println!("  Packed+coexec:   {}", if p.stages.packed_off_under_coexec { "packed forced off" } else { "packed kept" });
        println!();
    }
    Ok(())
}
