//! Command-line interface for the FP8 tile cost estimator.
//!
//! Parameters are organized into categories:
//!
//! ## Attention
//! - `--gen`: Hardware generation (gen-a / gen-b)
//! - `--qtile`, `--kv-tile`: Score tile rows per wave
//! - `--packed`, `--coexec`: Mode flags (gen-a ignores `--packed` under `--coexec`)
//!
//! ## GEMM
//! - `--tiles`: Comma-separated `MxNxK` tiles for the GEMM table
//!
//! ## Modes
//! - `--gemm`: Print the GEMM tile table
//! - `--sweep`: Attention tile sweep as CSV
//! - `--demo`: GEMM table plus two attention reports
//! - `--presets`: List hardware generations
//! - `--json`: JSON instead of text tables

use clap::Parser;

use crate::attention::{ModeFlags, TileShape};
use crate::error::{ConfigError, Result};
use crate::gemm::GemmTileConfig;
use crate::profile::{Generation, HardwareProfile};

#[derive(Parser, Debug)]
#[command(name = "fp8-tilecost")]
#[command(author, version, about = "Analytical cycle estimator for FP8 GEMM tiles and fused attention softmax")]
pub struct Cli {
    // =========================================================================
    // Attention
    // =========================================================================

    /// Hardware generation: gen-a or gen-b
    #[arg(long = "gen", default_value = "gen-b", help_heading = "Attention")]
    pub generation: String,

    /// Query rows per wave
    #[arg(long, default_value = "48", help_heading = "Attention")]
    pub qtile: u32,

    /// Key/value rows per wave
    #[arg(long, default_value = "64", help_heading = "Attention")]
    pub kv_tile: u32,

    /// Process two FP8 elements per lane per instruction
    #[arg(long, default_value = "false", help_heading = "Attention")]
    pub packed: bool,

    /// Overlap softmax with the GEMM pipeline
    #[arg(long, default_value = "false", help_heading = "Attention")]
    pub coexec: bool,

    // =========================================================================
    // GEMM
    // =========================================================================

    /// GEMM tiles as comma-separated MxNxK
    #[arg(long, default_value = "64x256x128,64x512x128,64x256x256", help_heading = "GEMM")]
    pub tiles: String,

    // =========================================================================
    // Modes
    // =========================================================================

    /// Print the GEMM tile table
    #[arg(long, default_value = "false", help_heading = "Modes")]
    pub gemm: bool,

    /// Enable attention tile sweep mode (CSV output)
    #[arg(long, default_value = "false", help_heading = "Modes")]
    pub sweep: bool,

    /// Query tiles to sweep (comma-separated)
    #[arg(long, default_value = "16,32,48,64", help_heading = "Modes")]
    pub sweep_qtiles: String,

    /// KV tiles to sweep (comma-separated)
    #[arg(long, default_value = "32,64,128", help_heading = "Modes")]
    pub sweep_kv: String,

    /// Run the demonstration set (GEMM table and two attention reports)
    #[arg(long, default_value = "false", help_heading = "Modes")]
    pub demo: bool,

    /// List hardware generations and their constants
    #[arg(long, default_value = "false", help_heading = "Modes")]
    pub presets: bool,

    /// Emit JSON instead of text tables
    #[arg(long, default_value = "false", help_heading = "Modes")]
    pub json: bool,

    /// Debug logging on stderr (RUST_LOG overrides)
    #[arg(short, long, default_value = "false", help_heading = "Modes")]
    pub verbose: bool,
}

impl Cli {
    /// Resolve `--gen` to a preset profile.
    pub fn to_profile(&self) -> Result<HardwareProfile> {
        Generation::from_str(&self.generation)
            .map(|g| g.profile())
            .ok_or_else(|| ConfigError::UnknownGeneration(self.generation.clone()))
    }

    pub fn to_shape(&self) -> TileShape {
        TileShape::new(self.qtile, self.kv_tile)
    }

    pub fn to_flags(&self) -> ModeFlags {
        ModeFlags::new(self.packed, self.coexec)
    }

    /// Parse `--tiles`.
    pub fn parse_tiles(&self) -> Result<Vec<GemmTileConfig>> {
        self.tiles
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_tile)
            .collect()
    }

    /// Parse sweep query tiles.
    pub fn parse_sweep_qtiles(&self) -> Result<Vec<u32>> {
        parse_list("qtile", &self.sweep_qtiles)
    }

    /// Parse sweep KV tiles.
    pub fn parse_sweep_kv(&self) -> Result<Vec<u32>> {
        parse_list("kv_tile", &self.sweep_kv)
    }
}

/// Parse `MxNxK` into a tile config. Divisibility is left to the GEMM model.
pub fn parse_tile(s: &str) -> Result<GemmTileConfig> {
    let dims: Vec<u32> = s
        .split(['x', 'X'])
        .map(|d| d.trim().parse::<u32>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| ConfigError::InvalidTile(s.to_string()))?;

    match dims.as_slice() {
        [m, n, k] => Ok(GemmTileConfig::new(*m, *n, *k)),
        _ => Err(ConfigError::InvalidTile(s.to_string())),
    }
}

/// Parse a comma-separated list of tile sizes.
pub fn parse_list(what: &'static str, s: &str) -> Result<Vec<u32>> {
    s.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse::<u32>().map_err(|_| ConfigError::InvalidList {
                what,
                value: v.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tile() {
        assert_eq!(parse_tile("64x256x128").unwrap(), GemmTileConfig::new(64, 256, 128));
        assert_eq!(parse_tile("64X512X128").unwrap(), GemmTileConfig::new(64, 512, 128));
        assert!(matches!(parse_tile("64x256"), Err(ConfigError::InvalidTile(_))));
        assert!(matches!(parse_tile("64xfoox128"), Err(ConfigError::InvalidTile(_))));
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list("qtile", "16, 32,48").unwrap(), vec![16, 32, 48]);
        assert_eq!(parse_list("qtile", "").unwrap(), Vec::<u32>::new());
        assert_eq!(
            parse_list("kv_tile", "32,x").unwrap_err(),
            ConfigError::InvalidList { what: "kv_tile", value: "x".to_string() }
        );
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["fp8-tilecost"]);
        assert_eq!(cli.to_shape(), TileShape::new(48, 64));
        assert_eq!(cli.to_flags(), ModeFlags::default());
        assert_eq!(cli.to_profile().unwrap().generation, Generation::B);
        assert_eq!(cli.parse_tiles().unwrap().len(), 3);
    }

    #[test]
    fn test_unknown_generation() {
        let cli = Cli::parse_from(["fp8-tilecost", "--gen", "gen-z"]);
        assert_eq!(
            cli.to_profile().unwrap_err(),
            ConfigError::UnknownGeneration("gen-z".to_string())
        );
    }

    #[test]
    fn test_flags_from_args() {
        let cli = Cli::parse_from(["fp8-tilecost", "--gen", "gen-a", "--packed", "--coexec", "--qtile", "16"]);
        assert_eq!(cli.to_flags(), ModeFlags::new(true, true));
        assert_eq!(cli.to_shape().query_tile, 16);
        assert_eq!(cli.to_profile().unwrap().generation, Generation::A);
    }
}
