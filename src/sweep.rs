//! Tile-size sweeps over the attention model.
//!
//! Evaluates every `(query_tile, kv_tile)` pair for one profile and reports
//! the serial and co-execution totals, for sensitivity tables and CSV output.

use serde::Serialize;

use crate::attention::{attention_report, ModeFlags, TileShape};
use crate::profile::HardwareProfile;

/// Single result from a tile sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepRow {
    pub generation: &'static str,
    pub query_tile: u32,
    pub kv_tile: u32,
    pub packed: bool,
    pub coexec: bool,
    pub gemm_cycles: f64,
    pub softmax_cycles: f64,
    pub total_cycles: f64,
    pub coexec_cycles: f64,
    /// Softmax share of the serial total, in percent.
    pub softmax_pct: f64,
}

impl SweepRow {
    /// CSV header.
    pub fn csv_header() -> &'static str {
        "gen,qtile,kv_tile,packed,coexec,gemm,softmax,total,total_coexec,softmax%"
    }

    /// Format as CSV row.
    pub fn to_csv(&self) -> String {
        format!(
            "{},{},{},{},{},{:.2},{:.2},{:.2},{:.2},{:.1}",
            self.generation,
            self.query_tile,
            self.kv_tile,
            self.packed,
            self.coexec,
            self.gemm_cycles,
            self.softmax_cycles,
            self.total_cycles,
            self.coexec_cycles,
            self.softmax_pct
        )
    }
}

/// Sweep every query/kv tile pair. Query tiles are the outer loop.
pub fn attention_sweep(
    profile: &HardwareProfile,
    query_tiles: &[u32],
    kv_tiles: &[u32],
    flags: ModeFlags,
) -> Vec<SweepRow> {
    let mut results = Vec::with_capacity(query_tiles.len() * kv_tiles.len());

    for &q in query_tiles {
        for &kv in kv_tiles {
            let report = attention_report(TileShape::new(q, kv), flags, profile);

            let softmax_pct = if report.total_cycles > 0.0 {
                100.0 * report.softmax_total / report.total_cycles
            } else {
                0.0
            };

            results.push(SweepRow {
                generation: profile.generation.name(),
                query_tile: q,
                kv_tile: kv,
                packed: report.flags.packed,
                coexec: report.flags.coexec,
                gemm_cycles: report.gemm_cycles,
                softmax_cycles: report.softmax_total,
                total_cycles: report.total_cycles,
                coexec_cycles: report.coexec_total_cycles,
                softmax_pct,
            });
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{GEN_A, GEN_B};

    #[test]
    fn test_sweep_produces_cartesian_product() {
        let rows = attention_sweep(&GEN_B, &[16, 32, 48], &[32, 64], ModeFlags::default());
        assert_eq!(rows.len(), 6);
        assert_eq!((rows[0].query_tile, rows[0].kv_tile), (16, 32));
        assert_eq!((rows[1].query_tile, rows[1].kv_tile), (16, 64));
        assert_eq!((rows[5].query_tile, rows[5].kv_tile), (48, 64));
    }

    #[test]
    fn test_sweep_empty_inputs() {
        assert!(attention_sweep(&GEN_A, &[], &[64], ModeFlags::default()).is_empty());
        assert!(attention_sweep(&GEN_A, &[16], &[], ModeFlags::default()).is_empty());
    }

    #[test]
    fn test_sweep_reports_effective_flags() {
        let rows = attention_sweep(&GEN_A, &[48], &[32], ModeFlags::new(true, true));
        assert!(!rows[0].packed);
        assert!(rows[0].coexec);
    }

    #[test]
    fn test_sweep_matches_known_point() {
        let rows = attention_sweep(&GEN_B, &[48], &[64], ModeFlags::default());
        let r = &rows[0];
        assert_eq!(r.gemm_cycles, 1536.0);
        assert_eq!(r.softmax_cycles, 2952.0);
        assert_eq!(r.total_cycles, 4488.0);
        assert_eq!(r.coexec_cycles, 2436.0);
        assert_eq!(r.generation, "gen-b");
    }

    #[test]
    fn test_zero_tile_softmax_pct_defined() {
        let rows = attention_sweep(&GEN_A, &[0], &[0], ModeFlags::default());
        assert_eq!(rows[0].softmax_pct, 0.0);
    }

    #[test]
    fn test_csv_column_count() {
        let rows = attention_sweep(&GEN_A, &[16], &[128], ModeFlags::default());
        let header_cols = SweepRow::csv_header().split(',').count();
        assert_eq!(rows[0].to_csv().split(',').count(), header_cols);
    }
}
