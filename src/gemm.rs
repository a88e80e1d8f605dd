//! FP8 x FP8 GEMM tile model.
//!
//! Maps a `(tile_m, tile_n, tile_k)` block to its LDS footprint, LDS and TDM
//! instruction costs, MFMA compute cycles and register usage. The B operand is
//! split across a 1x4 wave layout, so per-wave B quantities use `tile_n / 4`.
//!
//! Unlike the attention model, tiles are validated: `tile_k` must be a multiple
//! of the 32-wide scaling block and `tile_n` a multiple of the 16-wide MMA.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::error::{require_divisible, Result};

/// Bytes moved by one wave-wide LDS load (64 lanes x 8 bytes).
const LDS_INST_BYTES: u128 = 512;
/// Bytes moved by one wave-wide LDS scale load.
const LDS_SCALE_INST_BYTES: f64 = 128.0;
/// B-operand bytes covered by one TDM descriptor.
const TDM_B_BYTES: u128 = 256;
/// Waves sharing the N dimension.
const WAVES_N: f64 = 4.0;
/// FP8 elements packed per MFMA operand register lane.
const FP8_PACK: f64 = 4.0;
/// MMA N granularity.
const MMA_N: u32 = 16;

// ============================================================================
// Configuration
// ============================================================================

/// GEMM workload tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GemmTileConfig {
    pub tile_m: u32,
    pub tile_n: u32,
    pub tile_k: u32,
}

impl GemmTileConfig {
    pub fn new(tile_m: u32, tile_n: u32, tile_k: u32) -> Self {
        Self { tile_m, tile_n, tile_k }
    }

    /// Display key, e.g. `64x256x128`.
    pub fn name(&self) -> String {
        format!("{}x{}x{}", self.tile_m, self.tile_n, self.tile_k)
    }
}

/// Fixed hardware constants of the GEMM model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GemmConstants {
    /// Scaling granularity along K.
    pub block_size: u32,
    /// Extra columns padded onto each A row in LDS.
    pub a_lds_pad: u32,
    /// LDS capacity in bytes.
    pub lds_capacity_bytes: f64,
    pub lds_bytes_per_cycle: f64,
    /// FP8 MFMA throughput in MACs per cycle.
    pub mfma_throughput: f64,
}

impl Default for GemmConstants {
    fn default() -> Self {
        Self {
            block_size: 32,
            a_lds_pad: 16,
            lds_capacity_bytes: 320.0 * 1024.0,
            lds_bytes_per_cycle: 128.0,
            mfma_throughput: 16.0 * 16.0 * 128.0 / 8.0,
        }
    }
}

// ============================================================================
// Metrics
// ============================================================================

/// Rows of the GEMM table, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricRow {
    TileM,
    TileN,
    TileK,
    ComputeCycles,
    ALds,
    BLds,
    Scale,
    TotalLds,
    LdsAInst,
    LdsBInst,
    LdsScaleInst,
    MaxLdsStage,
    WaveLdsLatencyTime,
    TdmA,
    TdmB,
    TdmIssueTime,
    AccReg,
    ARegs,
    BRegs,
    RegPerMsb,
}

impl MetricRow {
    pub const ALL: [MetricRow; 20] = [
        Self::TileM,
        Self::TileN,
        Self::TileK,
        Self::ComputeCycles,
        Self::ALds,
        Self::BLds,
        Self::Scale,
        Self::TotalLds,
        Self::LdsAInst,
        Self::LdsBInst,
        Self::LdsScaleInst,
        Self::MaxLdsStage,
        Self::WaveLdsLatencyTime,
        Self::TdmA,
        Self::TdmB,
        Self::TdmIssueTime,
        Self::AccReg,
        Self::ARegs,
        Self::BRegs,
        Self::RegPerMsb,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::TileM => "tilem",
            Self::TileN => "tilen",
            Self::TileK => "tilek",
            Self::ComputeCycles => "compute cycles",
            Self::ALds => "A lds",
            Self::BLds => "B lds",
            Self::Scale => "scale",
            Self::TotalLds => "Total lds",
            Self::LdsAInst => "lds a inst",
            Self::LdsBInst => "lds b inst",
            Self::LdsScaleInst => "lds scale inst",
            Self::MaxLdsStage => "max lds stage",
            Self::WaveLdsLatencyTime => "wave lds latency time",
            Self::TdmA => "TDM A",
            Self::TdmB => "TDM B",
            Self::TdmIssueTime => "TDM issue time",
            Self::AccReg => "acc reg",
            Self::ARegs => "a regs",
            Self::BRegs => "b regs",
            Self::RegPerMsb => "reg per msb",
        }
    }
}

/// Metrics for one GEMM tile.
///
/// Byte and instruction counts are `u128`: products of three `u32` tile
/// dimensions cannot overflow them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GemmTileMetrics {
    pub config: GemmTileConfig,
    pub compute_cycles: f64,
    /// A bytes in LDS, rows padded.
    pub a_lds: u128,
    pub b_lds: u128,
    /// Scale bytes for A and B.
    pub scale: u128,
    pub total_lds: u128,
    pub lds_a_inst: u128,
    pub lds_b_inst: f64,
    pub lds_scale_inst: f64,
    /// Pipeline stages that fit in LDS (fractional).
    pub max_lds_stage: f64,
    pub wave_lds_latency_time: f64,
    pub tdm_a: u128,
    pub tdm_b: u128,
    pub tdm_issue_time: u128,
    pub acc_reg: f64,
    pub a_regs: f64,
    pub b_regs: f64,
    pub reg_per_msb: f64,
}

impl GemmTileMetrics {
    /// Value of one table row.
    pub fn value(&self, row: MetricRow) -> f64 {
        match row {
            MetricRow::TileM => self.config.tile_m as f64,
            MetricRow::TileN => self.config.tile_n as f64,
            MetricRow::TileK => self.config.tile_k as f64,
            MetricRow::ComputeCycles => self.compute_cycles,
            MetricRow::ALds => self.a_lds as f64,
            MetricRow::BLds => self.b_lds as f64,
            MetricRow::Scale => self.scale as f64,
            MetricRow::TotalLds => self.total_lds as f64,
            MetricRow::LdsAInst => self.lds_a_inst as f64,
            MetricRow::LdsBInst => self.lds_b_inst,
            MetricRow::LdsScaleInst => self.lds_scale_inst,
            MetricRow::MaxLdsStage => self.max_lds_stage,
            MetricRow::WaveLdsLatencyTime => self.wave_lds_latency_time,
            MetricRow::TdmA => self.tdm_a as f64,
            MetricRow::TdmB => self.tdm_b as f64,
            MetricRow::TdmIssueTime => self.tdm_issue_time as f64,
            MetricRow::AccReg => self.acc_reg,
            MetricRow::ARegs => self.a_regs,
            MetricRow::BRegs => self.b_regs,
            MetricRow::RegPerMsb => self.reg_per_msb,
        }
    }
}

/// Metrics for `config` with the default hardware constants.
pub fn gemm_tile_metrics(config: GemmTileConfig) -> Result<GemmTileMetrics> {
    gemm_tile_metrics_with(config, &GemmConstants::default())
}

/// Metrics for `config` with explicit hardware constants.
///
/// Fails before computing anything if `tile_k` or `tile_n` breaks granularity,
/// or if `hw.block_size` is zero.
pub fn gemm_tile_metrics_with(
    config: GemmTileConfig,
    hw: &GemmConstants,
) -> Result<GemmTileMetrics> {
    require_divisible(config.tile_k, hw.block_size, "tile_k")?;
    require_divisible(config.tile_n, MMA_N, "tile_n")?;

    let m = config.tile_m as u128;
    let n = config.tile_n as u128;
    let k = config.tile_k as u128;
    let block = hw.block_size as u128;
    let (mf, nf, kf) = (m as f64, n as f64, k as f64);

    // LDS footprint
    let a_lds = m * (k + hw.a_lds_pad as u128);
    let b_lds = k * n;
    let scale = (m * k) / block + (n * k) / block;
    let total_lds = a_lds + b_lds + scale;

    let compute_cycles = mf * nf * kf / FP8_PACK / hw.mfma_throughput;

    // TDM descriptors
    let tdm_a = m;
    let tdm_b = (n * k) / TDM_B_BYTES;
    let tdm_issue_time = tdm_a + tdm_b;

    // Per-wave LDS loads
    let lds_a_inst = (m * k) / LDS_INST_BYTES;
    let lds_b_inst = (nf / WAVES_N * kf / LDS_INST_BYTES as f64).floor();
    let lds_scale_inst = ((mf * kf / 32.0 + nf * kf / WAVES_N / 32.0) / LDS_SCALE_INST_BYTES).floor();
    let wave_lds_bytes = a_lds + b_lds / WAVES_N as u128;
    let wave_lds_latency_time = wave_lds_bytes as f64 / hw.lds_bytes_per_cycle;

    // Registers
    let acc_reg = mf * nf / 4.0 / 16.0 / 16.0 * 8.0;
    let a_regs = mf * kf / 16.0 / 128.0 * 16.0;
    let b_regs = nf / WAVES_N * kf / 16.0 / 128.0 * 16.0;
    let reg_per_msb = acc_reg / 4.0 + a_regs.max(b_regs) / 2.0;

    let max_lds_stage = hw.lds_capacity_bytes / total_lds as f64;

    debug!(tile = %config.name(), total_lds, max_lds_stage, compute_cycles, "gemm tile metrics");

    Ok(GemmTileMetrics {
        config,
        compute_cycles,
        a_lds,
        b_lds,
        scale,
        total_lds,
        lds_a_inst,
        lds_b_inst,
        lds_scale_inst,
        max_lds_stage,
        wave_lds_latency_time,
        tdm_a,
        tdm_b,
        tdm_issue_time,
        acc_reg,
        a_regs,
        b_regs,
        reg_per_msb,
    })
}

// ============================================================================
// Table
// ============================================================================

/// One table row: a metric across all configs.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub metric: MetricRow,
    pub values: Vec<f64>,
}

/// Rows x configs table of GEMM metrics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricTable {
    /// Config names, in input order.
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl MetricTable {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn row(&self, metric: MetricRow) -> Option<&TableRow> {
        self.rows.iter().find(|r| r.metric == metric)
    }

    /// Value at (`metric`, `column`).
    pub fn get(&self, metric: MetricRow, column: &str) -> Option<f64> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.row(metric).and_then(|r| r.values.get(idx).copied())
    }
}

struct RowMap<'a> {
    columns: &'a [String],
    values: &'a [f64],
}

impl Serialize for RowMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (col, v) in self.columns.iter().zip(self.values) {
            map.serialize_entry(col, v)?;
        }
        map.end()
    }
}

impl Serialize for MetricTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rows.len()))?;
        for row in &self.rows {
            let inner = RowMap { columns: &self.columns, values: &row.values };
            map.serialize_entry(row.metric.label(), &inner)?;
        }
        map.end()
    }
}

/// Evaluate every config and arrange the results as rows x configs.
///
/// Configs with a repeated name keep their first column. An empty input gives
/// an empty table. The first invalid config fails the whole table.
pub fn build_table(configs: &[GemmTileConfig]) -> Result<MetricTable> {
    let mut columns: Vec<String> = Vec::with_capacity(configs.len());
    let mut metrics: Vec<GemmTileMetrics> = Vec::with_capacity(configs.len());

    for cfg in configs {
        let name = cfg.name();
        if columns.contains(&name) {
            continue;
        }
        metrics.push(gemm_tile_metrics(*cfg)?);
        columns.push(name);
    }

    if metrics.is_empty() {
        return Ok(MetricTable::default());
    }

    let rows = MetricRow::ALL
        .iter()
        .map(|&metric| TableRow {
            metric,
            values: metrics.iter().map(|m| m.value(metric)).collect(),
        })
        .collect();

    Ok(MetricTable { columns, rows })
}
