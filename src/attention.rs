//! Cycle model for the fused FP8 attention softmax.
//!
//! Estimates the per-stage cycle cost of one softmax pass over a
//! `query_tile x kv_tile` score block, plus the MMA cycles of the QK and AV
//! multiplies around it. One parameterized model covers every hardware
//! generation; the differences live in [`HardwareProfile`].
//!
//! # Allocation-Free Hot Path
//!
//! [`attention_cycles`] and [`gemm_cycles`] only touch stack values and
//! return [`CostBreakdown`] by value, so sweeps can call them in tight loops.
//!
//! # No Input Validation
//!
//! Tile sizes are not checked. A zero tile yields zero-cost stages (and the
//! fixed latencies of generation B) rather than an error. Callers that need
//! validation must do it before calling in. This differs from the GEMM tile
//! model, which rejects tiles that break instruction granularity.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::profile::{
    Generation, HardwareProfile, InterLaneReduce, OutputRecompute, ROWS_PER_REDUCE,
};

/// Fraction of the GEMM duration the softmax can hide under when co-executing.
pub const COEXEC_OVERLAP: f64 = 0.75;

// ============================================================================
// Inputs
// ============================================================================

/// Attention workload: rows of Q and of K/V processed per wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TileShape {
    pub query_tile: u32,
    pub kv_tile: u32,
}

impl TileShape {
    pub fn new(query_tile: u32, kv_tile: u32) -> Self {
        Self { query_tile, kv_tile }
    }

    /// Score elements each lane processes: `q * kv / wave_width`.
    #[inline]
    pub fn lane_elements(&self, profile: &HardwareProfile) -> f64 {
        (self.query_tile as f64 * self.kv_tile as f64) / profile.wave_width
    }
}

/// Mode flags for one model evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModeFlags {
    /// Process two 8-bit elements per lane per instruction.
    pub packed: bool,
    /// Overlap the softmax with the GEMM pipeline.
    pub coexec: bool,
}

impl ModeFlags {
    pub fn new(packed: bool, coexec: bool) -> Self {
        Self { packed, coexec }
    }

    /// Flags as the profile actually applies them.
    ///
    /// Generation A drops packed mode under co-execution; generation B keeps
    /// whatever the caller asked for.
    #[inline]
    pub fn effective(self, profile: &HardwareProfile) -> Self {
        if self.coexec && profile.stages.packed_off_under_coexec {
            Self { packed: false, ..self }
        } else {
            self
        }
    }
}

// ============================================================================
// Cost Breakdown
// ============================================================================

/// Softmax pipeline stages, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    DequantScore,
    IntraMax,
    InterMax,
    SoftmaxFmaExp,
    SoftmaxSum,
    QuantScore,
    ReshapeScore,
    RecomputeOutput,
}

impl Stage {
    pub const COUNT: usize = 8;

    pub const ALL: [Stage; Self::COUNT] = [
        Self::DequantScore,
        Self::IntraMax,
        Self::InterMax,
        Self::SoftmaxFmaExp,
        Self::SoftmaxSum,
        Self::QuantScore,
        Self::ReshapeScore,
        Self::RecomputeOutput,
    ];

    /// Stable key used in reports and JSON.
    pub fn key(&self) -> &'static str {
        match self {
            Self::DequantScore => "dequant",
            Self::IntraMax => "intra_max",
            Self::InterMax => "inter_max",
            Self::SoftmaxFmaExp => "softmax_fma_exp",
            Self::SoftmaxSum => "softmax_sum",
            Self::QuantScore => "s_quant",
            Self::ReshapeScore => "reshape_s",
            Self::RecomputeOutput => "recompute_output",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.key() == key)
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

/// Ordered stage -> cycles mapping produced by one model evaluation.
///
/// Stages a generation does not model are absent, not zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostBreakdown {
    cycles: [Option<f64>; Stage::COUNT],
}

impl CostBreakdown {
    fn empty() -> Self {
        Self { cycles: [None; Stage::COUNT] }
    }

    #[inline]
    fn with(mut self, stage: Stage, cycles: f64) -> Self {
        self.cycles[stage.index()] = Some(cycles);
        self
    }

    /// Cycles for `stage`, `None` when the stage is not modeled.
    pub fn get(&self, stage: Stage) -> Option<f64> {
        self.cycles[stage.index()]
    }

    /// Present stages in report order.
    pub fn iter(&self) -> impl Iterator<Item = (Stage, f64)> + '_ {
        Stage::ALL
            .into_iter()
            .filter_map(move |s| self.get(s).map(|c| (s, c)))
    }

    pub fn len(&self) -> usize {
        self.cycles.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum over all present stages.
    pub fn sum(&self) -> f64 {
        self.iter().map(|(_, c)| c).sum()
    }
}

impl Serialize for CostBreakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (stage, cycles) in self.iter() {
            map.serialize_entry(stage.key(), &cycles)?;
        }
        map.end()
    }
}

// ============================================================================
// Model
// ============================================================================

#[inline]
fn halve_if(packed: bool, x: f64) -> f64 {
    if packed {
        x / 2.0
    } else {
        x
    }
}

/// MMA cycles for the QK and AV multiplies of one tile.
///
/// `q * kv * head * 2 * 2 / mma_throughput`.
#[inline]
pub fn gemm_cycles(shape: TileShape, profile: &HardwareProfile) -> f64 {
    let ops = shape.query_tile as f64 * shape.kv_tile as f64 * profile.head_size * 2.0 * 2.0;
    ops / profile.mma_throughput
}

/// Per-stage softmax cycles for one tile.
///
/// `flags` are passed through [`ModeFlags::effective`] first, so a generation
/// that disables packing under co-execution ignores `packed` there.
///
/// INVARIANT: No heap allocations in this function.
#[inline]
pub fn attention_cycles(
    shape: TileShape,
    flags: ModeFlags,
    profile: &HardwareProfile,
) -> CostBreakdown {
    let packed = flags.effective(profile).packed;
    let issue = &profile.issue;
    let stages = &profile.stages;
    let q = shape.query_tile as f64;
    let elems = shape.lane_elements(profile);
    let elems_h = halve_if(packed, elems);

    let mut out = CostBreakdown::empty();

    if stages.dequant_score {
        out = out.with(Stage::DequantScore, elems_h * issue.vector());
    }

    // max3 consumes two new elements per instruction
    out = out.with(Stage::IntraMax, elems / 2.0 * issue.vector());

    let inter_max = match stages.inter_lane {
        InterLaneReduce::RateScaled => 4.0 * q / ROWS_PER_REDUCE * issue.vector(),
        InterLaneReduce::SharedMemory {
            permute_latency,
            write_latency,
            read_latency,
            tail_cycles,
        } => {
            permute_latency
                + write_latency
                + read_latency
                + (q / ROWS_PER_REDUCE) * tail_cycles / 2.0
        }
    };
    out = out.with(Stage::InterMax, inter_max);

    // exp((s - max) * scale): one fma, one exp
    let fma_exp = elems_h * issue.vector() + elems * issue.transcendental();
    out = out.with(Stage::SoftmaxFmaExp, fma_exp);

    out = out.with(Stage::SoftmaxSum, elems_h * issue.vector());

    // scale compute + fp8 convert
    let quant = elems_h * issue.vector() + elems_h * issue.convert();
    out = out.with(Stage::QuantScore, quant);

    if let Some(reshape) = stages.reshape {
        let groups = elems / reshape.group_elems;
        let cycles = groups * reshape.write_bytes + reshape.latency + groups * reshape.read_bytes;
        out = out.with(Stage::ReshapeScore, cycles);
    }

    let recompute = match stages.recompute {
        OutputRecompute::RescaleAccumulate => {
            let out_elems = q * profile.head_size / profile.wave_width;
            halve_if(packed, out_elems * 2.0) * issue.vector()
        }
        OutputRecompute::ScaledSinglePass => {
            let out_elems = (q * profile.head_size / 4.0) / profile.wave_width;
            halve_if(packed, out_elems) * issue.vector()
        }
    };
    out.with(Stage::RecomputeOutput, recompute)
}

// ============================================================================
// Aggregation
// ============================================================================

/// Serial total: GEMM followed by the softmax.
#[inline]
pub fn total_cycles(gemm_cycles: f64, softmax_total: f64) -> f64 {
    gemm_cycles + softmax_total
}

/// Co-execution total.
///
/// The softmax overlaps `COEXEC_OVERLAP` of the GEMM and the remainder is
/// halved. Not clamped: a small softmax can yield less than the GEMM alone.
#[inline]
pub fn coexec_total_cycles(gemm_cycles: f64, softmax_total: f64) -> f64 {
    gemm_cycles + (softmax_total - gemm_cycles * COEXEC_OVERLAP) / 2.0
}

/// Full attention estimate for one tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttentionReport {
    pub generation: Generation,
    pub shape: TileShape,
    /// Flags as applied (after the co-execution override).
    pub flags: ModeFlags,
    pub gemm_cycles: f64,
    pub softmax_total: f64,
    pub breakdown: CostBreakdown,
    pub total_cycles: f64,
    pub coexec_total_cycles: f64,
}

/// Evaluate the softmax and GEMM models and combine them.
pub fn attention_report(
    shape: TileShape,
    flags: ModeFlags,
    profile: &HardwareProfile,
) -> AttentionReport {
    let flags = flags.effective(profile);
    let breakdown = attention_cycles(shape, flags, profile);
    let gemm = gemm_cycles(shape, profile);
    let softmax_total = breakdown.sum();

    debug!(
        generation = profile.generation.name(),
        query_tile = shape.query_tile,
        kv_tile = shape.kv_tile,
        packed = flags.packed,
        coexec = flags.coexec,
        gemm,
        softmax_total,
        "attention estimate"
    );

    AttentionReport {
        generation: profile.generation,
        shape,
        flags,
        gemm_cycles: gemm,
        softmax_total,
        breakdown,
        total_cycles: total_cycles(gemm, softmax_total),
        coexec_total_cycles: coexec_total_cycles(gemm, softmax_total),
    }
}
