//! Hardware generation profiles for the attention cycle model.
//!
//! Each [`HardwareProfile`] bundles the throughput constants of one hardware
//! generation together with the stage toggles that make its softmax pipeline
//! differ from the others. Profiles are plain values: the model never mutates
//! them and there is no process-wide state.

use serde::Serialize;

/// Rows reduced together by one cross-lane max step.
pub const ROWS_PER_REDUCE: f64 = 16.0;

// ============================================================================
// Issue Models
// ============================================================================

/// How per-instruction cycle costs are derived for vector work.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum IssueModel {
    /// Cycles per instruction taken from vector and transcendental rates.
    /// Conversions issue at the vector rate.
    Rate { vector: f64, transcendental: f64 },
    /// Fixed issue cycles per instruction.
    /// Exponentials cost 4x and conversions 2x the base issue.
    Fixed { issue_cycles: f64 },
}

impl IssueModel {
    /// Cost of one plain vector instruction (fma, max, add, mul).
    #[inline]
    pub fn vector(&self) -> f64 {
        match self {
            Self::Rate { vector, .. } => *vector,
            Self::Fixed { issue_cycles } => *issue_cycles,
        }
    }

    /// Cost of one transcendental instruction (exp).
    #[inline]
    pub fn transcendental(&self) -> f64 {
        match self {
            Self::Rate { transcendental, .. } => *transcendental,
            Self::Fixed { issue_cycles } => issue_cycles * 4.0,
        }
    }

    /// Cost of one 8-bit conversion instruction.
    #[inline]
    pub fn convert(&self) -> f64 {
        match self {
            Self::Rate { vector, .. } => *vector,
            Self::Fixed { issue_cycles } => issue_cycles * 2.0,
        }
    }
}

// ============================================================================
// Stage Toggles
// ============================================================================

/// Cross-lane max reduction flavour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum InterLaneReduce {
    /// `4 * q / 16` vector instructions.
    RateScaled,
    /// Lane permute plus a shared-memory round trip, then a max3 tail.
    SharedMemory {
        permute_latency: f64,
        write_latency: f64,
        read_latency: f64,
        /// Cycles per row group of the max3 tail (halved: two inputs per max3).
        tail_cycles: f64,
    },
}

/// Score-matrix re-layout between the softmax and the AV multiply.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReshapeCost {
    /// Score elements per lane group.
    pub group_elems: f64,
    /// Bytes written per lane group.
    pub write_bytes: f64,
    /// Fixed write-to-read latency.
    pub latency: f64,
    /// Bytes read back per lane group.
    pub read_bytes: f64,
}

/// How the running-max correction of the output tile is costed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutputRecompute {
    /// Rescale then accumulate: two passes over `q * head / wave` elements.
    RescaleAccumulate,
    /// Single pass over a quarter of the output elements.
    ScaledSinglePass,
}

/// Per-generation pipeline differences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageToggles {
    /// Score dequantization is a separate stage.
    pub dequant_score: bool,
    pub inter_lane: InterLaneReduce,
    /// `None` when the scores feed the second multiply in place.
    pub reshape: Option<ReshapeCost>,
    pub recompute: OutputRecompute,
    /// Packed mode is forced off when co-execution is requested.
    pub packed_off_under_coexec: bool,
}

// ============================================================================
// Hardware Profiles
// ============================================================================

/// Immutable constants for one hardware generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HardwareProfile {
    pub generation: Generation,
    /// Lanes per wave.
    pub wave_width: f64,
    /// Attention head dimension.
    pub head_size: f64,
    /// MMA throughput in elements per cycle.
    pub mma_throughput: f64,
    pub issue: IssueModel,
    pub stages: StageToggles,
}

/// Generation A: rate-based issue, separate dequant, no reshape.
pub const GEN_A: HardwareProfile = HardwareProfile {
    generation: Generation::A,
    wave_width: 32.0,
    head_size: 128.0,
    mma_throughput: 16.0 * 16.0 * 128.0 * 2.0 / 8.0,
    issue: IssueModel::Rate {
        vector: 1.0,
        transcendental: 2.0,
    },
    stages: StageToggles {
        dequant_score: true,
        inter_lane: InterLaneReduce::RateScaled,
        reshape: None,
        recompute: OutputRecompute::RescaleAccumulate,
        packed_off_under_coexec: true,
    },
};

/// Generation B: fixed issue cycles, shared-memory reduction and reshape.
pub const GEN_B: HardwareProfile = HardwareProfile {
    generation: Generation::B,
    wave_width: 64.0,
    head_size: 128.0,
    mma_throughput: 16.0 * 16.0 * 32.0 * 2.0 / 16.0,
    issue: IssueModel::Fixed { issue_cycles: 4.0 },
    stages: StageToggles {
        dequant_score: false,
        inter_lane: InterLaneReduce::SharedMemory {
            permute_latency: 250.0,
            write_latency: 84.0,
            read_latency: 112.0,
            tail_cycles: 4.0,
        },
        reshape: Some(ReshapeCost {
            group_elems: 4.0,
            write_bytes: 8.0,
            latency: 100.0,
            read_bytes: 32.0,
        }),
        recompute: OutputRecompute::ScaledSinglePass,
        packed_off_under_coexec: false,
    },
};

/// Known hardware generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Generation {
    A,
    B,
}

impl Generation {
    pub const ALL: [Generation; 2] = [Self::A, Self::B];

    /// Parse from string, case-insensitive.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "a" | "gen-a" | "gen_a" | "gena" => Some(Self::A),
            "b" | "gen-b" | "gen_b" | "genb" => Some(Self::B),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::A => "gen-a",
            Self::B => "gen-b",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::A => "Generation A (rate-based issue, in-register scores)",
            Self::B => "Generation B (fixed issue, LDS reduction + score reshape)",
        }
    }

    /// Preset profile for this generation.
    pub fn profile(&self) -> HardwareProfile {
        match self {
            Self::A => GEN_A,
            Self::B => GEN_B,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_aliases() {
        assert_eq!(Generation::from_str("gen-a"), Some(Generation::A));
        assert_eq!(Generation::from_str("GEN_B"), Some(Generation::B));
        assert_eq!(Generation::from_str("b"), Some(Generation::B));
        assert_eq!(Generation::from_str("gen-c"), None);
    }

    #[test]
    fn test_profile_roundtrip_generation() {
        for gen in Generation::ALL {
            assert_eq!(gen.profile().generation, gen);
            assert_eq!(Generation::from_str(gen.name()), Some(gen));
        }
    }

    #[test]
    fn test_fixed_issue_multipliers() {
        let issue = IssueModel::Fixed { issue_cycles: 4.0 };
        assert_eq!(issue.vector(), 4.0);
        assert_eq!(issue.transcendental(), 16.0);
        assert_eq!(issue.convert(), 8.0);
    }

    #[test]
    fn test_rate_convert_at_vector_rate() {
        let issue = GEN_A.issue;
        assert_eq!(issue.convert(), issue.vector());
        assert_eq!(issue.transcendental(), 2.0);
    }

    #[test]
    fn test_mma_throughput_constants() {
        assert_eq!(GEN_B.mma_throughput, 1024.0);
        assert_eq!(GEN_A.mma_throughput, 8192.0);
    }

    #[test]
    fn test_wave_widths() {
        assert_eq!(GEN_A.wave_width, 32.0);
        assert_eq!(GEN_B.wave_width, 64.0);
    }

    #[test]
    fn test_coexec_asymmetry_is_explicit() {
        assert!(GEN_A.stages.packed_off_under_coexec);
        assert!(!GEN_B.stages.packed_off_under_coexec);
    }
}
