//! Error types for tile configuration.
//!
//! Only the GEMM tile model rejects inputs. The attention model accepts any
//! tile sizes and lets degenerate values flow through the formulas.

use thiserror::Error;

/// Error raised when a tile configuration cannot be modeled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A tile dimension violates the instruction granularity.
    #[error("{dim} must be divisible by {divisor}, got {value}")]
    NotDivisible {
        /// Dimension name (`tile_k`, `tile_n`).
        dim: &'static str,
        /// Required granularity.
        divisor: u32,
        /// Offending value.
        value: u32,
    },

    /// A granularity constant is zero, so divisibility is undefined.
    #[error("{dim} granularity must be non-zero")]
    ZeroGranularity {
        /// Dimension the granularity applies to.
        dim: &'static str,
    },

    /// A tile spec string could not be parsed (expected `MxNxK`).
    #[error("invalid tile spec '{0}', expected MxNxK")]
    InvalidTile(String),

    /// A comma-separated list contained a non-numeric entry.
    #[error("invalid value '{value}' in {what} list")]
    InvalidList {
        /// Which list was being parsed.
        what: &'static str,
        /// Offending entry.
        value: String,
    },

    /// Unknown hardware generation name.
    #[error("unknown hardware generation '{0}' (expected gen-a or gen-b)")]
    UnknownGeneration(String),
}

/// Result alias for tile configuration.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Fail with [`ConfigError::NotDivisible`] unless `value % divisor == 0`.
/// A zero `divisor` is [`ConfigError::ZeroGranularity`].
#[inline]
pub fn require_divisible(value: u32, divisor: u32, dim: &'static str) -> Result<()> {
    if divisor == 0 {
        return Err(ConfigError::ZeroGranularity { dim });
    }
    if value % divisor != 0 {
        return Err(ConfigError::NotDivisible { dim, divisor, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divisible_ok() {
        assert!(require_divisible(128, 32, "tile_k").is_ok());
        assert!(require_divisible(0, 32, "tile_k").is_ok());
    }

    #[test]
    fn test_not_divisible_message() {
        let err = require_divisible(100, 32, "tile_k").unwrap_err();
        assert_eq!(
            err,
            ConfigError::NotDivisible { dim: "tile_k", divisor: 32, value: 100 }
        );
        assert_eq!(err.to_string(), "tile_k must be divisible by 32, got 100");
    }

    #[test]
    fn test_zero_divisor() {
        assert_eq!(
            require_divisible(128, 0, "tile_k").unwrap_err(),
            ConfigError::ZeroGranularity { dim: "tile_k" }
        );
        assert_eq!(
            require_divisible(0, 0, "tile_k").unwrap_err().to_string(),
            "tile_k granularity must be non-zero"
        );
    }
}
