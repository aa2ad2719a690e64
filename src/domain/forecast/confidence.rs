//! Final confidence scoring and suppression rules.

use crate::shared::types::SuppressReason;

pub const CONFIDENCE_FLOOR: f64 = 0.4;
pub const MAX_DEVIATION: f64 = 0.5;

// NOTE: this threshold is compared against an absolute price-unit standard
// deviation, which is unit-inconsistent across price magnitudes (0.15
// currency units of volatility is negligible for an expensive item and
// dominant for a cheap one). Kept as-is for behavioral compatibility;
// likely a latent defect.
pub const VOLATILITY_PENALTY_THRESHOLD: f64 = 0.15;
pub const VOLATILITY_PENALTY: f64 = 0.1;

/// Score the forecast and decide whether to emit it at all.
/// Returns the confidence on acceptance, or the suppression reason.
pub fn assess(
    projection: f64,
    last: f64,
    volatility: f64,
    count: usize,
) -> Result<f64, SuppressReason> {
    let mut confidence = if count > 20 {
        0.8
    } else if count >= 10 {
        0.65
    } else {
        0.5
    };
    if volatility > VOLATILITY_PENALTY_THRESHOLD {
        confidence -= VOLATILITY_PENALTY;
    }

    if last > 0.0 && ((projection - last) / last).abs() > MAX_DEVIATION {
        return Err(SuppressReason::ExcessiveDeviation);
    }
    if confidence < CONFIDENCE_FLOOR {
        return Err(SuppressReason::LowConfidence);
    }
    Ok(confidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_by_point_count() {
        assert_eq!(assess(100.0, 100.0, 0.0, 5).unwrap(), 0.5);
        assert_eq!(assess(100.0, 100.0, 0.0, 10).unwrap(), 0.65);
        assert_eq!(assess(100.0, 100.0, 0.0, 20).unwrap(), 0.65);
        assert_eq!(assess(100.0, 100.0, 0.0, 21).unwrap(), 0.8);
    }

    #[test]
    fn test_volatility_penalty_boundary_is_accepted() {
        // 0.5 - 0.1 = 0.4 is not strictly below the floor.
        let confidence = assess(100.0, 100.0, 4.0, 5).unwrap();
        assert!(confidence >= CONFIDENCE_FLOOR);
    }

    #[test]
    fn test_deviation_gate() {
        // |170 - 110| / 110 > 0.5
        assert_eq!(
            assess(170.0, 110.0, 0.0, 25),
            Err(SuppressReason::ExcessiveDeviation)
        );
        assert!(assess(150.0, 110.0, 0.0, 25).is_ok());
    }
}
