//! Uncertainty metrics for classification distributions.
//!
//! Works on already-normalized probability distributions, with care
//! around zero probabilities (no `ln(0)`) and malformed input. A
//! malformed distribution here is a programming-contract violation,
//! not a runtime condition.

use std::collections::BTreeMap;

use crate::classify::types::Category;
use crate::error::ClassifyError;

/// Probabilities below this are treated as zero for entropy purposes.
const EPSILON: f64 = 1e-8;

/// Tolerance on the distribution sum.
const SUM_TOLERANCE: f64 = 1e-6;

/// Derived certainty metrics for a probability distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uncertainty {
    /// `-Σ p·ln(p)` over nonzero entries; in `[0, ln N]`.
    pub entropy: f64,
    /// Top probability minus second probability; `>= 0`.
    pub margin: f64,
    /// Top probability.
    pub confidence: f64,
}

/// Compute entropy, margin and confidence for a distribution.
///
/// Fails with [`ClassifyError::InvalidDistribution`] if the input has
/// the wrong arity, contains negative or non-finite values, or does not
/// sum to ~1.
pub fn compute(probabilities: &BTreeMap<Category, f64>) -> Result<Uncertainty, ClassifyError> {
    if probabilities.len() != Category::COUNT {
        return Err(ClassifyError::InvalidDistribution {
            reason: format!(
                "expected {} entries, got {}",
                Category::COUNT,
                probabilities.len()
            ),
        });
    }

    let mut sum = 0.0;
    for (category, &p) in probabilities {
        if !p.is_finite() {
            return Err(ClassifyError::InvalidDistribution {
                reason: format!("probability for {category} is not finite"),
            });
        }
        if p < 0.0 {
            return Err(ClassifyError::InvalidDistribution {
                reason: format!("probability for {category} is negative"),
            });
        }
        sum += p;
    }
    if (sum - 1.0).abs() > SUM_TOLERANCE {
        return Err(ClassifyError::InvalidDistribution {
            reason: format!("probabilities sum to {sum}, expected 1"),
        });
    }

    let entropy = -probabilities
        .values()
        .filter(|&&p| p > EPSILON)
        .map(|&p| p * p.ln())
        .sum::<f64>();

    let mut sorted: Vec<f64> = probabilities.values().copied().collect();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    let confidence = sorted[0];
    let margin = sorted[0] - sorted[1];

    Ok(Uncertainty {
        entropy,
        margin,
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dist(info: f64, tech: f64, fin: f64) -> BTreeMap<Category, f64> {
        BTreeMap::from([
            (Category::Informational, info),
            (Category::Technical, tech),
            (Category::Financial, fin),
        ])
    }

    #[test]
    fn certain_distribution_has_zero_entropy_and_full_margin() {
        let u = compute(&dist(0.0, 1.0, 0.0)).unwrap();
        assert_eq!(u.entropy, 0.0);
        assert_eq!(u.margin, 1.0);
        assert_eq!(u.confidence, 1.0);
    }

    #[test]
    fn uniform_distribution_has_max_entropy_and_zero_margin() {
        let third = 1.0 / 3.0;
        let u = compute(&dist(third, third, third)).unwrap();
        assert!((u.entropy - 3f64.ln()).abs() < 1e-9);
        assert!(u.margin.abs() < 1e-12);
    }

    #[test]
    fn entropy_stays_within_bounds() {
        for d in [
            dist(0.1, 0.1, 0.8),
            dist(0.5, 0.3, 0.2),
            dist(0.98, 0.01, 0.01),
        ] {
            let u = compute(&d).unwrap();
            assert!(u.entropy >= 0.0);
            assert!(u.entropy <= 3f64.ln() + 1e-12);
            assert!(u.margin >= 0.0);
        }
    }

    #[test]
    fn known_values() {
        let u = compute(&dist(0.1, 0.1, 0.8)).unwrap();
        let expected = -(0.1f64 * 0.1f64.ln() + 0.1 * 0.1f64.ln() + 0.8 * 0.8f64.ln());
        assert!((u.entropy - expected).abs() < 1e-12);
        assert!((u.margin - 0.7).abs() < 1e-12);
        assert!((u.confidence - 0.8).abs() < 1e-12);
    }

    #[test]
    fn rejects_negative_probability() {
        let err = compute(&dist(-0.1, 0.6, 0.5)).unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidDistribution { .. }));
    }

    #[test]
    fn rejects_non_normalized_sum() {
        let err = compute(&dist(0.5, 0.5, 0.5)).unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidDistribution { .. }));
    }

    #[test]
    fn rejects_nan() {
        let err = compute(&dist(f64::NAN, 0.5, 0.5)).unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidDistribution { .. }));
    }
}
