//! This is the vector math module
//! Provide dot product, magnitude and cosine similarity

/// Dot Product
/// dot_prod = sum(a[i] * b[i]) for i = 0..a.len()
/// Callers validate dimensions first; extra components of the longer slice are ignored.
pub fn dot_product(left: &[f32], right: &[f32]) -> f32 {
    debug_assert_eq!(left.len(), right.len());

    left.iter()
        .zip(right.iter())
        .map(|(x, y)| x * y)
        .sum()
}

/// Euclidean norm
/// ||vec|| = sqrt(sum(vec[i]^2))
pub fn magnitude(vector: &[f32]) -> f32 {
    dot_product(vector, vector).sqrt()
}

/// Cosine similarity with both magnitudes already known.
///
/// A zero magnitude on either side yields a non-finite score (NaN); this is
/// left to the caller rather than clamped.
pub fn cosine_similarity(left: &[f32], left_mag: f32, right: &[f32], right_mag: f32) -> f32 {
    dot_product(left, right) / (left_mag * right_mag)
}

#[cfg(test)]
mod vector_test {
    use super::*;

    // ========== Magnitude Tests ==========

    #[test]
    fn test_magnitude_basic() {
        // ||[3,4]|| = sqrt(9+16) = 5
        let vector = vec![3.0, 4.0];
        assert!((magnitude(&vector) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_magnitude_negative_values() {
        let vector = vec![-3.0, 4.0];
        assert!((magnitude(&vector) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_magnitude_zero_and_empty() {
        assert_eq!(magnitude(&[0.0, 0.0, 0.0]), 0.0);
        assert_eq!(magnitude(&[]), 0.0);
    }

    // ========== Dot Product Tests ==========

    #[test]
    fn test_dot_product_basic() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![4.0, 5.0, 6.0];
        // Expected: 1*4 + 2*5 + 3*6 = 4 + 10 + 18 = 32
        assert!((dot_product(&a, &b) - 32.0).abs() < 1e-6);
    }

    #[test]
    fn test_dot_product_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(dot_product(&a, &b).abs() < 1e-6);
    }

    // ========== Cosine Similarity Tests ==========

    #[test]
    fn test_cosine_identical_direction() {
        let a = vec![1.0, 1.0, 1.0];
        let b = vec![2.0, 2.0, 2.0];
        let sim = cosine_similarity(&a, magnitude(&a), &b, magnitude(&b));
        assert!((sim - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_cosine_orthogonal_is_zero() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        let sim = cosine_similarity(&a, magnitude(&a), &b, magnitude(&b));
        assert!(sim.abs() < 1e-4);
    }

    #[test]
    fn test_cosine_opposite_is_minus_one() {
        let a = vec![1.0, -2.0];
        let b = vec![-1.0, 2.0];
        let sim = cosine_similarity(&a, magnitude(&a), &b, magnitude(&b));
        assert!((sim + 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_cosine_zero_vector_is_not_finite() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 0.0];
        let sim = cosine_similarity(&a, magnitude(&a), &b, magnitude(&b));
        assert!(!sim.is_finite());
    }

    #[test]
    fn test_cosine_reddish() {
        // [1,0,0] vs [0.9,0.1,0] = 0.9 / sqrt(0.82) ~ 0.9939
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.9, 0.1, 0.0];
        let sim = cosine_similarity(&a, magnitude(&a), &b, magnitude(&b));
        assert!((sim - 0.9939).abs() < 1e-3);
    }
}
