//! Property checks for the similarity primitives.

use approx::assert_relative_eq;
use ragline_core::similarity::{
    SimilarityMode, cosine_similarity, dot_product, euclidean_distance, similarity,
};
use test_case::test_case;

fn samples() -> Vec<Vec<f32>> {
    vec![
        vec![1.0, 0.0, 0.0],
        vec![0.3, -1.2, 4.5],
        vec![-2.0, -2.0, 0.5],
        vec![1e-3, 5.0, 7.25],
    ]
}

#[test]
fn cosine_of_self_is_one() {
    for x in samples() {
        assert_relative_eq!(cosine_similarity(&x, &x).unwrap(), 1.0, epsilon = 1e-9);
    }
}

#[test]
fn cosine_and_dot_are_symmetric() {
    let vs = samples();
    for a in &vs {
        for b in &vs {
            assert_relative_eq!(
                cosine_similarity(a, b).unwrap(),
                cosine_similarity(b, a).unwrap(),
                epsilon = 1e-12
            );
            assert_relative_eq!(dot_product(a, b).unwrap(), dot_product(b, a).unwrap());
        }
    }
}

#[test]
fn euclidean_of_self_is_zero() {
    for x in samples() {
        assert_eq!(euclidean_distance(&x, &x).unwrap(), 0.0);
    }
}

#[test_case(&[1.0, 0.0], &[1.0, 0.0], 0.0 ; "identical vectors")]
#[test_case(&[1.0, 0.0], &[0.0, 1.0], -std::f64::consts::SQRT_2 ; "orthogonal unit vectors")]
fn euclidean_mode_scores(a: &[f32], b: &[f32], expected: f64) {
    let score = similarity(a, b, SimilarityMode::Euclidean).unwrap();
    assert_relative_eq!(score, expected, epsilon = 1e-9);
}

#[test]
fn every_mode_rejects_length_mismatch() {
    for mode in [
        SimilarityMode::Cosine,
        SimilarityMode::DotProduct,
        SimilarityMode::Euclidean,
    ] {
        let err = similarity(&[1.0, 2.0], &[1.0], mode).unwrap_err();
        assert!(err.is_client_error(), "{mode} should reject mismatched lengths");
    }
}
