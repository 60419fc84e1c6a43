//! Split-half stability estimation
//!
//! Quantifies how reproducible each feature's role profile is. For every role
//! the responses are randomly partitioned into two halves and averaged per
//! half, giving two role x feature matrices `A` and `B`. The stability of a
//! feature is the cosine similarity between its column in `A` and its column
//! in `B`:
//!
//! ```text
//! stability[f] = Σ_r A[r,f]·B[r,f] / (‖A[·,f]‖ · ‖B[·,f]‖)
//! ```
//!
//! A zero norm on either side (or a non-finite quotient) yields `0`, and the
//! result is clamped to `[0, 1]`.
//!
//! Roles are visited in sorted name order and one seeded generator drives every
//! partition, so a fixed seed reproduces the same split. Only the running
//! numerator and the two squared norms are kept per feature, so raw response
//! files are streamed one role at a time.

use atlas_stats::matrix::Matrix;
use rand::{SeedableRng as _, seq::SliceRandom as _};
use rand_pcg::Pcg32;
use tracing::debug;

use crate::{error::DataIntegrityError, input::RawResponseSource};

/// Computes split-half stability for every feature.
///
/// # Arguments
///
/// * `role_names` - Roles of the run; each must be loadable from `source`
/// * `source` - Provider of per-role raw response matrices (pre-log values)
/// * `feature_width` - Expected number of columns of every response matrix
/// * `split_seed` - Seed of the partition generator
///
/// # Errors
///
/// Returns [`DataIntegrityError`] if a role cannot be loaded, its width differs
/// from `feature_width`, or it has fewer than two responses.
pub fn split_half_stability<S>(
    role_names: &[String],
    source: &S,
    feature_width: usize,
    split_seed: u64,
) -> Result<Vec<f32>, DataIntegrityError>
where
    S: RawResponseSource + ?Sized,
{
    let mut order = role_names.iter().collect::<Vec<_>>();
    order.sort();

    let mut rng = Pcg32::seed_from_u64(split_seed);
    let mut numerator = vec![0.0_f64; feature_width];
    let mut norm_a = vec![0.0_f64; feature_width];
    let mut norm_b = vec![0.0_f64; feature_width];

    for role in order {
        let responses = source.load_responses(role)?;
        if responses.rows() < 2 {
            return Err(DataIntegrityError::InsufficientResponses {
                role: role.clone(),
                count: responses.rows(),
            });
        }
        if responses.cols() != feature_width {
            return Err(DataIntegrityError::WidthMismatch {
                role: role.clone(),
                expected: feature_width,
                actual: responses.cols(),
            });
        }

        let mut indices = (0..responses.rows()).collect::<Vec<_>>();
        indices.shuffle(&mut rng);
        let (first, second) = indices.split_at(indices.len() / 2);
        let a = half_mean(&responses, first);
        let b = half_mean(&responses, second);
        debug!(
            "{role}: {} responses split {}/{}",
            responses.rows(),
            first.len(),
            second.len()
        );

        for f in 0..feature_width {
            numerator[f] += a[f] * b[f];
            norm_a[f] += a[f] * a[f];
            norm_b[f] += b[f] * b[f];
        }
    }

    let stability = (0..feature_width)
        .map(|f| {
            let denominator = norm_a[f].sqrt() * norm_b[f].sqrt();
            if denominator <= 0.0 {
                return 0.0;
            }
            #[expect(clippy::cast_possible_truncation)]
            let similarity = (numerator[f] / denominator) as f32;
            if similarity.is_finite() {
                similarity.clamp(0.0, 1.0)
            } else {
                0.0
            }
        })
        .collect();
    Ok(stability)
}

/// Column means of the selected response rows, in `f64`.
#[expect(clippy::cast_precision_loss)]
fn half_mean(responses: &Matrix, rows: &[usize]) -> Vec<f64> {
    let mut sum = vec![0.0_f64; responses.cols()];
    for &r in rows {
        for (s, &v) in sum.iter_mut().zip(responses.row(r)) {
            *s += f64::from(v);
        }
    }
    let n = rows.len() as f64;
    sum.iter_mut().for_each(|s| *s /= n);
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InMemoryResponses;

    fn source(roles: &[(&str, Vec<Vec<f32>>)]) -> (Vec<String>, InMemoryResponses) {
        let names = roles.iter().map(|(n, _)| (*n).to_owned()).collect();
        let source = roles
            .iter()
            .map(|(n, rows)| ((*n).to_owned(), Matrix::from_rows(rows).unwrap()))
            .collect();
        (names, source)
    }

    #[test]
    fn test_identical_halves_give_full_stability() {
        // Every response of a role is identical, so both halves agree exactly.
        let (names, src) = source(&[
            ("a", vec![vec![1.0, 0.0, 2.0]; 4]),
            ("b", vec![vec![3.0, 0.0, 1.0]; 4]),
        ]);
        let stability = split_half_stability(&names, &src, 3, 7).unwrap();
        assert!((stability[0] - 1.0).abs() < 1e-6);
        assert_eq!(stability[1], 0.0);
        assert!((stability[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_values_within_unit_interval_and_deterministic() {
        let (names, src) = source(&[
            ("r0", vec![
                vec![1.0, -2.0, 0.5],
                vec![0.0, 3.0, 0.1],
                vec![2.0, -1.0, 0.0],
            ]),
            ("r1", vec![vec![0.0, 1.0, 4.0], vec![5.0, -4.0, 0.0]]),
            ("r2", vec![
                vec![0.3, 0.2, 0.1],
                vec![0.0, 0.0, 0.0],
                vec![1.0, 1.0, 1.0],
                vec![2.0, 0.0, 2.0],
            ]),
        ]);
        let s1 = split_half_stability(&names, &src, 3, 11).unwrap();
        let s2 = split_half_stability(&names, &src, 3, 11).unwrap();
        assert_eq!(s1, s2);
        assert!(s1.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn test_role_order_does_not_change_result() {
        let roles = [
            ("x", vec![vec![1.0, 2.0], vec![0.0, 1.0], vec![3.0, 0.0]]),
            ("y", vec![vec![2.0, 2.0], vec![1.0, 0.0], vec![0.0, 5.0]]),
        ];
        let (names, src) = source(&roles);
        let reversed = names.iter().rev().cloned().collect::<Vec<_>>();
        assert_eq!(
            split_half_stability(&names, &src, 2, 3).unwrap(),
            split_half_stability(&reversed, &src, 2, 3).unwrap()
        );
    }

    #[test]
    fn test_single_response_is_rejected() {
        let (names, src) = source(&[("a", vec![vec![1.0], vec![2.0]]), ("b", vec![vec![1.0]])]);
        assert!(matches!(
            split_half_stability(&names, &src, 1, 0),
            Err(DataIntegrityError::InsufficientResponses { ref role, count: 1 }) if role == "b"
        ));
    }

    #[test]
    fn test_empty_response_array_counts_as_insufficient() {
        let mut src = InMemoryResponses::new();
        src.insert("a", Matrix::from_rows(&[vec![1.0, 2.0], vec![2.0, 1.0]]).unwrap());
        src.insert("b", Matrix::zeros(0, 0));
        let names = vec!["a".to_owned(), "b".to_owned()];
        assert!(matches!(
            split_half_stability(&names, &src, 2, 0),
            Err(DataIntegrityError::InsufficientResponses { ref role, count: 0 }) if role == "b"
        ));
    }

    #[test]
    fn test_width_mismatch_is_rejected() {
        let (names, src) = source(&[("a", vec![vec![1.0, 2.0], vec![2.0, 1.0]])]);
        assert!(matches!(
            split_half_stability(&names, &src, 3, 0),
            Err(DataIntegrityError::WidthMismatch {
                expected: 3,
                actual: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_missing_role_is_rejected() {
        let (_, src) = source(&[("a", vec![vec![1.0], vec![2.0]])]);
        let names = vec!["a".to_owned(), "missing".to_owned()];
        assert!(matches!(
            split_half_stability(&names, &src, 1, 0),
            Err(DataIntegrityError::MissingRoleFile { .. })
        ));
    }
}
