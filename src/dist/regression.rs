//! Core and accessory distances from jaccard fractions at several kmer lengths.
//!
//! The fraction of shared kmers of length k between two genomes is modelled as
//! J(k) = (1-a) * (1-c)^k, so that log J(k) = log(1-a) + k * log(1-c).
//! a is the core distance (divergence of shared genes), c the accessory distance
//! (difference in gene content), it drives the decay of J with k.
//!
//! We fit p0 = log(1-a) and p1 = log(1-c) by least squares of log J(k) against k with the
//! constraints p0 <= 0 and p1 <= 0. The model is linear in (p0, p1) so the jacobian of the residual
//! is the constant matrix with rows -[1, k]. It is computed once for a kmer list and shared by all pairs.
//! As the objective is a convex quadratic on a box, the constrained minimum is found exactly,
//! the starting point [0., -0.01] of an iterative solver plays no role.

use crate::errors::{Result, StrainError};

/// core and accessory distances of a pair, both in [0,1)
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PairDist {
    pub core: f64,
    pub accessory: f64,
}

/// Jacobian of residuals y - (p0 + p1 * k) for a given kmer list, with the
/// normal matrix J^t J which is all the solver needs.
#[derive(Clone, Debug)]
pub struct Jacobian {
    klist: Vec<f64>,
    /// rows -[1, k]
    jac: Vec<[f64; 2]>,
    /// J^t J = [[n, sum k], [sum k, sum k^2]]
    jtj: [[f64; 2]; 2],
} // end of Jacobian

impl Jacobian {
    /// fails if there are less than 2 distinct kmer lengths, the fit would be under determined.
    pub fn new(klist: &[usize]) -> Result<Self> {
        let klist: Vec<f64> = klist.iter().map(|k| *k as f64).collect();
        Jacobian::from_kmers(klist).ok_or_else(|| {
            StrainError::config("need at least 2 distinct kmer lengths for distance regression")
        })
    }

    fn from_kmers(klist: Vec<f64>) -> Option<Self> {
        let nb_distinct = {
            let mut sorted = klist.clone();
            sorted.sort_by(|a, b| a.total_cmp(b));
            sorted.dedup();
            sorted.len()
        };
        if nb_distinct < 2 {
            return None;
        }
        let jac: Vec<[f64; 2]> = klist.iter().map(|k| [-1., -k]).collect();
        let mut jtj = [[0f64; 2]; 2];
        for row in &jac {
            for i in 0..2 {
                for j in 0..2 {
                    jtj[i][j] += row[i] * row[j];
                }
            }
        }
        Some(Jacobian { klist, jac, jtj })
    } // end of from_kmers

    pub fn nb_kmers(&self) -> usize {
        self.klist.len()
    }

    pub fn get_rows(&self) -> &[[f64; 2]] {
        &self.jac
    }

    /// jacobian restricted to the kmer lengths flagged by keep, None if under determined.
    fn restrict(&self, keep: &[bool]) -> Option<Jacobian> {
        let klist: Vec<f64> = self
            .klist
            .iter()
            .zip(keep.iter())
            .filter(|(_, k)| **k)
            .map(|(x, _)| *x)
            .collect();
        Jacobian::from_kmers(klist)
    }

    /// minimizes sum (y_i - p0 - p1 * k_i)^2 under p0 <= 0, p1 <= 0. y has one value per kmer.
    fn solve(&self, y: &[f64]) -> [f64; 2] {
        // - J^t y
        let mut jty = [0f64; 2];
        for (row, v) in self.jac.iter().zip(y.iter()) {
            jty[0] -= row[0] * v;
            jty[1] -= row[1] * v;
        }
        let [[a, b], [_, d]] = self.jtj;
        let det = a * d - b * b;
        let unconstrained = [
            (d * jty[0] - b * jty[1]) / det,
            (a * jty[1] - b * jty[0]) / det,
        ];
        if unconstrained[0] <= 0. && unconstrained[1] <= 0. {
            return unconstrained;
        }
        // minimum is on the boundary of the box, examine both faces, corner included by clamping
        let on_p0_face = [0., (jty[1] / d).min(0.)];
        let on_p1_face = [(jty[0] / a).min(0.), 0.];
        let sse0 = self.sse(&on_p0_face, y);
        let sse1 = self.sse(&on_p1_face, y);
        if sse0 <= sse1 {
            on_p0_face
        } else {
            on_p1_face
        }
    } // end of solve

    fn sse(&self, p: &[f64; 2], y: &[f64]) -> f64 {
        self.klist
            .iter()
            .zip(y.iter())
            .map(|(k, v)| {
                let r = v - (p[0] + p[1] * k);
                r * r
            })
            .sum()
    }
} // end of impl Jacobian

/// fits core and accessory distances from fractions given along the kmer list of jacobian.
///
/// Null (or non finite) fractions have no log and are left out of the fit for this pair.
/// Returns None when less than 2 distinct kmer lengths remain, the distance is then not estimable.
pub fn fit_distances(jacobian: &Jacobian, fractions: &[f64]) -> Option<PairDist> {
    assert_eq!(fractions.len(), jacobian.nb_kmers());
    let keep: Vec<bool> = fractions.iter().map(|f| *f > 0. && f.is_finite()).collect();
    let params = if keep.iter().all(|k| *k) {
        let y: Vec<f64> = fractions.iter().map(|f| f.ln()).collect();
        jacobian.solve(&y)
    } else {
        let reduced = jacobian.restrict(&keep)?;
        let y: Vec<f64> = fractions
            .iter()
            .zip(keep.iter())
            .filter(|(_, k)| **k)
            .map(|(f, _)| f.ln())
            .collect();
        log::trace!(
            "fit_distances using {} kmer lengths out of {}",
            y.len(),
            fractions.len()
        );
        reduced.solve(&y)
    };
    Some(PairDist {
        core: transform(params[0]),
        accessory: transform(params[1]),
    })
} // end of fit_distances

// 1 - exp(p) for p <= 0, in [0,1)
fn transform(p: f64) -> f64 {
    (1. - p.exp()).max(0.)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(klist: &[usize], a: f64, c: f64) -> Vec<f64> {
        klist
            .iter()
            .map(|k| (1. - a) * (1. - c).powi(*k as i32))
            .collect()
    }

    #[test]
    fn test_recover_exact_distances() {
        let klist = [13, 17, 21, 25, 29];
        let jacobian = Jacobian::new(&klist).unwrap();
        for (a, c) in [(0.01, 0.002), (0.2, 0.03), (0., 0.01), (0.05, 0.), (0.5, 0.1)] {
            let dist = fit_distances(&jacobian, &synthetic(&klist, a, c)).unwrap();
            assert!((dist.core - a).abs() < 1e-6, "core {} expected {}", dist.core, a);
            assert!(
                (dist.accessory - c).abs() < 1e-6,
                "accessory {} expected {}",
                dist.accessory,
                c
            );
        }
    }

    #[test]
    fn test_jacobian_is_constant() {
        let jacobian = Jacobian::new(&[13, 17]).unwrap();
        assert_eq!(jacobian.get_rows(), &[[-1., -13.], [-1., -17.]]);
    }

    #[test]
    fn test_bounds_respected() {
        let klist = [13, 17, 21];
        let jacobian = Jacobian::new(&klist).unwrap();
        // fractions increasing with k would need a negative accessory distance
        let dist = fit_distances(&jacobian, &[0.2, 0.3, 0.4]).unwrap();
        assert_eq!(dist.accessory, 0.);
        assert!(dist.core >= 0. && dist.core < 1.);
        // fractions above 1 would need a negative core distance
        let dist = fit_distances(&jacobian, &[1., 1., 1.]).unwrap();
        assert_eq!(dist.core, 0.);
        assert_eq!(dist.accessory, 0.);
        let dist = fit_distances(&jacobian, &[0.9, 0.5, 0.1]).unwrap();
        assert!(dist.core >= 0. && dist.core < 1.);
        assert!(dist.accessory > 0. && dist.accessory < 1.);
    }

    #[test]
    fn test_core_face_minimum() {
        // log J = 0.1 - 0.01 k would give p0 = 0.1 > 0, the minimum is on face p0 = 0
        let klist = [11, 21, 31];
        let jacobian = Jacobian::new(&klist).unwrap();
        let fractions: Vec<f64> = klist.iter().map(|k| (0.1 - 0.01 * *k as f64).exp()).collect();
        let dist = fit_distances(&jacobian, &fractions).unwrap();
        assert_eq!(dist.core, 0.);
        assert!(dist.accessory > 0.);
    }

    #[test]
    fn test_zero_fraction_excluded() {
        let klist = [13, 17, 21, 25];
        let jacobian = Jacobian::new(&klist).unwrap();
        let mut fractions = synthetic(&klist, 0.1, 0.02);
        fractions[3] = 0.;
        let dist = fit_distances(&jacobian, &fractions).unwrap();
        assert!((dist.core - 0.1).abs() < 1e-6);
        assert!((dist.accessory - 0.02).abs() < 1e-6);
    }

    #[test]
    fn test_not_estimable() {
        let jacobian = Jacobian::new(&[13, 17, 21]).unwrap();
        assert!(fit_distances(&jacobian, &[0.1, 0., 0.]).is_none());
        assert!(fit_distances(&jacobian, &[0., 0., 0.]).is_none());
    }

    #[test]
    fn test_under_determined_kmer_list() {
        assert!(Jacobian::new(&[13]).is_err());
        assert!(Jacobian::new(&[13, 13]).is_err());
        assert!(Jacobian::new(&[]).is_err());
    }
}
