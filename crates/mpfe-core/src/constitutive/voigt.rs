//! Voigt notation helpers.
//!
//! Component order is xx, yy, zz, xy, yz, xz. Strain vectors carry
//! engineering shear (γ = 2ε), stress vectors carry tensor components, and
//! a 6×6 tangent `D` holds the tensor components `C_ijkl` so that
//! `stress = D · strain`.

use nalgebra::{Matrix3, Matrix6, Vector6};

/// Tensor index pairs of the six Voigt components
pub const VOIGT_PAIRS: [(usize, usize); 6] = [(0, 0), (1, 1), (2, 2), (0, 1), (1, 2), (0, 2)];

/// Voigt component of the symmetric pair (i, j)
pub fn voigt_index(i: usize, j: usize) -> usize {
    match (i.min(j), i.max(j)) {
        (0, 0) => 0,
        (1, 1) => 1,
        (2, 2) => 2,
        (0, 1) => 3,
        (1, 2) => 4,
        _ => 5,
    }
}

pub fn stress_tensor_to_vector(m: &Matrix3<f64>) -> Vector6<f64> {
    Vector6::from_fn(|r, _| {
        let (i, j) = VOIGT_PAIRS[r];
        m[(i, j)]
    })
}

pub fn stress_vector_to_tensor(v: &Vector6<f64>) -> Matrix3<f64> {
    Matrix3::from_fn(|i, j| v[voigt_index(i, j)])
}

pub fn strain_tensor_to_vector(m: &Matrix3<f64>) -> Vector6<f64> {
    Vector6::from_fn(|r, _| {
        let (i, j) = VOIGT_PAIRS[r];
        if i == j { m[(i, j)] } else { 2.0 * m[(i, j)] }
    })
}

pub fn strain_vector_to_tensor(v: &Vector6<f64>) -> Matrix3<f64> {
    Matrix3::from_fn(|i, j| {
        let value = v[voigt_index(i, j)];
        if i == j { value } else { 0.5 * value }
    })
}

/// Build a 6×6 tangent from a fourth-order tensor with minor symmetries
pub fn fourth_order_to_voigt(c: impl Fn(usize, usize, usize, usize) -> f64) -> Matrix6<f64> {
    Matrix6::from_fn(|r, s| {
        let (i, j) = VOIGT_PAIRS[r];
        let (k, l) = VOIGT_PAIRS[s];
        c(i, j, k, l)
    })
}

/// Push-forward `c_abcd = F_ai F_bj F_ck F_dl C_ijkl`
pub fn push_forward_tangent(c: &Matrix6<f64>, f: &Matrix3<f64>) -> Matrix6<f64> {
    Matrix6::from_fn(|r, s| {
        let (a, b) = VOIGT_PAIRS[r];
        let (cc, d) = VOIGT_PAIRS[s];
        let mut sum = 0.0;
        for i in 0..3 {
            for j in 0..3 {
                let fij = f[(a, i)] * f[(b, j)];
                if fij == 0.0 {
                    continue;
                }
                let row = voigt_index(i, j);
                for k in 0..3 {
                    for l in 0..3 {
                        sum += fij * f[(cc, k)] * f[(d, l)] * c[(row, voigt_index(k, l))];
                    }
                }
            }
        }
        sum
    })
}

/// Lamé parameters (λ, μ) from Young's modulus and Poisson's ratio
pub fn lame_parameters(young: f64, poisson: f64) -> (f64, f64) {
    let lambda = young * poisson / ((1.0 + poisson) * (1.0 - 2.0 * poisson));
    let mu = young / (2.0 * (1.0 + poisson));
    (lambda, mu)
}

/// Isotropic linear elastic tangent
pub fn isotropic_elasticity(young: f64, poisson: f64) -> Matrix6<f64> {
    let (lambda, mu) = lame_parameters(young, poisson);
    let mut d = Matrix6::zeros();
    for i in 0..3 {
        for j in 0..3 {
            d[(i, j)] = lambda;
        }
        d[(i, i)] = lambda + 2.0 * mu;
        d[(i + 3, i + 3)] = mu;
    }
    d
}

/// Deviatoric projector `I_sym - 1/3 δ⊗δ` in tangent convention
pub fn deviatoric_identity() -> Matrix6<f64> {
    let mut p = Matrix6::zeros();
    for i in 0..3 {
        for j in 0..3 {
            p[(i, j)] = -1.0 / 3.0;
        }
        p[(i, i)] = 2.0 / 3.0;
        p[(i + 3, i + 3)] = 0.5;
    }
    p
}

/// Voigt unit tensor (1, 1, 1, 0, 0, 0)
pub fn unit_vector() -> Vector6<f64> {
    Vector6::new(1.0, 1.0, 1.0, 0.0, 0.0, 0.0)
}

/// Norm of a symmetric tensor given as a stress-type Voigt vector
pub fn stress_norm(v: &Vector6<f64>) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2] + 2.0 * (v[3] * v[3] + v[4] * v[4] + v[5] * v[5]))
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn tensor_round_trips() {
        let m = Matrix3::new(1.0, 4.0, 6.0, 4.0, 2.0, 5.0, 6.0, 5.0, 3.0);
        let stress = stress_tensor_to_vector(&m);
        assert_eq!(stress, Vector6::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0));
        assert_eq!(stress_vector_to_tensor(&stress), m);

        let strain = strain_tensor_to_vector(&m);
        assert_eq!(strain, Vector6::new(1.0, 2.0, 3.0, 8.0, 10.0, 12.0));
        assert_eq!(strain_vector_to_tensor(&strain), m);
    }

    #[test]
    fn isotropic_tangent_matches_tensor_form() {
        let (lambda, mu) = lame_parameters(200.0, 0.25);
        let delta = |i: usize, j: usize| if i == j { 1.0 } else { 0.0 };
        let c = fourth_order_to_voigt(|i, j, k, l| {
            lambda * delta(i, j) * delta(k, l)
                + mu * (delta(i, k) * delta(j, l) + delta(i, l) * delta(j, k))
        });
        assert_relative_eq!(c, isotropic_elasticity(200.0, 0.25), epsilon = 1e-12);
    }

    #[test]
    fn push_forward_by_identity_is_identity() {
        let d = isotropic_elasticity(1000.0, 0.3);
        assert_relative_eq!(push_forward_tangent(&d, &Matrix3::identity()), d, epsilon = 1e-12);
    }

    #[test]
    fn push_forward_by_scaling() {
        // F = s I scales every component by s^4
        let d = isotropic_elasticity(1000.0, 0.3);
        let pushed = push_forward_tangent(&d, &(Matrix3::identity() * 2.0));
        assert_relative_eq!(pushed, d * 16.0, epsilon = 1e-9);
    }

    #[test]
    fn deviatoric_projection_removes_pressure() {
        let p = deviatoric_identity();
        let hydrostatic = Vector6::new(1.0, 1.0, 1.0, 0.0, 0.0, 0.0);
        assert_relative_eq!(p * hydrostatic, Vector6::zeros(), epsilon = 1e-15);
    }
}
