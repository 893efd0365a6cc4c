//! Sigma-point generation and the weighted reductions of the unscented transform.
//!
//! The sigma-point set has `2 * N_AUG + 1` columns. The spread parameter is fixed at
//! `λ = 3 - N_AUG`, and the same weights are used for the mean and the covariance.

use crate::error::FilterError;
use crate::model::{normalize_angle, AugState, Cov, Sigma, State, N_AUG, N_SIGMA, N_X, YAW};

pub type Weights = na::SVector<f64, N_SIGMA>;

const L: f64 = N_AUG as f64;
pub const LAMBDA: f64 = 3.0 - L;

// シグマ点の重み
pub fn sigma_weights() -> Weights {
    let mut w = Weights::from_element(1.0 / (2.0 * (LAMBDA + L)));
    w[0] = LAMBDA / (LAMBDA + L);
    w
}

// 拡大状態のシグマ点を生成する
pub fn sigma_points(x: &AugState, p: &Cov<N_AUG>) -> Result<Sigma<N_AUG>, FilterError> {
    let l = p
        .cholesky()
        .ok_or(FilterError::NotPositiveDefinite)?
        .l()
        * (LAMBDA + L).sqrt();
    let mut sigma_points = Sigma::<N_AUG>::zeros();
    sigma_points.set_column(0, x);
    for i in 0..N_AUG {
        sigma_points.set_column(1 + i, &(x + l.column(i)));
        sigma_points.set_column(1 + N_AUG + i, &(x - l.column(i)));
    }
    Ok(sigma_points)
}

/// `a - b`, with the component at `angle` (if any) wrapped into (-π, π].
pub fn residual<const S: usize>(
    a: &na::SVector<f64, S>,
    b: &na::SVector<f64, S>,
    angle: Option<usize>,
) -> na::SVector<f64, S> {
    let mut d = a - b;
    if let Some(i) = angle {
        d[i] = normalize_angle(d[i]);
    }
    d
}

// シグマ点を重み付き平均と共分散に戻す
pub fn unscented_transform<const S: usize>(
    sigmas: &Sigma<S>,
    w: &Weights,
    angle: Option<usize>,
) -> (na::SVector<f64, S>, Cov<S>) {
    let x = sigmas * w;
    let mut p = Cov::<S>::zeros();
    for i in 0..N_SIGMA {
        let y = residual(&sigmas.column(i).into_owned(), &x, angle);
        p += w[i] * y * y.transpose();
    }
    (x, p)
}

// 状態空間と観測空間の相互共分散
pub fn cross_covariance<const S: usize>(
    sigma_x: &Sigma<N_X>,
    x: &State,
    sigma_z: &Sigma<S>,
    z: &na::SVector<f64, S>,
    w: &Weights,
    z_angle: Option<usize>,
) -> na::SMatrix<f64, N_X, S> {
    let mut pxz = na::SMatrix::<f64, N_X, S>::zeros();
    for i in 0..N_SIGMA {
        let dx = residual(&sigma_x.column(i).into_owned(), x, Some(YAW));
        let dz = residual(&sigma_z.column(i).into_owned(), z, z_angle);
        pxz += w[i] * dx * dz.transpose();
    }
    pxz
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::PI;

    fn approx_equal(a: f64, b: f64) -> bool {
        let epsilon = 1e-9;
        (a - b).abs() < epsilon
    }

    #[test]
    fn weights_sum_to_one() {
        let w = sigma_weights();
        assert!(approx_equal(w.sum(), 1.0));
        assert!(approx_equal(w[0], -4.0 / 3.0));
        assert!(approx_equal(w[1], 1.0 / 6.0));
        assert!(approx_equal(w[N_SIGMA - 1], 1.0 / 6.0));
    }

    #[test]
    fn sigma_points_recover_mean_and_covariance() {
        let x = AugState::from_fn(|i, _| i as f64 * 0.5 - 1.0);
        let mut p = Cov::<N_AUG>::from_diagonal_element(2.0);
        p[(0, 1)] = 0.3;
        p[(1, 0)] = 0.3;
        let sigmas = sigma_points(&x, &p).unwrap();
        assert!((sigmas.column(0) - x).norm() < 1e-12);

        let (mean, cov) = unscented_transform(&sigmas, &sigma_weights(), None);
        assert!((mean - x).norm() < 1e-9);
        assert!((cov - p).norm() < 1e-9);
    }

    #[test]
    fn sigma_points_are_symmetric_about_mean() {
        let x = AugState::zeros();
        let p = Cov::<N_AUG>::identity();
        let sigmas = sigma_points(&x, &p).unwrap();
        for i in 0..N_AUG {
            let plus = sigmas.column(1 + i);
            let minus = sigmas.column(1 + N_AUG + i);
            assert!((plus + minus).norm() < 1e-12);
            assert!(approx_equal(plus[i], 3.0f64.sqrt()));
        }
    }

    #[test]
    fn non_positive_definite_covariance_is_rejected() {
        let mut p = Cov::<N_AUG>::identity();
        p[(2, 2)] = -1.0;
        assert_eq!(
            sigma_points(&AugState::zeros(), &p),
            Err(FilterError::NotPositiveDefinite)
        );
    }

    #[test]
    fn residual_wraps_only_angle_component() {
        let a = na::Vector3::new(10.0, PI - 0.1, 10.0);
        let b = na::Vector3::new(0.0, -PI + 0.1, 0.0);
        let d = residual(&a, &b, Some(1));
        assert!(approx_equal(d[0], 10.0));
        assert!(approx_equal(d[1], -0.2));
        assert!(approx_equal(d[2], 10.0));
        let d = residual(&a, &b, None);
        assert!(approx_equal(d[1], 2.0 * PI - 0.2));
    }
}
