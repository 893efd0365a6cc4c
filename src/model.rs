use core::f64::consts::PI;

use na::matrix;

// 状態 [px, py, v, yaw, yawd]
pub const N_X: usize = 5;
// 拡大状態 [px, py, v, yaw, yawd, nu_a, nu_yawdd]
pub const N_AUG: usize = N_X + 2;
// シグマ点の数
pub const N_SIGMA: usize = 2 * N_AUG + 1;
// lidar: [px, py]
pub const N_Z_LIDAR: usize = 2;
// radar: [rho, phi, rho_dot]
pub const N_Z_RADAR: usize = 3;

// 状態ベクトル中の角度成分
pub const YAW: usize = 3;
// radar観測中の角度成分
pub const PHI: usize = 1;

pub type State = na::SVector<f64, N_X>;
pub type AugState = na::SVector<f64, N_AUG>;
pub type Cov<const S: usize> = na::SMatrix<f64, S, S>;
pub type Sigma<const S: usize> = na::SMatrix<f64, S, N_SIGMA>;
pub type LidarZ = na::SVector<f64, N_Z_LIDAR>;
pub type RadarZ = na::SVector<f64, N_Z_RADAR>;

/// Below this yaw rate the straight-line motion formula is used.
pub const MIN_YAW_RATE: f64 = 1e-3;

/// Lidar observes the position components directly.
pub const H_LIDAR: na::SMatrix<f64, N_Z_LIDAR, N_X> = matrix![
    1.0, 0.0, 0.0, 0.0, 0.0;
    0.0, 1.0, 0.0, 0.0, 0.0;
];

/// Wraps an angle into (-π, π].
pub fn normalize_angle(mut a: f64) -> f64 {
    if !a.is_finite() {
        return a;
    }
    // 大きな値のときはループを回さずに一気に戻す
    if a.abs() > 64.0 * PI {
        a %= 2.0 * PI;
    }
    while a > PI {
        a -= 2.0 * PI;
    }
    while a <= -PI {
        a += 2.0 * PI;
    }
    a
}

// 状態遷移関数 (CTRV)
// 拡大シグマ点を受け取り, ノイズ項を含めて dt 秒後の状態を返す
pub fn fx(x: &AugState, dt: f64) -> State {
    let (px, py, v, yaw, yawd) = (x[0], x[1], x[2], x[3], x[4]);
    let (nu_a, nu_yawdd) = (x[5], x[6]);

    // ヨーレートが小さいときは直線運動で近似してゼロ除算を避ける
    let (mut px_p, mut py_p) = if yawd.abs() > MIN_YAW_RATE {
        (
            px + v / yawd * ((yaw + yawd * dt).sin() - yaw.sin()),
            py + v / yawd * (yaw.cos() - (yaw + yawd * dt).cos()),
        )
    } else {
        (px + v * dt * yaw.cos(), py + v * dt * yaw.sin())
    };
    let mut v_p = v;
    let mut yaw_p = yaw + yawd * dt;
    let mut yawd_p = yawd;

    // ノイズの寄与
    let dt2 = dt * dt;
    px_p += 0.5 * nu_a * dt2 * yaw.cos();
    py_p += 0.5 * nu_a * dt2 * yaw.sin();
    v_p += nu_a * dt;
    yaw_p += 0.5 * nu_yawdd * dt2;
    yawd_p += nu_yawdd * dt;

    State::new(px_p, py_p, v_p, yaw_p, yawd_p)
}

// 観測関数 (radar)
pub fn hx_radar(x: &State) -> RadarZ {
    let (px, py, v, yaw) = (x[0], x[1], x[2], x[3]);
    let vx = v * yaw.cos();
    let vy = v * yaw.sin();

    let rho = px.hypot(py);
    let phi = py.atan2(px);
    let rho_dot = (px * vx + py * vy) / rho;

    // rho ≈ 0 で NaN や無限大が出たら 0 に置き換える
    RadarZ::new(rho, phi, rho_dot).map(|z| if z.is_finite() { z } else { 0.0 })
}

// 観測関数 (lidar)
pub fn hx_lidar(x: &State) -> LidarZ {
    H_LIDAR * x
}

pub fn polar_to_cartesian(rho: f64, phi: f64) -> (f64, f64) {
    (rho * phi.cos(), rho * phi.sin())
}
