use log::{debug, trace, warn};

use crate::error::FilterError;
use crate::measurement::{Measurement, Reading, SensorKind};
use crate::model::{
    fx, hx_radar, AugState, Cov, LidarZ, RadarZ, Sigma, State, H_LIDAR, N_AUG, N_SIGMA, N_X,
    N_Z_RADAR, PHI, YAW,
};
use crate::unscented::{
    cross_covariance, residual, sigma_points, sigma_weights, unscented_transform, Weights,
};

/// Standard deviations of the process and measurement noise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseParams {
    /// longitudinal acceleration [m/s^2]
    pub std_a: f64,
    /// yaw acceleration [rad/s^2]
    pub std_yawdd: f64,
    /// lidar position x [m]
    pub std_laspx: f64,
    /// lidar position y [m]
    pub std_laspy: f64,
    /// radar range [m]
    pub std_radr: f64,
    /// radar bearing [rad]
    pub std_radphi: f64,
    /// radar range rate [m/s]
    pub std_radrd: f64,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            std_a: 0.63,
            std_yawdd: 1.2,
            std_laspx: 0.15,
            std_laspy: 0.15,
            std_radr: 0.9,
            std_radphi: 0.005,
            std_radrd: 0.5,
        }
    }
}

/// NIS of the most recent update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nis {
    pub sensor: SensorKind,
    pub value: f64,
}

pub struct UnscentedKalmanFilter {
    x: State,
    p: Cov<N_X>,
    q: Cov<2>,
    r_lidar: Cov<2>,
    r_radar: Cov<N_Z_RADAR>,
    w: Weights,
    sigma_f: Sigma<N_X>,
    prev_timestamp: Option<i64>,
    nis: Option<Nis>,
}

impl UnscentedKalmanFilter {
    // 位置がこれより 0 に近いときは初期値を置き換える
    const MIN_INIT_POSITION: f64 = 1e-4;
    const GUARD_POSITION: f64 = 1.0;
    const GUARD_VARIANCE: f64 = 1000.0;
    const US_PER_SEC: f64 = 1e6;

    pub fn new(noise: NoiseParams) -> Self {
        let q = Cov::<2>::from_diagonal(&na::vector![
            noise.std_a.powi(2),
            noise.std_yawdd.powi(2)
        ]);
        let r_lidar = Cov::<2>::from_diagonal(&na::vector![
            noise.std_laspx.powi(2),
            noise.std_laspy.powi(2)
        ]);
        let r_radar = Cov::<N_Z_RADAR>::from_diagonal(&na::vector![
            noise.std_radr.powi(2),
            noise.std_radphi.powi(2),
            noise.std_radrd.powi(2)
        ]);
        Self {
            x: State::zeros(),
            p: Self::initial_covariance(),
            q,
            r_lidar,
            r_radar,
            w: sigma_weights(),
            sigma_f: Sigma::<N_X>::from_element(f64::NAN),
            prev_timestamp: None,
            nis: None,
        }
    }

    // 初期共分散 (速度とヨーレートは未知)
    pub fn initial_covariance() -> Cov<N_X> {
        Cov::<N_X>::from_diagonal(&na::vector![1.0, 1.0, 1000.0, 100.0, 1.0])
    }

    pub fn process_measurement(&mut self, m: &Measurement) -> Result<(), FilterError> {
        let Some(prev) = self.prev_timestamp else {
            self.initialize(m);
            return Ok(());
        };

        if m.timestamp < prev {
            warn!(
                "rejecting {} measurement: timestamp {} < {}",
                m.kind(),
                m.timestamp,
                prev
            );
            return Err(FilterError::TimestampRegression {
                previous: prev,
                current: m.timestamp,
            });
        }
        let dt = (m.timestamp - prev) as f64 / Self::US_PER_SEC;

        if dt > 0.0 {
            self.predict(dt)?;
        } else {
            // 同時刻の観測は予測せず, 現在の推定からシグマ点だけ作り直す
            debug!("duplicate timestamp {}, skipping prediction", m.timestamp);
            self.sigma_f = self.propagate_sigma_points(0.0)?;
        }
        // 予測が失敗したときは時刻を進めない
        self.prev_timestamp = Some(m.timestamp);
        match &m.reading {
            Reading::Lidar(z) => self.update_lidar(z),
            Reading::Radar(z) => self.update_radar(z),
        }
    }

    fn initialize(&mut self, m: &Measurement) {
        let (mut px, mut py) = m.reading.to_cartesian();
        self.p = Self::initial_covariance();

        // 位置が 0 だと radar の観測関数が発散するので初期値を差し替えて不確かさを上げる
        if px.abs() < Self::MIN_INIT_POSITION {
            warn!("initial px {} too close to zero, substituting", px);
            px = Self::GUARD_POSITION;
            self.p[(0, 0)] = Self::GUARD_VARIANCE;
        }
        if py.abs() < Self::MIN_INIT_POSITION {
            warn!("initial py {} too close to zero, substituting", py);
            py = Self::GUARD_POSITION;
            self.p[(1, 1)] = Self::GUARD_VARIANCE;
        }

        self.x = State::new(px, py, 0.0, 0.0, 0.0);
        self.prev_timestamp = Some(m.timestamp);
        debug!(
            "initialized from {} at t={}: x = {:?}",
            m.kind(),
            m.timestamp,
            self.x.as_slice()
        );
    }

    // 拡大シグマ点を生成して dt 秒先へ伝播する
    fn propagate_sigma_points(&self, dt: f64) -> Result<Sigma<N_X>, FilterError> {
        // 拡大状態と拡大共分散は毎回作り直す
        let mut x_aug = AugState::zeros();
        x_aug.fixed_rows_mut::<N_X>(0).copy_from(&self.x);
        let mut p_aug = Cov::<N_AUG>::zeros();
        p_aug.fixed_view_mut::<N_X, N_X>(0, 0).copy_from(&self.p);
        p_aug.fixed_view_mut::<2, 2>(N_X, N_X).copy_from(&self.q);

        let sigma_aug = sigma_points(&x_aug, &p_aug)?;
        let mut sigma_f = Sigma::<N_X>::zeros();
        for i in 0..N_SIGMA {
            sigma_f.set_column(i, &fx(&sigma_aug.column(i).into_owned(), dt));
        }
        Ok(sigma_f)
    }

    pub fn predict(&mut self, dt: f64) -> Result<(), FilterError> {
        let sigma_f = self.propagate_sigma_points(dt)?;
        let (x, p) = unscented_transform(&sigma_f, &self.w, Some(YAW));

        self.sigma_f = sigma_f;
        self.x = x;
        self.commit_covariance(p);
        trace!("predicted dt={}: x = {:?}", dt, self.x.as_slice());
        Ok(())
    }

    pub fn update_lidar(&mut self, z: &LidarZ) -> Result<(), FilterError> {
        let ht = H_LIDAR.transpose();
        let y = z - H_LIDAR * self.x;
        let s = H_LIDAR * self.p * ht + self.r_lidar;
        let si = s.try_inverse().ok_or(FilterError::SingularInnovation {
            sensor: SensorKind::Lidar,
        })?;
        let k = self.p * ht * si;

        self.x += k * y;
        self.commit_covariance((Cov::<N_X>::identity() - k * H_LIDAR) * self.p);

        self.record_nis(SensorKind::Lidar, (y.transpose() * si * y)[0]);
        Ok(())
    }

    pub fn update_radar(&mut self, z: &RadarZ) -> Result<(), FilterError> {
        let mut sigmas_h = Sigma::<N_Z_RADAR>::zeros();
        for i in 0..N_SIGMA {
            sigmas_h.set_column(i, &hx_radar(&self.sigma_f.column(i).into_owned()));
        }
        let (zp, pz) = unscented_transform(&sigmas_h, &self.w, Some(PHI));
        let s = pz + self.r_radar;
        let si = s.try_inverse().ok_or(FilterError::SingularInnovation {
            sensor: SensorKind::Radar,
        })?;
        let pxz = cross_covariance(&self.sigma_f, &self.x, &sigmas_h, &zp, &self.w, Some(PHI));
        let k = pxz * si;
        let y = residual(z, &zp, Some(PHI));

        self.x += k * y;
        self.commit_covariance(self.p - k * s * k.transpose());

        self.record_nis(SensorKind::Radar, (y.transpose() * si * y)[0]);
        Ok(())
    }

    // 対称性を維持し, 正定値でなくなっていれば修復してから保持する
    fn commit_covariance(&mut self, p: Cov<N_X>) {
        let p = (p + p.transpose()) / 2.0;
        self.p = if p.cholesky().is_some() {
            p
        } else {
            warn!("covariance is not positive definite, repairing");
            nearest_positive_definite(p)
        };
    }

    fn record_nis(&mut self, sensor: SensorKind, value: f64) {
        trace!("{} NIS = {}", sensor, value);
        self.nis = Some(Nis { sensor, value });
    }

    // 推定した状態を返す
    pub fn state(&self) -> State {
        self.x
    }

    pub fn covariance(&self) -> Cov<N_X> {
        self.p
    }

    pub fn nis(&self) -> Option<Nis> {
        self.nis
    }

    pub fn is_initialized(&self) -> bool {
        self.prev_timestamp.is_some()
    }

    pub fn predicted_sigma_points(&self) -> &Sigma<N_X> {
        &self.sigma_f
    }
}

const MIN_EIGENVALUE: f64 = 1e-6;

/// Rebuilds a symmetric matrix with every eigenvalue made positive.
///
/// Negative eigenvalues are replaced by their magnitude, and all of them are
/// kept at or above `MIN_EIGENVALUE`.
fn nearest_positive_definite(p: Cov<N_X>) -> Cov<N_X> {
    let mut eig = p.symmetric_eigen();
    eig.eigenvalues = eig.eigenvalues.map(|l| l.abs().max(MIN_EIGENVALUE));
    let p = eig.recompose();
    (p + p.transpose()) / 2.0
}
