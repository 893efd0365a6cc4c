use core::fmt;

use crate::model::{polar_to_cartesian, LidarZ, RadarZ};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Lidar,
    Radar,
}

impl SensorKind {
    // ログ形式の先頭トークン
    pub fn token(self) -> &'static str {
        match self {
            SensorKind::Lidar => "L",
            SensorKind::Radar => "R",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorKind::Lidar => write!(f, "lidar"),
            SensorKind::Radar => write!(f, "radar"),
        }
    }
}

/// Raw sensor values: lidar `[px, py]`, radar `[rho, phi, rho_dot]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Lidar(LidarZ),
    Radar(RadarZ),
}

impl Reading {
    pub fn kind(&self) -> SensorKind {
        match self {
            Reading::Lidar(_) => SensorKind::Lidar,
            Reading::Radar(_) => SensorKind::Radar,
        }
    }

    /// Position of the reading in Cartesian coordinates.
    pub fn to_cartesian(&self) -> (f64, f64) {
        match self {
            Reading::Lidar(z) => (z[0], z[1]),
            Reading::Radar(z) => polar_to_cartesian(z[0], z[1]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub reading: Reading,
    // マイクロ秒
    pub timestamp: i64,
}

impl Measurement {
    pub fn lidar(px: f64, py: f64, timestamp: i64) -> Self {
        Self {
            reading: Reading::Lidar(LidarZ::new(px, py)),
            timestamp,
        }
    }

    pub fn radar(rho: f64, phi: f64, rho_dot: f64, timestamp: i64) -> Self {
        Self {
            reading: Reading::Radar(RadarZ::new(rho, phi, rho_dot)),
            timestamp,
        }
    }

    pub fn kind(&self) -> SensorKind {
        self.reading.kind()
    }
}

/// Ground truth `[px, py, vx, vy]`, only read by the accuracy scoring.
pub type GroundTruth = na::Vector4<f64>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record {
    pub measurement: Measurement,
    pub ground_truth: GroundTruth,
}
