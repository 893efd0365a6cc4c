use std::collections::HashMap;

use anyhow::{ensure, Result};

use crate::measurement::{GroundTruth, SensorKind};
use crate::model::State;
use crate::ukf::Nis;

// 推定値を [px, py, vx, vy] に変換する
pub fn to_cartesian(x: &State) -> GroundTruth {
    GroundTruth::new(x[0], x[1], x[2] * x[3].cos(), x[2] * x[3].sin())
}

/// Root-mean-square error per component of `[px, py, vx, vy]`.
pub fn calculate_rmse(
    estimations: &[GroundTruth],
    ground_truth: &[GroundTruth],
) -> Result<GroundTruth> {
    ensure!(!estimations.is_empty(), "no estimations to score");
    ensure!(
        estimations.len() == ground_truth.len(),
        "{} estimations but {} ground truth values",
        estimations.len(),
        ground_truth.len()
    );
    let sum = estimations
        .iter()
        .zip(ground_truth)
        .fold(GroundTruth::zeros(), |acc, (e, g)| {
            acc + (e - g).component_mul(&(e - g))
        });
    Ok((sum / estimations.len() as f64).map(f64::sqrt))
}

/// Counts of NIS values above the 95% chi-square bound of each sensor.
#[derive(Debug, Clone, Default)]
pub struct NisStats {
    counts: HashMap<SensorKind, (usize, usize)>,
}

impl NisStats {
    // 自由度 2 と 3 の χ² 分布の 95% 点
    pub fn threshold(sensor: SensorKind) -> f64 {
        match sensor {
            SensorKind::Lidar => 5.991,
            SensorKind::Radar => 7.815,
        }
    }

    pub fn push(&mut self, nis: Nis) {
        let (total, above) = self.counts.entry(nis.sensor).or_default();
        *total += 1;
        if nis.value > Self::threshold(nis.sensor) {
            *above += 1;
        }
    }

    pub fn count(&self, sensor: SensorKind) -> usize {
        self.counts.get(&sensor).map_or(0, |c| c.0)
    }

    /// Fraction of updates whose NIS exceeded the threshold.
    pub fn exceedance(&self, sensor: SensorKind) -> Option<f64> {
        match self.counts.get(&sensor) {
            Some(&(total, above)) if total > 0 => Some(above as f64 / total as f64),
            _ => None,
        }
    }
}
