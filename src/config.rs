use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::io::SensorFilter;
use crate::ukf::NoiseParams;

/// Unscented Kalman filter fusing lidar and radar measurements.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the filter over a measurement log and write the estimates.
    Filter(FilterArgs),
    /// Generate a synthetic measurement log.
    Simulate(SimulateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// Input measurement log.
    pub input: PathBuf,

    /// Output file for the estimates.
    pub output: PathBuf,

    /// Log the state and covariance after every measurement.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Use only radar data.
    #[arg(short, long, conflicts_with = "lidar")]
    pub radar: bool,

    /// Use only lidar data.
    #[arg(short, long)]
    pub lidar: bool,

    #[command(flatten)]
    pub noise: NoiseArgs,
}

impl FilterArgs {
    pub fn sensor_filter(&self) -> SensorFilter {
        match (self.radar, self.lidar) {
            (true, _) => SensorFilter::RadarOnly,
            (_, true) => SensorFilter::LidarOnly,
            _ => SensorFilter::All,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Output measurement log.
    pub output: PathBuf,

    /// RNG seed.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Number of measurements.
    #[arg(long, default_value_t = 500)]
    pub steps: usize,

    /// Time between measurements in microseconds.
    #[arg(long, default_value_t = 50_000)]
    pub dt_us: i64,

    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    #[command(flatten)]
    pub noise: NoiseArgs,
}

/// Noise standard deviations; unset values keep the defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct NoiseArgs {
    /// Longitudinal acceleration noise [m/s^2].
    #[arg(long)]
    pub std_a: Option<f64>,
    /// Yaw acceleration noise [rad/s^2].
    #[arg(long)]
    pub std_yawdd: Option<f64>,
    /// Lidar x noise [m].
    #[arg(long)]
    pub std_laspx: Option<f64>,
    /// Lidar y noise [m].
    #[arg(long)]
    pub std_laspy: Option<f64>,
    /// Radar range noise [m].
    #[arg(long)]
    pub std_radr: Option<f64>,
    /// Radar bearing noise [rad].
    #[arg(long)]
    pub std_radphi: Option<f64>,
    /// Radar range rate noise [m/s].
    #[arg(long)]
    pub std_radrd: Option<f64>,
}

impl From<&NoiseArgs> for NoiseParams {
    fn from(a: &NoiseArgs) -> Self {
        let d = NoiseParams::default();
        NoiseParams {
            std_a: a.std_a.unwrap_or(d.std_a),
            std_yawdd: a.std_yawdd.unwrap_or(d.std_yawdd),
            std_laspx: a.std_laspx.unwrap_or(d.std_laspx),
            std_laspy: a.std_laspy.unwrap_or(d.std_laspy),
            std_radr: a.std_radr.unwrap_or(d.std_radr),
            std_radphi: a.std_radphi.unwrap_or(d.std_radphi),
            std_radrd: a.std_radrd.unwrap_or(d.std_radrd),
        }
    }
}
