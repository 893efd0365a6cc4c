extern crate nalgebra as na;

pub mod accuracy;
pub mod config;
pub mod error;
pub mod io;
pub mod measurement;
pub mod model;
pub mod sim;
pub mod ukf;
pub mod unscented;

pub use error::FilterError;
pub use measurement::{Measurement, Reading, Record, SensorKind};
pub use ukf::{NoiseParams, Nis, UnscentedKalmanFilter};
