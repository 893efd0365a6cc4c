use crate::measurement::SensorKind;

/// Numerical failures that end a filtering run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error("augmented covariance is not positive definite")]
    NotPositiveDefinite,
    #[error("{sensor} innovation covariance is singular")]
    SingularInnovation { sensor: SensorKind },
    #[error("timestamp went backwards: {current} < {previous}")]
    TimestampRegression { previous: i64, current: i64 },
}
