use thiserror::Error;

/// Faults the flight task can report. Timing faults are not errors: a missed
/// deadline only bumps a telemetry counter.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlightError {
    /// A parameter the control law cannot run without was not registered
    #[error("required parameter `{0}` is not registered")]
    MissingParam(&'static str),

    #[error("no parameter with that name")]
    UnknownParam,

    #[error("expected `Name=value`")]
    BadAssignment,
}

pub type FlightResult<T> = Result<T, FlightError>;
