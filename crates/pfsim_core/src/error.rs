use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("host died: rbc_count dropped to {rbc_count} at age {age_days:.2} days")]
    HostDeath { age_days: f64, rbc_count: i64 },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("unknown antibody class")]
    UnknownAntibodyClass,
}

pub type SimulationResult<T> = Result<T, SimulationError>;
