use thiserror::Error;

/// Shock guard error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("Sensor unavailable: {0}")]
    SensorUnavailable(String),

    #[error("Malformed sensor reading: {0}")]
    MalformedReading(String),

    #[error("Protect attribute I/O failed: {0}")]
    SwitchIo(String),

    #[error("Not ready after startup wait: {0}")]
    StartupUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for guard operations
pub type GuardResult<T> = Result<T, GuardError>;

impl GuardError {
    /// Per-tick failures that the sampling loop absorbs and retries next tick.
    /// Everything else ends the process.
    pub fn is_transient(&self) -> bool {
        match self {
            GuardError::SensorUnavailable(_)
            | GuardError::MalformedReading(_)
            | GuardError::SwitchIo(_) => true,
            GuardError::StartupUnavailable(_) | GuardError::InvalidConfig(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(GuardError::SensorUnavailable("gone".into()).is_transient());
        assert!(GuardError::MalformedReading("(1,".into()).is_transient());
        assert!(GuardError::SwitchIo("EIO".into()).is_transient());
        assert!(!GuardError::StartupUnavailable("sensor".into()).is_transient());
        assert!(!GuardError::InvalidConfig("threshold".into()).is_transient());
    }

    #[test]
    fn test_display_carries_detail() {
        let err = GuardError::SwitchIo("/sys/block/sda/queue/protect: EACCES".into());
        assert_eq!(
            err.to_string(),
            "Protect attribute I/O failed: /sys/block/sda/queue/protect: EACCES"
        );
    }
}
