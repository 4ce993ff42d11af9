//! Error taxonomy for the sensor control surface.

use thiserror::Error;

/// Failure categories surfaced to control-surface callers.
///
/// Each category maps to a stable negative status code (errno-shaped) so
/// callers on the bus can switch on the number without parsing messages.
/// Best-effort faults (wake-source toggles, reset pulses) are deliberately
/// absent: they are logged at the call site and never surfaced, because no
/// corrective action exists for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorError {
    /// The operation requires an available device and it is not.
    #[error("sensor unavailable")]
    Unavailable,

    /// Payload direction or size validation failed; nothing was mutated.
    #[error("payload access fault: {0}")]
    AccessFault(String),

    /// Attach-time allocation failed (input device, session slots).
    #[error("resource exhausted: {0}")]
    Exhausted(String),

    /// Wiring parse or IRQ registration failed; the device was unwound to
    /// unavailable.
    #[error("hardware fault: {0}")]
    Hardware(String),
}

impl SensorError {
    /// Negative status code reported over the control surface.
    pub const fn status(&self) -> i32 {
        match self {
            Self::Unavailable => -19,  // ENODEV
            Self::AccessFault(_) => -14, // EFAULT
            Self::Exhausted(_) => -12, // ENOMEM
            Self::Hardware(_) => -13,  // EACCES/EPERM class
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn status_codes_are_stable() {
        assert_eq!(SensorError::Unavailable.status(), -19);
        assert_eq!(SensorError::AccessFault("x".into()).status(), -14);
        assert_eq!(SensorError::Exhausted("x".into()).status(), -12);
        assert_eq!(SensorError::Hardware("x".into()).status(), -13);
    }

    #[test]
    fn messages_name_the_category() {
        assert_eq!(SensorError::Unavailable.to_string(), "sensor unavailable");
        assert_eq!(
            SensorError::AccessFault("bad size".into()).to_string(),
            "payload access fault: bad size"
        );
    }
}
