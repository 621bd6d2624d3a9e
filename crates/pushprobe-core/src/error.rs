//! Scenario-level error taxonomy.
//!
//! Every failure is fail-fast: helpers return [`ProbeError`] and scenarios
//! propagate it with `?`, so the first failed step ends the scenario.

use std::fmt;

use thiserror::Error;

use crate::driver::DriverError;
use crate::push::DeliveryError;

/// A value read back from a setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    /// A checkbox state.
    Toggle(bool),
    /// The concatenated fields of a time picker.
    Time(String),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Toggle(checked) => write!(f, "{}", if *checked { "checked" } else { "unchecked" }),
            SettingValue::Time(text) => write!(f, "\"{}\"", text),
        }
    }
}

/// Errors that end a scenario.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// A required UI element was not on screen.
    #[error("UI element not found: {selector}")]
    ElementNotFound {
        /// The selector path that failed to resolve.
        selector: String,
    },

    /// Sending a push failed.
    #[error("push delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    /// A setting did not survive leaving and re-entering its screen.
    #[error("setting {setting} did not persist: expected {expected}, found {actual}")]
    PersistenceViolation {
        /// The setting key.
        setting: String,
        /// The value read before leaving the screen.
        expected: SettingValue,
        /// The value read after coming back.
        actual: SettingValue,
    },

    /// A scenario assertion did not hold.
    #[error("assertion failed: {0}")]
    AssertionFailed(String),

    /// Navigation could not recognise the current screen.
    #[error("unrecognized screen: {0}")]
    UnknownScreen(String),

    /// The device backend failed.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// The configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ProbeError {
    /// A short, static name for the error kind, used in run reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::ElementNotFound { .. } => "element_not_found",
            ProbeError::Delivery(_) => "delivery",
            ProbeError::PersistenceViolation { .. } => "persistence_violation",
            ProbeError::AssertionFailed(_) => "assertion_failed",
            ProbeError::UnknownScreen(_) => "unknown_screen",
            ProbeError::Driver(_) => "driver",
            ProbeError::Config(_) => "config",
        }
    }
}

/// Fails with [`ProbeError::AssertionFailed`] unless `condition` holds.
pub fn ensure(condition: bool, message: impl Into<String>) -> Result<(), ProbeError> {
    if condition {
        Ok(())
    } else {
        Err(ProbeError::AssertionFailed(message.into()))
    }
}

/// Fails with [`ProbeError::AssertionFailed`] unless the values are equal.
pub fn ensure_eq<T: PartialEq + fmt::Debug>(
    expected: T,
    actual: T,
    message: impl Into<String>,
) -> Result<(), ProbeError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ProbeError::AssertionFailed(format!(
            "{}: expected {:?}, found {:?}",
            message.into(),
            expected,
            actual
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_violation_names_both_values() {
        let err = ProbeError::PersistenceViolation {
            setting: "SOUND_ENABLE".to_string(),
            expected: SettingValue::Toggle(true),
            actual: SettingValue::Toggle(false),
        };
        let msg = err.to_string();
        assert!(msg.contains("SOUND_ENABLE"));
        assert!(msg.contains("expected checked"));
        assert!(msg.contains("found unchecked"));
        assert_eq!(err.kind(), "persistence_violation");
    }

    #[test]
    fn test_time_value_display() {
        assert_eq!(SettingValue::Time("730PM".to_string()).to_string(), "\"730PM\"");
    }

    #[test]
    fn test_ensure_helpers() {
        assert!(ensure(true, "fine").is_ok());
        let err = ensure(false, "Failed to display notification in a webview").unwrap_err();
        assert!(matches!(err, ProbeError::AssertionFailed(ref m) if m.contains("webview")));

        assert!(ensure_eq(3, 3, "count").is_ok());
        let err = ensure_eq(3, 4, "message count").unwrap_err();
        assert_eq!(err.to_string(), "assertion failed: message count: expected 3, found 4");
    }

    #[test]
    fn test_driver_errors_pass_through() {
        let err = ProbeError::from(DriverError::NotConnected);
        assert_eq!(err.to_string(), "Not connected to device");
        assert_eq!(err.kind(), "driver");
    }
}
