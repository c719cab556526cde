use std::fmt;
use std::str::FromStr;

/// How severe an issue is, and whether the node needs an external action to recover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    Info,
    Warning,
    /// The node has a permanent issue, only repairable through an external action.
    Fatal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Fatal => "Fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the known severities.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid severity: `{0}`")]
pub struct InvalidSeverity(pub String);

impl FromStr for Severity {
    type Err = InvalidSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Info" => Ok(Severity::Info),
            "Warning" => Ok(Severity::Warning),
            "Fatal" => Ok(Severity::Fatal),
            other => Err(InvalidSeverity(other.to_owned())),
        }
    }
}

/// A health signal emitted by a monitor.
///
/// Conditions are immutable once built. Use [`Condition::builder`] or a
/// [`Reason`](super::reasons::Reason) from the catalog to create one.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    reason: String,
    message: String,
    severity: Severity,
    min_occurrences: i64,
}

impl Condition {
    pub fn builder(reason: impl Into<String>, severity: Severity) -> ConditionBuilder {
        ConditionBuilder {
            reason: reason.into(),
            message: String::new(),
            severity,
            min_occurrences: 1,
        }
    }

    /// Short PascalCase identifier, stable across emissions.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Number of observations required before the condition is considered active.
    pub fn min_occurrences(&self) -> i64 {
        self.min_occurrences
    }
}

/// Accumulates the fields of a [`Condition`] before it is emitted.
#[derive(Debug, Clone)]
#[must_use]
pub struct ConditionBuilder {
    reason: String,
    message: String,
    severity: Severity,
    min_occurrences: i64,
}

impl ConditionBuilder {
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn min_occurrences(mut self, min_occurrences: i64) -> Self {
        self.min_occurrences = min_occurrences;
        self
    }

    pub fn build(self) -> Condition {
        Condition {
            reason: self.reason,
            message: self.message,
            severity: self.severity,
            min_occurrences: self.min_occurrences,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let condition = Condition::builder("Test", Severity::Warning).build();
        assert_eq!(condition.reason(), "Test");
        assert_eq!(condition.message(), "");
        assert_eq!(condition.severity(), Severity::Warning);
        assert_eq!(condition.min_occurrences(), 1);
    }

    #[test]
    fn test_builder_overrides() {
        let condition = Condition::builder("Test", Severity::Warning)
            .message("details")
            .severity(Severity::Fatal)
            .min_occurrences(5)
            .build();
        assert_eq!(condition.message(), "details");
        assert_eq!(condition.severity(), Severity::Fatal);
        assert_eq!(condition.min_occurrences(), 5);
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!("Info".parse::<Severity>(), Ok(Severity::Info));
        assert_eq!("Warning".parse::<Severity>(), Ok(Severity::Warning));
        assert_eq!("Fatal".parse::<Severity>(), Ok(Severity::Fatal));
        assert_eq!(
            "Invalid".parse::<Severity>(),
            Err(InvalidSeverity("Invalid".to_owned()))
        );
        assert!("warning".parse::<Severity>().is_err());
    }

    #[test]
    fn test_deserialize_rejects_unknown_severity() {
        let raw = r#"{"reason":"A","message":"","severity":"Critical","minOccurrences":1}"#;
        assert!(serde_json::from_str::<Condition>(raw).is_err());

        let raw = r#"{"reason":"A","message":"m","severity":"Fatal","minOccurrences":2}"#;
        let condition: Condition = serde_json::from_str(raw).unwrap();
        assert_eq!(condition.severity(), Severity::Fatal);
        assert_eq!(condition.min_occurrences(), 2);
    }
}
