//! Static checks run before a plugin enters the registry.
//!
//! Severity needs no check here: [`crate::monitor::Severity`] only has the three valid values
//! and rejects anything else when parsed.

use super::{Error, MonitorPlugin, Result};
use crate::monitor::{Condition, Monitor};

pub fn validate_plugin(plugin: &dyn MonitorPlugin) -> Result<()> {
    if plugin.name().is_empty() {
        return Err(Error::EmptyPluginName);
    }
    let monitors = plugin.monitors();
    if monitors.is_empty() {
        return Err(Error::NoMonitors(plugin.name().to_owned()));
    }
    for (index, monitor) in monitors.iter().enumerate() {
        validate_monitor(monitor.as_ref()).map_err(|err| Error::Monitor {
            index,
            source: Box::new(err),
        })?;
    }
    Ok(())
}

pub fn validate_monitor(monitor: &dyn Monitor) -> Result<()> {
    if monitor.name().is_empty() {
        return Err(Error::EmptyMonitorName);
    }
    for (index, condition) in monitor.conditions().iter().enumerate() {
        validate_condition(condition).map_err(|err| Error::Condition {
            index,
            source: Box::new(err),
        })?;
    }
    Ok(())
}

pub fn validate_condition(condition: &Condition) -> Result<()> {
    if condition.reason().is_empty() {
        return Err(Error::EmptyReason);
    }
    if condition.min_occurrences() < 0 {
        return Err(Error::NegativeMinOccurrences(condition.min_occurrences()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::monitor::Severity;
    use crate::registry::Plugin;
    use crate::registry::tests::StaticMonitor;

    fn condition(reason: &str, min_occurrences: i64) -> Condition {
        Condition::builder(reason, Severity::Warning)
            .min_occurrences(min_occurrences)
            .build()
    }

    #[test]
    fn test_validate_condition() {
        assert!(validate_condition(&condition("Reason", 0)).is_ok());
        assert!(validate_condition(&condition("Reason", 3)).is_ok());
        assert!(matches!(
            validate_condition(&condition("", 1)),
            Err(Error::EmptyReason)
        ));
        assert!(matches!(
            validate_condition(&condition("Reason", -1)),
            Err(Error::NegativeMinOccurrences(-1))
        ));
    }

    #[test]
    fn test_validate_monitor() {
        assert!(validate_monitor(&StaticMonitor::new("m")).is_ok());
        assert!(matches!(
            validate_monitor(&StaticMonitor::new("")),
            Err(Error::EmptyMonitorName)
        ));

        let monitor = StaticMonitor::with_conditions(
            "m",
            vec![condition("Ok", 1), condition("", 1)],
        );
        let err = validate_monitor(&monitor).unwrap_err();
        assert!(matches!(err, Error::Condition { index: 1, .. }));
        assert_eq!(err.to_string(), "condition 1 validation failed");
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "condition reason cannot be empty");
    }

    #[test]
    fn test_validate_plugin() {
        let valid = Plugin::new("p", vec![Arc::new(StaticMonitor::new("m"))]);
        assert!(validate_plugin(&valid).is_ok());

        assert!(matches!(
            validate_plugin(&Plugin::new("", vec![Arc::new(StaticMonitor::new("m"))])),
            Err(Error::EmptyPluginName)
        ));
        assert!(matches!(
            validate_plugin(&Plugin::new("p", Vec::new())),
            Err(Error::NoMonitors(_))
        ));

        let invalid = Plugin::new(
            "p",
            vec![
                Arc::new(StaticMonitor::new("m")),
                Arc::new(StaticMonitor::new("")),
            ],
        );
        assert!(matches!(
            validate_plugin(&invalid),
            Err(Error::Monitor { index: 1, .. })
        ));
    }
}
