use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use serde::Serialize;

use crate::monitor::{Condition, Severity};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to serialize condition: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Propagates conditions that passed occurrence gating to the outside world.
///
/// `source` is the name of the monitor that raised the condition.
pub trait Exporter: Send + Sync + 'static {
    fn info(
        &self,
        source: &str,
        condition: &Condition,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn warning(
        &self,
        source: &str,
        condition: &Condition,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn fatal(
        &self,
        source: &str,
        condition: &Condition,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Number of exports per severity and reason.
#[derive(Debug, Default)]
pub struct ConditionStats {
    counts: DashMap<(Severity, String), u64>,
    fatal_reasons: DashSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionCount {
    pub severity: Severity,
    pub reason: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub conditions: Vec<ConditionCount>,
    /// Reasons exported at least once with [`Severity::Fatal`].
    pub fatal_reasons: Vec<String>,
}

impl ConditionStats {
    pub fn record(&self, condition: &Condition) {
        *self
            .counts
            .entry((condition.severity(), condition.reason().to_owned()))
            .or_default() += 1;
        if condition.severity() == Severity::Fatal {
            self.fatal_reasons.insert(condition.reason().to_owned());
        }
    }

    /// Point-in-time copy, sorted by reason then severity.
    pub fn snapshot(&self) -> StatsSnapshot {
        let mut conditions: Vec<ConditionCount> = self
            .counts
            .iter()
            .map(|entry| ConditionCount {
                severity: entry.key().0,
                reason: entry.key().1.clone(),
                count: *entry.value(),
            })
            .collect();
        conditions.sort_by(|a, b| {
            a.reason
                .cmp(&b.reason)
                .then_with(|| a.severity.as_str().cmp(b.severity.as_str()))
        });

        let mut fatal_reasons: Vec<String> =
            self.fatal_reasons.iter().map(|r| r.key().clone()).collect();
        fatal_reasons.sort();

        StatsSnapshot {
            conditions,
            fatal_reasons,
        }
    }
}

/// Writes every condition as a JSON log record and counts it.
#[derive(Debug, Clone, Default)]
pub struct LogExporter {
    stats: Arc<ConditionStats>,
}

#[derive(Serialize)]
struct Record<'a> {
    source: &'a str,
    #[serde(flatten)]
    condition: &'a Condition,
}

impl LogExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> Arc<ConditionStats> {
        Arc::clone(&self.stats)
    }

    fn export(&self, level: log::Level, source: &str, condition: &Condition) -> Result<()> {
        let record = serde_json::to_string(&Record { source, condition })?;
        log::log!(target: "condition", level, "{record}");
        self.stats.record(condition);
        Ok(())
    }
}

impl Exporter for LogExporter {
    async fn info(&self, source: &str, condition: &Condition) -> Result<()> {
        self.export(log::Level::Info, source, condition)
    }

    async fn warning(&self, source: &str, condition: &Condition) -> Result<()> {
        self.export(log::Level::Warn, source, condition)
    }

    async fn fatal(&self, source: &str, condition: &Condition) -> Result<()> {
        self.export(log::Level::Error, source, condition)
    }
}
