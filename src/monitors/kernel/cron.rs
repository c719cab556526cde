use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDateTime, TimeDelta};

use super::{Error, KernelChecks};
use crate::handler::Handle;
use crate::monitor::reasons;

/// Jobs repeating faster than this are reported.
const MIN_INTERVAL_MINUTES: i64 = 5;
const MIN_FIELDS: usize = 7;
const CMD_MARKER: &str = " CMD ";

/// Flags cron jobs that run more often than every [`MIN_INTERVAL_MINUTES`].
///
/// Owns the last time each command was seen. It must be driven by a single task: the cache
/// takes no lock and relies on lines arriving in file order.
pub(super) struct CronFloodDetector {
    checks: Arc<KernelChecks>,
    last_seen: HashMap<String, NaiveDateTime>,
}

/// One `CMD` entry of the cron log.
#[derive(Debug, PartialEq, Eq)]
struct CronEntry<'a> {
    timestamp: NaiveDateTime,
    command: &'a str,
}

impl CronFloodDetector {
    pub(super) fn new(checks: Arc<KernelChecks>) -> Self {
        Self {
            checks,
            last_seen: HashMap::new(),
        }
    }

    async fn observe(&mut self, line: &str) -> Result<(), Error> {
        let Some(entry) = parse_entry(line)? else {
            return Ok(());
        };

        let window = TimeDelta::minutes(MIN_INTERVAL_MINUTES);
        let too_fast = self
            .last_seen
            .get(entry.command)
            .is_some_and(|last| entry.timestamp < *last + window);
        // re-armed on every observation, so each too-fast repetition reports again
        self.last_seen
            .insert(entry.command.to_owned(), entry.timestamp);

        if too_fast {
            log::debug!("cron job `{}` repeated within the window", entry.command);
            self.checks
                .notify(
                    reasons::RAPID_CRON
                        .builder()
                        .message(format!(
                            "A cron job is running faster than every {MIN_INTERVAL_MINUTES} minutes, which can impact node performance"
                        ))
                        .build(),
                )
                .await?;
        }
        Ok(())
    }
}

impl Handle<String> for CronFloodDetector {
    type Error = Error;

    async fn handle(&mut self, line: String) -> Result<(), Self::Error> {
        self.observe(&line).await
    }
}

/// Parses a syslog style cron line, e.g.
/// `Sep 17 21:44:01 host CROND[13867]: (root) CMD (/usr/bin/job)`.
///
/// Returns `Ok(None)` for lines that do not record a command execution.
fn parse_entry(line: &str) -> Result<Option<CronEntry<'_>>, Error> {
    let Some((_, command)) = line.split_once(CMD_MARKER) else {
        return Ok(None);
    };
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < MIN_FIELDS {
        return Err(Error::CronFormat {
            expected: MIN_FIELDS,
            actual: fields.len(),
            line: line.to_owned(),
        });
    }

    // syslog timestamps carry no year; pin a leap year so that `Feb 29` parses
    let value = format!("2000 {} {} {}", fields[0], fields[1], fields[2]);
    let timestamp = NaiveDateTime::parse_from_str(&value, "%Y %b %d %H:%M:%S").map_err(
        |source| Error::CronTimestamp {
            value: value[5..].to_owned(),
            source,
        },
    )?;

    Ok(Some(CronEntry {
        timestamp,
        command: command.trim(),
    }))
}
