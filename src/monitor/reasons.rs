//! Catalog of the condition reasons emitted by the built-in monitors.

use super::{Condition, ConditionBuilder, Severity};

/// A reason identifier together with the severity it is emitted with by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reason {
    name: &'static str,
    default_severity: Severity,
}

impl Reason {
    pub const fn new(name: &'static str, default_severity: Severity) -> Self {
        Self {
            name,
            default_severity,
        }
    }

    pub fn builder(&self) -> ConditionBuilder {
        Condition::builder(self.name, self.default_severity)
    }
}

pub const APP_BLOCKED: Reason = Reason::new("AppBlocked", Severity::Warning);
pub const APP_CRASH: Reason = Reason::new("AppCrash", Severity::Warning);
pub const APPROACHING_KERNEL_PID_MAX: Reason =
    Reason::new("ApproachingKernelPidMax", Severity::Warning);
pub const APPROACHING_MAX_OPEN_FILES: Reason =
    Reason::new("ApproachingMaxOpenFiles", Severity::Warning);
pub const CONNTRACK_EXCEEDED_KERNEL: Reason =
    Reason::new("ConntrackExceededKernel", Severity::Warning);
pub const EXCESSIVE_ZOMBIE_PROCESSES: Reason =
    Reason::new("ExcessiveZombieProcesses", Severity::Warning);
pub const FORK_FAILED_OUT_OF_PIDS: Reason = Reason::new("ForkFailedOutOfPIDs", Severity::Fatal);
pub const KERNEL_BUG: Reason = Reason::new("KernelBug", Severity::Warning);
pub const LARGE_ENVIRONMENT: Reason = Reason::new("LargeEnvironment", Severity::Warning);
pub const RAPID_CRON: Reason = Reason::new("RapidCron", Severity::Warning);
pub const SOFT_LOCKUP: Reason = Reason::new("SoftLockup", Severity::Warning);
