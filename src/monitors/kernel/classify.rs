//! Pattern matching of kernel and kubelet log lines.
//!
//! Each line yields at most one condition; patterns are tried in a fixed order and the first
//! match wins.

use std::sync::LazyLock;

use regex::Regex;

use crate::monitor::Condition;
use crate::monitor::reasons;

static SOFT_LOCKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"watchdog: BUG: soft lockup - .* stuck for (.*)! \[.*\]").expect("valid regex")
});
static KERNEL_BUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*?\] BUG: (.*)").expect("valid regex"));
// one capture group per alternative, holding the process name
static APP_CRASH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"traps:\s*(.*?)\[|\s([^\s\[\]]+)\[\d+\]: segfault at").expect("valid regex")
});
static APP_BLOCKED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"task (.*?):\d+ blocked for more than").expect("valid regex"));
static CONNTRACK_EXCEEDED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(ip|nf)_conntrack: table full, dropping packet").expect("valid regex")
});

static FORK_FAILED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"fork/exec.*resource temporarily unavailable").expect("valid regex")
});
static THREAD_CREATE_FAILED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"failed to create new OS thread.*errno=11").expect("valid regex")
});

/// Classifies one kernel ring buffer line.
pub fn classify_kernel_line(line: &str) -> Option<Condition> {
    if let Some(caps) = SOFT_LOCKUP.captures(line) {
        let duration = &caps[1];
        return Some(
            reasons::SOFT_LOCKUP
                .builder()
                .message(format!("CPU stuck for {duration}"))
                .build(),
        );
    }
    if KERNEL_BUG.is_match(line) {
        return Some(
            reasons::KERNEL_BUG
                .builder()
                .message("A kernel bug was detected and reported by the Linux kernel")
                .build(),
        );
    }
    if let Some(caps) = APP_CRASH.captures(line) {
        let process = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map_or("", |m| m.as_str());
        return Some(
            reasons::APP_CRASH
                .builder()
                .message(format!("Process {process:?} on the node has crashed"))
                .build(),
        );
    }
    if let Some(caps) = APP_BLOCKED.captures(line) {
        let process = &caps[1];
        return Some(
            reasons::APP_BLOCKED
                .builder()
                .message(format!(
                    "Process {process:?} has been blocked from scheduling for a long period of time"
                ))
                .build(),
        );
    }
    if CONNTRACK_EXCEEDED.is_match(line) {
        return Some(
            reasons::CONNTRACK_EXCEEDED_KERNEL
                .builder()
                .message("Connection tracking exceeded the maximum for the kernel")
                .build(),
        );
    }
    None
}

/// Classifies one line of the kubelet journal.
pub fn classify_kubelet_line(line: &str) -> Option<Condition> {
    if FORK_FAILED.is_match(line) || THREAD_CREATE_FAILED.is_match(line) {
        return Some(
            reasons::FORK_FAILED_OUT_OF_PIDS
                .builder()
                .message(
                    "A fork or exec call has failed due to the system being out of process IDs or memory",
                )
                .build(),
        );
    }
    None
}
