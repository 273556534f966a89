//! Pod and Job phase → exit-code mapping.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const PHASE_RUNNING: &str = "Running";
pub const PHASE_SUCCEEDED: &str = "Succeeded";
pub const PHASE_FAILED: &str = "Failed";
pub const PHASE_UNKNOWN: &str = "Unknown";

/// Phase-to-code table shared by pods and jobs: running and succeeded map to 0,
/// failed to 1, everything else to 255.
fn phase_code(phase: &str) -> i32 {
    match phase {
        PHASE_RUNNING | PHASE_SUCCEEDED => 0,
        PHASE_FAILED => 1,
        _ => 255,
    }
}

/// Observed pod phase, usable as a process exit code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodStatus {
    phase: String,
}

impl PodStatus {
    pub fn new(phase: impl Into<String>) -> Self {
        Self { phase: phase.into() }
    }

    pub fn phase(&self) -> &str {
        &self.phase
    }

    pub fn code(&self) -> i32 {
        phase_code(&self.phase)
    }

    pub fn is_running(&self) -> bool {
        self.phase == PHASE_RUNNING
    }

    pub fn is_failed(&self) -> bool {
        self.phase == PHASE_FAILED
    }

    pub fn is_succeeded(&self) -> bool {
        self.phase == PHASE_SUCCEEDED
    }
}

impl fmt::Display for PodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.phase)
    }
}

impl PartialEq<str> for PodStatus {
    fn eq(&self, other: &str) -> bool {
        self.phase == other
    }
}

impl PartialEq<&str> for PodStatus {
    fn eq(&self, other: &&str) -> bool {
        self.phase == *other
    }
}

/// Job phase derived from its active/succeeded/failed pod counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    phase: String,
}

impl JobStatus {
    pub fn from_counts(active: Option<i32>, succeeded: Option<i32>, failed: Option<i32>) -> Self {
        let phase = if active.unwrap_or(0) >= 1 {
            PHASE_RUNNING
        } else if succeeded.unwrap_or(0) >= 1 {
            PHASE_SUCCEEDED
        } else if failed.unwrap_or(0) >= 1 {
            PHASE_FAILED
        } else {
            PHASE_UNKNOWN
        };
        Self { phase: phase.to_string() }
    }

    pub fn phase(&self) -> &str {
        &self.phase
    }

    pub fn code(&self) -> i32 {
        phase_code(&self.phase)
    }

    pub fn is_running(&self) -> bool {
        self.phase == PHASE_RUNNING
    }

    pub fn is_failed(&self) -> bool {
        self.phase == PHASE_FAILED
    }

    pub fn is_succeeded(&self) -> bool {
        self.phase == PHASE_SUCCEEDED
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.phase)
    }
}

impl PartialEq<str> for JobStatus {
    fn eq(&self, other: &str) -> bool {
        self.phase == other
    }
}

impl PartialEq<&str> for JobStatus {
    fn eq(&self, other: &&str) -> bool {
        self.phase == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pod_phase_codes() {
        assert_eq!(PodStatus::new("Running").code(), 0);
        assert_eq!(PodStatus::new("Succeeded").code(), 0);
        assert_eq!(PodStatus::new("Failed").code(), 1);
        assert_eq!(PodStatus::new("Pending").code(), 255);
        assert_eq!(PodStatus::new("Unknown").code(), 255);
        assert_eq!(PodStatus::new("").code(), 255);
    }

    #[test]
    fn pod_predicates_and_string_equality() {
        let s = PodStatus::new("Failed");
        assert!(s.is_failed());
        assert!(!s.is_running());
        assert!(!s.is_succeeded());
        assert_eq!(s, "Failed");
        assert_eq!(s.to_string(), "Failed");
    }

    #[test]
    fn job_phase_from_counters() {
        assert_eq!(JobStatus::from_counts(Some(1), None, None), "Running");
        assert_eq!(JobStatus::from_counts(Some(0), Some(1), None), "Succeeded");
        assert_eq!(JobStatus::from_counts(None, None, Some(3)), "Failed");
        assert_eq!(JobStatus::from_counts(None, None, None), "Unknown");
        assert_eq!(JobStatus::from_counts(None, None, Some(1)).code(), 1);
        assert_eq!(JobStatus::from_counts(None, None, None).code(), 255);
        assert!(JobStatus::from_counts(None, Some(2), Some(1)).is_succeeded());
    }
}
