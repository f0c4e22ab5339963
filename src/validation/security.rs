//! Security event classification and log
//!
//! Only security-relevant rejections land here. Ordinary out-of-range input is
//! reported to the caller as a validation error and never logged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

const LOG_TARGET: &str = "finplan_engine::security";

/// Events retained in memory before the oldest are dropped
pub const DEFAULT_SECURITY_LOG_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SecurityEventKind {
    /// Markup or script protocol found in a string field
    DangerousPattern,
    /// Parameter combination large enough to overflow or exhaust the engine
    OverflowAttempt,
    RateLimitExceeded,
}

impl SecurityEventKind {
    /// Severity assigned to this kind of event
    pub fn severity(self) -> Severity {
        match self {
            SecurityEventKind::DangerousPattern => Severity::Medium,
            SecurityEventKind::OverflowAttempt => Severity::High,
            SecurityEventKind::RateLimitExceeded => Severity::Low,
        }
    }
}

impl fmt::Display for SecurityEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SecurityEventKind::DangerousPattern => "dangerous_pattern",
            SecurityEventKind::OverflowAttempt => "overflow_attempt",
            SecurityEventKind::RateLimitExceeded => "rate_limit_exceeded",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEvent {
    pub kind: SecurityEventKind,
    pub severity: Severity,
    pub caller_id: String,
    /// Internal detail; never returned to the caller
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

impl SecurityEvent {
    /// Event stamped with the current time
    pub fn new(kind: SecurityEventKind, caller_id: &str, detail: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            caller_id: caller_id.to_string(),
            detail: detail.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Bounded in-memory record of security events
#[derive(Debug)]
pub struct SecurityLog {
    events: VecDeque<SecurityEvent>,
    capacity: usize,
}

impl Default for SecurityLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SECURITY_LOG_CAPACITY)
    }
}

impl SecurityLog {
    /// Log that keeps the newest `capacity` events
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Emit the event through `log` and retain it
    pub fn record(&mut self, event: SecurityEvent) {
        if event.severity >= Severity::High {
            log::error!(
                target: LOG_TARGET,
                "[{:?}] {} from caller '{}': {}",
                event.severity,
                event.kind,
                event.caller_id,
                event.detail
            );
        } else {
            log::warn!(
                target: LOG_TARGET,
                "[{:?}] {} from caller '{}': {}",
                event.severity,
                event.kind,
                event.caller_id,
                event.detail
            );
        }

        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Retained events, oldest first
    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events.iter().cloned().collect()
    }

    /// Get number of retained events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop every retained event
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_classification() {
        assert_eq!(SecurityEventKind::DangerousPattern.severity(), Severity::Medium);
        assert_eq!(SecurityEventKind::OverflowAttempt.severity(), Severity::High);
        assert_eq!(SecurityEventKind::RateLimitExceeded.severity(), Severity::Low);
        assert!(Severity::Critical > Severity::High);
    }

    #[test]
    fn test_log_is_bounded() {
        let mut log = SecurityLog::with_capacity(2);
        for i in 0..3 {
            log.record(SecurityEvent::new(
                SecurityEventKind::RateLimitExceeded,
                &format!("caller-{}", i),
                "too many requests",
            ));
        }

        let events = log.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].caller_id, "caller-1");
        assert_eq!(events[1].caller_id, "caller-2");

        log.clear();
        assert!(log.is_empty());
    }
}
