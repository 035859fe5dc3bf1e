//! Call observation and execution health.
//!
//! The dispatcher reports every executed call to an injected
//! [`CallObserver`]. [`ToolHealthTracker`] is the production observer: it
//! keeps a sliding window of outcomes per tool and grades each tool by
//! success rate and latency. Tests pass their own recorders instead of
//! reading process-wide counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

// =============================================================================
// Observation
// =============================================================================

/// How an executed call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallClass {
    Success,
    /// Declared tool error, passed through to the caller.
    ToolError,
    /// Undeclared failure or panic in the tool body.
    Internal,
}

impl CallClass {
    pub fn is_success(self) -> bool {
        matches!(self, CallClass::Success)
    }

    fn label(self) -> &'static str {
        match self {
            CallClass::Success => "success",
            CallClass::ToolError => "tool_error",
            CallClass::Internal => "internal",
        }
    }
}

/// One executed call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallRecord {
    pub tool_id: String,
    pub outcome: CallClass,
    pub latency_ms: u64,
    pub finished_at: DateTime<Utc>,
}

/// Receives a record for each executed call. Must not block.
pub trait CallObserver: Send + Sync {
    fn record(&self, record: &CallRecord);
}

/// Observer that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl CallObserver for NoopObserver {
    fn record(&self, _record: &CallRecord) {}
}

// =============================================================================
// Health grading
// =============================================================================

/// Health grade of a tool or of the whole server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

impl HealthStatus {
    fn severity(self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 2,
            HealthStatus::Unknown => 3,
        }
    }
}

fn worse_status(a: HealthStatus, b: HealthStatus) -> HealthStatus {
    if a.severity() >= b.severity() {
        a
    } else {
        b
    }
}

/// Grading thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Minimum success rate for `Healthy` (default 0.95).
    pub success_rate_healthy: f64,
    /// Minimum success rate for `Degraded` (default 0.80).
    pub success_rate_degraded: f64,
    /// Maximum average latency for `Healthy` (default 2000 ms).
    pub latency_healthy_ms: u64,
    /// Maximum average latency for `Degraded` (default 5000 ms).
    pub latency_degraded_ms: u64,
    /// Calls needed before a tool is graded at all (default 5).
    pub min_calls_for_assessment: usize,
    /// Records kept per tool (default 100).
    pub window_size: usize,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            success_rate_healthy: 0.95,
            success_rate_degraded: 0.80,
            latency_healthy_ms: 2000,
            latency_degraded_ms: 5000,
            min_calls_for_assessment: 5,
            window_size: 100,
        }
    }
}

#[derive(Debug)]
struct ToolWindow {
    records: VecDeque<(CallClass, u64)>,
    last_call: DateTime<Utc>,
}

impl ToolWindow {
    fn push(&mut self, capacity: usize, record: &CallRecord) {
        if self.records.len() >= capacity {
            self.records.pop_front();
        }
        self.records.push_back((record.outcome, record.latency_ms));
        self.last_call = record.finished_at;
    }

    fn success_rate(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        let ok = self.records.iter().filter(|(c, _)| c.is_success()).count();
        ok as f64 / self.records.len() as f64
    }

    fn avg_latency_ms(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.records.iter().map(|(_, ms)| ms).sum();
        sum as f64 / self.records.len() as f64
    }

    fn failures(&self) -> usize {
        self.records.iter().filter(|(c, _)| !c.is_success()).count()
    }
}

/// Health report for a single tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolHealthReport {
    pub tool_id: String,
    pub status: HealthStatus,
    pub success_rate: f64,
    pub avg_latency_ms: f64,
    pub total_calls: usize,
    pub failures: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_call: Option<DateTime<Utc>>,
    pub issues: Vec<String>,
}

/// Server-wide health report, served by `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct SystemHealthReport {
    pub status: HealthStatus,
    pub tools: Vec<ToolHealthReport>,
    pub summary: HealthSummary,
}

/// Counts by health status.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HealthSummary {
    pub healthy: usize,
    pub degraded: usize,
    pub unhealthy: usize,
    pub unknown: usize,
}

// =============================================================================
// Tracker
// =============================================================================

/// Sliding-window health tracker. Shared across concurrent calls; the lock
/// is never held across an await.
#[derive(Debug)]
pub struct ToolHealthTracker {
    config: HealthConfig,
    windows: Mutex<HashMap<String, ToolWindow>>,
    registered: Vec<String>,
}

impl ToolHealthTracker {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
            registered: Vec::new(),
        }
    }

    /// Tools to report on even before their first call.
    pub fn with_registered_tools(mut self, tool_ids: Vec<String>) -> Self {
        self.registered = tool_ids;
        self
    }

    pub fn check_tool_health(&self, tool_id: &str) -> ToolHealthReport {
        let windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        self.grade(tool_id, windows.get(tool_id))
    }

    pub fn check_system_health(&self) -> SystemHealthReport {
        let windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);

        let mut ids: Vec<&str> = self.registered.iter().map(String::as_str).collect();
        ids.extend(windows.keys().map(String::as_str));
        ids.sort_unstable();
        ids.dedup();

        let tools: Vec<ToolHealthReport> = ids
            .iter()
            .map(|id| self.grade(id, windows.get(*id)))
            .collect();

        let mut summary = HealthSummary::default();
        for report in &tools {
            match report.status {
                HealthStatus::Healthy => summary.healthy += 1,
                HealthStatus::Degraded => summary.degraded += 1,
                HealthStatus::Unhealthy => summary.unhealthy += 1,
                HealthStatus::Unknown => summary.unknown += 1,
            }
        }

        // Unknown tools don't drag the server down.
        let status = tools
            .iter()
            .map(|r| r.status)
            .filter(|s| *s != HealthStatus::Unknown)
            .reduce(worse_status)
            .unwrap_or(HealthStatus::Unknown);

        SystemHealthReport {
            status,
            tools,
            summary,
        }
    }

    /// Failure counts per outcome class, most frequent first.
    pub fn error_patterns(&self, tool_id: &str) -> Vec<(CallClass, usize)> {
        let windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(window) = windows.get(tool_id) else {
            return Vec::new();
        };
        let mut counts: HashMap<CallClass, usize> = HashMap::new();
        for (class, _) in window.records.iter().filter(|(c, _)| !c.is_success()) {
            *counts.entry(*class).or_default() += 1;
        }
        let mut patterns: Vec<(CallClass, usize)> = counts.into_iter().collect();
        patterns.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.label().cmp(b.0.label())));
        patterns
    }

    fn grade(&self, tool_id: &str, window: Option<&ToolWindow>) -> ToolHealthReport {
        let Some(window) = window else {
            return ToolHealthReport {
                tool_id: tool_id.to_string(),
                status: HealthStatus::Unknown,
                success_rate: 0.0,
                avg_latency_ms: 0.0,
                total_calls: 0,
                failures: 0,
                last_call: None,
                issues: vec!["No execution history".to_string()],
            };
        };

        let total = window.records.len();
        let success_rate = window.success_rate();
        let avg_latency = window.avg_latency_ms();
        let mut issues = Vec::new();

        let status = if total < self.config.min_calls_for_assessment {
            issues.push(format!(
                "Insufficient data ({}/{})",
                total, self.config.min_calls_for_assessment
            ));
            HealthStatus::Unknown
        } else {
            let by_rate = if success_rate >= self.config.success_rate_healthy {
                HealthStatus::Healthy
            } else if success_rate >= self.config.success_rate_degraded {
                HealthStatus::Degraded
            } else {
                HealthStatus::Unhealthy
            };
            let by_latency = if avg_latency <= self.config.latency_healthy_ms as f64 {
                HealthStatus::Healthy
            } else if avg_latency <= self.config.latency_degraded_ms as f64 {
                HealthStatus::Degraded
            } else {
                HealthStatus::Unhealthy
            };

            if success_rate < self.config.success_rate_healthy {
                issues.push(format!(
                    "Success rate {:.1}% below {:.0}% threshold",
                    success_rate * 100.0,
                    self.config.success_rate_healthy * 100.0,
                ));
            }
            if avg_latency > self.config.latency_healthy_ms as f64 {
                issues.push(format!(
                    "Avg latency {:.0}ms exceeds {}ms threshold",
                    avg_latency, self.config.latency_healthy_ms,
                ));
            }
            worse_status(by_rate, by_latency)
        };

        ToolHealthReport {
            tool_id: tool_id.to_string(),
            status,
            success_rate,
            avg_latency_ms: avg_latency,
            total_calls: total,
            failures: window.failures(),
            last_call: Some(window.last_call),
            issues,
        }
    }
}

impl Default for ToolHealthTracker {
    fn default() -> Self {
        Self::new(HealthConfig::default())
    }
}

impl CallObserver for ToolHealthTracker {
    fn record(&self, record: &CallRecord) {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        windows
            .entry(record.tool_id.clone())
            .or_insert_with(|| ToolWindow {
                records: VecDeque::with_capacity(self.config.window_size),
                last_call: record.finished_at,
            })
            .push(self.config.window_size, record);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> ToolHealthTracker {
        ToolHealthTracker::new(HealthConfig {
            min_calls_for_assessment: 3,
            ..Default::default()
        })
    }

    fn observe(tracker: &ToolHealthTracker, tool: &str, outcome: CallClass, latency_ms: u64) {
        tracker.record(&CallRecord {
            tool_id: tool.to_string(),
            outcome,
            latency_ms,
            finished_at: Utc::now(),
        });
    }

    #[test]
    fn test_unknown_without_history() {
        let report = tracker().check_tool_health("add");
        assert_eq!(report.status, HealthStatus::Unknown);
        assert_eq!(report.total_calls, 0);
        assert!(report.last_call.is_none());
    }

    #[test]
    fn test_insufficient_data_is_unknown() {
        let t = tracker();
        observe(&t, "add", CallClass::Success, 10);
        observe(&t, "add", CallClass::Success, 10);
        let report = t.check_tool_health("add");
        assert_eq!(report.status, HealthStatus::Unknown);
        assert_eq!(report.total_calls, 2);
    }

    #[test]
    fn test_healthy_tool() {
        let t = tracker();
        for _ in 0..10 {
            observe(&t, "add", CallClass::Success, 100);
        }
        let report = t.check_tool_health("add");
        assert_eq!(report.status, HealthStatus::Healthy);
        assert!((report.avg_latency_ms - 100.0).abs() < f64::EPSILON);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_declared_errors_degrade_success_rate() {
        let t = tracker();
        for _ in 0..8 {
            observe(&t, "fetch", CallClass::Success, 100);
        }
        for _ in 0..2 {
            observe(&t, "fetch", CallClass::ToolError, 100);
        }
        let report = t.check_tool_health("fetch");
        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.failures, 2);
    }

    #[test]
    fn test_slow_tool_is_graded_by_latency() {
        let t = tracker();
        for _ in 0..5 {
            observe(&t, "slow", CallClass::Success, 6000);
        }
        assert_eq!(t.check_tool_health("slow").status, HealthStatus::Unhealthy);
    }

    #[test]
    fn test_window_evicts_old_records() {
        let t = ToolHealthTracker::new(HealthConfig {
            window_size: 5,
            min_calls_for_assessment: 3,
            ..Default::default()
        });
        for _ in 0..5 {
            observe(&t, "add", CallClass::Internal, 10);
        }
        for _ in 0..5 {
            observe(&t, "add", CallClass::Success, 10);
        }
        let report = t.check_tool_health("add");
        assert!((report.success_rate - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_system_report_includes_registered_tools() {
        let t = tracker().with_registered_tools(vec!["add".into(), "echo".into()]);
        for _ in 0..5 {
            observe(&t, "add", CallClass::Success, 10);
        }
        let report = t.check_system_health();
        assert_eq!(report.tools.len(), 2);
        assert_eq!(report.summary.healthy, 1);
        assert_eq!(report.summary.unknown, 1);
        assert_eq!(report.status, HealthStatus::Healthy);
    }

    #[test]
    fn test_error_patterns_by_class() {
        let t = tracker();
        observe(&t, "fetch", CallClass::ToolError, 10);
        observe(&t, "fetch", CallClass::ToolError, 10);
        observe(&t, "fetch", CallClass::Internal, 10);
        observe(&t, "fetch", CallClass::Success, 10);

        let patterns = t.error_patterns("fetch");
        assert_eq!(patterns, vec![(CallClass::ToolError, 2), (CallClass::Internal, 1)]);
        assert!(t.error_patterns("missing").is_empty());
    }
}
