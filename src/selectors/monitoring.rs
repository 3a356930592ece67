use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::SelectorStrategy;

/// Why a selector candidate failed. Classified heuristically from the
/// driver's error text; misclassification is possible and acceptable.
/// `StructureChanged` is the catch-all bucket and doubles as the signal that
/// the page markup likely changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    NotFound,
    Uninteractable,
    StaleElement,
    PermissionDenied,
    StructureChanged,
}

impl FailureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCategory::NotFound => "not_found",
            FailureCategory::Uninteractable => "uninteractable",
            FailureCategory::StaleElement => "stale_element",
            FailureCategory::PermissionDenied => "permission_denied",
            FailureCategory::StructureChanged => "structure_changed",
        }
    }
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a driver error by substring matching on its normalized text.
/// The predicates are ordered; the first match wins.
pub fn categorize_failure(error: &str) -> FailureCategory {
    let text = error.to_lowercase();

    if text.contains("timeout") || text.contains("not found") || text.contains("no element") {
        FailureCategory::NotFound
    } else if text.contains("not interactable")
        || text.contains("not visible")
        || text.contains("not enabled")
    {
        FailureCategory::Uninteractable
    } else if text.contains("stale") || text.contains("detached") {
        FailureCategory::StaleElement
    } else if text.contains("permission") || text.contains("denied") {
        FailureCategory::PermissionDenied
    } else {
        FailureCategory::StructureChanged
    }
}

/// One resolution try against one concrete selector. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorAttempt {
    pub selector: String,
    pub strategy: SelectorStrategy,
    pub success: bool,
    pub failure_category: Option<FailureCategory>,
    pub error_detail: Option<String>,
    /// Truncated markup snapshot captured at failure time, for diagnostics.
    pub dom_context: Option<String>,
    pub elapsed_ms: u64,
    pub attempted_at: DateTime<Utc>,
}

impl SelectorAttempt {
    pub fn succeeded(selector: &str, strategy: SelectorStrategy, elapsed_ms: u64) -> Self {
        Self {
            selector: selector.to_string(),
            strategy,
            success: true,
            failure_category: None,
            error_detail: None,
            dom_context: None,
            elapsed_ms,
            attempted_at: Utc::now(),
        }
    }

    pub fn failed(
        selector: &str,
        strategy: SelectorStrategy,
        error: &str,
        dom_context: Option<String>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            selector: selector.to_string(),
            strategy,
            success: false,
            failure_category: Some(categorize_failure(error)),
            error_detail: Some(error.to_string()),
            dom_context,
            elapsed_ms,
            attempted_at: Utc::now(),
        }
    }
}

/// Everything observed while resolving one logical element: the attempt
/// trail, the winning selector if any, and rollup counters. Owned by the
/// resolver during resolution, then handed to the health monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementMonitoring {
    pub element_name: String,
    pub attempts: Vec<SelectorAttempt>,
    pub successful_selector: Option<String>,
    pub successful_strategy: Option<SelectorStrategy>,
    pub final_success: bool,
    pub total_elapsed_ms: u64,
}

impl ElementMonitoring {
    pub fn new(element_name: impl Into<String>) -> Self {
        Self {
            element_name: element_name.into(),
            attempts: Vec::new(),
            successful_selector: None,
            successful_strategy: None,
            final_success: false,
            total_elapsed_ms: 0,
        }
    }

    pub fn record_attempt(&mut self, attempt: SelectorAttempt) {
        self.attempts.push(attempt);
    }

    pub fn mark_success(&mut self, selector: &str, strategy: SelectorStrategy) {
        self.successful_selector = Some(selector.to_string());
        self.successful_strategy = Some(strategy);
        self.final_success = true;
    }

    pub fn finish(&mut self, total_elapsed_ms: u64) {
        self.total_elapsed_ms = total_elapsed_ms;
    }

    pub fn total_attempts(&self) -> usize {
        self.attempts.len()
    }

    /// Collected error messages from failed attempts, for alert patterns.
    pub fn failure_messages(&self) -> Vec<String> {
        self.attempts
            .iter()
            .filter(|a| !a.success)
            .filter_map(|a| a.error_detail.clone())
            .collect()
    }

    pub fn has_failure_category(&self, category: FailureCategory) -> bool {
        self.attempts
            .iter()
            .any(|a| a.failure_category == Some(category))
    }

    /// Earliest and latest failed-attempt timestamps, if any attempt failed.
    pub fn failure_window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let mut failed = self
            .attempts
            .iter()
            .filter(|a| !a.success)
            .map(|a| a.attempted_at);
        let first = failed.next()?;
        let last = failed.last().unwrap_or(first);
        Some((first, last))
    }
}
