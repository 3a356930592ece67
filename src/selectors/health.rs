use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::MonitorConfig;

use super::monitoring::{ElementMonitoring, FailureCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Critical,
    Warning,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Critical => "critical",
            AlertSeverity::Warning => "warning",
        }
    }
}

/// Operator-facing alert raised when a page health record crosses a
/// threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureAlert {
    pub severity: AlertSeverity,
    pub page_type: String,
    pub elements: Vec<String>,
    /// Observed error messages from the failing attempts.
    pub failure_patterns: Vec<String>,
    pub recommended_actions: Vec<String>,
    pub first_failure: DateTime<Utc>,
    pub last_failure: DateTime<Utc>,
}

/// Aggregated selector health for one page type. Only the latest record per
/// page type is retained; alerts accumulate separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageHealthRecord {
    pub page_type: String,
    pub overall_success_rate: f64,
    pub total_elements: usize,
    pub successful_elements: usize,
    /// Logical elements that failed every candidate.
    pub critical_failures: Vec<String>,
    pub structure_changed: bool,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverallHealth {
    pub average_success_rate: f64,
    pub min_success_rate: f64,
    pub max_success_rate: f64,
    pub pages_monitored: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub overall_health: OverallHealth,
    pub critical_issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct HealthState {
    pages: HashMap<String, PageHealthRecord>,
    alerts: HashMap<String, VecDeque<FailureAlert>>,
}

/// Aggregates per-element monitoring into page health records and raises
/// alerts when selector reliability degrades.
///
/// One monitor instance serves the whole process; construct it explicitly
/// and hand it to whichever sessions need it. Internal state sits behind a
/// mutex so concurrent sessions can record safely; recording is infrequent
/// and cheap, so there is no finer-grained locking.
#[derive(Debug)]
pub struct HealthMonitor {
    thresholds: MonitorConfig,
    state: Mutex<HealthState>,
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}

impl HealthMonitor {
    pub fn new(thresholds: MonitorConfig) -> Self {
        Self {
            thresholds,
            state: Mutex::new(HealthState::default()),
        }
    }

    /// Fold one page's element monitoring into the health history and raise
    /// any threshold alerts. Monitoring must never destabilize the scrape it
    /// observes: this method cannot fail and recovers a poisoned lock.
    pub fn record_page_health(
        &self,
        page_type: &str,
        monitoring: &HashMap<String, ElementMonitoring>,
    ) {
        let total = monitoring.len();
        let successful = monitoring.values().filter(|m| m.final_success).count();
        let overall_success_rate = if total == 0 {
            0.0
        } else {
            successful as f64 / total as f64
        };

        let mut critical_failures: Vec<String> = monitoring
            .values()
            .filter(|m| !m.final_success)
            .map(|m| m.element_name.clone())
            .collect();
        critical_failures.sort();

        let structure_changed = self.detect_structure_change(monitoring);

        let record = PageHealthRecord {
            page_type: page_type.to_string(),
            overall_success_rate,
            total_elements: total,
            successful_elements: successful,
            critical_failures,
            structure_changed,
            recorded_at: Utc::now(),
        };

        if structure_changed {
            warn!(
                page = page_type,
                success_rate = overall_success_rate,
                "failure pattern suggests the page structure changed"
            );
        } else {
            info!(
                page = page_type,
                success_rate = overall_success_rate,
                failed = record.critical_failures.len(),
                "recorded page health"
            );
        }

        let alerts = self.generate_alerts(&record, monitoring);

        let mut state = self.lock_state();
        let page_alerts = state.alerts.entry(page_type.to_string()).or_default();
        for alert in alerts {
            page_alerts.push_back(alert);
        }
        // Retain only the most recent alerts per page type.
        while page_alerts.len() > self.thresholds.max_alerts_per_page {
            page_alerts.pop_front();
        }
        state.pages.insert(page_type.to_string(), record);
    }

    /// A page counts as structurally changed when more than the configured
    /// ratio of its elements carry a `structure_changed` failure or
    /// exhausted several strategies without success. Biased toward false
    /// positives: over-alerting beats silently degrading.
    fn detect_structure_change(
        &self,
        monitoring: &HashMap<String, ElementMonitoring>,
    ) -> bool {
        if monitoring.is_empty() {
            return false;
        }

        let indicators = monitoring
            .values()
            .filter(|m| {
                m.has_failure_category(FailureCategory::StructureChanged)
                    || (!m.final_success
                        && m.total_attempts() >= self.thresholds.exhausted_attempts_threshold)
            })
            .count();

        indicators as f64 / monitoring.len() as f64 > self.thresholds.structure_change_ratio
    }

    fn generate_alerts(
        &self,
        record: &PageHealthRecord,
        monitoring: &HashMap<String, ElementMonitoring>,
    ) -> Vec<FailureAlert> {
        let mut alerts = Vec::new();
        let now = Utc::now();

        if record.overall_success_rate < self.thresholds.critical_success_rate {
            let (first, last) = monitoring
                .values()
                .filter_map(|m| m.failure_window())
                .fold(None::<(DateTime<Utc>, DateTime<Utc>)>, |acc, (f, l)| {
                    Some(match acc {
                        Some((af, al)) => (af.min(f), al.max(l)),
                        None => (f, l),
                    })
                })
                .unwrap_or((now, now));

            alerts.push(FailureAlert {
                severity: AlertSeverity::Critical,
                page_type: record.page_type.clone(),
                elements: record.critical_failures.clone(),
                failure_patterns: monitoring
                    .values()
                    .flat_map(|m| m.failure_messages())
                    .collect(),
                recommended_actions: vec![
                    "review page structure changes".to_string(),
                    "update selector configurations".to_string(),
                    "check for upstream UI updates".to_string(),
                ],
                first_failure: first,
                last_failure: last,
            });
        }

        for element in &record.critical_failures {
            let element_monitoring = monitoring.get(element);
            let (first, last) = element_monitoring
                .and_then(|m| m.failure_window())
                .unwrap_or((now, now));

            alerts.push(FailureAlert {
                severity: AlertSeverity::Warning,
                page_type: record.page_type.clone(),
                elements: vec![element.clone()],
                failure_patterns: element_monitoring
                    .map(|m| m.failure_messages())
                    .unwrap_or_default(),
                recommended_actions: vec![
                    format!("review {} selector configuration", element),
                    format!("test {} selectors manually", element),
                    format!("add more fallback selectors for {}", element),
                ],
                first_failure: first,
                last_failure: last,
            });
        }

        alerts
    }

    /// Aggregate a report across every recorded page. Pure read.
    pub fn get_health_report(&self) -> HealthReport {
        let state = self.lock_state();

        let rates: Vec<f64> = state
            .pages
            .values()
            .map(|r| r.overall_success_rate)
            .collect();
        let pages_monitored = rates.len();
        let average = if rates.is_empty() {
            0.0
        } else {
            rates.iter().sum::<f64>() / rates.len() as f64
        };
        let min = rates.iter().copied().fold(f64::INFINITY, f64::min);
        let max = rates.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let mut critical_issues = Vec::new();
        let mut page_types: Vec<&String> = state.pages.keys().collect();
        page_types.sort();
        for page_type in page_types {
            let record = &state.pages[page_type];
            if record.structure_changed {
                critical_issues.push(format!(
                    "page structure change detected on {}",
                    page_type
                ));
            }
            if record.overall_success_rate < self.thresholds.low_success_rate {
                critical_issues.push(format!(
                    "low selector success rate on {}: {:.0}%",
                    page_type,
                    record.overall_success_rate * 100.0
                ));
            }
        }

        let recommendations = if pages_monitored > 0
            && average < self.thresholds.recommend_below_rate
        {
            vec![
                "audit failing selectors against the live page markup".to_string(),
                "promote working fallback selectors to the semantic group".to_string(),
                "refresh the selector catalog for recently redesigned pages".to_string(),
            ]
        } else {
            Vec::new()
        };

        HealthReport {
            overall_health: OverallHealth {
                average_success_rate: average,
                min_success_rate: if min.is_finite() { min } else { 0.0 },
                max_success_rate: if max.is_finite() { max } else { 0.0 },
                pages_monitored,
            },
            critical_issues,
            recommendations,
            generated_at: Utc::now(),
        }
    }

    pub fn latest_record(&self, page_type: &str) -> Option<PageHealthRecord> {
        self.lock_state().pages.get(page_type).cloned()
    }

    pub fn alerts(&self, page_type: &str) -> Vec<FailureAlert> {
        self.lock_state()
            .alerts
            .get(page_type)
            .map(|a| a.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop alert history for one page type, or for all when `None`.
    pub fn clear_alerts(&self, page_type: Option<&str>) {
        let mut state = self.lock_state();
        match page_type {
            Some(page) => {
                state.alerts.remove(page);
            }
            None => state.alerts.clear(),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, HealthState> {
        // A panic while holding the lock must not take monitoring down with
        // it; the poisoned state is still internally consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selectors::catalog::SelectorStrategy;
    use crate::selectors::monitoring::SelectorAttempt;

    fn success(name: &str) -> ElementMonitoring {
        let mut m = ElementMonitoring::new(name);
        m.record_attempt(SelectorAttempt::succeeded("#ok", SelectorStrategy::Semantic, 10));
        m.mark_success("#ok", SelectorStrategy::Semantic);
        m.finish(10);
        m
    }

    fn failure(name: &str, attempts: usize, error: &str) -> ElementMonitoring {
        let mut m = ElementMonitoring::new(name);
        for i in 0..attempts {
            m.record_attempt(SelectorAttempt::failed(
                &format!("#cand-{}", i),
                SelectorStrategy::Semantic,
                error,
                None,
                25,
            ));
        }
        m.finish(25 * attempts as u64);
        m
    }

    fn page(elements: Vec<ElementMonitoring>) -> HashMap<String, ElementMonitoring> {
        elements
            .into_iter()
            .map(|m| (m.element_name.clone(), m))
            .collect()
    }

    #[test]
    fn success_rate_counts_failed_elements() {
        let monitor = HealthMonitor::default();
        monitor.record_page_health(
            "search_page",
            &page(vec![
                success("a"),
                success("b"),
                success("c"),
                failure("d", 1, "timeout waiting for selector: #d"),
            ]),
        );

        let record = monitor.latest_record("search_page").unwrap();
        assert!((record.overall_success_rate - 0.75).abs() < 1e-9);
        assert_eq!(record.critical_failures, vec!["d".to_string()]);
    }

    #[test]
    fn empty_page_has_zero_rate_and_no_structure_change() {
        let monitor = HealthMonitor::default();
        monitor.record_page_health("empty_page", &HashMap::new());

        let record = monitor.latest_record("empty_page").unwrap();
        assert_eq!(record.overall_success_rate, 0.0);
        assert!(!record.structure_changed);
    }

    #[test]
    fn low_success_rate_raises_critical_alert() {
        let monitor = HealthMonitor::default();
        // 2 of 5 succeed: 0.4 < 0.5.
        monitor.record_page_health(
            "search_page",
            &page(vec![
                success("a"),
                success("b"),
                failure("c", 1, "timeout"),
                failure("d", 1, "timeout"),
                failure("e", 1, "timeout"),
            ]),
        );

        let alerts = monitor.alerts("search_page");
        assert!(alerts
            .iter()
            .any(|a| a.severity == AlertSeverity::Critical));
        // One warning per failed element on top of the page-level critical.
        assert_eq!(
            alerts
                .iter()
                .filter(|a| a.severity == AlertSeverity::Warning)
                .count(),
            3
        );
    }

    #[test]
    fn healthy_page_raises_no_alerts() {
        let monitor = HealthMonitor::default();
        let mut elements = vec![failure("j", 1, "timeout")];
        for name in ["a", "b", "c", "d", "e", "f", "g", "h", "i"] {
            elements.push(success(name));
        }
        // 9 of 10 succeed: 0.9, one warning for the failing element only.
        monitor.record_page_health("results_page", &page(elements));
        let alerts = monitor.alerts("results_page");
        assert!(alerts.iter().all(|a| a.severity == AlertSeverity::Warning));
        assert_eq!(alerts.len(), 1);

        // A fully healthy page emits nothing at all.
        let monitor = HealthMonitor::default();
        monitor.record_page_health(
            "results_page",
            &page(vec![success("a"), success("b")]),
        );
        assert!(monitor.alerts("results_page").is_empty());
    }

    #[test]
    fn structure_change_requires_majority_of_indicators() {
        let monitor = HealthMonitor::default();

        // 3 of 4 elements exhausted 3+ attempts: 75% > 50%.
        monitor.record_page_health(
            "search_page",
            &page(vec![
                success("a"),
                failure("b", 3, "timeout"),
                failure("c", 3, "timeout"),
                failure("d", 4, "timeout"),
            ]),
        );
        assert!(monitor.latest_record("search_page").unwrap().structure_changed);

        // 1 of 4: 25% is under the threshold.
        monitor.record_page_health(
            "search_page",
            &page(vec![
                success("a"),
                success("b"),
                success("c"),
                failure("d", 3, "timeout"),
            ]),
        );
        assert!(!monitor.latest_record("search_page").unwrap().structure_changed);
    }

    #[test]
    fn classified_structure_failures_count_even_with_few_attempts() {
        let monitor = HealthMonitor::default();
        monitor.record_page_health(
            "search_page",
            &page(vec![
                failure("a", 1, "unexpected markup shape"),
                failure("b", 1, "unexpected markup shape"),
                success("c"),
            ]),
        );
        assert!(monitor.latest_record("search_page").unwrap().structure_changed);
    }

    #[test]
    fn record_page_health_end_to_end() {
        let monitor = HealthMonitor::default();
        monitor.record_page_health(
            "search_page",
            &page(vec![
                success("elem1"),
                failure("elem2", 3, "layout mismatch while locating element"),
                failure("elem3", 3, "layout mismatch while locating element"),
            ]),
        );

        let record = monitor.latest_record("search_page").unwrap();
        assert!((record.overall_success_rate - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(
            record.critical_failures,
            vec!["elem2".to_string(), "elem3".to_string()]
        );
        assert!(record.structure_changed);

        let alerts = monitor.alerts("search_page");
        let criticals = alerts
            .iter()
            .filter(|a| a.severity == AlertSeverity::Critical)
            .count();
        let warnings = alerts
            .iter()
            .filter(|a| a.severity == AlertSeverity::Warning)
            .count();
        assert_eq!(criticals, 1);
        assert_eq!(warnings, 2);

        let warning = alerts
            .iter()
            .find(|a| a.severity == AlertSeverity::Warning)
            .unwrap();
        assert!(!warning.failure_patterns.is_empty());
        assert!(warning
            .recommended_actions
            .iter()
            .any(|r| r.contains(&warning.elements[0])));
    }

    #[test]
    fn latest_record_wins_but_alerts_accumulate() {
        let monitor = HealthMonitor::default();
        monitor.record_page_health("search_page", &page(vec![failure("a", 1, "timeout")]));
        monitor.record_page_health("search_page", &page(vec![success("a")]));

        let record = monitor.latest_record("search_page").unwrap();
        assert_eq!(record.overall_success_rate, 1.0);
        // Alerts from the first recording survive the overwrite.
        assert!(!monitor.alerts("search_page").is_empty());
    }

    #[test]
    fn alert_history_is_bounded() {
        let monitor = HealthMonitor::new(MonitorConfig {
            max_alerts_per_page: 5,
            ..MonitorConfig::default()
        });
        for _ in 0..10 {
            monitor.record_page_health("search_page", &page(vec![failure("a", 1, "timeout")]));
        }
        assert_eq!(monitor.alerts("search_page").len(), 5);

        monitor.clear_alerts(Some("search_page"));
        assert!(monitor.alerts("search_page").is_empty());
    }

    #[test]
    fn report_aggregates_across_pages() {
        let monitor = HealthMonitor::default();
        monitor.record_page_health(
            "good_page",
            &page(vec![success("a"), success("b")]),
        );
        monitor.record_page_health(
            "bad_page",
            &page(vec![
                failure("a", 3, "timeout"),
                failure("b", 3, "timeout"),
                failure("c", 3, "timeout"),
                success("d"),
            ]),
        );

        let report = monitor.get_health_report();
        assert_eq!(report.overall_health.pages_monitored, 2);
        assert!((report.overall_health.average_success_rate - 0.625).abs() < 1e-9);
        assert_eq!(report.overall_health.min_success_rate, 0.25);
        assert_eq!(report.overall_health.max_success_rate, 1.0);

        // bad_page: structure change + sub-0.3 rate.
        assert_eq!(report.critical_issues.len(), 2);
        assert!(!report.recommendations.is_empty());

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["overall_health"]["average_success_rate"].is_number());
    }

    #[test]
    fn report_for_healthy_history_has_no_recommendations() {
        let monitor = HealthMonitor::default();
        monitor.record_page_health("a_page", &page(vec![success("x")]));

        let report = monitor.get_health_report();
        assert!(report.critical_issues.is_empty());
        assert!(report.recommendations.is_empty());

        let empty_report = HealthMonitor::default().get_health_report();
        assert_eq!(empty_report.overall_health.pages_monitored, 0);
        assert!(empty_report.recommendations.is_empty());
    }
}
