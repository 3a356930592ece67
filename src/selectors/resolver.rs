use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::core::{PageDriver, ResolverConfig};

use super::catalog::{SelectorCatalog, SelectorStrategy};
use super::monitoring::{ElementMonitoring, SelectorAttempt};

/// A successfully resolved element together with the selector and strategy
/// that produced it.
#[derive(Debug, Clone)]
pub struct ResolvedElement<E> {
    pub element: E,
    pub selector: String,
    pub strategy: SelectorStrategy,
}

/// Turns logical element names into live page elements by walking the
/// catalog's strategy groups in priority order.
///
/// Resolution is strictly sequential: concurrent DOM queries against a live
/// page race its own JavaScript, so candidates are tried one after another
/// and the first visible+enabled match wins. Every try is recorded as a
/// [`SelectorAttempt`]; the per-element trail is kept until it is drained
/// into the health monitor via [`take_monitoring`](Self::take_monitoring).
pub struct ElementResolver<D: PageDriver> {
    driver: Arc<D>,
    catalog: SelectorCatalog,
    config: ResolverConfig,
    monitoring: RwLock<HashMap<String, ElementMonitoring>>,
}

impl<D: PageDriver> ElementResolver<D> {
    pub fn new(driver: Arc<D>, catalog: SelectorCatalog, config: ResolverConfig) -> Self {
        Self {
            driver,
            catalog,
            config,
            monitoring: RwLock::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &SelectorCatalog {
        &self.catalog
    }

    /// Resolve with the configured default timeout budget.
    pub async fn resolve(&self, logical_name: &str) -> Option<ResolvedElement<D::Element>> {
        self.resolve_with_timeout(logical_name, self.config.default_timeout_ms)
            .await
    }

    /// Resolve a logical element within a total timeout budget.
    ///
    /// The budget is split evenly across the untried strategy groups, and a
    /// group's share is split evenly across its untried candidates, so a
    /// group with many fallbacks does not starve the ones after it. Once the
    /// deadline has passed remaining candidates are still tried (with a zero
    /// wait) so an exhausted resolution reports every candidate.
    ///
    /// `None` is the expected give-up signal, not an exceptional one.
    pub async fn resolve_with_timeout(
        &self,
        logical_name: &str,
        timeout_ms: u64,
    ) -> Option<ResolvedElement<D::Element>> {
        let started = Instant::now();
        let deadline = started + Duration::from_millis(timeout_ms);
        let mut monitoring = ElementMonitoring::new(logical_name);

        let Some(entry) = self.catalog.get(logical_name) else {
            warn!(element = logical_name, "logical element missing from selector catalog");
            monitoring.finish(elapsed_ms(started));
            self.store_monitoring(monitoring).await;
            return None;
        };

        let groups: Vec<(SelectorStrategy, &[String])> = SelectorStrategy::PRIORITY
            .iter()
            .map(|s| (*s, entry.candidates(*s)))
            .filter(|(_, candidates)| !candidates.is_empty())
            .collect();

        if groups.is_empty() {
            warn!(element = logical_name, "selector catalog entry has no candidates");
            monitoring.finish(elapsed_ms(started));
            self.store_monitoring(monitoring).await;
            return None;
        }

        for (group_index, (strategy, candidates)) in groups.iter().enumerate() {
            let untried_groups = (groups.len() - group_index) as u32;
            let group_budget = deadline.saturating_duration_since(Instant::now()) / untried_groups;
            let group_deadline = Instant::now() + group_budget;

            debug!(
                element = logical_name,
                strategy = %strategy,
                candidates = candidates.len(),
                budget_ms = group_budget.as_millis() as u64,
                "trying strategy group"
            );

            for (candidate_index, selector) in candidates.iter().enumerate() {
                let untried = (candidates.len() - candidate_index) as u32;
                let candidate_budget =
                    group_deadline.saturating_duration_since(Instant::now()) / untried;

                let attempt_start = Instant::now();
                match self.try_candidate(selector, candidate_budget).await {
                    Ok(element) => {
                        let took = elapsed_ms(attempt_start);
                        monitoring
                            .record_attempt(SelectorAttempt::succeeded(selector, *strategy, took));
                        monitoring.mark_success(selector, *strategy);
                        monitoring.finish(elapsed_ms(started));

                        info!(
                            element = logical_name,
                            selector = %selector,
                            strategy = %strategy,
                            attempts = monitoring.total_attempts(),
                            "resolved element"
                        );
                        self.store_monitoring(monitoring).await;

                        return Some(ResolvedElement {
                            element,
                            selector: selector.clone(),
                            strategy: *strategy,
                        });
                    }
                    Err(error) => {
                        let took = elapsed_ms(attempt_start);
                        let dom_context = if self.config.capture_dom_context {
                            self.capture_dom_context().await
                        } else {
                            None
                        };
                        debug!(
                            element = logical_name,
                            selector = %selector,
                            strategy = %strategy,
                            error = %error,
                            "selector candidate failed"
                        );
                        monitoring.record_attempt(SelectorAttempt::failed(
                            selector,
                            *strategy,
                            &error,
                            dom_context,
                            took,
                        ));
                    }
                }
            }
        }

        monitoring.finish(elapsed_ms(started));
        warn!(
            element = logical_name,
            attempts = monitoring.total_attempts(),
            elapsed_ms = monitoring.total_elapsed_ms,
            "all selector candidates exhausted"
        );
        self.store_monitoring(monitoring).await;
        None
    }

    /// Wait, query, and gate one candidate. The error string feeds the
    /// failure classifier, so gate failures spell out "not visible" /
    /// "not enabled".
    async fn try_candidate(
        &self,
        selector: &str,
        budget: Duration,
    ) -> std::result::Result<D::Element, String> {
        self.driver
            .wait_for_selector(selector, budget.as_millis() as u64)
            .await
            .map_err(|e| e.to_string())?;

        let element = self
            .driver
            .query_selector(selector)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("element not found after wait: {}", selector))?;

        let visible = self
            .driver
            .is_visible(&element)
            .await
            .map_err(|e| e.to_string())?;
        if !visible {
            return Err(format!("element is not visible: {}", selector));
        }

        let enabled = self
            .driver
            .is_enabled(&element)
            .await
            .map_err(|e| e.to_string())?;
        if !enabled {
            return Err(format!("element is not enabled: {}", selector));
        }

        Ok(element)
    }

    /// Coarse page snapshot for failure diagnostics. Best-effort: a failed
    /// capture never fails the resolution.
    async fn capture_dom_context(&self) -> Option<String> {
        let script = format!(
            "(function() {{ \
                 if (!document.body) return null; \
                 return document.body.innerHTML.substring(0, {}); \
             }})()",
            self.config.dom_context_max_chars
        );

        match self.driver.evaluate(&script).await {
            Ok(value) => value.as_str().map(|s| s.to_string()),
            Err(error) => {
                debug!(%error, "DOM context capture failed");
                None
            }
        }
    }

    /// Resolve and click. Returns `false` instead of an error so callers can
    /// chain their own fallbacks.
    pub async fn click_logical(&self, logical_name: &str) -> bool {
        let Some(resolved) = self.resolve(logical_name).await else {
            return false;
        };
        match self.driver.click(&resolved.element).await {
            Ok(()) => true,
            Err(error) => {
                warn!(element = logical_name, %error, "click failed after resolution");
                false
            }
        }
    }

    /// Resolve and fill with the given value.
    pub async fn fill_logical(&self, logical_name: &str, value: &str) -> bool {
        let Some(resolved) = self.resolve(logical_name).await else {
            return false;
        };
        match self.driver.fill(&resolved.element, value).await {
            Ok(()) => true,
            Err(error) => {
                warn!(element = logical_name, %error, "fill failed after resolution");
                false
            }
        }
    }

    /// Resolve and read trimmed inner text.
    pub async fn read_text_logical(&self, logical_name: &str) -> Option<String> {
        let resolved = self.resolve(logical_name).await?;
        match self.driver.inner_text(&resolved.element).await {
            Ok(text) => Some(text.trim().to_string()),
            Err(error) => {
                warn!(element = logical_name, %error, "text read failed after resolution");
                None
            }
        }
    }

    async fn store_monitoring(&self, monitoring: ElementMonitoring) {
        self.monitoring
            .write()
            .await
            .insert(monitoring.element_name.clone(), monitoring);
    }

    /// Drain the per-element monitoring collected since the last drain.
    /// Called once per page by the session when recording health.
    pub async fn take_monitoring(&self) -> HashMap<String, ElementMonitoring> {
        std::mem::take(&mut *self.monitoring.write().await)
    }

    /// Clone the current monitoring without draining it.
    pub async fn monitoring_snapshot(&self) -> HashMap<String, ElementMonitoring> {
        self.monitoring.read().await.clone()
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selectors::catalog::CatalogEntry;
    use crate::selectors::monitoring::FailureCategory;
    use crate::testing::{MockElementSpec, MockPage};

    fn resolver_for(page: MockPage, catalog: SelectorCatalog) -> ElementResolver<MockPage> {
        let config = ResolverConfig {
            default_timeout_ms: 400,
            capture_dom_context: false,
            dom_context_max_chars: 300,
        };
        ElementResolver::new(Arc::new(page), catalog, config)
    }

    fn entry(semantic: &[&str], class_based: &[&str]) -> CatalogEntry {
        CatalogEntry::new()
            .semantic(semantic.iter().copied())
            .class_based(class_based.iter().copied())
    }

    #[tokio::test]
    async fn semantic_group_short_circuits_later_groups() {
        let page = MockPage::new()
            .with_element(".sem", MockElementSpec::interactable("Search"))
            .with_element(".cls", MockElementSpec::interactable("Search"));
        let catalog =
            SelectorCatalog::new().with_entry("search_button", entry(&[".sem"], &[".cls"]));

        let resolver = resolver_for(page, catalog);
        let resolved = resolver.resolve("search_button").await.unwrap();

        assert_eq!(resolved.selector, ".sem");
        assert_eq!(resolved.strategy, SelectorStrategy::Semantic);

        let monitoring = resolver.monitoring_snapshot().await;
        assert_eq!(monitoring["search_button"].total_attempts(), 1);
    }

    #[tokio::test]
    async fn first_candidate_wins_within_group() {
        let page = MockPage::new()
            .with_element("#a", MockElementSpec::interactable("A"))
            .with_element("#b", MockElementSpec::interactable("B"));
        let catalog =
            SelectorCatalog::new().with_entry("origin_input", entry(&["#a", "#b"], &[]));

        let resolver = resolver_for(page, catalog);
        let resolved = resolver.resolve("origin_input").await.unwrap();
        assert_eq!(resolved.selector, "#a");
    }

    #[tokio::test]
    async fn invisible_element_fails_gate_and_resolution_continues() {
        let page = MockPage::new()
            .with_element(".hidden", MockElementSpec::interactable("x").visible(false))
            .with_element(".shown", MockElementSpec::interactable("x"));
        let catalog =
            SelectorCatalog::new().with_entry("price", entry(&[".hidden", ".shown"], &[]));

        let resolver = resolver_for(page, catalog);
        let resolved = resolver.resolve("price").await.unwrap();
        assert_eq!(resolved.selector, ".shown");

        let monitoring = resolver.monitoring_snapshot().await;
        let record = &monitoring["price"];
        assert_eq!(record.total_attempts(), 2);
        let gate_attempt = &record.attempts[0];
        assert!(!gate_attempt.success);
        assert_eq!(
            gate_attempt.failure_category,
            Some(FailureCategory::Uninteractable)
        );
    }

    #[tokio::test]
    async fn disabled_element_fails_gate() {
        let page = MockPage::new()
            .with_element(".off", MockElementSpec::interactable("x").enabled(false));
        let catalog = SelectorCatalog::new().with_entry("search_button", entry(&[".off"], &[]));

        let resolver = resolver_for(page, catalog);
        assert!(resolver.resolve("search_button").await.is_none());

        let monitoring = resolver.monitoring_snapshot().await;
        assert_eq!(
            monitoring["search_button"].attempts[0].failure_category,
            Some(FailureCategory::Uninteractable)
        );
    }

    #[tokio::test]
    async fn exhaustion_records_every_candidate() {
        let page = MockPage::new();
        let catalog = SelectorCatalog::new().with_entry(
            "flight_results",
            CatalogEntry::new()
                .semantic(["#s1", "#s2"])
                .structural(["#t1"])
                .class_based(["#c1", "#c2"])
                .content_based(["#x1"]),
        );

        let resolver = resolver_for(page, catalog);
        assert!(resolver.resolve("flight_results").await.is_none());

        let monitoring = resolver.monitoring_snapshot().await;
        let record = &monitoring["flight_results"];
        assert!(!record.final_success);
        assert_eq!(record.total_attempts(), 6);
        assert!(record
            .attempts
            .iter()
            .all(|a| a.failure_category == Some(FailureCategory::NotFound)));
    }

    #[tokio::test]
    async fn falls_back_to_class_group_when_semantic_missing() {
        // End-to-end scenario: semantic candidate absent, class candidate
        // present and interactable.
        let page = MockPage::new().with_element(".cls-a", MockElementSpec::interactable("go"));
        let catalog =
            SelectorCatalog::new().with_entry("search_button", entry(&[".sem-a"], &[".cls-a"]));

        let resolver = resolver_for(page, catalog);
        let resolved = resolver.resolve("search_button").await.unwrap();

        assert_eq!(resolved.selector, ".cls-a");
        assert_eq!(resolved.strategy, SelectorStrategy::ClassBased);

        let monitoring = resolver.monitoring_snapshot().await;
        let record = &monitoring["search_button"];
        assert_eq!(record.total_attempts(), 2);
        assert_eq!(
            record.successful_strategy,
            Some(SelectorStrategy::ClassBased)
        );
        assert_eq!(record.successful_selector.as_deref(), Some(".cls-a"));
    }

    #[tokio::test]
    async fn unknown_logical_name_resolves_to_none() {
        let resolver = resolver_for(MockPage::new(), SelectorCatalog::new());
        assert!(resolver.resolve("nonexistent").await.is_none());

        let monitoring = resolver.monitoring_snapshot().await;
        assert!(!monitoring["nonexistent"].final_success);
        assert_eq!(monitoring["nonexistent"].total_attempts(), 0);
    }

    #[tokio::test]
    async fn click_logical_reports_outcome_as_bool() {
        let page = Arc::new(MockPage::new().with_element("#go", MockElementSpec::interactable("Go")));
        let catalog = SelectorCatalog::new().with_entry("search_button", entry(&["#go"], &[]));
        let config = ResolverConfig {
            default_timeout_ms: 400,
            capture_dom_context: false,
            dom_context_max_chars: 300,
        };

        let resolver = ElementResolver::new(page.clone(), catalog, config);
        assert!(resolver.click_logical("search_button").await);
        assert!(!resolver.click_logical("missing_button").await);

        assert_eq!(page.clicked().await, vec!["#go".to_string()]);
    }

    #[tokio::test]
    async fn fill_and_read_text_wrappers() {
        let page = MockPage::new()
            .with_element("#from", MockElementSpec::interactable("  LAX  "));
        let catalog = SelectorCatalog::new().with_entry("origin_input", entry(&["#from"], &[]));

        let resolver = resolver_for(page, catalog);
        assert!(resolver.fill_logical("origin_input", "LAX").await);
        assert_eq!(
            resolver.read_text_logical("origin_input").await.as_deref(),
            Some("LAX")
        );
        assert!(resolver.read_text_logical("absent_field").await.is_none());
    }

    #[tokio::test]
    async fn take_monitoring_drains_the_session() {
        let page = MockPage::new().with_element("#a", MockElementSpec::interactable("a"));
        let catalog = SelectorCatalog::new().with_entry("origin_input", entry(&["#a"], &[]));

        let resolver = resolver_for(page, catalog);
        assert!(resolver.resolve("origin_input").await.is_some());

        let drained = resolver.take_monitoring().await;
        assert_eq!(drained.len(), 1);
        assert!(resolver.monitoring_snapshot().await.is_empty());
    }
}
