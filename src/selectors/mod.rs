pub mod catalog;
pub mod health;
pub mod monitoring;
pub mod resolver;

pub use catalog::{CatalogEntry, SelectorCatalog, SelectorStrategy};
pub use health::{
    AlertSeverity, FailureAlert, HealthMonitor, HealthReport, OverallHealth, PageHealthRecord,
};
pub use monitoring::{categorize_failure, ElementMonitoring, FailureCategory, SelectorAttempt};
pub use resolver::{ElementResolver, ResolvedElement};
