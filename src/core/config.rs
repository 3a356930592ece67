use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub browser: BrowserConfig,
    pub resolver: ResolverConfig,
    pub monitor: MonitorConfig,
    pub flights: FlightsConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport: Viewport,
    pub user_agent: Option<String>,
    pub disable_images: bool,
    pub args: Vec<String>,
    pub timeout_ms: u64,
}

/// Tuning for the element resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Total timeout budget per resolution call, split across strategy
    /// groups and their candidates.
    pub default_timeout_ms: u64,
    /// Capture a truncated DOM snippet when a candidate fails, for
    /// diagnostics.
    pub capture_dom_context: bool,
    pub dom_context_max_chars: usize,
}

/// Thresholds for health aggregation and alerting. The numeric defaults
/// mirror long-observed scraping behaviour; they are configuration, not law.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Below this overall success rate a page gets a critical alert.
    pub critical_success_rate: f64,
    /// Below this rate a page is listed as a critical issue in the report.
    pub low_success_rate: f64,
    /// Below this average rate the report carries recommendations.
    pub recommend_below_rate: f64,
    /// Indicator ratio above which a page counts as structurally changed.
    pub structure_change_ratio: f64,
    /// A failed element with at least this many attempts counts as a
    /// structure-change indicator even without a classified failure.
    pub exhausted_attempts_threshold: usize,
    /// Most recent alerts retained per page type.
    pub max_alerts_per_page: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightsConfig {
    pub base_url: String,
    pub round_trip_url: String,
    pub fallback_url: String,
    /// How long to wait for flight results to appear after a search.
    pub results_timeout_ms: u64,
    pub max_results: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub navigation_timeout_ms: u64,
    /// Pause after form actions so the page JS can settle.
    pub action_delay_ms: u64,
    pub retry_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser: BrowserConfig::default(),
            resolver: ResolverConfig::default(),
            monitor: MonitorConfig::default(),
            flights: FlightsConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport::default(),
            user_agent: Some(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ),
            disable_images: false,
            args: vec![],
            timeout_ms: 30_000,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 10_000,
            capture_dom_context: true,
            dom_context_max_chars: 300,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            critical_success_rate: 0.5,
            low_success_rate: 0.3,
            recommend_below_rate: 0.7,
            structure_change_ratio: 0.5,
            exhausted_attempts_threshold: 3,
            max_alerts_per_page: 100,
        }
    }
}

impl Default for FlightsConfig {
    fn default() -> Self {
        Self {
            base_url:
                "https://www.google.com/travel/flights?tfs=CBwQARoAQAFIAXABggELCP___________wGYAQI&tfu=KgIIAw"
                    .to_string(),
            round_trip_url:
                "https://www.google.com/travel/flights?tfs=CBwQARoOagwIAhIIL20vMGQ5anIaDnIMCAISCC9tLzBkOWpyQAFIAXABggELCP___________wGYAQE&tfu=KgIIAg"
                    .to_string(),
            fallback_url: "https://www.google.com/travel/flights".to_string(),
            results_timeout_ms: 10_000,
            max_results: 50,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: 60_000,
            action_delay_ms: 1_500,
            retry_attempts: 3,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1366,
            height: 768,
        }
    }
}

impl Config {
    /// Reject configurations that would fail deep inside a scrape.
    pub fn validate(&self) -> crate::errors::Result<()> {
        use crate::errors::ScraperError;

        for (name, value) in [
            ("base_url", &self.flights.base_url),
            ("round_trip_url", &self.flights.round_trip_url),
            ("fallback_url", &self.flights.fallback_url),
        ] {
            url::Url::parse(value).map_err(|e| {
                ScraperError::ConfigurationError(format!("invalid {}: {}", name, e))
            })?;
        }

        for (name, value) in [
            ("critical_success_rate", self.monitor.critical_success_rate),
            ("low_success_rate", self.monitor.low_success_rate),
            ("recommend_below_rate", self.monitor.recommend_below_rate),
            ("structure_change_ratio", self.monitor.structure_change_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ScraperError::ConfigurationError(format!(
                    "{} must be within 0.0..=1.0, got {}",
                    name, value
                )));
            }
        }

        if self.flights.max_results == 0 {
            return Err(ScraperError::ConfigurationError(
                "max_results must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_url() {
        let mut config = Config::default();
        config.flights.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let mut config = Config::default();
        config.monitor.structure_change_ratio = 1.5;
        assert!(config.validate().is_err());
    }
}
