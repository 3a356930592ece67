use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use crate::core::{BrowserControl, Config, PageDriver};
use crate::errors::Result;
use crate::models::{ScrapingResult, SearchCriteria};
use crate::selectors::{ElementResolver, HealthMonitor, HealthReport, SelectorCatalog};

use super::chrome::ChromeDriver;
use super::extractor::DataExtractor;
use super::form::FormHandler;

/// The page type every search session records health under.
pub const FLIGHT_SEARCH_PAGE: &str = "flight_search_page";

/// One scraping session: a driver, a resolver over the selector catalog, and
/// a shared health monitor. Sessions are independent; run several against
/// separate driver instances and share one monitor between them.
pub struct FlightScraper<D: PageDriver + BrowserControl> {
    driver: Arc<D>,
    resolver: ElementResolver<D>,
    health: Arc<HealthMonitor>,
    config: Config,
    session_id: String,
}

impl FlightScraper<ChromeDriver> {
    /// Launch a Chrome-backed session with the stock Google Flights catalog.
    pub fn launch(config: Config) -> Result<Self> {
        config.validate()?;
        let driver = Arc::new(ChromeDriver::launch(&config.browser)?);
        let health = Arc::new(HealthMonitor::new(config.monitor.clone()));
        Ok(Self::new(
            driver,
            SelectorCatalog::google_flights(),
            health,
            config,
        ))
    }
}

impl<D: PageDriver + BrowserControl> FlightScraper<D> {
    pub fn new(
        driver: Arc<D>,
        catalog: SelectorCatalog,
        health: Arc<HealthMonitor>,
        config: Config,
    ) -> Self {
        let resolver = ElementResolver::new(driver.clone(), catalog, config.resolver.clone());
        let session_id = uuid::Uuid::new_v4().to_string();
        Self {
            driver,
            resolver,
            health,
            config,
            session_id,
        }
    }

    pub fn resolver(&self) -> &ElementResolver<D> {
        &self.resolver
    }

    pub fn health_monitor(&self) -> Arc<HealthMonitor> {
        self.health.clone()
    }

    /// Run one search end to end. Failures come back inside the
    /// [`ScrapingResult`] rather than as errors, and selector health is
    /// recorded on both paths so a broken page still feeds the monitor.
    pub async fn scrape(&self, criteria: &SearchCriteria) -> ScrapingResult {
        let started = Instant::now();
        info!(
            session = %self.session_id,
            origin = %criteria.origin,
            destination = %criteria.destination,
            "starting scrape"
        );

        let outcome = self.run_search(criteria).await;
        self.record_session_health(FLIGHT_SEARCH_PAGE).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(flights) => {
                info!(
                    session = %self.session_id,
                    flights = flights.len(),
                    elapsed_ms,
                    "scrape finished"
                );
                ScrapingResult::succeeded(criteria.clone(), flights, elapsed_ms)
            }
            Err(err) => {
                error!(session = %self.session_id, error = %err, "scrape failed");
                ScrapingResult::failed(criteria.clone(), err.to_string(), elapsed_ms)
            }
        }
    }

    async fn run_search(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<crate::models::FlightOffer>> {
        let form = FormHandler::new(self.driver.as_ref(), &self.resolver, &self.config);
        form.navigate_to_flights(criteria).await?;
        form.fill_search_form(criteria).await?;
        form.trigger_search().await?;

        let extractor = DataExtractor::new(self.driver.as_ref(), &self.resolver, &self.config);
        extractor.extract_flights(criteria).await
    }

    /// Hand the resolver's accumulated monitoring to the health monitor
    /// under the given page type.
    pub async fn record_session_health(&self, page_type: &str) {
        let monitoring = self.resolver.take_monitoring().await;
        if monitoring.is_empty() {
            return;
        }
        self.health.record_page_health(page_type, &monitoring);
    }

    pub fn health_report(&self) -> HealthReport {
        self.health.get_health_report()
    }
}
