use tracing::{info, warn};

use crate::core::{BrowserControl, Config, PageDriver};
use crate::errors::{Result, ScraperError};
use crate::models::{SearchCriteria, TripType};
use crate::selectors::ElementResolver;
use crate::utils::{format_date_for_input, settle_delay};

/// Drives the search form: navigation, field filling, and search triggering.
/// All element location goes through the resolver; this layer only decides
/// what to do when a logical element cannot be found at all.
pub struct FormHandler<'a, D: PageDriver + BrowserControl> {
    driver: &'a D,
    resolver: &'a ElementResolver<D>,
    config: &'a Config,
}

impl<'a, D: PageDriver + BrowserControl> FormHandler<'a, D> {
    pub fn new(driver: &'a D, resolver: &'a ElementResolver<D>, config: &'a Config) -> Self {
        Self {
            driver,
            resolver,
            config,
        }
    }

    /// Navigate to the flights page for the trip type, falling back to the
    /// plain flights URL when the parameterized one fails to load.
    pub async fn navigate_to_flights(&self, criteria: &SearchCriteria) -> Result<()> {
        let url = match criteria.trip_type {
            TripType::RoundTrip => &self.config.flights.round_trip_url,
            TripType::OneWay => &self.config.flights.base_url,
        };

        info!(%url, "navigating to flights search");
        if let Err(error) = self.try_navigate(url).await {
            warn!(%error, "primary navigation failed, trying fallback URL");
            self.try_navigate(&self.config.flights.fallback_url)
                .await
                .map_err(|fallback_error| {
                    ScraperError::NavigationFailed(format!(
                        "primary and fallback navigation both failed: {} / {}",
                        error, fallback_error
                    ))
                })?;
        }

        // Let the page JS finish wiring up the form.
        settle_delay(self.config.session.action_delay_ms).await;
        Ok(())
    }

    async fn try_navigate(&self, url: &str) -> Result<()> {
        self.driver.navigate(url).await?;
        self.driver
            .wait_for_navigation(self.config.session.navigation_timeout_ms)
            .await
    }

    /// Fill origin, destination and dates. Origin and destination are
    /// required; a missing date field degrades to a click-then-type attempt
    /// before giving up.
    pub async fn fill_search_form(&self, criteria: &SearchCriteria) -> Result<()> {
        info!(
            origin = %criteria.origin,
            destination = %criteria.destination,
            "filling search form"
        );

        if !self
            .resolver
            .fill_logical("origin_input", &criteria.origin)
            .await
        {
            return Err(ScraperError::ElementNotFound(
                "origin input not found with any selector strategy".to_string(),
            ));
        }
        self.confirm_field().await?;

        if !self
            .resolver
            .fill_logical("destination_input", &criteria.destination)
            .await
        {
            return Err(ScraperError::ElementNotFound(
                "destination input not found with any selector strategy".to_string(),
            ));
        }
        self.confirm_field().await?;

        self.fill_date("departure_date", criteria.departure_date)
            .await?;

        if criteria.trip_type == TripType::RoundTrip {
            if let Some(return_date) = criteria.return_date {
                // Missing return field is tolerable; the site sometimes
                // infers it from the trip-type URL.
                if let Err(error) = self.fill_date("return_date", return_date).await {
                    warn!(%error, "could not fill return date, continuing");
                }
            }
        }

        settle_delay(self.config.session.action_delay_ms).await;
        Ok(())
    }

    /// Commit the focused field so the autocomplete dropdown closes.
    async fn confirm_field(&self) -> Result<()> {
        self.driver.press_key("Enter").await?;
        settle_delay(self.config.session.action_delay_ms).await;
        Ok(())
    }

    async fn fill_date(&self, logical_name: &str, date: chrono::NaiveDate) -> Result<()> {
        let formatted = format_date_for_input(date);

        if self.resolver.fill_logical(logical_name, &formatted).await {
            self.confirm_field().await?;
            return Ok(());
        }

        // Some date widgets only accept keyboard input after a click.
        warn!(
            element = logical_name,
            "direct fill failed, trying click-then-type"
        );
        if self.resolver.click_logical(logical_name).await {
            settle_delay(self.config.session.action_delay_ms).await;
            for ch in formatted.chars() {
                self.driver.press_key(&ch.to_string()).await?;
            }
            self.confirm_field().await?;
            return Ok(());
        }

        Err(ScraperError::ElementNotFound(format!(
            "could not interact with {} field",
            logical_name
        )))
    }

    /// Trigger the search, falling back to the Enter key when the button
    /// cannot be resolved, then validate that the results URL loaded.
    pub async fn trigger_search(&self) -> Result<()> {
        info!("triggering flight search");

        let clicked = self.resolver.click_logical("search_button").await;
        if !clicked {
            warn!("search button not resolved, falling back to Enter key");
            self.driver.press_key("Enter").await?;
        }

        settle_delay(self.config.session.action_delay_ms).await;
        self.driver
            .wait_for_navigation(self.config.session.navigation_timeout_ms)
            .await?;

        let url = self.driver.current_url().await?;
        if url.contains("search") {
            info!(%url, "search triggered");
        } else {
            // Landing elsewhere usually means the wrong button got clicked.
            warn!(%url, "post-search URL does not look like a results page");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selectors::{CatalogEntry, SelectorCatalog};
    use crate::testing::{MockElementSpec, MockPage};
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn search_page() -> MockPage {
        MockPage::new()
            .with_element("#from", MockElementSpec::interactable(""))
            .with_element("#to", MockElementSpec::interactable(""))
            .with_element("#depart", MockElementSpec::interactable(""))
            .with_element("#return", MockElementSpec::interactable(""))
            .with_element("#search", MockElementSpec::interactable("Search"))
            .with_url("https://flights.test/search?q=1")
    }

    fn catalog() -> SelectorCatalog {
        SelectorCatalog::new()
            .with_entry("origin_input", CatalogEntry::new().semantic(["#from"]))
            .with_entry("destination_input", CatalogEntry::new().semantic(["#to"]))
            .with_entry("departure_date", CatalogEntry::new().semantic(["#depart"]))
            .with_entry("return_date", CatalogEntry::new().semantic(["#return"]))
            .with_entry("search_button", CatalogEntry::new().semantic(["#search"]))
    }

    fn fast_config() -> Config {
        let mut config = Config::default();
        config.resolver.default_timeout_ms = 200;
        config.resolver.capture_dom_context = false;
        config.session.action_delay_ms = 0;
        config.session.navigation_timeout_ms = 100;
        config
    }

    #[tokio::test]
    async fn fills_round_trip_form_and_triggers_search() {
        let driver = Arc::new(search_page());
        let config = fast_config();
        let resolver = ElementResolver::new(driver.clone(), catalog(), config.resolver.clone());
        let form = FormHandler::new(driver.as_ref(), &resolver, &config);

        let criteria = SearchCriteria::round_trip(
            "LAX",
            "JFK",
            NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 9, 8).unwrap(),
        );

        form.navigate_to_flights(&criteria).await.unwrap();
        form.fill_search_form(&criteria).await.unwrap();
        form.trigger_search().await.unwrap();

        let filled = driver.filled().await;
        assert!(filled.contains(&("#from".to_string(), "LAX".to_string())));
        assert!(filled.contains(&("#to".to_string(), "JFK".to_string())));
        assert!(filled.contains(&("#depart".to_string(), "2026-09-01".to_string())));
        assert!(filled.contains(&("#return".to_string(), "2026-09-08".to_string())));
        assert_eq!(driver.clicked().await, vec!["#search".to_string()]);
        assert_eq!(
            driver.navigations().await,
            vec![Config::default().flights.round_trip_url]
        );
    }

    #[tokio::test]
    async fn missing_origin_field_is_fatal() {
        let driver = Arc::new(MockPage::new());
        let config = fast_config();
        let resolver = ElementResolver::new(driver.clone(), catalog(), config.resolver.clone());
        let form = FormHandler::new(driver.as_ref(), &resolver, &config);

        let criteria =
            SearchCriteria::one_way("LAX", "JFK", NaiveDate::from_ymd_opt(2026, 9, 1).unwrap());

        let result = form.fill_search_form(&criteria).await;
        assert!(matches!(result, Err(ScraperError::ElementNotFound(_))));
    }

    #[tokio::test]
    async fn search_trigger_falls_back_to_enter_key() {
        // No search button anywhere on the page.
        let driver = Arc::new(
            MockPage::new().with_url("https://flights.test/search?q=1"),
        );
        let config = fast_config();
        let resolver = ElementResolver::new(driver.clone(), catalog(), config.resolver.clone());
        let form = FormHandler::new(driver.as_ref(), &resolver, &config);

        form.trigger_search().await.unwrap();
        assert_eq!(driver.keys_pressed().await, vec!["Enter".to_string()]);
    }
}
