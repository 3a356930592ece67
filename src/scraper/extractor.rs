use chrono::Utc;
use tracing::{debug, info, warn};

use crate::core::{Config, PageDriver};
use crate::errors::{Result, ScraperError};
use crate::models::{FlightOffer, FlightSegment, SearchCriteria};
use crate::selectors::ElementResolver;
use crate::utils::{parse_duration, parse_price, parse_stops, parse_times};

/// Pulls structured flight offers out of the results page.
///
/// The result container is located through the resolver; individual offers
/// are then enumerated with the selector that won and parsed from their
/// text. Parsing from text rather than per-field selectors keeps extraction
/// working across markup shuffles that the field selectors have not caught
/// up with yet.
pub struct DataExtractor<'a, D: PageDriver> {
    driver: &'a D,
    resolver: &'a ElementResolver<D>,
    config: &'a Config,
}

impl<'a, D: PageDriver> DataExtractor<'a, D> {
    pub fn new(driver: &'a D, resolver: &'a ElementResolver<D>, config: &'a Config) -> Self {
        Self {
            driver,
            resolver,
            config,
        }
    }

    pub async fn extract_flights(&self, criteria: &SearchCriteria) -> Result<Vec<FlightOffer>> {
        let Some(container) = self
            .resolver
            .resolve_with_timeout("flight_results", self.config.flights.results_timeout_ms)
            .await
        else {
            return Err(ScraperError::ExtractionFailed(
                "flight results never appeared".to_string(),
            ));
        };

        let rows = self.driver.query_selector_all(&container.selector).await?;
        info!(
            selector = %container.selector,
            strategy = %container.strategy,
            rows = rows.len(),
            "found flight result rows"
        );

        let limit = criteria.max_results.min(self.config.flights.max_results);
        let mut offers = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            if offers.len() >= limit {
                break;
            }
            match self.extract_single_flight(row, criteria).await {
                Ok(Some(offer)) => offers.push(offer),
                Ok(None) => debug!(index, "skipping row with no offer data"),
                Err(error) => {
                    // One bad row must not sink the rest of the page.
                    warn!(index, %error, "failed to extract flight row");
                }
            }
        }

        if offers.is_empty() {
            return Err(ScraperError::ExtractionFailed(
                "result rows were present but none parsed into offers".to_string(),
            ));
        }

        info!(extracted = offers.len(), "extraction complete");
        Ok(offers)
    }

    async fn extract_single_flight(
        &self,
        row: &D::Element,
        criteria: &SearchCriteria,
    ) -> Result<Option<FlightOffer>> {
        let text = self.driver.inner_text(row).await?;
        Ok(parse_flight_text(&text, criteria))
    }
}

/// Parse one result row's text into an offer. Rows without anything
/// price-shaped or time-shaped are ads or section headers, not offers.
pub fn parse_flight_text(text: &str, criteria: &SearchCriteria) -> Option<FlightOffer> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (departure_time, arrival_time) = parse_times(trimmed);
    let price = parse_price(trimmed);
    if departure_time.is_none() && !price.starts_with(&['$', '£', '€', '¥'][..]) {
        return None;
    }

    let duration = parse_duration(trimmed);
    let stops = parse_stops(trimmed);
    let airline = guess_airline(trimmed);

    Some(FlightOffer {
        price,
        currency: "USD".to_string(),
        stops,
        total_duration: duration.clone(),
        segments: vec![FlightSegment {
            airline,
            departure_airport: criteria.origin.clone(),
            arrival_airport: criteria.destination.clone(),
            departure_time: departure_time.unwrap_or_else(|| "Unknown".to_string()),
            arrival_time: arrival_time.unwrap_or_else(|| "Unknown".to_string()),
            duration,
        }],
        scraped_at: Utc::now(),
    })
}

/// The airline name is usually the first line that is neither a time, a
/// price, a duration, nor a stop count.
fn guess_airline(text: &str) -> String {
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.len() > 60 {
            continue;
        }
        let lowered = line.to_lowercase();
        if line.contains(':')
            || line.starts_with(&['$', '£', '€', '¥'][..])
            || lowered.contains("stop")
            || lowered.contains("nonstop")
            || lowered.contains("hr")
            || lowered.contains("min")
            || lowered.contains("co2")
            || lowered.contains("emissions")
        {
            continue;
        }
        return line.to_string();
    }
    "Unknown".to_string()
}
