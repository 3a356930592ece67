use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripType {
    OneWay,
    RoundTrip,
}

/// One leg of an offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightSegment {
    pub airline: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub duration: String,
}

/// A flight offer as scraped from the results page. Times, durations and
/// prices are kept as display strings; normalizing them is business logic
/// that lives with the consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightOffer {
    pub price: String,
    pub currency: String,
    pub stops: u32,
    pub total_duration: String,
    pub segments: Vec<FlightSegment>,
    pub scraped_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub trip_type: TripType,
    pub max_results: usize,
}

impl SearchCriteria {
    pub fn one_way(origin: &str, destination: &str, departure_date: NaiveDate) -> Self {
        Self {
            origin: origin.to_string(),
            destination: destination.to_string(),
            departure_date,
            return_date: None,
            trip_type: TripType::OneWay,
            max_results: 50,
        }
    }

    pub fn round_trip(
        origin: &str,
        destination: &str,
        departure_date: NaiveDate,
        return_date: NaiveDate,
    ) -> Self {
        Self {
            origin: origin.to_string(),
            destination: destination.to_string(),
            departure_date,
            return_date: Some(return_date),
            trip_type: TripType::RoundTrip,
            max_results: 50,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

/// Outcome of one scraping session, success or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingResult {
    pub search_criteria: SearchCriteria,
    pub flights: Vec<FlightOffer>,
    pub total_results: usize,
    pub success: bool,
    pub error_message: Option<String>,
    pub scraped_at: DateTime<Utc>,
    pub execution_time_ms: u64,
}

impl ScrapingResult {
    pub fn succeeded(
        criteria: SearchCriteria,
        flights: Vec<FlightOffer>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            total_results: flights.len(),
            search_criteria: criteria,
            flights,
            success: true,
            error_message: None,
            scraped_at: Utc::now(),
            execution_time_ms,
        }
    }

    pub fn failed(criteria: SearchCriteria, error: String, execution_time_ms: u64) -> Self {
        Self {
            search_criteria: criteria,
            flights: Vec::new(),
            total_results: 0,
            success: false,
            error_message: Some(error),
            scraped_at: Utc::now(),
            execution_time_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criteria_builders_set_trip_type() {
        let date = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let one_way = SearchCriteria::one_way("LAX", "JFK", date);
        assert_eq!(one_way.trip_type, TripType::OneWay);
        assert!(one_way.return_date.is_none());

        let back = NaiveDate::from_ymd_opt(2026, 9, 8).unwrap();
        let round = SearchCriteria::round_trip("LAX", "JFK", date, back).with_max_results(5);
        assert_eq!(round.trip_type, TripType::RoundTrip);
        assert_eq!(round.max_results, 5);
    }

    #[test]
    fn result_constructors_track_outcome() {
        let date = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let criteria = SearchCriteria::one_way("LAX", "JFK", date);

        let ok = ScrapingResult::succeeded(criteria.clone(), Vec::new(), 1200);
        assert!(ok.success);
        assert_eq!(ok.total_results, 0);

        let err = ScrapingResult::failed(criteria, "navigation failed".to_string(), 300);
        assert!(!err.success);
        assert_eq!(err.error_message.as_deref(), Some("navigation failed"));
    }

    #[test]
    fn result_serializes_to_json() {
        let date = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let result = ScrapingResult::succeeded(
            SearchCriteria::one_way("LAX", "JFK", date),
            vec![FlightOffer {
                price: "$312".to_string(),
                currency: "USD".to_string(),
                stops: 0,
                total_duration: "5 hr 25 min".to_string(),
                segments: vec![],
                scraped_at: Utc::now(),
            }],
            900,
        );

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["flights"][0]["price"], "$312");
        assert_eq!(json["search_criteria"]["trip_type"], "one_way");
    }
}
