pub mod core;
pub mod errors;
pub mod models;
pub mod scraper;
pub mod selectors;
pub mod testing;
pub mod utils;

pub use crate::core::{BrowserControl, Config, PageDriver};
pub use errors::{Result, ScraperError};
pub use models::{FlightOffer, ScrapingResult, SearchCriteria, TripType};
pub use scraper::{ChromeDriver, FlightScraper};
pub use selectors::{
    ElementResolver, FailureCategory, HealthMonitor, HealthReport, SelectorCatalog,
    SelectorStrategy,
};
