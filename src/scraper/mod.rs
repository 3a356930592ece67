pub mod chrome;
pub mod extractor;
pub mod form;
pub mod session;

pub use chrome::{ChromeDriver, ChromeElement};
pub use extractor::DataExtractor;
pub use form::FormHandler;
pub use session::{FlightScraper, FLIGHT_SEARCH_PAGE};
