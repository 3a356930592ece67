use chrono::{Duration, Utc};
use flight_scraper::{Config, FlightScraper, SearchCriteria};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flight_scraper=info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let origin = args.next().unwrap_or_else(|| "LAX".to_string());
    let destination = args.next().unwrap_or_else(|| "JFK".to_string());
    let departure = match args.next() {
        Some(raw) => raw.parse()?,
        None => (Utc::now() + Duration::days(30)).date_naive(),
    };

    info!(%origin, %destination, %departure, "starting flight search");

    let criteria = SearchCriteria::one_way(&origin, &destination, departure).with_max_results(10);
    let scraper = FlightScraper::launch(Config::default())?;

    let result = scraper.scrape(&criteria).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    let report = scraper.health_report();
    info!(
        pages = report.overall_health.pages_monitored,
        average_success_rate = report.overall_health.average_success_rate,
        "selector health"
    );
    for issue in &report.critical_issues {
        error!(%issue, "selector health issue");
    }
    if !report.recommendations.is_empty() {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
