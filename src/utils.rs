//! Text normalization helpers for scraped flight data.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use std::time::Duration;

lazy_static! {
    static ref PRICE_RE: Regex = Regex::new(r"[\$£€¥][\d,]+|\d[\d,]*\s?(?:USD|EUR|GBP)")
        .expect("price pattern");
    static ref STOPS_RE: Regex = Regex::new(r"(\d+)\s*stop").expect("stops pattern");
    static ref DURATION_RE: Regex =
        Regex::new(r"(\d{1,2})\s*hr?\s*(?:(\d{1,2})\s*min)?").expect("duration pattern");
    static ref TIME_RE: Regex =
        Regex::new(r"\d{1,2}:\d{2}\s*(?:AM|PM|am|pm)?").expect("time pattern");
    static ref AIRPORT_RE: Regex = Regex::new(r"^[A-Z]{3}$").expect("airport pattern");
}

/// Format a travel date the way the search form expects it.
pub fn format_date_for_input(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Pull a price out of arbitrary offer text. Returns "0" when nothing
/// price-shaped appears, matching the "no price shown" rows.
pub fn parse_price(text: &str) -> String {
    PRICE_RE
        .find(text)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                "0".to_string()
            } else {
                trimmed.to_string()
            }
        })
}

/// Normalize a duration snippet ("5 hr 25 min") to a stable display string.
pub fn parse_duration(text: &str) -> String {
    match DURATION_RE.captures(text) {
        Some(caps) => {
            let hours = caps.get(1).map(|m| m.as_str()).unwrap_or("0");
            match caps.get(2) {
                Some(minutes) => format!("{} hr {} min", hours, minutes.as_str()),
                None => format!("{} hr", hours),
            }
        }
        None => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                "Unknown".to_string()
            } else {
                trimmed.to_string()
            }
        }
    }
}

/// Parse stop count from offer text. "Nonstop"/"direct" means zero; an
/// unparseable non-empty string conservatively counts as one stop.
pub fn parse_stops(text: &str) -> u32 {
    let lowered = text.to_lowercase();
    if lowered.is_empty() {
        return 0;
    }
    if lowered.contains("nonstop") || lowered.contains("non-stop") || lowered.contains("direct") {
        return 0;
    }
    STOPS_RE
        .captures(&lowered)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(1)
}

/// Departure and arrival times from offer text, in display order.
pub fn parse_times(text: &str) -> (Option<String>, Option<String>) {
    let mut times = TIME_RE.find_iter(text).map(|m| m.as_str().to_string());
    let departure = times.next();
    let arrival = times.next();
    (departure, arrival)
}

pub fn validate_airport_code(code: &str) -> bool {
    AIRPORT_RE.is_match(&code.to_uppercase())
}

pub fn normalize_airport_code(code: &str) -> String {
    code.trim().to_uppercase().chars().take(3).collect()
}

/// Fixed pause so page JavaScript can settle after an action.
pub async fn settle_delay(delay_ms: u64) {
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
}
