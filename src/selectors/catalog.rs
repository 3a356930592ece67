use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Category of selector technique, ordered by presumed resilience to site
/// redesign. Resolution always walks these in `PRIORITY` order: semantic
/// markup survives visual refreshes, obfuscated class names do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorStrategy {
    Semantic,
    Structural,
    ClassBased,
    ContentBased,
}

impl SelectorStrategy {
    pub const PRIORITY: [SelectorStrategy; 4] = [
        SelectorStrategy::Semantic,
        SelectorStrategy::Structural,
        SelectorStrategy::ClassBased,
        SelectorStrategy::ContentBased,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SelectorStrategy::Semantic => "semantic",
            SelectorStrategy::Structural => "structural",
            SelectorStrategy::ClassBased => "class_based",
            SelectorStrategy::ContentBased => "content_based",
        }
    }
}

impl std::fmt::Display for SelectorStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered selector candidates for one logical element, grouped by strategy.
/// Within a group, candidates are tried in listed order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub semantic: Vec<String>,
    #[serde(default)]
    pub structural: Vec<String>,
    #[serde(default)]
    pub class_based: Vec<String>,
    #[serde(default)]
    pub content_based: Vec<String>,
}

impl CatalogEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn semantic<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.semantic = selectors.into_iter().map(Into::into).collect();
        self
    }

    pub fn structural<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.structural = selectors.into_iter().map(Into::into).collect();
        self
    }

    pub fn class_based<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.class_based = selectors.into_iter().map(Into::into).collect();
        self
    }

    pub fn content_based<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.content_based = selectors.into_iter().map(Into::into).collect();
        self
    }

    pub fn candidates(&self, strategy: SelectorStrategy) -> &[String] {
        match strategy {
            SelectorStrategy::Semantic => &self.semantic,
            SelectorStrategy::Structural => &self.structural,
            SelectorStrategy::ClassBased => &self.class_based,
            SelectorStrategy::ContentBased => &self.content_based,
        }
    }

    pub fn total_candidates(&self) -> usize {
        SelectorStrategy::PRIORITY
            .iter()
            .map(|s| self.candidates(*s).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_candidates() == 0
    }
}

/// Static mapping from logical element name to its selector candidates.
/// Pure data: swap it per target site or site version without touching the
/// resolution engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectorCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl SelectorCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, logical_name: impl Into<String>, entry: CatalogEntry) {
        self.entries.insert(logical_name.into(), entry);
    }

    pub fn with_entry(mut self, logical_name: impl Into<String>, entry: CatalogEntry) -> Self {
        self.insert(logical_name, entry);
        self
    }

    pub fn get(&self, logical_name: &str) -> Option<&CatalogEntry> {
        self.entries.get(logical_name)
    }

    pub fn contains(&self, logical_name: &str) -> bool {
        self.entries.contains_key(logical_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn logical_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Selector data for the current Google Flights markup. Expected to rot;
    /// replace the strings here, not the resolver, when the site changes.
    pub fn google_flights() -> Self {
        let mut catalog = Self::new();

        catalog.insert(
            "origin_input",
            CatalogEntry::new()
                .semantic([
                    "input[aria-label*=\"Where from\"]",
                    "input[placeholder*=\"Where from\"]",
                    "input[data-testid*=\"origin\"]",
                ])
                .structural(["div[role=\"search\"] input[type=\"text\"]:first-of-type"])
                .class_based([".II2One .TP4Lpb input"]),
        );

        catalog.insert(
            "destination_input",
            CatalogEntry::new()
                .semantic([
                    "input[aria-label*=\"Where to\"]",
                    "input[placeholder*=\"Where to\"]",
                    "input[data-testid*=\"destination\"]",
                ])
                .structural(["div[role=\"search\"] input[type=\"text\"]:last-of-type"])
                .class_based([".II2One .TP4Lpb:last-child input"]),
        );

        catalog.insert(
            "departure_date",
            CatalogEntry::new()
                .semantic([
                    "input[aria-label*=\"Departure\"]",
                    "input[placeholder*=\"Departure\"]",
                    "input[data-testid*=\"departure\"]",
                ])
                .class_based([".II2One .eoY5cb input"]),
        );

        catalog.insert(
            "return_date",
            CatalogEntry::new()
                .semantic([
                    "input[aria-label*=\"Return\"]",
                    "input[placeholder*=\"Return\"]",
                    "input[data-testid*=\"return\"]",
                ])
                .class_based([".II2One .eoY5cb:last-child input"]),
        );

        catalog.insert(
            "search_button",
            CatalogEntry::new()
                .semantic([
                    "button[aria-label*=\"Search\"]",
                    "button[data-testid*=\"search\"]",
                ])
                .structural(["div[role=\"search\"] button"])
                .class_based([".VfPpkd-LgbsSe[jsname=\"LgbsSe\"]", ".RNNXgb button"]),
        );

        catalog.insert(
            "flight_results",
            CatalogEntry::new()
                .semantic(["[data-testid=\"flight-offer\"]"])
                .structural(["div[role=\"tabpanel\"] ul li", "main ul[role=\"list\"] > li"])
                .class_based([".pIav2d", ".Rk10dc li"]),
        );

        catalog.insert(
            "airline_name",
            CatalogEntry::new()
                .semantic(["[data-testid*=\"airline\"]", "img[alt*=\"logo\"]"])
                .class_based([".Ir0Voe", ".sSHqwe"]),
        );

        catalog.insert(
            "departure_time",
            CatalogEntry::new()
                .semantic(["[data-testid*=\"departure-time\"]", "span[aria-label*=\"Departure time\"]"])
                .class_based([".wtdjmc .eoY5cb:first-child", ".zxVSec:first-child"]),
        );

        catalog.insert(
            "arrival_time",
            CatalogEntry::new()
                .semantic(["[data-testid*=\"arrival-time\"]", "span[aria-label*=\"Arrival time\"]"])
                .class_based([".wtdjmc .eoY5cb:last-child", ".zxVSec:last-child"]),
        );

        catalog.insert(
            "duration",
            CatalogEntry::new()
                .semantic(["[data-testid*=\"duration\"]"])
                .class_based([".gvkrdb", ".AdWm1c"]),
        );

        catalog.insert(
            "stops",
            CatalogEntry::new()
                .semantic(["[data-testid*=\"stops\"]"])
                .class_based([".EfT7Ae .ogfYpf", ".c8rWCd"]),
        );

        catalog.insert(
            "price",
            CatalogEntry::new()
                .semantic(["[data-testid*=\"price\"]", "[aria-label*=\"dollar\"]"])
                .class_based([".f8F1md .YMlIz", ".U3gSDe"]),
        );

        catalog
    }
}
