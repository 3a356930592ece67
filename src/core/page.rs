use crate::errors::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Capability contract the selector-resolution core consumes.
///
/// Any browser-automation backend can satisfy this trait; the resolver never
/// talks to a browser directly. Element handles are owned values so they can
/// be carried across await points without borrowing the driver.
#[async_trait]
pub trait PageDriver: Send + Sync {
    type Element: Clone + Send + Sync;

    /// Block until the selector matches something in the DOM, up to the
    /// timeout. A timeout is reported as an error whose text contains
    /// "timeout" so the failure classifier files it as `not_found`.
    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()>;

    /// Query the first element matching the selector.
    async fn query_selector(&self, selector: &str) -> Result<Option<Self::Element>>;

    /// Query every element matching the selector.
    async fn query_selector_all(&self, selector: &str) -> Result<Vec<Self::Element>>;

    async fn is_visible(&self, element: &Self::Element) -> Result<bool>;

    async fn is_enabled(&self, element: &Self::Element) -> Result<bool>;

    async fn click(&self, element: &Self::Element) -> Result<()>;

    async fn fill(&self, element: &Self::Element, text: &str) -> Result<()>;

    async fn inner_text(&self, element: &Self::Element) -> Result<String>;

    async fn get_attribute(&self, element: &Self::Element, name: &str)
        -> Result<Option<String>>;

    /// Execute JavaScript in the page. The resolver only uses this for
    /// diagnostic DOM-context capture.
    async fn evaluate(&self, script: &str) -> Result<Value>;

    async fn current_url(&self) -> Result<String>;
}

/// Navigation-level operations used by the orchestrators (form filling,
/// extraction). Kept separate from `PageDriver` so the resolver core depends
/// only on the query capabilities.
#[async_trait]
pub trait BrowserControl: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    async fn wait_for_navigation(&self, timeout_ms: u64) -> Result<()>;

    /// Press a keyboard key (e.g. "Enter") against the focused element.
    async fn press_key(&self, key: &str) -> Result<()>;
}
