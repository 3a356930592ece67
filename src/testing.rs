//! Scripted in-memory page driver for exercising the resolver and
//! orchestrators without a browser.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::core::{BrowserControl, PageDriver};
use crate::errors::{Result, ScraperError};

/// Behaviour of one mocked element.
#[derive(Debug, Clone)]
pub struct MockElementSpec {
    pub visible: bool,
    pub enabled: bool,
    pub text: String,
    pub attributes: HashMap<String, String>,
}

impl MockElementSpec {
    /// A visible, enabled element with the given inner text.
    pub fn interactable(text: &str) -> Self {
        Self {
            visible: true,
            enabled: true,
            text: text.to_string(),
            attributes: HashMap::new(),
        }
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, Clone)]
pub struct MockElement {
    pub selector: String,
    spec: MockElementSpec,
}

/// Scripted [`PageDriver`]: selectors either resolve to a configured
/// element, fail with a configured error message, or time out immediately
/// (so tests never sleep out a real budget).
#[derive(Debug, Default)]
pub struct MockPage {
    elements: HashMap<String, MockElementSpec>,
    /// Multi-match selectors for list extraction.
    element_lists: HashMap<String, Vec<MockElementSpec>>,
    failures: HashMap<String, String>,
    url: String,
    body_snippet: Option<String>,
    clicked: Mutex<Vec<String>>,
    filled: Mutex<Vec<(String, String)>>,
    keys_pressed: Mutex<Vec<String>>,
    navigations: Mutex<Vec<String>>,
}

impl MockPage {
    pub fn new() -> Self {
        Self {
            url: "https://mock.test/".to_string(),
            ..Self::default()
        }
    }

    pub fn with_element(mut self, selector: &str, spec: MockElementSpec) -> Self {
        self.elements.insert(selector.to_string(), spec);
        self
    }

    pub fn with_element_list(mut self, selector: &str, specs: Vec<MockElementSpec>) -> Self {
        if let Some(first) = specs.first() {
            self.elements.insert(selector.to_string(), first.clone());
        }
        self.element_lists.insert(selector.to_string(), specs);
        self
    }

    /// Make a selector fail with a specific driver error message, feeding
    /// the failure classifier.
    pub fn with_failure(mut self, selector: &str, message: &str) -> Self {
        self.failures.insert(selector.to_string(), message.to_string());
        self
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn with_body_snippet(mut self, snippet: &str) -> Self {
        self.body_snippet = Some(snippet.to_string());
        self
    }

    pub async fn clicked(&self) -> Vec<String> {
        self.clicked.lock().await.clone()
    }

    pub async fn filled(&self) -> Vec<(String, String)> {
        self.filled.lock().await.clone()
    }

    pub async fn keys_pressed(&self) -> Vec<String> {
        self.keys_pressed.lock().await.clone()
    }

    pub async fn navigations(&self) -> Vec<String> {
        self.navigations.lock().await.clone()
    }
}

#[async_trait]
impl PageDriver for MockPage {
    type Element = MockElement;

    async fn wait_for_selector(&self, selector: &str, _timeout_ms: u64) -> Result<()> {
        if let Some(message) = self.failures.get(selector) {
            return Err(ScraperError::BrowserError(message.clone()));
        }
        if self.elements.contains_key(selector) {
            Ok(())
        } else {
            Err(ScraperError::Timeout(format!(
                "timeout waiting for selector: {}",
                selector
            )))
        }
    }

    async fn query_selector(&self, selector: &str) -> Result<Option<Self::Element>> {
        Ok(self.elements.get(selector).map(|spec| MockElement {
            selector: selector.to_string(),
            spec: spec.clone(),
        }))
    }

    async fn query_selector_all(&self, selector: &str) -> Result<Vec<Self::Element>> {
        if let Some(specs) = self.element_lists.get(selector) {
            return Ok(specs
                .iter()
                .map(|spec| MockElement {
                    selector: selector.to_string(),
                    spec: spec.clone(),
                })
                .collect());
        }
        Ok(self
            .elements
            .get(selector)
            .map(|spec| {
                vec![MockElement {
                    selector: selector.to_string(),
                    spec: spec.clone(),
                }]
            })
            .unwrap_or_default())
    }

    async fn is_visible(&self, element: &Self::Element) -> Result<bool> {
        Ok(element.spec.visible)
    }

    async fn is_enabled(&self, element: &Self::Element) -> Result<bool> {
        Ok(element.spec.enabled)
    }

    async fn click(&self, element: &Self::Element) -> Result<()> {
        self.clicked.lock().await.push(element.selector.clone());
        Ok(())
    }

    async fn fill(&self, element: &Self::Element, text: &str) -> Result<()> {
        self.filled
            .lock()
            .await
            .push((element.selector.clone(), text.to_string()));
        Ok(())
    }

    async fn inner_text(&self, element: &Self::Element) -> Result<String> {
        Ok(element.spec.text.clone())
    }

    async fn get_attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> Result<Option<String>> {
        Ok(element.spec.attributes.get(name).cloned())
    }

    async fn evaluate(&self, _script: &str) -> Result<Value> {
        Ok(self
            .body_snippet
            .as_ref()
            .map(|s| Value::String(s.clone()))
            .unwrap_or(Value::Null))
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.url.clone())
    }
}

#[async_trait]
impl BrowserControl for MockPage {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.navigations.lock().await.push(url.to_string());
        Ok(())
    }

    async fn wait_for_navigation(&self, _timeout_ms: u64) -> Result<()> {
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.keys_pressed.lock().await.push(key.to_string());
        Ok(())
    }
}
