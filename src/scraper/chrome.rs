use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use tracing::debug;

use crate::core::{BrowserConfig, BrowserControl, PageDriver};
use crate::errors::{Result, ScraperError};

/// Element handle backed by a page-side registry.
///
/// Chrome elements are stashed under `window.__fsHandles` when queried, so a
/// handle stays valid across await points; if the node has been detached by
/// the page's own JavaScript, operations fail with a stale-element error that
/// the failure classifier recognizes.
#[derive(Debug, Clone)]
pub struct ChromeElement {
    handle: u64,
    pub selector: String,
}

/// [`PageDriver`] backed by a real Chrome via DevTools protocol. All element
/// work happens through injected JavaScript.
pub struct ChromeDriver {
    // Keeps the browser process alive for the driver's lifetime.
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeDriver {
    pub fn launch(config: &BrowserConfig) -> Result<Self> {
        let window_size_arg = format!(
            "--window-size={},{}",
            config.viewport.width, config.viewport.height
        );

        let user_agent_arg = config
            .user_agent
            .as_ref()
            .map(|ua| format!("--user-agent={}", ua));

        let mut args = vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new(&window_size_arg),
        ];

        if let Some(ref ua_arg) = user_agent_arg {
            args.push(OsStr::new(ua_arg));
        }

        if config.disable_images {
            args.push(OsStr::new("--blink-settings=imagesEnabled=false"));
        }

        for arg in &config.args {
            args.push(OsStr::new(arg));
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .args(args)
            .build()
            .map_err(|e| ScraperError::LaunchFailed(e.to_string()))?;

        let browser =
            Browser::new(launch_options).map_err(|e| ScraperError::LaunchFailed(e.to_string()))?;

        let tab = browser
            .new_tab()
            .map_err(|e| ScraperError::LaunchFailed(e.to_string()))?;

        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    fn eval(&self, script: &str) -> Result<Value> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| ScraperError::JavaScriptFailed(e.to_string()))?;
        Ok(result.value.unwrap_or(Value::Null))
    }

    /// Run an element operation against the registry. `body` must `return`
    /// an object shaped `{ value }` on success or `{ error }` on failure;
    /// the element is in scope as `el`.
    fn eval_on_element(&self, element: &ChromeElement, body: &str) -> Result<Value> {
        let script = format!(
            "(function() {{ \
                 const handles = window.__fsHandles || {{}}; \
                 const el = handles[{}]; \
                 if (!el || !el.isConnected) {{ \
                     return {{ error: 'stale element reference: node detached from document' }}; \
                 }} \
                 {} \
             }})()",
            element.handle, body
        );

        let result = self.eval(&script)?;
        if let Some(error) = result.get("error").and_then(Value::as_str) {
            return Err(ScraperError::JavaScriptFailed(error.to_string()));
        }
        Ok(result.get("value").cloned().unwrap_or(Value::Null))
    }

    fn quote(text: &str) -> Result<String> {
        Ok(serde_json::to_string(text)?)
    }
}

#[async_trait]
impl PageDriver for ChromeDriver {
    type Element = ChromeElement;

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()> {
        let quoted = Self::quote(selector)?;
        let probe = format!("!!document.querySelector({})", quoted);
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            if self.eval(&probe)?.as_bool().unwrap_or(false) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ScraperError::Timeout(format!(
                    "timeout waiting for selector: {}",
                    selector
                )));
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    async fn query_selector(&self, selector: &str) -> Result<Option<Self::Element>> {
        let quoted = Self::quote(selector)?;
        let script = format!(
            "(function() {{ \
                 const el = document.querySelector({}); \
                 if (!el) return null; \
                 window.__fsHandles = window.__fsHandles || {{}}; \
                 window.__fsNextHandle = (window.__fsNextHandle || 0) + 1; \
                 window.__fsHandles[window.__fsNextHandle] = el; \
                 return window.__fsNextHandle; \
             }})()",
            quoted
        );

        Ok(self.eval(&script)?.as_u64().map(|handle| ChromeElement {
            handle,
            selector: selector.to_string(),
        }))
    }

    async fn query_selector_all(&self, selector: &str) -> Result<Vec<Self::Element>> {
        let quoted = Self::quote(selector)?;
        let script = format!(
            "(function() {{ \
                 const els = document.querySelectorAll({}); \
                 window.__fsHandles = window.__fsHandles || {{}}; \
                 const ids = []; \
                 els.forEach((el) => {{ \
                     window.__fsNextHandle = (window.__fsNextHandle || 0) + 1; \
                     window.__fsHandles[window.__fsNextHandle] = el; \
                     ids.push(window.__fsNextHandle); \
                 }}); \
                 return ids; \
             }})()",
            quoted
        );

        let ids = self.eval(&script)?;
        let elements: Vec<Self::Element> = ids
            .as_array()
            .map(|array| {
                array
                    .iter()
                    .filter_map(Value::as_u64)
                    .map(|handle| ChromeElement {
                        handle,
                        selector: selector.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        debug!(selector, count = elements.len(), "queried element list");
        Ok(elements)
    }

    async fn is_visible(&self, element: &Self::Element) -> Result<bool> {
        let result = self.eval_on_element(
            element,
            "const rect = el.getBoundingClientRect(); \
             const style = window.getComputedStyle(el); \
             return { value: rect.width > 0 && rect.height > 0 \
                 && style.visibility !== 'hidden' && style.display !== 'none' };",
        )?;
        Ok(result.as_bool().unwrap_or(false))
    }

    async fn is_enabled(&self, element: &Self::Element) -> Result<bool> {
        let result = self.eval_on_element(
            element,
            "return { value: !el.disabled && el.getAttribute('aria-disabled') !== 'true' };",
        )?;
        Ok(result.as_bool().unwrap_or(false))
    }

    async fn click(&self, element: &Self::Element) -> Result<()> {
        self.eval_on_element(
            element,
            "el.scrollIntoView({ block: 'center' }); \
             if (el.focus) el.focus(); \
             el.click(); \
             const rect = el.getBoundingClientRect(); \
             ['mousedown', 'mouseup', 'click'].forEach((type) => { \
                 el.dispatchEvent(new MouseEvent(type, { \
                     bubbles: true, \
                     cancelable: true, \
                     clientX: rect.left + rect.width / 2, \
                     clientY: rect.top + rect.height / 2 \
                 })); \
             }); \
             return { value: true };",
        )?;
        Ok(())
    }

    async fn fill(&self, element: &Self::Element, text: &str) -> Result<()> {
        let quoted = Self::quote(text)?;
        let body = format!(
            "el.focus(); \
             const tag = el.tagName.toLowerCase(); \
             if (tag === 'input' || tag === 'textarea') {{ \
                 el.value = {quoted}; \
                 el.dispatchEvent(new Event('input', {{ bubbles: true, cancelable: true }})); \
                 el.dispatchEvent(new Event('change', {{ bubbles: true, cancelable: true }})); \
             }} else if (el.isContentEditable) {{ \
                 el.textContent = {quoted}; \
                 el.dispatchEvent(new Event('input', {{ bubbles: true, cancelable: true }})); \
             }} else {{ \
                 return {{ error: 'element is not interactable: cannot accept text input' }}; \
             }} \
             return {{ value: true }};",
        );
        self.eval_on_element(element, &body)?;
        Ok(())
    }

    async fn inner_text(&self, element: &Self::Element) -> Result<String> {
        let result = self.eval_on_element(
            element,
            "return { value: el.innerText || el.textContent || '' };",
        )?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    async fn get_attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> Result<Option<String>> {
        let quoted = Self::quote(name)?;
        let body = format!("return {{ value: el.getAttribute({}) }};", quoted);
        let result = self.eval_on_element(element, &body)?;
        Ok(result.as_str().map(|s| s.to_string()))
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        self.eval(script)
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.tab.get_url())
    }
}

#[async_trait]
impl BrowserControl for ChromeDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| ScraperError::NavigationFailed(e.to_string()))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| ScraperError::NavigationFailed(e.to_string()))?;
        Ok(())
    }

    async fn wait_for_navigation(&self, timeout_ms: u64) -> Result<()> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            let state = self.eval("document.readyState")?;
            if state.as_str() == Some("complete") {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ScraperError::Timeout(
                    "page did not finish loading".to_string(),
                ));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.tab
            .press_key(key)
            .map_err(|e| ScraperError::BrowserError(e.to_string()))?;
        Ok(())
    }
}
