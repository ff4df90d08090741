//! chromiumoxide-backed implementation of the page capability traits.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::{Element, Page};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::app::{PagesiftError, Result};
use crate::page::{DynElement, ElementHandle, PageHandle, QueryScope};

/// Interval between selector probes inside [`PageHandle::wait_for`].
const WAIT_PROBE_INTERVAL: Duration = Duration::from_millis(100);

/// Browser launch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Whether to run the browser in headless mode (default: true)
    pub headless: bool,

    /// User agent string to use
    pub user_agent: Option<String>,

    /// Page load timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            user_agent: Some(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ),
            timeout_secs: 30,
        }
    }
}

impl BrowserSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn page_err(context: &str, e: impl std::fmt::Display) -> PagesiftError {
    PagesiftError::Page(format!("{context}: {e}"))
}

/// A launched Chrome instance handing out pages.
pub struct ChromeSession {
    browser: Browser,
    settings: BrowserSettings,
    handler_task: JoinHandle<()>,
}

impl ChromeSession {
    /// Launch Chrome with the given settings.
    pub async fn launch(settings: BrowserSettings) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage");

        if !settings.headless {
            builder = builder.with_head();
        }

        let config = builder
            .build()
            .map_err(|e| page_err("Failed to build browser config", e))?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            page_err(
                "Failed to launch browser (is Chrome or Chromium installed and in PATH?)",
                e,
            )
        })?;

        tracing::debug!("browser launched");

        // Drive the CDP event loop for the lifetime of the session
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("browser handler event error: {e}");
                }
            }
        });

        Ok(Self {
            browser,
            settings,
            handler_task,
        })
    }

    /// Open a fresh blank page with the configured user agent applied.
    pub async fn new_page(&self) -> Result<ChromePage> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| page_err("Failed to create page", e))?;

        if let Some(ref ua) = self.settings.user_agent {
            page.set_user_agent(ua)
                .await
                .map_err(|e| page_err("Failed to set user agent", e))?;
        }

        Ok(ChromePage { inner: page })
    }

    /// Shut the browser down and wait for the process to exit.
    pub async fn close(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| page_err("Failed to close browser", e))?;
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        Ok(())
    }
}

/// [`PageHandle`] implementation over a chromiumoxide page.
pub struct ChromePage {
    inner: Page,
}

#[async_trait]
impl QueryScope for ChromePage {
    async fn find(&self, selector: &str) -> Result<Option<DynElement>> {
        // chromiumoxide reports "no match" as an error; both that and a
        // transient query fault count as absence here, per the tolerant
        // extraction contract.
        match self.inner.find_element(selector).await {
            Ok(el) => Ok(Some(Box::new(ChromeElement { inner: el }))),
            Err(e) => {
                tracing::trace!("find {selector:?}: {e}");
                Ok(None)
            }
        }
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<DynElement>> {
        match self.inner.find_elements(selector).await {
            Ok(els) => Ok(els
                .into_iter()
                .map(|el| Box::new(ChromeElement { inner: el }) as DynElement)
                .collect()),
            Err(e) => {
                tracing::trace!("find_all {selector:?}: {e}");
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl PageHandle for ChromePage {
    async fn goto(&self, url: &str) -> Result<()> {
        tracing::debug!("navigating to {url}");
        self.inner
            .goto(url)
            .await
            .map_err(|e| page_err("Navigation failed", e))?;
        self.inner
            .wait_for_navigation()
            .await
            .map_err(|e| page_err("Navigation did not settle", e))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let url = self
            .inner
            .url()
            .await
            .map_err(|e| page_err("Failed to read page URL", e))?;
        Ok(url.unwrap_or_default())
    }

    async fn title(&self) -> Result<String> {
        let title = self
            .inner
            .get_title()
            .await
            .map_err(|e| page_err("Failed to read page title", e))?;
        Ok(title.unwrap_or_default())
    }

    async fn add_init_script(&self, source: &str) -> Result<()> {
        let params = AddScriptToEvaluateOnNewDocumentParams::builder()
            .source(source)
            .build()
            .map_err(|e| page_err("Invalid init script", e))?;
        self.inner
            .execute(params)
            .await
            .map_err(|e| page_err("Failed to register init script", e))?;
        Ok(())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<DynElement> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(el) = self.find(selector).await? {
                return Ok(el);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(PagesiftError::Timeout(format!("selector {selector:?}")));
            }
            tokio::time::sleep(WAIT_PROBE_INTERVAL).await;
        }
    }
}

/// [`ElementHandle`] implementation over a chromiumoxide element.
pub struct ChromeElement {
    inner: Element,
}

#[async_trait]
impl QueryScope for ChromeElement {
    async fn find(&self, selector: &str) -> Result<Option<DynElement>> {
        match self.inner.find_element(selector).await {
            Ok(el) => Ok(Some(Box::new(ChromeElement { inner: el }))),
            Err(e) => {
                tracing::trace!("find {selector:?}: {e}");
                Ok(None)
            }
        }
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<DynElement>> {
        match self.inner.find_elements(selector).await {
            Ok(els) => Ok(els
                .into_iter()
                .map(|el| Box::new(ChromeElement { inner: el }) as DynElement)
                .collect()),
            Err(e) => {
                tracing::trace!("find_all {selector:?}: {e}");
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl ElementHandle for ChromeElement {
    async fn text(&self) -> Result<Option<String>> {
        self.inner
            .inner_text()
            .await
            .map_err(|e| page_err("Failed to read element text", e))
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.inner
            .attribute(name)
            .await
            .map_err(|e| page_err("Failed to read attribute", e))
    }

    async fn click(&self) -> Result<()> {
        self.inner
            .click()
            .await
            .map_err(|e| page_err("Click failed", e))?;
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        self.inner
            .type_str(text)
            .await
            .map_err(|e| page_err("Typing failed", e))?;
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.inner
            .press_key(key)
            .await
            .map_err(|e| page_err("Key press failed", e))?;
        Ok(())
    }

    async fn eval(&self, js_fn: &str) -> Result<Value> {
        let returns = self
            .inner
            .call_js_fn(js_fn, false)
            .await
            .map_err(|e| page_err("Script execution failed", e))?;
        Ok(returns.result.value.unwrap_or(Value::Null))
    }
}
