//! In-memory page/element fakes for exercising recipes without a browser.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::app::{PagesiftError, Result};
use crate::page::{DynElement, ElementHandle, PageHandle, QueryScope};

/// Fake DOM node. Children are registered under the exact selector string a
/// recipe will query with; `find_all` returns every child registered under
/// that selector, in registration order.
#[derive(Clone, Default)]
pub struct FakeElement {
    texts: Vec<String>,
    cursor: Arc<AtomicUsize>,
    attrs: HashMap<String, String>,
    children: Vec<(String, FakeElement)>,
    evals: Vec<(String, Value)>,
    log: Arc<Mutex<Vec<String>>>,
}

impl FakeElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: &str) -> Self {
        Self {
            texts: vec![text.to_string()],
            ..Self::default()
        }
    }

    /// Element whose text changes across successive reads (sticking at the
    /// last value), simulating streamed content.
    pub fn streaming(texts: &[&str]) -> Self {
        Self {
            texts: texts.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn child(mut self, selector: &str, element: FakeElement) -> Self {
        self.children.push((selector.to_string(), element));
        self
    }

    /// Canned result for `eval` calls whose script contains `fragment`.
    pub fn on_eval(mut self, fragment: &str, value: Value) -> Self {
        self.evals.push((fragment.to_string(), value));
        self
    }

    /// Every action performed against this element or its clones.
    pub fn actions(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, action: String) {
        self.log.lock().unwrap().push(action);
    }
}

#[async_trait]
impl QueryScope for FakeElement {
    async fn find(&self, selector: &str) -> Result<Option<DynElement>> {
        self.record(format!("find {selector}"));
        Ok(self
            .children
            .iter()
            .find(|(s, _)| s == selector)
            .map(|(_, el)| Box::new(el.clone()) as DynElement))
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<DynElement>> {
        self.record(format!("find_all {selector}"));
        Ok(self
            .children
            .iter()
            .filter(|(s, _)| s == selector)
            .map(|(_, el)| Box::new(el.clone()) as DynElement)
            .collect())
    }
}

#[async_trait]
impl ElementHandle for FakeElement {
    async fn text(&self) -> Result<Option<String>> {
        if self.texts.is_empty() {
            return Ok(None);
        }
        let i = self.cursor.fetch_add(1, Ordering::SeqCst);
        Ok(Some(self.texts[i.min(self.texts.len() - 1)].clone()))
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.attrs.get(name).cloned())
    }

    async fn click(&self) -> Result<()> {
        self.record("click".to_string());
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        self.record(format!("type {text}"));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.record(format!("press {key}"));
        Ok(())
    }

    async fn eval(&self, js_fn: &str) -> Result<Value> {
        Ok(self
            .evals
            .iter()
            .find(|(frag, _)| js_fn.contains(frag.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or(Value::Null))
    }
}

/// Fake page. Navigation is recorded, never performed; `wait_for` resolves
/// immediately or times out based on registered children.
#[derive(Clone, Default)]
pub struct FakePage {
    title: String,
    url: Arc<Mutex<String>>,
    children: Vec<(String, FakeElement)>,
    log: Arc<Mutex<Vec<String>>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// URL the page reports after navigation (simulates redirects).
    pub fn redirects_to(self, url: &str) -> Self {
        *self.url.lock().unwrap() = url.to_string();
        self
    }

    pub fn child(mut self, selector: &str, element: FakeElement) -> Self {
        self.children.push((selector.to_string(), element));
        self
    }

    pub fn actions(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, action: String) {
        self.log.lock().unwrap().push(action);
    }
}

#[async_trait]
impl QueryScope for FakePage {
    async fn find(&self, selector: &str) -> Result<Option<DynElement>> {
        self.record(format!("find {selector}"));
        Ok(self
            .children
            .iter()
            .find(|(s, _)| s == selector)
            .map(|(_, el)| Box::new(el.clone()) as DynElement))
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<DynElement>> {
        self.record(format!("find_all {selector}"));
        Ok(self
            .children
            .iter()
            .filter(|(s, _)| s == selector)
            .map(|(_, el)| Box::new(el.clone()) as DynElement)
            .collect())
    }
}

#[async_trait]
impl PageHandle for FakePage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.record(format!("goto {url}"));
        let mut current = self.url.lock().unwrap();
        if current.is_empty() {
            *current = url.to_string();
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.url.lock().unwrap().clone())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.title.clone())
    }

    async fn add_init_script(&self, _source: &str) -> Result<()> {
        self.record("init_script".to_string());
        Ok(())
    }

    async fn wait_for(&self, selector: &str, _timeout: Duration) -> Result<DynElement> {
        self.find(selector)
            .await?
            .ok_or_else(|| PagesiftError::Timeout(format!("selector {selector:?}")))
    }
}
