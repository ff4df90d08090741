//! The recipe contract and the endpoint dispatcher.

pub mod brave;
pub mod deepl;
pub mod wikipedia;
pub mod x;

pub use brave::BraveRecipe;
pub use deepl::DeeplRecipe;
pub use wikipedia::WikipediaRecipe;
pub use x::XRecipe;

use async_trait::async_trait;

use crate::app::{PagesiftError, Result};
use crate::model::ScrapeResult;
use crate::page::PageHandle;
use crate::toolkit::Params;

/// One self-contained extraction unit for a target site/workflow.
///
/// Recipes are stateless across invocations; the page handle carries all
/// per-invocation state. `scrape` may navigate and wait repeatedly within
/// one call but must never mutate the request parameters.
#[async_trait]
pub trait Recipe: Send + Sync {
    /// Endpoint names this recipe claims. Used for registration-time
    /// conflict checks and the default `supports` implementation.
    fn endpoints(&self) -> &[&str];

    /// Pure membership test against [`Recipe::endpoints`].
    fn supports(&self, endpoint: &str) -> bool {
        self.endpoints().contains(&endpoint)
    }

    /// Drive the page and produce a populated result, or fail with a
    /// descriptive typed error.
    async fn scrape(
        &self,
        endpoint: &str,
        page: &dyn PageHandle,
        params: &Params,
    ) -> Result<ScrapeResult>;
}

/// Ordered collection of recipes with first-match dispatch.
///
/// Endpoint names must be globally unique across registered recipes;
/// [`Registry::register`] fails fast on a conflict rather than letting
/// registration order silently decide the winner.
#[derive(Default)]
pub struct Registry {
    recipes: Vec<Box<dyn Recipe>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a recipe, rejecting any endpoint already claimed.
    pub fn register(&mut self, recipe: Box<dyn Recipe>) -> Result<()> {
        for &endpoint in recipe.endpoints() {
            if self.recipes.iter().any(|r| r.supports(endpoint)) {
                return Err(PagesiftError::Config(format!(
                    "endpoint {endpoint:?} is already registered"
                )));
            }
        }
        self.recipes.push(recipe);
        Ok(())
    }

    /// All endpoints currently claimed, in registration order.
    pub fn endpoints(&self) -> Vec<&str> {
        self.recipes
            .iter()
            .flat_map(|r| r.endpoints().iter().copied())
            .collect()
    }

    /// Select the recipe claiming `endpoint` and invoke it, propagating its
    /// result or failure unchanged.
    pub async fn dispatch(
        &self,
        endpoint: &str,
        page: &dyn PageHandle,
        params: &Params,
    ) -> Result<ScrapeResult> {
        let recipe = self
            .recipes
            .iter()
            .find(|r| r.supports(endpoint))
            .ok_or_else(|| PagesiftError::UnsupportedEndpoint(endpoint.to_string()))?;

        tracing::debug!("dispatching endpoint {endpoint:?}");
        recipe.scrape(endpoint, page, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;
    use crate::page::fake::FakePage;
    use serde_json::json;

    struct StubRecipe {
        endpoints: Vec<&'static str>,
        marker: &'static str,
    }

    #[async_trait]
    impl Recipe for StubRecipe {
        fn endpoints(&self) -> &[&str] {
            &self.endpoints
        }

        async fn scrape(
            &self,
            _endpoint: &str,
            _page: &dyn PageHandle,
            _params: &Params,
        ) -> Result<ScrapeResult> {
            let mut record = Record::new();
            record.insert("from".into(), json!(self.marker));
            Ok(ScrapeResult::single(record))
        }
    }

    fn stub(endpoints: Vec<&'static str>, marker: &'static str) -> Box<dyn Recipe> {
        Box::new(StubRecipe { endpoints, marker })
    }

    #[test]
    fn test_supports_is_pure_membership() {
        let recipe = StubRecipe {
            endpoints: vec!["de-en", "en-de"],
            marker: "t",
        };
        assert!(recipe.supports("de-en"));
        assert!(recipe.supports("en-de"));
        assert!(!recipe.supports("search"));
    }

    #[tokio::test]
    async fn test_dispatch_routes_to_claiming_recipe() {
        let mut registry = Registry::new();
        registry.register(stub(vec!["search"], "brave")).unwrap();
        registry.register(stub(vec!["posts"], "x")).unwrap();

        let page = FakePage::new();
        let result = registry
            .dispatch("posts", &page, &Params::default())
            .await
            .unwrap();
        assert_eq!(result.items[0]["from"], json!("x"));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_endpoint_is_distinct_failure() {
        let mut registry = Registry::new();
        registry.register(stub(vec!["search"], "brave")).unwrap();

        let page = FakePage::new();
        let err = registry
            .dispatch("article", &page, &Params::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PagesiftError::UnsupportedEndpoint(_)));
    }

    #[test]
    fn test_register_rejects_overlapping_endpoints() {
        let mut registry = Registry::new();
        registry
            .register(stub(vec!["search", "article"], "wikipedia"))
            .unwrap();
        let err = registry
            .register(stub(vec!["search"], "brave"))
            .unwrap_err();
        assert!(matches!(err, PagesiftError::Config(_)));
        // The conflicting recipe was not registered
        assert_eq!(registry.endpoints(), vec!["search", "article"]);
    }
}
