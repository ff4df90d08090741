use std::collections::HashMap;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pagesift::cli::{Cli, Commands, Site};
use pagesift::config::Config;
use pagesift::page::ChromeSession;
use pagesift::recipe::{BraveRecipe, DeeplRecipe, Recipe, Registry, WikipediaRecipe, XRecipe};
use pagesift::toolkit::Params;

fn build_recipe(site: Site, config: &Config) -> Box<dyn Recipe> {
    match site {
        Site::Brave => Box::new(BraveRecipe::new(config.brave.clone())),
        Site::Deepl => Box::new(DeeplRecipe::new(config.poll.clone())),
        Site::Wikipedia => Box::new(WikipediaRecipe::new(config.wikipedia.clone())),
        Site::X => Box::new(XRecipe::from_env()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Endpoints => {
            for site in Site::all() {
                let recipe = build_recipe(site, &config);
                println!("{}: {}", site.name(), recipe.endpoints().join(", "));
            }
        }
        Commands::Scrape {
            site,
            endpoint,
            query,
            count,
            page,
        } => {
            let mut registry = Registry::new();
            registry.register(build_recipe(site, &config))?;

            let mut map = HashMap::new();
            map.insert("query".to_string(), query);
            if let Some(count) = count {
                map.insert("count".to_string(), count.to_string());
            }
            if let Some(page) = page {
                map.insert("page".to_string(), page.to_string());
            }
            let params = Params::new(map);

            let mut browser_settings = config.browser.clone();
            if cli.headful {
                browser_settings.headless = false;
            }

            let session = ChromeSession::launch(browser_settings).await?;
            let page_handle = session.new_page().await?;

            let outcome = registry.dispatch(&endpoint, &page_handle, &params).await;
            session.close().await?;

            let result = outcome?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
