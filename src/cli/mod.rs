use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "pagesift")]
#[command(about = "Extract structured records from live web pages", long_about = None)]
pub struct Cli {
    /// Run the browser with a visible window
    #[arg(long, global = true)]
    pub headful: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one extraction against a site and print the result as JSON
    Scrape {
        /// Target site
        #[arg(value_enum)]
        site: Site,

        /// Endpoint the site recipe claims (e.g. search, article, posts, en-de)
        endpoint: String,

        /// Free text: search query, article title, account handle or source text
        #[arg(short, long)]
        query: String,

        /// Requested item cap
        #[arg(short, long)]
        count: Option<u32>,

        /// 1-based page number
        #[arg(short, long)]
        page: Option<u32>,
    },
    /// List the endpoints each site recipe claims
    Endpoints,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum Site {
    Brave,
    Deepl,
    Wikipedia,
    X,
}

impl Site {
    pub fn all() -> [Site; 4] {
        [Site::Brave, Site::Deepl, Site::Wikipedia, Site::X]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Site::Brave => "brave",
            Site::Deepl => "deepl",
            Site::Wikipedia => "wikipedia",
            Site::X => "x",
        }
    }
}
