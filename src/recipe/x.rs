//! X (Twitter) timeline recipe: authenticated retrieval via the `bird` CLI.
//!
//! The site itself is too hostile to scrape from a page handle; instead the
//! recipe shells out to the `bird` tool, which emits a JSON array of tweets
//! on stdout (after optional diagnostic preamble lines) and human-readable
//! errors on stderr.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;

use crate::app::{PagesiftError, Result};
use crate::model::{Record, ScrapeResult};
use crate::page::PageHandle;
use crate::recipe::Recipe;
use crate::toolkit::Params;

const ENDPOINTS: &[&str] = &["posts"];

const AUTH_TOKEN_ENV: &str = "BIRD_AUTH_TOKEN";
const CT0_ENV: &str = "BIRD_CT0";
const AUTH_FILE_NAME: &str = ".bird_auth";

const TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// The two secrets `bird` needs for authenticated API access.
#[derive(Debug, Clone)]
pub struct BirdAuth {
    pub auth_token: String,
    pub ct0: String,
}

impl BirdAuth {
    /// Resolve credentials once at startup: environment first, then
    /// `~/.bird_auth` with `KEY=value` lines.
    pub fn resolve() -> Option<Self> {
        if let Some(auth) = Self::from_env() {
            return Some(auth);
        }
        let path = dirs::home_dir()?.join(AUTH_FILE_NAME);
        Self::from_file(&path)
    }

    pub fn from_env() -> Option<Self> {
        let auth_token = std::env::var(AUTH_TOKEN_ENV).ok()?;
        let ct0 = std::env::var(CT0_ENV).ok()?;
        if auth_token.is_empty() || ct0.is_empty() {
            return None;
        }
        Some(Self { auth_token, ct0 })
    }

    pub fn from_file(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        let mut auth_token = None;
        let mut ct0 = None;
        for line in content.lines() {
            let line = line.trim();
            if let Some(value) = line.strip_prefix("AUTH_TOKEN=") {
                auth_token = Some(value.to_string());
            } else if let Some(value) = line.strip_prefix("CT0=") {
                ct0 = Some(value.to_string());
            }
        }
        match (auth_token, ct0) {
            (Some(auth_token), Some(ct0)) if !auth_token.is_empty() && !ct0.is_empty() => {
                Some(Self { auth_token, ct0 })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Seam over subprocess execution so tests can fake the external tool.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String], timeout: Duration)
        -> Result<CommandOutput>;
}

/// Real runner on top of `tokio::process` with a bounded execution time.
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandOutput> {
        let output = tokio::time::timeout(timeout, Command::new(program).args(args).output())
            .await
            .map_err(|_| PagesiftError::Timeout(format!("{program} did not finish")))?
            .map_err(|e| PagesiftError::ExternalTool(format!("failed to run {program}: {e}")))?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Fetches a user's timeline through the `bird` CLI.
pub struct XRecipe {
    auth: Option<BirdAuth>,
    runner: Box<dyn CommandRunner>,
    timeout: Duration,
}

impl XRecipe {
    /// Credentials are resolved by the caller at startup and handed in
    /// explicitly; `None` makes every `posts` request fail with
    /// `ConfigurationMissing` before any subprocess runs.
    pub fn new(auth: Option<BirdAuth>) -> Self {
        Self {
            auth,
            runner: Box::new(TokioCommandRunner),
            timeout: TOOL_TIMEOUT,
        }
    }

    pub fn from_env() -> Self {
        Self::new(BirdAuth::resolve())
    }

    pub fn with_runner(auth: Option<BirdAuth>, runner: Box<dyn CommandRunner>) -> Self {
        Self {
            auth,
            runner,
            timeout: TOOL_TIMEOUT,
        }
    }

    /// Map one tweet object from the tool into the uniform item shape.
    fn map_tweet(tweet: &Value, fallback_user: &str) -> Record {
        let author = tweet["author"]["username"]
            .as_str()
            .unwrap_or(fallback_user)
            .to_string();
        let text = tweet["text"].as_str().unwrap_or_default();

        let mut record = Record::new();
        record.insert("text".into(), json!(text));
        record.insert("author".into(), json!(author));
        record.insert(
            "author_name".into(),
            json!(tweet["author"]["name"].as_str().unwrap_or_default()),
        );
        record.insert(
            "timestamp".into(),
            json!(tweet["createdAt"].as_str().unwrap_or_default()),
        );
        record.insert(
            "url".into(),
            json!(format!(
                "https://x.com/{author}/status/{}",
                tweet["id"].as_str().unwrap_or_default()
            )),
        );

        for (field, key) in [
            ("replies", "replyCount"),
            ("reposts", "retweetCount"),
            ("likes", "likeCount"),
            ("views", "viewCount"),
        ] {
            if let Some(n) = tweet[key].as_u64() {
                record.insert(field.into(), json!(n));
            }
        }

        // The tool does not flag retweets; the RT prefix is the only signal
        record.insert("is_retweet".into(), json!(text.starts_with("RT @")));

        record
    }

    /// The tool prints diagnostic lines before the payload; the first `[`
    /// starts the JSON array.
    fn parse_tool_output(stdout: &str, username: &str) -> Result<Vec<Value>> {
        let start = stdout.find('[').ok_or_else(|| {
            PagesiftError::ExternalTool(format!("no JSON output from bird for @{username}"))
        })?;
        serde_json::from_str(&stdout[start..]).map_err(|e| {
            PagesiftError::ExternalTool(format!("unparseable bird output for @{username}: {e}"))
        })
    }
}

#[async_trait]
impl Recipe for XRecipe {
    fn endpoints(&self) -> &[&str] {
        ENDPOINTS
    }

    async fn scrape(
        &self,
        _endpoint: &str,
        _page: &dyn PageHandle,
        params: &Params,
    ) -> Result<ScrapeResult> {
        let username = params.require_query("username")?.trim_start_matches('@');
        if username.is_empty() {
            return Err(PagesiftError::InvalidRequest(
                "Missing username: pass query=<username>".to_string(),
            ));
        }
        let count = params.count(10, 50);

        let auth = self.auth.as_ref().ok_or_else(|| {
            PagesiftError::ConfigurationMissing(format!(
                "X credentials unavailable: set {AUTH_TOKEN_ENV} and {CT0_ENV} or create ~/{AUTH_FILE_NAME}"
            ))
        })?;

        let args = vec![
            "user-tweets".to_string(),
            username.to_string(),
            "-n".to_string(),
            count.to_string(),
            "--json".to_string(),
            "--auth-token".to_string(),
            auth.auth_token.clone(),
            "--ct0".to_string(),
            auth.ct0.clone(),
        ];

        tracing::debug!("running bird user-tweets for @{username} (count {count})");
        let output = self.runner.run("bird", &args, self.timeout).await?;

        if !output.success {
            let stderr = output.stderr.trim();
            let lower = stderr.to_lowercase();
            if lower.contains("could not find user") || lower.contains("not found") {
                return Err(PagesiftError::NotFound(format!(
                    "Account @{username} not found"
                )));
            }
            return Err(PagesiftError::ExternalTool(format!(
                "bird failed: {stderr}"
            )));
        }

        let tweets = Self::parse_tool_output(&output.stdout, username)?;

        let items = tweets
            .iter()
            .take(count)
            .map(|tweet| Self::map_tweet(tweet, username))
            .collect();

        // Strictly more raw entries than requested means the timeline
        // continues past this batch
        let has_next = tweets.len() > count;

        Ok(ScrapeResult::new(items, 1, has_next))
    }
}
