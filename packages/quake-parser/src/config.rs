//! Configuration.
//!
//! `PipelineConfig` and `InferenceConfig` are plain structs with defaults and
//! `with_*` builders for library use. `AppConfig` assembles everything the
//! binary needs from environment variables.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ParserError, Result};
use crate::inference::PromptBudget;
use crate::security::SecretString;

/// Batch processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Records loaded per `process_downloaded` call. Default: 100.
    pub batch_limit: usize,

    /// Records processed at once. Default: 1 (strictly sequential).
    pub concurrency: usize,

    /// Deadline for one inference call, in seconds. Default: 120.
    pub inference_timeout_secs: u64,

    /// Deadline for one extraction run, in seconds. Default: 10.
    pub extraction_timeout_secs: u64,

    /// Re-infer even when a schema is stored for the domain. Default: false.
    pub force_reinfer: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_limit: 100,
            concurrency: 1,
            inference_timeout_secs: 120,
            extraction_timeout_secs: 10,
            force_reinfer: false,
        }
    }
}

impl PipelineConfig {
    pub fn with_batch_limit(mut self, limit: usize) -> Self {
        self.batch_limit = limit;
        self
    }

    /// Set the worker count. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_inference_timeout(mut self, secs: u64) -> Self {
        self.inference_timeout_secs = secs;
        self
    }

    pub fn with_extraction_timeout(mut self, secs: u64) -> Self {
        self.extraction_timeout_secs = secs;
        self
    }

    pub fn with_force_reinfer(mut self, force: bool) -> Self {
        self.force_reinfer = force;
        self
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference_timeout_secs)
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }
}

/// Model endpoint and prompt budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// OpenAI-compatible API root. Default: `https://api.openai.com/v1`.
    pub base_url: String,

    /// Default: `gpt-4o`.
    pub model: String,

    /// Prompt ceiling in tokens. Default: 80000.
    pub max_prompt_tokens: usize,

    /// Tokenizer endpoint; the character heuristic is used when unset.
    pub tokenizer_url: Option<String>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            max_prompt_tokens: 80_000,
            tokenizer_url: None,
        }
    }
}

impl InferenceConfig {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_prompt_tokens(mut self, max: usize) -> Self {
        self.max_prompt_tokens = max;
        self
    }

    pub fn with_tokenizer_url(mut self, url: impl Into<String>) -> Self {
        self.tokenizer_url = Some(url.into());
        self
    }

    pub fn budget(&self) -> PromptBudget {
        PromptBudget::new(self.max_prompt_tokens)
    }
}

/// How raw HTML is obtained.
#[derive(Debug, Clone)]
pub enum FetchStrategy {
    /// Plain HTTP GET
    Http,
    /// Remote browser rendering through Firecrawl
    Firecrawl { api_key: SecretString },
}

/// Everything the binary needs, loaded from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub openai_api_key: SecretString,
    pub inference: InferenceConfig,
    pub pipeline: PipelineConfig,
    pub database_url: String,
    pub blob_root: PathBuf,
    pub fetch: FetchStrategy,
    /// Fetch requests per second
    pub fetch_rate_limit: u32,
    pub tavily_api_key: Option<SecretString>,
    /// Keyword file for the search stage; search is skipped when unset.
    pub keywords_file: Option<PathBuf>,
    pub search_site_filter: Option<String>,
    /// Results requested per keyword. Default: 10.
    pub search_max_results: usize,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is read first when present.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_api_key = get("OPENAI_API_KEY")
            .map(SecretString::from)
            .ok_or_else(|| ParserError::Config("OPENAI_API_KEY must be set".into()))?;

        let defaults = InferenceConfig::default();
        let inference = InferenceConfig {
            base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            model: get("OPENAI_MODEL").unwrap_or(defaults.model),
            max_prompt_tokens: parse_or(&get, "MAX_PROMPT_TOKENS", defaults.max_prompt_tokens)?,
            tokenizer_url: get("TOKENIZER_URL"),
        };

        let defaults = PipelineConfig::default();
        let pipeline = PipelineConfig {
            batch_limit: parse_or(&get, "BATCH_LIMIT", defaults.batch_limit)?,
            concurrency: parse_or(&get, "PIPELINE_CONCURRENCY", defaults.concurrency)?.max(1),
            inference_timeout_secs: parse_or(
                &get,
                "INFERENCE_TIMEOUT_SECS",
                defaults.inference_timeout_secs,
            )?,
            extraction_timeout_secs: parse_or(
                &get,
                "EXTRACTION_TIMEOUT_SECS",
                defaults.extraction_timeout_secs,
            )?,
            force_reinfer: parse_or(&get, "FORCE_REINFER", defaults.force_reinfer)?,
        };

        let fetch = match get("FETCH_STRATEGY").as_deref().unwrap_or("http") {
            "http" => FetchStrategy::Http,
            "firecrawl" => FetchStrategy::Firecrawl {
                api_key: get("FIRECRAWL_API_KEY").map(SecretString::from).ok_or_else(|| {
                    ParserError::Config(
                        "FIRECRAWL_API_KEY must be set when FETCH_STRATEGY=firecrawl".into(),
                    )
                })?,
            },
            other => {
                return Err(ParserError::Config(format!(
                    "FETCH_STRATEGY must be http or firecrawl, got {}",
                    other
                )))
            }
        };

        Ok(Self {
            openai_api_key,
            inference,
            pipeline,
            database_url: get("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://quake-parser.db?mode=rwc".to_string()),
            blob_root: get("BLOB_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./storage")),
            fetch,
            fetch_rate_limit: parse_or(&get, "FETCH_RATE_LIMIT", 2)?,
            tavily_api_key: get("TAVILY_API_KEY").map(SecretString::from),
            keywords_file: get("KEYWORDS_FILE").map(PathBuf::from),
            search_site_filter: get("SEARCH_SITE_FILTER"),
            search_max_results: parse_or(&get, "SEARCH_MAX_RESULTS", 10)?,
        })
    }
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ParserError::Config(format!("{} must be a valid value, got {}", key, raw))),
        None => Ok(default),
    }
}
