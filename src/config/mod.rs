//! Configuration management
//!
//! This module handles loading and managing configuration from
//! TOML files, the environment and CLI arguments.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::core::constants::{defaults, endpoints, output_formats, timeouts};
use crate::core::error::{Result, SerpwatchError};
use crate::engine::{QuotaSpacing, RetryPolicy};

const CONFIG_FILE_NAME: &str = ".serpwatch.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Property to report on, e.g. `sc-domain:example.com`
    pub site: Option<String>,

    /// Root of the search analytics / URL inspection API
    pub api_base_url: Option<String>,

    /// Lab performance audit endpoint
    pub pagespeed_url: Option<String>,

    /// Field experience endpoint
    pub crux_url: Option<String>,

    /// Pre-issued OAuth access token, passed through as a bearer token
    pub access_token: Option<String>,

    /// API key for the page signal endpoints
    pub api_key: Option<String>,

    /// Timeout in seconds for HTTP requests
    pub timeout: Option<u64>,

    /// Total attempts per remote call, the first one included
    pub retry_attempts: Option<u32>,

    /// Base backoff delay in milliseconds
    pub retry_base_delay: Option<u64>,

    /// Upper bound of a single backoff delay in milliseconds
    pub retry_max_delay: Option<u64>,

    /// Maximum random jitter added to a backoff delay in milliseconds
    pub retry_jitter: Option<u64>,

    /// Minimum spacing between sequential URL inspections in milliseconds
    pub quota_spacing: Option<u64>,

    /// Rows requested per analytics query
    pub row_limit: Option<u32>,

    /// Query patterns (regex) left out of keyword-level reports
    pub exclude_queries: Option<Vec<String>>,

    /// Output format (text, json)
    pub output_format: Option<String>,

    /// Enable verbose logging
    pub verbose: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site: None,
            api_base_url: Some(endpoints::API_BASE_URL.to_string()),
            pagespeed_url: Some(endpoints::PAGESPEED_URL.to_string()),
            crux_url: Some(endpoints::CRUX_URL.to_string()),
            access_token: None,
            api_key: None,
            timeout: Some(timeouts::DEFAULT_TIMEOUT_SECONDS),
            retry_attempts: Some(defaults::RETRY_ATTEMPTS),
            retry_base_delay: Some(timeouts::DEFAULT_RETRY_BASE_DELAY_MS),
            retry_max_delay: Some(timeouts::DEFAULT_RETRY_MAX_DELAY_MS),
            retry_jitter: Some(timeouts::DEFAULT_RETRY_JITTER_MS),
            quota_spacing: Some(timeouts::DEFAULT_QUOTA_SPACING_MS),
            row_limit: Some(defaults::ROW_LIMIT),
            exclude_queries: None,
            output_format: Some(output_formats::DEFAULT.to_string()),
            verbose: Some(false),
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults for missing keys
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SerpwatchError::Config(format!(
                "Could not read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let parsed: Config = toml::from_str(&content).map_err(|e| {
            SerpwatchError::Config(format!(
                "Invalid TOML in config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config = Self::default().overlay(parsed);
        config.validate()?;
        Ok(config)
    }

    /// Try to find and load a config file in standard locations
    pub fn load_from_standard_locations() -> Self {
        if let Ok(config) = Self::load_from_file(CONFIG_FILE_NAME) {
            return config;
        }

        // Parent directories, up to 3 levels
        for i in 1..=3 {
            let path = format!("{}{CONFIG_FILE_NAME}", "../".repeat(i));
            if let Ok(config) = Self::load_from_file(&path) {
                return config;
            }
        }

        Self::default()
    }

    /// Keys set in `other` replace the ones in `self`.
    fn overlay(mut self, other: Config) -> Self {
        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(
            site,
            api_base_url,
            pagespeed_url,
            crux_url,
            access_token,
            api_key,
            timeout,
            retry_attempts,
            retry_base_delay,
            retry_max_delay,
            retry_jitter,
            quota_spacing,
            row_limit,
            exclude_queries,
            output_format,
            verbose,
        );
        self
    }

    /// Fill the access token from the environment when none is configured.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.access_token.is_none()
            && let Some(token) = lookup(endpoints::ACCESS_TOKEN_ENV).filter(|t| !t.is_empty())
        {
            self.access_token = Some(token);
        }
    }

    /// Merge this config with CLI arguments (CLI takes precedence)
    pub fn merge_with_cli(&mut self, cli_config: &CliConfig) {
        if let Some(ref site) = cli_config.site {
            self.site = Some(site.clone());
        }
        if let Some(timeout) = cli_config.timeout {
            self.timeout = Some(timeout);
        }

        // Retry & quota
        if let Some(retry_attempts) = cli_config.retry_attempts {
            self.retry_attempts = Some(retry_attempts);
        }
        if let Some(retry_delay) = cli_config.retry_base_delay {
            self.retry_base_delay = Some(retry_delay);
            // The cap never sits below a base delay given on the command line
            if self.retry_max_delay.is_some_and(|max| max < retry_delay) {
                self.retry_max_delay = Some(retry_delay);
            }
        }
        if let Some(quota_spacing) = cli_config.quota_spacing {
            self.quota_spacing = Some(quota_spacing);
        }
        if let Some(row_limit) = cli_config.row_limit {
            self.row_limit = Some(row_limit);
        }
        if let Some(ref patterns) = cli_config.exclude_queries {
            self.exclude_queries = Some(patterns.clone());
        }

        // Output & format
        if cli_config.verbose {
            self.verbose = Some(true);
        }
        if let Some(ref output_format) = cli_config.output_format {
            self.output_format = Some(output_format.clone());
        }
    }

    /// Compile query exclusion patterns into regex objects
    pub fn compile_exclude_queries(&self) -> Result<Vec<Regex>> {
        let mut compiled = Vec::new();
        if let Some(ref patterns) = self.exclude_queries {
            for pattern in patterns {
                compiled.push(Regex::new(pattern)?);
            }
        }
        Ok(compiled)
    }

    /// Site to report on, required by every command
    pub fn require_site(&self) -> Result<&str> {
        self.site
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                SerpwatchError::Config(
                    "No site configured. Pass --site or set `site` in .serpwatch.toml.".to_string(),
                )
            })
    }

    /// Get timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(timeouts::DEFAULT_TIMEOUT_SECONDS))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts.unwrap_or(defaults::RETRY_ATTEMPTS),
            base_delay: Duration::from_millis(
                self.retry_base_delay
                    .unwrap_or(timeouts::DEFAULT_RETRY_BASE_DELAY_MS),
            ),
            max_delay: Duration::from_millis(
                self.retry_max_delay
                    .unwrap_or(timeouts::DEFAULT_RETRY_MAX_DELAY_MS),
            ),
            jitter: Duration::from_millis(
                self.retry_jitter.unwrap_or(timeouts::DEFAULT_RETRY_JITTER_MS),
            ),
        }
    }

    pub fn quota_spacing(&self) -> QuotaSpacing {
        QuotaSpacing::from_millis(
            self.quota_spacing
                .unwrap_or(timeouts::DEFAULT_QUOTA_SPACING_MS),
        )
    }

    pub fn row_limit(&self) -> u32 {
        self.row_limit.unwrap_or(defaults::ROW_LIMIT)
    }

    pub fn is_json_output(&self) -> bool {
        self.output_format.as_deref() == Some(output_formats::JSON)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err(SerpwatchError::Config(
                    "Timeout cannot be 0. Expected a positive integer representing seconds."
                        .to_string(),
                ));
            }
            if timeout > 3600 {
                return Err(SerpwatchError::Config(format!(
                    "Timeout of {timeout} seconds is extremely large (>1 hour). Consider using a smaller value."
                )));
            }
        }

        if let Some(attempts) = self.retry_attempts {
            if attempts == 0 {
                return Err(SerpwatchError::Config(
                    "Retry attempts cannot be 0. Use 1 to disable retries.".to_string(),
                ));
            }
            if attempts > 10 {
                return Err(SerpwatchError::Config(format!(
                    "Retry attempts of {attempts} is very high and may exhaust the API quota. Consider using a smaller value."
                )));
            }
        }

        if let (Some(base), Some(max)) = (self.retry_base_delay, self.retry_max_delay)
            && max < base
        {
            return Err(SerpwatchError::Config(format!(
                "Retry max delay ({max}ms) must not be smaller than the base delay ({base}ms)."
            )));
        }

        if let Some(row_limit) = self.row_limit
            && (row_limit == 0 || row_limit > defaults::MAX_ROW_LIMIT)
        {
            return Err(SerpwatchError::Config(format!(
                "Row limit {row_limit} is out of range. Expected a value between 1-{}.",
                defaults::MAX_ROW_LIMIT
            )));
        }

        if let Some(ref format) = self.output_format
            && !output_formats::ALL.contains(&format.as_str())
        {
            return Err(SerpwatchError::Config(format!(
                "Invalid output format '{format}'. Expected one of: {}.",
                output_formats::ALL.join(", ")
            )));
        }

        for url in [&self.api_base_url, &self.pagespeed_url, &self.crux_url]
            .into_iter()
            .flatten()
        {
            if reqwest::Url::parse(url).is_err() {
                return Err(SerpwatchError::Config(format!(
                    "'{url}' is not a valid URL."
                )));
            }
        }

        self.compile_exclude_queries()?;

        Ok(())
    }
}

/// Configuration options that can come from CLI
#[derive(Debug, Default)]
pub struct CliConfig {
    pub site: Option<String>,            // --site
    pub timeout: Option<u64>,            // --timeout
    pub retry_attempts: Option<u32>,     // --retry
    pub retry_base_delay: Option<u64>,   // --retry-delay
    pub quota_spacing: Option<u64>,      // --quota-spacing
    pub row_limit: Option<u32>,          // --row-limit
    pub exclude_queries: Option<Vec<String>>, // --exclude-query

    // Output & format
    pub quiet: bool,                   // --quiet
    pub verbose: bool,                 // --verbose
    pub output_format: Option<String>, // --format
    pub no_progress: bool,             // --no-progress

    // Configuration
    pub config_file: Option<String>, // --config
    pub no_config: bool,             // --no-config
}
