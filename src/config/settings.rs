//! Application settings and configuration
//!
//! This module provides configuration management for the application,
//! loading settings from environment variables with sensible defaults.
//! Upstream credentials are read here once and handed to the clients
//! explicitly; nothing else in the crate touches the environment.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Application environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[value(alias = "dev")]
    Development,
    #[value(alias = "stage")]
    Staging,
    #[value(alias = "prod")]
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Development
    }
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => anyhow::bail!(
                "Invalid environment: {}. Expected: development, staging, or production",
                s
            ),
        }
    }
}

/// GitHub GraphQL API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubConfig {
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,
    pub graphql_url: String,
    pub user_agent: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            auth_token: None,
            graphql_url: "https://api.github.com/graphql".to_string(),
            user_agent: "docs-sponsors".to_string(),
        }
    }
}

/// Airtable base holding the sponsor metadata and the tier mirror
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AirtableConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_id: Option<String>,
    pub base_url: String,
    pub sponsors_table: String,
    pub tiers_table: String,
}

impl Default for AirtableConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_id: None,
            base_url: "https://api.airtable.com".to_string(),
            sponsors_table: "sponsors".to_string(),
            tiers_table: "tiers".to_string(),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_window: u32,
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_window: 30,
            window_seconds: 60,
        }
    }
}

/// Docs navigation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocsSettings {
    /// JSON file holding the shared docs configuration (`{ "menu": [...], ... }`)
    pub config_path: Option<PathBuf>,
    pub repository_url: String,
    pub discord_url: String,
}

impl Default for DocsSettings {
    fn default() -> Self {
        Self {
            config_path: None,
            repository_url: "https://github.com/tanstack/router".to_string(),
            discord_url: "https://tlinz.com/discord".to_string(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    // App settings
    pub app_name: String,
    pub app_version: String,
    pub environment: Environment,
    pub log_level: String,

    // Server settings
    pub host: String,
    pub port: u16,

    // Upstream services
    pub github: GithubConfig,
    pub airtable: AirtableConfig,
    /// Applied to every upstream request; there is no other timeout or retry.
    pub http_timeout_seconds: u64,

    // Authentication
    pub require_api_key: bool,
    #[serde(skip_serializing)]
    pub api_keys: Vec<String>,

    // Rate limiting
    pub rate_limit: RateLimitConfig,

    // Docs navigation
    pub docs: DocsSettings,

    /// Ephemeral API key (generated at startup, valid for this process only)
    #[serde(skip)]
    pub ephemeral_api_key: Option<String>,
}

impl Settings {
    /// Load settings from environment variables with defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignored in production typically)
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let settings = Self {
            app_name: env_or_default("APP_NAME", &defaults.app_name),
            app_version: defaults.app_version,
            environment: env_or_default("ENVIRONMENT", "development")
                .parse()
                .unwrap_or_default(),
            log_level: env_or_default("LOG_LEVEL", "info"),

            host: env_or_default("HOST", &defaults.host),
            port: env_or_default("PORT", "8000")
                .parse()
                .context("Invalid PORT value")?,

            github: GithubConfig {
                auth_token: env_non_empty("GITHUB_AUTH_TOKEN"),
                graphql_url: env_or_default("GITHUB_GRAPHQL_URL", &defaults.github.graphql_url),
                user_agent: env_or_default("GITHUB_USER_AGENT", &defaults.github.user_agent),
            },
            airtable: AirtableConfig {
                api_key: env_non_empty("AIRTABLE_API_KEY"),
                base_id: env_non_empty("AIRTABLE_BASE_ID"),
                base_url: env_or_default("AIRTABLE_URL", &defaults.airtable.base_url),
                sponsors_table: env_or_default(
                    "AIRTABLE_SPONSORS_TABLE",
                    &defaults.airtable.sponsors_table,
                ),
                tiers_table: env_or_default("AIRTABLE_TIERS_TABLE", &defaults.airtable.tiers_table),
            },
            http_timeout_seconds: env_or_default("HTTP_TIMEOUT_SECONDS", "30")
                .parse()
                .context("Invalid HTTP_TIMEOUT_SECONDS value")?,

            require_api_key: env_or_default("REQUIRE_API_KEY", "true")
                .parse()
                .unwrap_or(true),
            api_keys: parse_key_list(&env_or_default("API_KEYS", "")),

            rate_limit: RateLimitConfig {
                enabled: env_or_default("RATE_LIMIT_ENABLED", "true")
                    .parse()
                    .unwrap_or(true),
                requests_per_window: env_or_default("RATE_LIMIT_REQUESTS_PER_WINDOW", "30")
                    .parse()
                    .unwrap_or(30),
                window_seconds: env_or_default("RATE_LIMIT_WINDOW_SECONDS", "60")
                    .parse()
                    .unwrap_or(60),
            },

            docs: DocsSettings {
                config_path: env_non_empty("DOCS_CONFIG_PATH").map(PathBuf::from),
                repository_url: env_or_default("DOCS_REPOSITORY_URL", &defaults.docs.repository_url),
                discord_url: env_or_default("DOCS_DISCORD_URL", &defaults.docs.discord_url),
            },

            ephemeral_api_key: None,
        };

        settings.validate()?;

        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("Port cannot be 0");
        }

        if self.http_timeout_seconds == 0 {
            anyhow::bail!("HTTP_TIMEOUT_SECONDS must be > 0");
        }

        if self.rate_limit.enabled {
            if self.rate_limit.requests_per_window == 0 {
                anyhow::bail!("Rate limit requests_per_window must be > 0");
            }
            if self.rate_limit.window_seconds == 0 {
                anyhow::bail!("Rate limit window_seconds must be > 0");
            }
        }

        if !self.sponsors_configured() {
            if self.is_production() {
                anyhow::bail!(
                    "GITHUB_AUTH_TOKEN, AIRTABLE_API_KEY and AIRTABLE_BASE_ID are required in production"
                );
            }
            tracing::warn!("Sponsor services are not fully configured; the sponsors endpoint will answer 503");
        }

        if self.environment == Environment::Production && !self.require_api_key {
            tracing::warn!("Running in production without API key authentication!");
        }

        Ok(())
    }

    /// Whether every credential needed by the sponsor aggregation is present
    pub fn sponsors_configured(&self) -> bool {
        self.github.auth_token.is_some()
            && self.airtable.api_key.is_some()
            && self.airtable.base_id.is_some()
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Get the server address string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Generate and set an ephemeral API key
    /// Returns the generated key
    pub fn generate_ephemeral_key(&mut self) -> String {
        let key = format!("ds-{}", uuid::Uuid::new_v4().simple());
        self.ephemeral_api_key = Some(key.clone());
        key
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "docs-sponsors".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: Environment::Development,
            log_level: "info".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            github: GithubConfig::default(),
            airtable: AirtableConfig::default(),
            http_timeout_seconds: 30,
            require_api_key: true,
            api_keys: Vec::new(),
            rate_limit: RateLimitConfig::default(),
            docs: DocsSettings::default(),
            ephemeral_api_key: None,
        }
    }
}

/// Helper function to get environment variable with default
fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Environment variable, treating an empty value as unset
fn env_non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Comma separated list of API keys
fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}
