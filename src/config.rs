use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::locale::Locale;

/// gd-session - keeps a data generator session alive
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// GraphQL endpoint of the generator API
    #[arg(short = 'u', long, env = "GD_API_URL")]
    pub api_url: Option<String>,

    /// Account email; with --password, logs in when no session can be restored
    #[arg(short, long, env = "GD_EMAIL")]
    pub email: Option<String>,

    /// Account password
    #[arg(short, long, env = "GD_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// UI locale (de, en, es, fr, ja, nl, ta, zh)
    #[arg(short, long, env = "GD_LOCALE", default_value = "en")]
    pub locale: String,

    /// Directory holding <locale>.json string files
    #[arg(long, env = "GD_LOCALE_DIR")]
    pub locale_dir: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "30")]
    pub http_timeout: u64,

    /// HTTP max retries
    #[arg(long, env = "HTTP_MAX_RETRIES", default_value = "2")]
    pub http_retries: u32,
}

#[derive(Clone, Debug)]
pub struct Config {
    // API
    pub api_url: String,

    // Credentials
    pub email: Option<String>,
    pub password: Option<String>,

    // Strings
    pub locale: String,
    pub locale_dir: Option<PathBuf>,

    // Timeouts
    pub token_refresh_lead: u64,

    // HTTP client
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,
    pub http_max_retries: u32,

    // Logging
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        Self::from_args(args)
    }

    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Config {
            api_url: args
                .api_url
                .context("GD_API_URL is required (use -u or set GD_API_URL env var)")?,

            email: args.email,
            password: args.password,

            locale: args.locale,
            locale_dir: args.locale_dir.map(PathBuf::from),

            token_refresh_lead: env_or("TOKEN_REFRESH_LEAD", 60),

            http_connect_timeout: env_or("HTTP_CONNECT_TIMEOUT", 10),
            http_request_timeout: args.http_timeout,
            http_max_retries: args.http_retries,

            log_level: args.log_level,
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            anyhow::bail!("GD_API_URL must be an http(s) URL: {}", self.api_url);
        }

        self.parsed_locale()?;

        if self.email.is_some() != self.password.is_some() {
            anyhow::bail!("GD_EMAIL and GD_PASSWORD must be given together");
        }

        Ok(())
    }

    pub fn parsed_locale(&self) -> Result<Locale> {
        self.locale
            .parse()
            .with_context(|| format!("Invalid GD_LOCALE: {}", self.locale))
    }

    /// Email and password, when both are configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.email, &self.password) {
            (Some(email), Some(password)) => Some((email.as_str(), password.as_str())),
            _ => None,
        }
    }
}

fn env_or(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
