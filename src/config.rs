use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// SchoolPick teacher console - session tools
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Base URL of the SchoolPick API
    #[arg(short = 'u', long, env = "SCHOOLPICK_API_URL", default_value = "http://localhost:8000")]
    pub api_url: String,

    /// Runtime environment (development, production)
    #[arg(long, env = "APP_ENV", default_value = "production")]
    pub app_env: String,

    /// Clear stored credentials on startup in development until a login happens
    #[arg(long, env = "CLEAR_TOKEN_ON_START", default_value_t = true, action = clap::ArgAction::Set)]
    pub clear_token_on_start: bool,

    /// Path to the durable session storage file
    #[arg(short = 's', long, env = "SCHOOLPICK_STORAGE_FILE")]
    pub storage_file: Option<String>,

    /// Session validation timeout in seconds
    #[arg(long, env = "VALIDATE_TIMEOUT", default_value = "5")]
    pub validate_timeout: u64,

    /// Logout notification timeout in seconds
    #[arg(long, env = "LOGOUT_TIMEOUT", default_value = "3")]
    pub logout_timeout: u64,

    /// Login request timeout in seconds
    #[arg(long, env = "LOGIN_TIMEOUT", default_value = "30")]
    pub login_timeout: u64,

    /// Profile fetch timeout in seconds
    #[arg(long, env = "PROFILE_TIMEOUT", default_value = "10")]
    pub profile_timeout: u64,

    /// API client request timeout in seconds
    #[arg(long, env = "API_TIMEOUT", default_value = "30")]
    pub api_timeout: u64,

    /// Max retries for API client requests
    #[arg(long, env = "HTTP_MAX_RETRIES", default_value = "2")]
    pub http_retries: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Sign in and store the session
    Login {
        #[arg(short, long)]
        email: Option<String>,
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Notify the server and clear the stored session
    Logout,
    /// Show the stored session without touching the network
    Status,
    /// Run startup validation as if the app was opened at PATH
    Validate {
        #[arg(default_value = "/dashboard")]
        path: String,
    },
    /// Navigate to PATH through the route guard
    Open { path: String },
    /// GET an API endpoint (relative to /api) with the stored token
    Get { endpoint: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    // Remote API
    pub api_base_url: String,

    // Environment
    pub app_env: AppEnv,
    pub clear_token_on_start: bool,

    // Storage
    pub storage_file: PathBuf,

    // Timeouts
    pub validate_timeout: Duration,
    pub logout_timeout: Duration,
    pub login_timeout: Duration,
    pub profile_timeout: Duration,

    // API client
    pub api_timeout: Duration,
    pub http_max_retries: u32,

    // Logging
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            app_env: AppEnv::Production,
            clear_token_on_start: true,
            storage_file: default_storage_file(),
            validate_timeout: Duration::from_secs(5),
            logout_timeout: Duration::from_secs(3),
            login_timeout: Duration::from_secs(30),
            profile_timeout: Duration::from_secs(10),
            api_timeout: Duration::from_secs(30),
            http_max_retries: 2,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Load CLI arguments with priority: CLI > ENV (.env included) > defaults
    pub fn load() -> Result<(Self, Command)> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        let config = Self::from_args(&args)?;
        Ok((config, args.command))
    }

    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let config = Config {
            api_base_url: args.api_url.trim_end_matches('/').to_string(),
            app_env: parse_app_env(&args.app_env),
            clear_token_on_start: args.clear_token_on_start,
            storage_file: args
                .storage_file
                .as_deref()
                .map(expand_tilde)
                .unwrap_or_else(default_storage_file),
            validate_timeout: Duration::from_secs(args.validate_timeout),
            logout_timeout: Duration::from_secs(args.logout_timeout),
            login_timeout: Duration::from_secs(args.login_timeout),
            profile_timeout: Duration::from_secs(args.profile_timeout),
            api_timeout: Duration::from_secs(args.api_timeout),
            http_max_retries: args.http_retries,
            log_level: args.log_level.clone(),
            log_format: parse_log_format(&args.log_format),
        };

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            anyhow::bail!(
                "SCHOOLPICK_API_URL must start with http:// or https://: {}",
                self.api_base_url
            );
        }

        for (name, value) in [
            ("VALIDATE_TIMEOUT", self.validate_timeout),
            ("LOGOUT_TIMEOUT", self.logout_timeout),
            ("LOGIN_TIMEOUT", self.login_timeout),
            ("PROFILE_TIMEOUT", self.profile_timeout),
            ("API_TIMEOUT", self.api_timeout),
        ] {
            if value.is_zero() {
                anyhow::bail!("{} must be greater than zero", name);
            }
        }

        Ok(())
    }

    /// Development-only clear-on-start applies until this process has logged in
    pub fn should_clear_on_start(&self, has_logged_in: bool) -> bool {
        self.clear_token_on_start && self.app_env == AppEnv::Development && !has_logged_in
    }
}

/// Default durable storage location under the user's data directory
pub fn default_storage_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("schoolpick")
        .join("storage.json")
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse runtime environment from string
fn parse_app_env(s: &str) -> AppEnv {
    match s.to_lowercase().as_str() {
        "development" | "dev" => AppEnv::Development,
        _ => AppEnv::Production,
    }
}

/// Parse log format from string
fn parse_log_format(s: &str) -> LogFormat {
    match s.to_lowercase().as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    }
}
