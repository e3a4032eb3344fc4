//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. A `.env` file in the working directory (or a parent) is loaded into the
//!    process environment, without overriding variables that are already set
//! 2. Attempts to load from environment variables
//! 3. If incomplete, falls back to loading from file
//! 4. Probes multiple paths for config files
//! 5. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! Required:
//! - `HCHB_CLIENT_ID`: Agency client id
//! - `HCHB_RESOURCE_SECURITY_ID`: Resource security id
//! - `HCHB_AGENCY_SECRET`: Agency secret
//! - `HCHB_TOKEN_URL`: Token endpoint
//! - `HCHB_API_BASE_URL`: FHIR API base URL
//!
//! Optional:
//! - `EXPORT_JSON`: Write fetched patients to disk (true/false)
//! - `FHIRPULL_EXPORT_DIR`: Export directory
//! - `FHIRPULL_TOKEN_SCOPE`: Token scope
//! - `FHIRPULL_REQUEST_TIMEOUT_SECS`, `FHIRPULL_MAX_CONCURRENT_REQUESTS`
//! - `FHIRPULL_MAX_ATTEMPTS`, `FHIRPULL_BASE_DELAY_MS`, `FHIRPULL_MAX_DELAY_MS`
//! - `FHIRPULL_TOKEN_MAX_USES`, `FHIRPULL_TOKEN_MAX_AGE_SECS`
//! - `FHIRPULL_PAGE_SIZE`, `FHIRPULL_MAX_PAGES`, `FHIRPULL_INCLUDE_INACTIVE`
//! - `FHIRPULL_ON_PAGE_FAILURE`: `accept_partial` or `fail`
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.{json,toml}` or `./fhirpull.{json,toml}` (current working
//!    directory)
//! 2. `../config.{json,toml}` (parent directory)
//! 3. `../../config.{json,toml}` (grandparent directory)
//! 4. The same names relative to the executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use fhirpull_domain::{
    ApiConfig, AuthConfig, Config, ExportConfig, FhirPullError, PaginationConfig, Result,
    RetryPolicy, TokenRefreshPolicy,
};

/// Load a `.env` file into the process environment, if one exists.
///
/// Returns the path of the file that was loaded.
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::debug!(path = %path.display(), "Loaded .env file");
            Some(path)
        }
        Err(e) if e.not_found() => None,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unreadable .env file");
            None
        }
    }
}

/// Load configuration with automatic fallback strategy
///
/// Loads `.env` first, then attempts the environment. If any required
/// variables are missing, falls back to loading from a config file. The
/// result is validated before it is returned.
///
/// # Errors
/// Returns `FhirPullError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing or invalid
pub fn load() -> Result<Config> {
    load_dotenv();

    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None).map_err(|file_err| {
                FhirPullError::Config(format!("{e}; file fallback failed: {file_err}"))
            })?
        }
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// All required environment variables must be present. Returns an error
/// if any are missing.
///
/// # Environment Variables
/// See module documentation for the complete list.
///
/// # Errors
/// Returns `FhirPullError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<Config> {
    config_from_lookup(|key| std::env::var(key).ok())
}

/// Build a configuration from an arbitrary variable source.
///
/// Empty values count as unset.
///
/// # Errors
/// Returns `FhirPullError::Config` if required variables are missing
/// or have invalid values.
pub fn config_from_lookup<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let vars = Vars(lookup);

    let mut auth = AuthConfig::new(
        vars.required("HCHB_TOKEN_URL")?,
        vars.required("HCHB_CLIENT_ID")?,
        vars.required("HCHB_RESOURCE_SECURITY_ID")?,
        vars.required("HCHB_AGENCY_SECRET")?,
    );
    if let Some(scope) = vars.get("FHIRPULL_TOKEN_SCOPE") {
        auth.scope = scope;
    }

    let mut api = ApiConfig::new(vars.required("HCHB_API_BASE_URL")?);
    if let Some(secs) = vars.parse("FHIRPULL_REQUEST_TIMEOUT_SECS")? {
        api.request_timeout_secs = secs;
    }
    if let Some(limit) = vars.parse("FHIRPULL_MAX_CONCURRENT_REQUESTS")? {
        api.max_concurrent_requests = limit;
    }

    let mut retry = RetryPolicy::default();
    if let Some(attempts) = vars.parse("FHIRPULL_MAX_ATTEMPTS")? {
        retry.max_attempts = attempts;
    }
    if let Some(ms) = vars.parse("FHIRPULL_BASE_DELAY_MS")? {
        retry.base_delay_ms = ms;
    }
    if let Some(ms) = vars.parse("FHIRPULL_MAX_DELAY_MS")? {
        retry.max_delay_ms = ms;
    }

    let mut token_refresh = TokenRefreshPolicy::default();
    if let Some(uses) = vars.parse("FHIRPULL_TOKEN_MAX_USES")? {
        token_refresh.max_uses = uses;
    }
    if let Some(secs) = vars.parse("FHIRPULL_TOKEN_MAX_AGE_SECS")? {
        token_refresh.max_age_secs = secs;
    }

    let mut pagination = PaginationConfig::default();
    if let Some(size) = vars.parse("FHIRPULL_PAGE_SIZE")? {
        pagination.page_size = size;
    }
    if let Some(pages) = vars.parse("FHIRPULL_MAX_PAGES")? {
        pagination.max_pages = pages;
    }
    pagination.include_inactive = vars.bool("FHIRPULL_INCLUDE_INACTIVE", false);
    if let Some(policy) = vars.parse("FHIRPULL_ON_PAGE_FAILURE")? {
        pagination.on_page_failure = policy;
    }

    let mut export =
        ExportConfig { enabled: vars.bool("EXPORT_JSON", false), ..ExportConfig::default() };
    if let Some(dir) = vars.get("FHIRPULL_EXPORT_DIR") {
        export.output_dir = dir;
    }

    Ok(Config { api, auth, retry, token_refresh, pagination, export })
}

/// Variable source with typed accessors
struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    /// Get required variable
    ///
    /// # Errors
    /// Returns `FhirPullError::Config` if the variable is not set.
    fn required(&self, key: &str) -> Result<String> {
        self.get(key).ok_or_else(|| {
            FhirPullError::Config(format!("Missing required environment variable: {key}"))
        })
    }

    fn parse<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|e| FhirPullError::Config(format!("Invalid value for {key}: {e}")))
            })
            .transpose()
    }

    /// Parse boolean from a variable
    ///
    /// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off`
    /// (case-insensitive). Returns `default` if not set.
    fn bool(&self, key: &str, default: bool) -> bool {
        self.get(key)
            .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(default)
    }
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `FhirPullError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(FhirPullError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            FhirPullError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| FhirPullError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `FhirPullError::Config` if format is invalid or parsing fails.
pub fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| FhirPullError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| FhirPullError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(FhirPullError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("fhirpull.json"),
        dir.join("fhirpull.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
        dir.join("../../config.json"),
        dir.join("../../config.toml"),
    ]
}
