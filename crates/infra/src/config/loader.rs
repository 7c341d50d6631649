//! Configuration loader
//!
//! Builds [`ConnectionOptions`] from defaults, a config file and environment
//! variables.
//!
//! ## Loading Strategy
//! 1. Start from the production defaults
//! 2. Apply the first config file found by [`probe_config_paths`], if any
//! 3. Apply environment variables on top
//!
//! ## Environment Variables
//! - `DTELINK_ENVIRONMENT`: `production` / `certification` (SII spellings
//!   `produccion` / `certificacion` accepted)
//! - `DTELINK_RETRY_BUDGET`: Maximum attempts per request (capped at 10)
//! - `DTELINK_VERIFY_TLS`: Whether to verify server certificates (true/false)
//! - `DTELINK_CACHE_BACKEND`: `memory` or `filesystem`
//! - `DTELINK_CACHE_DIR`: Directory of the filesystem token cache
//! - `DTELINK_WSDL_DIR`: Directory holding local WSDL copies
//! - `DTELINK_REQUEST_TIMEOUT_SECS`: Per-attempt HTTP timeout in seconds
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./dtelink.toml`, `./dtelink.json`, `./config.toml`, `./config.json`
//! 2. The same names in `..` and `../..`

use std::path::{Path, PathBuf};

use dtelink_domain::{ConnectionOptions, ConnectionOverrides, DteLinkError, Result};
use url::Url;

const CONFIG_FILE_NAMES: [&str; 4] = ["dtelink.toml", "dtelink.json", "config.toml", "config.json"];

/// Load connection options from defaults, config file and environment
///
/// A missing config file is not an error; environment variables alone (or
/// nothing at all) are enough.
///
/// # Errors
/// Returns `DteLinkError::Config` if a config file or variable is present
/// but invalid.
pub fn load() -> Result<ConnectionOptions> {
    let mut options = ConnectionOptions::new();

    match probe_config_paths() {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading connection options from file");
            options = options.apply(read_overrides(&path)?)?;
        }
        None => tracing::debug!("No config file found, using defaults"),
    }

    let options = options.apply(overrides_from_env()?)?;
    tracing::info!(
        environment = %options.environment(),
        retry_budget = options.retry_budget(),
        cache = %options.cache_backend(),
        "Connection options loaded"
    );
    Ok(options)
}

/// Load connection options from environment variables over the defaults
///
/// # Errors
/// Returns `DteLinkError::Config` if a variable has an invalid value.
pub fn load_from_env() -> Result<ConnectionOptions> {
    ConnectionOptions::new().apply(overrides_from_env()?)
}

/// Load connection options from a file over the defaults
///
/// If `path` is `None`, probes the standard locations. Format is detected
/// by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `DteLinkError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<ConnectionOptions> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(DteLinkError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            DteLinkError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading connection options from file");
    ConnectionOptions::new().apply(read_overrides(&config_path)?)
}

/// Probe the working directory and up to two parents for a config file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    candidate_paths(&cwd).into_iter().find(|path| path.exists())
}

fn candidate_paths(base: &Path) -> Vec<PathBuf> {
    [base.to_path_buf(), base.join(".."), base.join("../..")]
        .iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .collect()
}

fn read_overrides(path: &Path) -> Result<ConnectionOverrides> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| DteLinkError::Config(format!("Failed to read config file: {}", e)))?;

    parse_overrides(&contents, path)
}

/// Parse a config file, detecting the format by extension.
fn parse_overrides(contents: &str, path: &Path) -> Result<ConnectionOverrides> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    let overrides: ConnectionOverrides = match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| DteLinkError::Config(format!("Invalid TOML format: {}", e)))?,
        "json" => serde_json::from_str(contents)
            .map_err(|e| DteLinkError::Config(format!("Invalid JSON format: {}", e)))?,
        _ => {
            return Err(DteLinkError::Config(format!(
                "Unsupported config format: {}",
                extension
            )))
        }
    };

    for (service, template) in &overrides.wsdl {
        validate_wsdl_template(service, template)?;
    }
    Ok(overrides)
}

/// A template must be an absolute URL once its placeholders are filled in.
fn validate_wsdl_template(service: &str, template: &str) -> Result<()> {
    let sample = template.replace("{server}", "palena").replace("{service}", "CrSeed");
    let url = Url::parse(&sample).map_err(|e| {
        DteLinkError::Config(format!("Invalid WSDL template for {service}: {template} ({e})"))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(DteLinkError::Config(format!(
            "WSDL template for {service} must use http or https: {template}"
        )));
    }
    Ok(())
}

fn overrides_from_env() -> Result<ConnectionOverrides> {
    overrides_from_vars(|key| std::env::var(key).ok())
}

fn overrides_from_vars(var: impl Fn(&str) -> Option<String>) -> Result<ConnectionOverrides> {
    let retry_budget = var("DTELINK_RETRY_BUDGET")
        .map(|s| {
            s.trim()
                .parse::<u32>()
                .map_err(|e| DteLinkError::Config(format!("Invalid retry budget: {}", e)))
        })
        .transpose()?;
    let request_timeout_secs = var("DTELINK_REQUEST_TIMEOUT_SECS")
        .map(|s| {
            s.trim()
                .parse::<u64>()
                .map_err(|e| DteLinkError::Config(format!("Invalid request timeout: {}", e)))
        })
        .transpose()?;
    let verify_tls = var("DTELINK_VERIFY_TLS").map(|s| parse_bool(&s)).transpose()?;

    Ok(ConnectionOverrides {
        environment: var("DTELINK_ENVIRONMENT"),
        retry_budget,
        verify_tls,
        cache: var("DTELINK_CACHE_BACKEND"),
        cache_dir: var("DTELINK_CACHE_DIR").map(PathBuf::from),
        wsdl_dir: var("DTELINK_WSDL_DIR").map(PathBuf::from),
        request_timeout_secs,
        ..ConnectionOverrides::default()
    })
}

/// Parse a boolean flag
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(DteLinkError::Config(format!("Invalid boolean value: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use dtelink_domain::{CacheBackend, Environment};

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse_bool() {
        for value in ["1", "true", "YES", "on"] {
            assert!(parse_bool(value).unwrap(), "{value}");
        }
        for value in ["0", "false", "No", "OFF"] {
            assert!(!parse_bool(value).unwrap(), "{value}");
        }
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn test_overrides_from_vars() {
        let overrides = overrides_from_vars(vars(&[
            ("DTELINK_ENVIRONMENT", "certificacion"),
            ("DTELINK_RETRY_BUDGET", "4"),
            ("DTELINK_VERIFY_TLS", "false"),
            ("DTELINK_CACHE_BACKEND", "filesystem"),
            ("DTELINK_CACHE_DIR", "/var/cache/dtelink"),
            ("DTELINK_REQUEST_TIMEOUT_SECS", "12"),
        ]))
        .unwrap();

        let options = ConnectionOptions::new().apply(overrides).unwrap();
        assert_eq!(options.environment(), Environment::Certification);
        assert_eq!(options.retry_budget(), 4);
        assert!(!options.verify_tls());
        assert_eq!(options.cache_backend(), CacheBackend::Filesystem);
        assert_eq!(options.cache_dir(), Some(Path::new("/var/cache/dtelink")));
        assert_eq!(options.request_timeout(), Duration::from_secs(12));
    }

    #[test]
    fn test_no_vars_keeps_defaults() {
        let options =
            ConnectionOptions::new().apply(overrides_from_vars(vars(&[])).unwrap()).unwrap();

        assert_eq!(options, ConnectionOptions::new());
    }

    #[test]
    fn test_invalid_number_is_config_error() {
        let err = overrides_from_vars(vars(&[("DTELINK_RETRY_BUDGET", "ten")])).unwrap_err();
        assert!(matches!(err, DteLinkError::Config(_)), "Should be a Config error");
    }

    #[test]
    fn test_unknown_environment_is_config_error() {
        let overrides = overrides_from_vars(vars(&[("DTELINK_ENVIRONMENT", "staging")])).unwrap();
        let err = ConnectionOptions::new().apply(overrides).unwrap_err();
        assert!(matches!(err, DteLinkError::Config(_)), "Should be a Config error");
    }

    #[test]
    fn test_load_from_env() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("DTELINK_ENVIRONMENT", "certification");
        std::env::set_var("DTELINK_RETRY_BUDGET", "25");

        let result = load_from_env();

        std::env::remove_var("DTELINK_ENVIRONMENT");
        std::env::remove_var("DTELINK_RETRY_BUDGET");

        let options = result.expect("Should load options from env vars");
        assert_eq!(options.environment(), Environment::Certification);
        assert_eq!(options.retry_budget(), 10, "budget is capped");
    }

    #[test]
    fn test_parse_overrides_toml() {
        let toml_content = r#"
environment = "certification"
retry_budget = 3
cache = "filesystem"

[servers.default]
certification = "maullin2"

[wsdl]
QueryEstDteAv = "https://{server}.sii.cl/DTEWS/services/{service}?WSDL"
"#;

        let overrides = parse_overrides(toml_content, Path::new("dtelink.toml")).unwrap();
        let options = ConnectionOptions::new().apply(overrides).unwrap();

        assert_eq!(options.resolve_server("default"), "maullin2");
        assert_eq!(
            options.resolve_wsdl("QueryEstDteAv"),
            "https://maullin2.sii.cl/DTEWS/services/QueryEstDteAv?WSDL"
        );
    }

    #[test]
    fn test_parse_overrides_json() {
        let json_content = r#"{ "retry_budget": 2, "verify_tls": false }"#;

        let overrides = parse_overrides(json_content, Path::new("dtelink.json")).unwrap();

        assert_eq!(overrides.retry_budget, Some(2));
        assert_eq!(overrides.verify_tls, Some(false));
    }

    #[test]
    fn test_invalid_wsdl_template_is_rejected() {
        let toml_content = r#"
[wsdl]
CrSeed = "not a url {service}"
"#;

        let err = parse_overrides(toml_content, Path::new("dtelink.toml")).unwrap_err();
        assert!(matches!(err, DteLinkError::Config(ref msg) if msg.contains("CrSeed")));
    }

    #[test]
    fn test_parse_unsupported_format() {
        let result = parse_overrides("some content", Path::new("test.yaml"));
        assert!(result.is_err(), "Should fail with unsupported format");
    }

    #[test]
    fn test_load_from_file_not_found() {
        let err = load_from_file(Some(PathBuf::from("/nonexistent/dtelink.toml"))).unwrap_err();
        assert!(matches!(err, DteLinkError::Config(_)), "Should be a Config error");
    }

    #[test]
    fn test_candidate_paths_order() {
        let paths = candidate_paths(Path::new("/work/app"));

        assert_eq!(paths.len(), 12);
        assert_eq!(paths[0], PathBuf::from("/work/app/dtelink.toml"));
        assert_eq!(paths[3], PathBuf::from("/work/app/config.json"));
        assert_eq!(paths[4], PathBuf::from("/work/app/../dtelink.toml"));
        assert_eq!(paths[11], PathBuf::from("/work/app/../../config.json"));
    }
}
