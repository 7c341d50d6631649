//! Connection configuration for the SII webservices
//!
//! [`ConnectionOptions`] is an immutable value built once per connection
//! profile. Every resolver on it is total: a missing override falls back to
//! the default entry, which the types make mandatory. Changes go through
//! `with_*` builders (or [`ConnectionOptions::apply`] for a partially
//! specified config file) that return a new value.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    CERTIFICATION_SERVER, DEFAULT_BACKOFF_BASE, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SERVER_TYPE,
    DEFAULT_WSDL_TEMPLATE, MAX_RETRY_BUDGET, PRODUCTION_SERVER, RESOURCE_URL_TEMPLATE,
    SERVICES_WSDL_SERVICES, SERVICES_WSDL_TEMPLATE, WWW4_CERTIFICATION_SERVER,
    WWW4_PRODUCTION_SERVER, WWW4_RESOURCE, WWW4_SERVER_TYPE,
};
use crate::errors::{DteLinkError, Result};
use crate::impl_domain_status_conversions;
use crate::types::{Endpoint, Environment};

/// Token cache implementation to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    #[default]
    Memory,
    Filesystem,
}

impl_domain_status_conversions!(CacheBackend {
    Memory => "memory",
    Filesystem => "filesystem",
});

impl CacheBackend {
    /// Map a configured name to a backend; anything unrecognized is `Memory`.
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }
}

/// Server names for both environments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerNames {
    pub production: String,
    pub certification: String,
}

impl ServerNames {
    pub fn new(production: impl Into<String>, certification: impl Into<String>) -> Self {
        Self { production: production.into(), certification: certification.into() }
    }

    pub fn get(&self, environment: Environment) -> &str {
        match environment {
            Environment::Production => &self.production,
            Environment::Certification => &self.certification,
        }
    }

    fn set(&mut self, environment: Environment, name: String) {
        match environment {
            Environment::Production => self.production = name,
            Environment::Certification => self.certification = name,
        }
    }
}

/// Server names for one server type; either environment may be left unset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerOverride {
    pub production: Option<String>,
    pub certification: Option<String>,
}

impl ServerOverride {
    pub fn get(&self, environment: Environment) -> Option<&str> {
        match environment {
            Environment::Production => self.production.as_deref(),
            Environment::Certification => self.certification.as_deref(),
        }
    }

    fn set(&mut self, environment: Environment, name: String) {
        match environment {
            Environment::Production => self.production = Some(name),
            Environment::Certification => self.certification = Some(name),
        }
    }
}

/// Server lookup table: a mandatory default plus per-type overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerTable {
    default: ServerNames,
    overrides: BTreeMap<String, ServerOverride>,
}

impl Default for ServerTable {
    fn default() -> Self {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            WWW4_SERVER_TYPE.to_string(),
            ServerOverride {
                production: Some(WWW4_PRODUCTION_SERVER.to_string()),
                certification: Some(WWW4_CERTIFICATION_SERVER.to_string()),
            },
        );
        Self { default: ServerNames::new(PRODUCTION_SERVER, CERTIFICATION_SERVER), overrides }
    }
}

impl ServerTable {
    /// Never fails: unknown types and unset environments use the default.
    pub fn resolve(&self, server_type: &str, environment: Environment) -> &str {
        self.overrides
            .get(server_type)
            .and_then(|entry| entry.get(environment))
            .unwrap_or_else(|| self.default.get(environment))
    }

    fn set(&mut self, server_type: &str, environment: Environment, name: String) {
        if server_type == DEFAULT_SERVER_TYPE {
            self.default.set(environment, name);
        } else {
            self.overrides.entry(server_type.to_string()).or_default().set(environment, name);
        }
    }
}

/// WSDL URL templates: a mandatory default plus per-service overrides
///
/// Templates use `{server}` and `{service}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsdlTable {
    default: String,
    overrides: BTreeMap<String, String>,
}

impl Default for WsdlTable {
    fn default() -> Self {
        let overrides = SERVICES_WSDL_SERVICES
            .iter()
            .map(|service| (service.to_string(), SERVICES_WSDL_TEMPLATE.to_string()))
            .collect();
        Self { default: DEFAULT_WSDL_TEMPLATE.to_string(), overrides }
    }
}

impl WsdlTable {
    pub fn template_for(&self, service: &str) -> &str {
        self.overrides.get(service).map(String::as_str).unwrap_or(&self.default)
    }

    fn set(&mut self, service: &str, template: String) {
        if service == DEFAULT_SERVER_TYPE {
            self.default = template;
        } else {
            self.overrides.insert(service.to_string(), template);
        }
    }
}

/// Parameters of the connection to the SII webservices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    environment: Environment,
    servers: ServerTable,
    wsdl: WsdlTable,
    retry_budget: u32,
    verify_tls: bool,
    cache_backend: CacheBackend,
    cache_dir: Option<PathBuf>,
    wsdl_dir: Option<PathBuf>,
    request_timeout: Duration,
    backoff_base: Duration,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            environment: Environment::Production,
            servers: ServerTable::default(),
            wsdl: WsdlTable::default(),
            retry_budget: MAX_RETRY_BUDGET,
            verify_tls: true,
            cache_backend: CacheBackend::Memory,
            cache_dir: None,
            wsdl_dir: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }
}

impl ConnectionOptions {
    /// Production defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults pointed at `environment`.
    pub fn for_environment(environment: Environment) -> Self {
        Self::default().with_environment(environment)
    }

    // ------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Assign the server for `server_type` in `environment`. The type
    /// `"default"` replaces the fallback entry itself.
    pub fn with_server(
        mut self,
        server_type: &str,
        environment: Environment,
        server: impl Into<String>,
    ) -> Self {
        self.servers.set(server_type, environment, server.into());
        self
    }

    /// Assign the WSDL template for `service`. The service `"default"`
    /// replaces the fallback template.
    pub fn with_wsdl(mut self, service: &str, template: impl Into<String>) -> Self {
        self.wsdl.set(service, template.into());
        self
    }

    /// Stored as given; [`ConnectionOptions::retry_budget`] applies the cap.
    pub fn with_retry_budget(mut self, budget: u32) -> Self {
        self.retry_budget = budget;
        self
    }

    /// Disabling verification is an explicit opt-out, meant for test setups.
    pub fn with_tls_verification(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    pub fn with_cache_backend(mut self, backend: CacheBackend) -> Self {
        self.cache_backend = backend;
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn with_wsdl_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.wsdl_dir = Some(dir.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Apply a partially specified configuration field by field.
    ///
    /// Server and WSDL entries merge per key; every other field replaces the
    /// current value only when present.
    ///
    /// # Errors
    /// Returns `DteLinkError::Config` when the environment name is unknown.
    pub fn apply(mut self, overrides: ConnectionOverrides) -> Result<Self> {
        if let Some(name) = overrides.environment {
            let environment = name.parse::<Environment>().map_err(DteLinkError::Config)?;
            self = self.with_environment(environment);
        }
        for (server_type, entry) in overrides.servers {
            for environment in Environment::ALL {
                if let Some(name) = entry.get(environment) {
                    self.servers.set(&server_type, environment, name.to_string());
                }
            }
        }
        for (service, template) in overrides.wsdl {
            self.wsdl.set(&service, template);
        }
        if let Some(budget) = overrides.retry_budget {
            self.retry_budget = budget;
        }
        if let Some(verify) = overrides.verify_tls {
            self.verify_tls = verify;
        }
        if let Some(name) = overrides.cache.as_deref() {
            self.cache_backend = CacheBackend::from_name(name);
        }
        if let Some(dir) = overrides.cache_dir {
            self.cache_dir = Some(dir);
        }
        if let Some(dir) = overrides.wsdl_dir {
            self.wsdl_dir = Some(dir);
        }
        if let Some(secs) = overrides.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = overrides.backoff_base_ms {
            self.backoff_base = Duration::from_millis(ms);
        }
        Ok(self)
    }

    // ------------------------------------------------------------------
    // Accessors and resolvers
    // ------------------------------------------------------------------

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Server for `server_type` in the configured environment.
    pub fn resolve_server(&self, server_type: &str) -> &str {
        self.servers.resolve(server_type, self.environment)
    }

    /// Server for `server_type` in `environment`. Never fails.
    pub fn resolve_server_for(&self, server_type: &str, environment: Environment) -> &str {
        self.servers.resolve(server_type, environment)
    }

    /// WSDL URL of `service`, using its own template or the default one.
    pub fn resolve_wsdl(&self, service: &str) -> String {
        self.wsdl
            .template_for(service)
            .replace("{server}", self.resolve_server(DEFAULT_SERVER_TYPE))
            .replace("{service}", service)
    }

    /// WSDL and SOAP address of `service`, plus its local WSDL copy if any.
    pub fn resolve_endpoint(&self, service: &str) -> Endpoint {
        Endpoint::from_wsdl(service, self.resolve_wsdl(service))
            .with_local_wsdl(self.wsdl_path(service))
    }

    /// URL of a resource on the SII web site.
    ///
    /// The legacy cancellation resource lives on the `www4` hosts; every
    /// other path uses the default server.
    pub fn resolve_resource_url(&self, path: &str) -> String {
        let server_type = if path == WWW4_RESOURCE { WWW4_SERVER_TYPE } else { DEFAULT_SERVER_TYPE };
        RESOURCE_URL_TEMPLATE
            .replace("{server}", self.resolve_server(server_type))
            .replace("{path}", path)
    }

    /// Local copy of a service's WSDL (`{wsdl_dir}/{server}/{service}.wsdl`),
    /// if a directory is configured and the file is readable.
    pub fn wsdl_path(&self, service: &str) -> Option<PathBuf> {
        let dir = self.wsdl_dir.as_deref()?;
        let path = dir
            .join(self.resolve_server(DEFAULT_SERVER_TYPE))
            .join(format!("{service}.wsdl"));
        std::fs::File::open(&path).ok()?;
        path.canonicalize().ok()
    }

    /// Attempts allowed per call: at least one, never above
    /// [`MAX_RETRY_BUDGET`].
    pub fn retry_budget(&self) -> u32 {
        self.retry_budget.clamp(1, MAX_RETRY_BUDGET)
    }

    pub fn verify_tls(&self) -> bool {
        self.verify_tls
    }

    pub fn cache_backend(&self) -> CacheBackend {
        self.cache_backend
    }

    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn backoff_base(&self) -> Duration {
        self.backoff_base
    }
}

/// Partially specified connection configuration, as read from a file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionOverrides {
    /// `production` or `certification` (SII spellings accepted)
    pub environment: Option<String>,
    /// Server type → per-environment server names; `default` edits the fallback
    pub servers: BTreeMap<String, ServerOverride>,
    /// Service → WSDL template; `default` edits the fallback
    pub wsdl: BTreeMap<String, String>,
    pub retry_budget: Option<u32>,
    pub verify_tls: Option<bool>,
    /// `memory` or `filesystem`; anything else means `memory`
    pub cache: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub wsdl_dir: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
    pub backoff_base_ms: Option<u64>,
}
