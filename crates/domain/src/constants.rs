//! Domain constants
//!
//! Defaults for the connection to the SII webservices. Every value here can
//! be overridden through [`crate::ConnectionOptions`].

use std::time::Duration;

/// Default and maximum number of attempts for a single webservice call.
///
/// Retries use exponential backoff, so a larger budget means a much longer
/// worst-case latency.
pub const MAX_RETRY_BUDGET: u32 = 10;

/// Server type used when a lookup does not name one.
pub const DEFAULT_SERVER_TYPE: &str = "default";

/// Server type hosting the legacy document cancellation resource.
pub const WWW4_SERVER_TYPE: &str = "www4";

/// Resource routed to the [`WWW4_SERVER_TYPE`] host instead of the default.
pub const WWW4_RESOURCE: &str = "/anulacionMsvDteInternet";

// Default DTE servers
pub const PRODUCTION_SERVER: &str = "palena";
pub const CERTIFICATION_SERVER: &str = "maullin";
pub const WWW4_PRODUCTION_SERVER: &str = "www4";
pub const WWW4_CERTIFICATION_SERVER: &str = "www4c";

/// WSDL template used when a service has no specific template.
pub const DEFAULT_WSDL_TEMPLATE: &str = "https://{server}.sii.cl/DTEWS/{service}.jws?WSDL";

/// WSDL template for services published under `/DTEWS/services/`.
pub const SERVICES_WSDL_TEMPLATE: &str = "https://{server}.sii.cl/DTEWS/services/{service}?WSDL";

/// Services whose WSDL lives under `/DTEWS/services/`.
pub const SERVICES_WSDL_SERVICES: [&str; 2] = ["QueryEstDteAv", "wsDTECorreo"];

/// Template for plain resources on the SII web site.
pub const RESOURCE_URL_TEMPLATE: &str = "https://{server}.sii.cl{path}";

// Timing defaults
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(200);

// Authentication services
pub const SEED_SERVICE: &str = "CrSeed";
pub const SEED_OPERATION: &str = "getSeed";
pub const TOKEN_SERVICE: &str = "GetTokenFromSeed";
pub const TOKEN_OPERATION: &str = "getToken";
pub const TOKEN_ARGUMENT: &str = "pszXml";

/// Header status the SII returns when a seed or token request succeeds.
pub const STATUS_OK: &str = "00";

/// Header statuses meaning the token sent with a query is inactive or unknown.
pub const TOKEN_REJECTED_STATUSES: [&str; 3] = ["001", "002", "003"];

// Signature validation service
pub const SIGNATURE_SERVICE: &str = "QueryEstDteAv";
pub const SIGNATURE_OPERATION: &str = "getEstDteAv";
