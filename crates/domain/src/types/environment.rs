//! Deployment target of the SII webservices

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which SII environment requests are sent to.
///
/// Selects the server names used for endpoint resolution and namespaces the
/// token cache, so a token obtained in one environment is never presented to
/// the other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Production,
    Certification,
}

impl Environment {
    pub const ALL: [Environment; 2] = [Environment::Production, Environment::Certification];

    /// Lowercase identifier used in cache keys and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Certification => "certification",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    /// Accepts the English names as well as the SII's own spelling
    /// (`produccion`, `certificacion`), ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" | "produccion" | "producción" => Ok(Self::Production),
            "certification" | "certificacion" | "certificación" => Ok(Self::Certification),
            _ => Err(format!("Invalid Environment: {s}")),
        }
    }
}
