//! Macro for implementing Display and FromStr for small string-backed enums
//!
//! Configuration values such as the cache backend or failure kinds travel as
//! lowercase strings in config files and logs. This macro keeps both
//! directions of that mapping in one place.
//!
//! # Example
//!
//! ```rust
//! use dtelink_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Backend {
//!     Memory,
//!     Filesystem,
//! }
//!
//! impl_domain_status_conversions!(Backend {
//!     Memory => "memory",
//!     Filesystem => "filesystem",
//! });
//!
//! assert_eq!(Backend::Memory.to_string(), "memory");
//! assert_eq!("FILESYSTEM".parse::<Backend>(), Ok(Backend::Filesystem));
//! ```

/// Implements Display and FromStr traits for string-backed enums
///
/// - Display writes the mapped lowercase string
/// - FromStr parses case-insensitively and reports the enum name on failure
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => std::result::Result::Ok(Self::$variant),)+
                    _ => std::result::Result::Err(format!(
                        "Invalid {}: {}",
                        stringify!($enum_name),
                        s
                    )),
                }
            }
        }
    };
}
