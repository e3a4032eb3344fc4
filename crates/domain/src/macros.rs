//! Macro for implementing Display and FromStr for configuration enums
//!
//! Policy enums are read from environment variables and config files as
//! snake_case strings. This macro gives them one consistent, case-insensitive
//! string mapping.
//!
//! # Example
//!
//! ```rust
//! use fhirpull_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum OutputFormat {
//!     Pretty,
//!     Compact,
//! }
//!
//! impl_domain_status_conversions!(OutputFormat {
//!     Pretty => "pretty",
//!     Compact => "compact",
//! });
//!
//! assert_eq!("PRETTY".parse::<OutputFormat>(), Ok(OutputFormat::Pretty));
//! ```

/// Implements Display and FromStr traits for string-mapped enums
///
/// * Display writes the mapped string
/// * FromStr parses case-insensitively and reports the enum name on failure
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
