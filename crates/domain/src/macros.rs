//! Macro for implementing Display and FromStr for vocabulary enums
//!
//! Both the internal rule grammar and the persisted status column use fixed
//! string vocabularies. This macro keeps each vocabulary in one exhaustive
//! table instead of string comparisons scattered through the sync logic.
//!
//! # Example
//!
//! ```rust
//! use calsync_domain::impl_vocabulary_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Freq {
//!     Daily,
//!     Weekly,
//! }
//!
//! impl_vocabulary_conversions!(Freq {
//!     Daily => "DAILY",
//!     Weekly => "WEEKLY",
//! });
//!
//! assert_eq!(Freq::Daily.to_string(), "DAILY");
//! assert_eq!("weekly".parse::<Freq>(), Ok(Freq::Weekly));
//! ```

/// Implements Display and FromStr traits for vocabulary enums
///
/// This macro generates:
/// - Display trait: writes the canonical string of each variant verbatim
/// - FromStr trait: parses ASCII case-insensitive strings to enum variants
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their canonical string
#[macro_export]
macro_rules! impl_vocabulary_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical string for this variant.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                let trimmed = s.trim();
                $(
                    if trimmed.eq_ignore_ascii_case($str) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }
    };
}
