//! Macro for string conversions on status-like enums
//!
//! Generates `as_str`, `ALL`, `Display` and a case-insensitive `FromStr`
//! that fails with [`ClubhouseError::Validation`](crate::ClubhouseError).
//!
//! # Example
//!
//! ```rust
//! use clubhouse_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum ReviewState {
//!     Open,
//!     Closed,
//! }
//!
//! impl_domain_status_conversions!(ReviewState {
//!     Open => "open",
//!     Closed => "closed",
//! });
//!
//! assert_eq!(ReviewState::Open.as_str(), "open");
//! assert_eq!("CLOSED".parse::<ReviewState>().unwrap(), ReviewState::Closed);
//! ```

/// Implements `as_str`, `ALL`, `Display` and `FromStr` for a fieldless enum
///
/// Strings must be lowercase; parsing lowercases its input first.
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl $enum_name {
            /// Every variant in declaration order
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Wire representation
            pub const fn as_str(self) -> &'static str {
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
            type Err = $crate::errors::ClubhouseError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => ::core::result::Result::Ok(Self::$variant),)+
                    _ => ::core::result::Result::Err(
                        $crate::errors::ClubhouseError::Validation(format!(
                            "invalid {}: {s:?}",
                            stringify!($enum_name)
                        )),
                    ),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    // The crate's one-argument alias must not leak into the expansion.
    #[allow(unused_imports)]
    use crate::errors::{ClubhouseError, Result};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Tier {
        Bronze,
        Silver,
        Gold,
    }

    impl_domain_status_conversions!(Tier {
        Bronze => "bronze",
        Silver => "silver",
        Gold => "gold",
    });

    #[test]
    fn test_display_matches_as_str() {
        for tier in Tier::ALL {
            assert_eq!(tier.to_string(), tier.as_str());
        }
    }

    #[test]
    fn test_parse_is_case_insensitive_and_trimmed() {
        assert_eq!(Tier::from_str("GOLD").unwrap(), Tier::Gold);
        assert_eq!(Tier::from_str(" Silver ").unwrap(), Tier::Silver);
    }

    #[test]
    fn test_parse_failure_is_validation_error() {
        let err = Tier::from_str("platinum").unwrap_err();
        assert!(matches!(err, ClubhouseError::Validation(ref msg) if msg.contains("Tier")));
        assert!(Tier::from_str("").is_err());
    }

    #[test]
    fn test_all_lists_every_variant_once() {
        assert_eq!(Tier::ALL, &[Tier::Bronze, Tier::Silver, Tier::Gold]);
    }
}
