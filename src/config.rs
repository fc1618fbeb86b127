//! Process-wide runtime configuration.
//!
//! Read once at startup and passed explicitly into schema resolution.
//! Changing a value requires re-resolving the affected schemas; resolved
//! schemas never observe mutation.

/// Default upper bound on the `page` querystring parameter.
pub const DEFAULT_MAX_PAGES: u32 = 50;

/// Default upper bound (and default value) for `page_size`.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 25;

/// Process-wide limits and presentation policy for the contract layer.
///
/// Sourced from the environment (`MAX_PAGES`, `MAX_PAGE_SIZE`,
/// `SHOW_ERRORS`) or constructed directly. Immutable once a schema has been
/// resolved against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Upper bound on the `page` querystring parameter.
    pub max_pages: u32,
    /// Upper bound on `page_size`, and its default when absent.
    pub max_page_size: u32,
    /// When false, error responses carry an empty message.
    pub show_errors: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            show_errors: true,
        }
    }
}

impl RuntimeConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through a lookup closure.
    ///
    /// Unparseable values fall back to the default for that key with a
    /// warning; a bad environment value must not take the process down.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            max_pages: parse_u32(lookup("MAX_PAGES"), "MAX_PAGES", defaults.max_pages),
            max_page_size: parse_u32(
                lookup("MAX_PAGE_SIZE"),
                "MAX_PAGE_SIZE",
                defaults.max_page_size,
            ),
            show_errors: parse_bool(lookup("SHOW_ERRORS"), "SHOW_ERRORS", defaults.show_errors),
        }
    }
}

fn parse_u32(raw: Option<String>, key: &str, default: u32) -> u32 {
    match raw {
        None => default,
        Some(value) => match value.parse::<u32>() {
            Ok(parsed) if parsed > 0 => parsed,
            _ => {
                tracing::warn!(key, value, "unparseable configuration value, using default");
                default
            }
        },
    }
}

fn parse_bool(raw: Option<String>, key: &str, default: bool) -> bool {
    match raw.as_deref() {
        None => default,
        Some("true") | Some("True") | Some("1") => true,
        Some("false") | Some("False") | Some("0") => false,
        Some(value) => {
            tracing::warn!(key, value, "unparseable configuration value, using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.max_pages, 50);
        assert_eq!(config.max_page_size, 25);
        assert!(config.show_errors);
    }

    #[test]
    fn test_from_lookup_reads_all_keys() {
        let config = RuntimeConfig::from_lookup(|key| match key {
            "MAX_PAGES" => Some("2".to_string()),
            "MAX_PAGE_SIZE" => Some("1".to_string()),
            "SHOW_ERRORS" => Some("false".to_string()),
            _ => None,
        });
        assert_eq!(config.max_pages, 2);
        assert_eq!(config.max_page_size, 1);
        assert!(!config.show_errors);
    }

    #[test]
    fn test_from_lookup_missing_keys_use_defaults() {
        let config = RuntimeConfig::from_lookup(|_| None);
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let config = RuntimeConfig::from_lookup(|key| match key {
            "MAX_PAGES" => Some("many".to_string()),
            "MAX_PAGE_SIZE" => Some("0".to_string()),
            "SHOW_ERRORS" => Some("maybe".to_string()),
            _ => None,
        });
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn test_bool_spellings() {
        for truthy in ["true", "True", "1"] {
            let config = RuntimeConfig::from_lookup(|key| {
                (key == "SHOW_ERRORS").then(|| truthy.to_string())
            });
            assert!(config.show_errors, "{truthy} should parse as true");
        }
        for falsy in ["false", "False", "0"] {
            let config = RuntimeConfig::from_lookup(|key| {
                (key == "SHOW_ERRORS").then(|| falsy.to_string())
            });
            assert!(!config.show_errors, "{falsy} should parse as false");
        }
    }
}
