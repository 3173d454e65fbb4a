//! Identifiers for registered formatters, filters and handlers
//!
//! Each category has its own suffix. Constructing a name appends the suffix
//! when it is missing, so `"console"` and `"console_handler"` are the same
//! handler.

use std::fmt;

macro_rules! suffixed_name {
    ($(#[$meta:meta])* $name:ident, $suffix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Suffix appended to every name in this category
            pub const SUFFIX: &'static str = $suffix;

            pub fn new(name: impl Into<String>) -> Self {
                let mut name = name.into();
                if !name.ends_with(Self::SUFFIX) {
                    name.push_str(Self::SUFFIX);
                }
                Self(name)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(name: &str) -> Self {
                Self::new(name)
            }
        }

        impl From<String> for $name {
            fn from(name: String) -> Self {
                Self::new(name)
            }
        }
    };
}

suffixed_name!(
    /// Name of a registered formatter, always ending in `_formatter`
    FormatterName,
    "_formatter"
);
suffixed_name!(
    /// Name of a registered filter, always ending in `_filter`
    FilterName,
    "_filter"
);
suffixed_name!(
    /// Name of a registered handler, always ending in `_handler`
    HandlerName,
    "_handler"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_appended_once() {
        assert_eq!(HandlerName::new("console").as_str(), "console_handler");
        assert_eq!(
            HandlerName::new("console_handler").as_str(),
            "console_handler"
        );
        assert_eq!(FormatterName::from("simple").as_str(), "simple_formatter");
        assert_eq!(FilterName::from("info_filter").as_str(), "info_filter");
    }

    #[test]
    fn test_normalized_names_compare_equal() {
        assert_eq!(HandlerName::new("info_file"), HandlerName::new("info_file_handler"));
    }
}
