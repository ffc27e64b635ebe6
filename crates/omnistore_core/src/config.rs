//! Store configuration and defaults.

use crate::catalog;
use omnistore_backend::StoreSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Partial configuration for constructing a store.
///
/// Every field is optional; a total-default configuration is merged
/// underneath the caller-supplied values, field by field (shallow
/// merge; caller values always win per field).
///
/// # Example
///
/// ```rust
/// use omnistore_core::Config;
///
/// let config = Config::new()
///     .name("myapp")
///     .store_name("settings")
///     .driver_order(["leveldatastore", "localstorage"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logical database identifier.
    pub name: Option<String>,

    /// Sub-namespace within the database (table / object-store name).
    pub store_name: Option<String>,

    /// Byte-size hint for quota-limited backends.
    pub size: Option<u64>,

    /// Human-readable description of the store.
    pub description: Option<String>,

    /// Alias of `name` for backends that address databases by key.
    pub db_key: Option<String>,

    /// Filesystem location hint for file-backed backends.
    pub path: Option<PathBuf>,

    /// Ordered driver preference; first viable driver wins.
    /// Duplicates are permitted but meaningless.
    pub driver_order: Option<Vec<String>>,
}

impl Config {
    /// Creates an empty configuration (all defaults apply).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the logical database identifier.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the sub-namespace (table / object-store name).
    #[must_use]
    pub fn store_name(mut self, store_name: impl Into<String>) -> Self {
        self.store_name = Some(store_name.into());
        self
    }

    /// Sets the byte-size hint.
    #[must_use]
    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets the store description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the database key alias.
    #[must_use]
    pub fn db_key(mut self, db_key: impl Into<String>) -> Self {
        self.db_key = Some(db_key.into());
        self
    }

    /// Sets the filesystem location hint.
    #[must_use]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the ordered driver preference.
    #[must_use]
    pub fn driver_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.driver_order = Some(order.into_iter().map(Into::into).collect());
        self
    }

    /// Merges this configuration over the total defaults.
    ///
    /// Returns the concrete settings handed to drivers together with
    /// the driver preference tokens (still unresolved; translation to
    /// driver identifiers happens during initialization so that a bad
    /// token surfaces through `ready()` rather than panicking here).
    #[must_use]
    pub fn merge_over_defaults(&self) -> (StoreSettings, Vec<String>) {
        let defaults = StoreSettings::default();

        let settings = StoreSettings {
            name: self.name.clone().unwrap_or(defaults.name),
            store_name: self.store_name.clone().unwrap_or(defaults.store_name),
            size: self.size.unwrap_or(defaults.size),
            description: self.description.clone().unwrap_or(defaults.description),
            db_key: self.db_key.clone().unwrap_or(defaults.db_key),
            path: self.path.clone().unwrap_or(defaults.path),
        };

        let order = self.driver_order.clone().unwrap_or_else(|| {
            catalog::DEFAULT_DRIVER_ORDER
                .iter()
                .map(|s| (*s).to_string())
                .collect()
        });

        (settings, order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_empty() {
        let (settings, order) = Config::new().merge_over_defaults();

        assert_eq!(settings.name, "_omnistore");
        assert_eq!(settings.store_name, "_omnikv");
        assert_eq!(settings.size, 4_980_736);
        assert_eq!(settings.db_key, "_omnikey");
        assert_eq!(
            order,
            vec!["sqlite", "indexeddb", "leveldatastore", "websql", "localstorage"]
        );
    }

    #[test]
    fn caller_values_win_per_field() {
        let (settings, order) = Config::new()
            .name("myapp")
            .size(1024)
            .driver_order(["localstorage"])
            .merge_over_defaults();

        // Overridden fields
        assert_eq!(settings.name, "myapp");
        assert_eq!(settings.size, 1024);
        assert_eq!(order, vec!["localstorage"]);

        // Untouched fields keep their defaults
        assert_eq!(settings.store_name, "_omnikv");
        assert_eq!(settings.db_key, "_omnikey");
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .name("app")
            .store_name("cache")
            .description("test store")
            .db_key("app_key")
            .path("/tmp/data");

        assert_eq!(config.name.as_deref(), Some("app"));
        assert_eq!(config.store_name.as_deref(), Some("cache"));
        assert_eq!(config.description.as_deref(), Some("test store"));
        assert_eq!(config.db_key.as_deref(), Some("app_key"));
        assert_eq!(config.path, Some(PathBuf::from("/tmp/data")));
    }

    #[test]
    fn config_deserializes_from_json() {
        let config: Config = serde_json::from_str(
            r#"{"name": "myapp", "driver_order": ["leveldatastore"]}"#,
        )
        .unwrap();

        assert_eq!(config.name.as_deref(), Some("myapp"));
        assert_eq!(config.driver_order, Some(vec!["leveldatastore".to_string()]));
        assert!(config.store_name.is_none());
    }
}
