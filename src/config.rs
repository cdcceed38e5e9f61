use serde::{Deserialize, Serialize};
use tracing::warn;

/// Storefront a build sells through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AppStore {
    #[default]
    Unknown,
    GooglePlay,
    AppleAppStore,
}

impl AppStore {
    /// The store the build target ships through.
    pub fn current() -> Self {
        if cfg!(target_os = "android") {
            AppStore::GooglePlay
        } else if cfg!(target_os = "ios") {
            AppStore::AppleAppStore
        } else {
            AppStore::Unknown
        }
    }

    /// Whether this build target can talk to the store at all.
    pub fn is_reachable(self) -> bool {
        self == AppStore::Unknown || self == AppStore::current()
    }
}

/// `plugins.billing` section of the app configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingConfig {
    /// Overrides the store derived from the build target.
    #[serde(default)]
    pub app_store: Option<AppStore>,
    #[serde(default = "default_enable_store_kit2")]
    pub enable_store_kit2: bool,
}

fn default_enable_store_kit2() -> bool {
    true
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            app_store: None,
            enable_store_kit2: default_enable_store_kit2(),
        }
    }
}

impl BillingConfig {
    /// The store to bill through. A configured store this target cannot
    /// reach falls back to [`AppStore::Unknown`], which runs the fake store.
    pub fn resolve_app_store(&self) -> AppStore {
        match self.app_store {
            None => AppStore::current(),
            Some(store) if store.is_reachable() => store,
            Some(store) => {
                warn!(
                    configured = ?store,
                    current = ?AppStore::current(),
                    "configured store is not available on this target, billing is disabled"
                );
                AppStore::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_store_kit2() {
        let config: BillingConfig = serde_json::from_str("{}").unwrap();
        assert!(config.enable_store_kit2);
        assert_eq!(config.app_store, None);
        assert!(BillingConfig::default().enable_store_kit2);
    }

    #[test]
    fn parses_plugin_section() {
        let config: BillingConfig =
            serde_json::from_str(r#"{ "appStore": "googlePlay", "enableStoreKit2": false }"#)
                .unwrap();
        assert_eq!(config.app_store, Some(AppStore::GooglePlay));
        assert!(!config.enable_store_kit2);
    }

    #[test]
    fn unreachable_store_resolves_to_unknown() {
        let config = BillingConfig {
            app_store: Some(AppStore::Unknown),
            ..Default::default()
        };
        assert_eq!(config.resolve_app_store(), AppStore::Unknown);

        assert_eq!(BillingConfig::default().resolve_app_store(), AppStore::current());

        #[cfg(not(any(target_os = "android", target_os = "ios")))]
        {
            let config = BillingConfig {
                app_store: Some(AppStore::AppleAppStore),
                ..Default::default()
            };
            assert_eq!(config.resolve_app_store(), AppStore::Unknown);
        }
    }
}
