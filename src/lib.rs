//! One in-app purchase API over Google Play Billing and the App Store.
//!
//! Application code talks to a [`BillingManager`]. Store answers are queued
//! and delivered when the host calls [`BillingManager::update`]; with the
//! `plugin` feature the Tauri plugin runs that pump itself.

pub mod apple;
mod client;
#[cfg(feature = "plugin")]
mod commands;
mod config;
mod desktop;
mod error;
pub mod google;
mod manager;
mod models;

pub use client::*;
pub use config::{AppStore, BillingConfig};
pub use desktop::FakeBillingClient;
pub use error::{Error, Result};
pub use manager::{BillingManager, Storefront};
pub use models::*;

#[cfg(feature = "plugin")]
pub use plugin::*;

#[cfg(feature = "plugin")]
mod plugin {
  use std::time::Duration;

  use serde::Serialize;
  use tauri::{
    plugin::{Builder, PluginApi, TauriPlugin},
    Emitter, Manager, Runtime,
  };
  use tracing::warn;

  use crate::{commands, BillingConfig, BillingManager, BillingResult, Purchase, Storefront};

  /// Event carrying every purchase-complete notification to the frontend.
  pub const PURCHASE_COMPLETE_EVENT: &str = "billing://purchase-complete";

  const FRAME: Duration = Duration::from_millis(16);

  #[derive(Debug, Clone, Serialize)]
  #[serde(rename_all = "camelCase")]
  pub struct PurchaseCompleteEvent {
    pub result: BillingResult,
    pub purchase: Option<Purchase>,
  }

  /// Extensions to [`tauri::App`], [`tauri::AppHandle`] and [`tauri::Window`] to access the
  /// billing APIs.
  pub trait BillingExt<R: Runtime> {
    fn billing(&self) -> &BillingManager;
  }

  impl<R: Runtime, T: Manager<R>> crate::BillingExt<R> for T {
    fn billing(&self) -> &BillingManager {
      self.state::<BillingManager>().inner()
    }
  }

  /// Initializes the plugin.
  pub fn init<R: Runtime>() -> TauriPlugin<R, Option<BillingConfig>> {
    Builder::<R, Option<BillingConfig>>::new("billing")
      .invoke_handler(tauri::generate_handler![
        commands::is_billing_supported,
        commands::query_in_app_products,
        commands::query_subs_products,
        commands::buy_in_app_product,
        commands::buy_subs_product,
        commands::consume,
        commands::acknowledge,
        commands::query_purchases,
      ])
      .setup(|app, api| {
        let config = api.config().clone().unwrap_or_default();
        let storefront = storefront(&api, &config)?;

        let emitter = app.clone();
        let manager = BillingManager::new(
          storefront,
          tauri::async_runtime::handle().inner().clone(),
          move |result, purchase| {
            let event = PurchaseCompleteEvent { result, purchase };
            if let Err(err) = emitter.emit(PURCHASE_COMPLETE_EVENT, event) {
              warn!(error = %err, "failed to emit purchase-complete event");
            }
          },
        );
        app.manage(manager);

        let pump = app.clone();
        tauri::async_runtime::spawn(async move {
          let mut frames = tokio::time::interval(FRAME);
          loop {
            frames.tick().await;
            pump.billing().update();
          }
        });
        Ok(())
      })
      .build()
  }

  #[cfg_attr(
    not(any(target_os = "android", target_os = "ios")),
    allow(unused_variables)
  )]
  fn storefront<R: Runtime>(
    api: &PluginApi<R, Option<BillingConfig>>,
    config: &BillingConfig,
  ) -> crate::Result<Storefront> {
    let storefront = match config.resolve_app_store() {
      #[cfg(target_os = "android")]
      crate::AppStore::GooglePlay => {
        Storefront::GooglePlay(std::sync::Arc::new(crate::google::mobile::init(api)?))
      }
      #[cfg(target_os = "ios")]
      crate::AppStore::AppleAppStore => {
        let plugin = std::sync::Arc::new(crate::apple::mobile::init(api)?);
        Storefront::AppleAppStore(crate::apple::StoreKit::select(
          config.enable_store_kit2,
          plugin.clone(),
          plugin,
        ))
      }
      _ => Storefront::Unsupported,
    };
    Ok(storefront)
  }
}
