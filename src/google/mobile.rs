use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tauri::{
  ipc::{Channel, InvokeResponseBody},
  plugin::{PluginApi, PluginHandle},
  Runtime,
};
use tracing::warn;

use super::{bridge::*, models::*};
use crate::models::PurchaseOptions;

const PLUGIN_IDENTIFIER: &str = "app.tauri.billing";

/// Registers the Kotlin `BillingPlugin`.
pub fn init<R: Runtime, C>(api: &PluginApi<R, C>) -> crate::Result<PlayBilling<R>> {
  let handle = api.register_android_plugin(PLUGIN_IDENTIFIER, "BillingPlugin")?;
  Ok(PlayBilling(handle))
}

/// Play Billing reached through the Android plugin.
pub struct PlayBilling<R: Runtime>(PluginHandle<R>);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FeatureRequest {
  feature: GoogleFeatureType,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProductDetailsRequest {
  product_type: GoogleProductType,
  product_ids: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BillingFlowRequest {
  product_type: GoogleProductType,
  product_id: String,
  #[serde(flatten)]
  options: PurchaseOptions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest {
  purchase_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PurchasesRequest {
  product_type: GoogleProductType,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CurrencyRequest {
  currency_code: String,
}

#[derive(Serialize)]
struct RegisterListener {
  event: &'static str,
  handler: Channel,
}

#[derive(Deserialize)]
struct Value<T> {
  value: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PurchasesUpdated {
  billing_result: GoogleBillingResult,
  #[serde(default)]
  purchases: Vec<GooglePurchase>,
}

#[async_trait]
impl<R: Runtime> PlayBillingBridge for PlayBilling<R> {
  fn is_feature_supported(&self, feature: GoogleFeatureType) -> bool {
    match self
      .0
      .run_mobile_plugin::<Value<bool>>("isFeatureSupported", FeatureRequest { feature })
    {
      Ok(response) => response.value,
      Err(err) => {
        warn!(?feature, error = %err, "feature check failed");
        false
      }
    }
  }

  fn set_purchases_updated_listener(
    &self,
    listener: PurchasesUpdatedListener,
  ) -> crate::Result<()> {
    let handler = Channel::new(move |body: InvokeResponseBody| {
      match body.deserialize::<PurchasesUpdated>() {
        Ok(update) => listener(update.billing_result, update.purchases),
        Err(err) => warn!(error = %err, "malformed purchasesUpdated event"),
      }
      Ok(())
    });
    self.0.run_mobile_plugin::<()>(
      "registerListener",
      RegisterListener {
        event: "purchasesUpdated",
        handler,
      },
    )?;
    Ok(())
  }

  async fn query_product_details(
    &self,
    product_type: GoogleProductType,
    product_ids: Vec<String>,
  ) -> crate::Result<GoogleProductDetailsResult> {
    self
      .0
      .run_mobile_plugin_async(
        "queryProductDetails",
        ProductDetailsRequest {
          product_type,
          product_ids,
        },
      )
      .await
      .map_err(Into::into)
  }

  async fn launch_billing_flow(
    &self,
    product_type: GoogleProductType,
    product_id: String,
    options: PurchaseOptions,
  ) -> crate::Result<GoogleBillingResult> {
    self
      .0
      .run_mobile_plugin_async(
        "launchBillingFlow",
        BillingFlowRequest {
          product_type,
          product_id,
          options,
        },
      )
      .await
      .map_err(Into::into)
  }

  async fn consume(&self, purchase_token: String) -> crate::Result<GoogleBillingResult> {
    self
      .0
      .run_mobile_plugin_async("consume", TokenRequest { purchase_token })
      .await
      .map_err(Into::into)
  }

  async fn acknowledge(&self, purchase_token: String) -> crate::Result<GoogleBillingResult> {
    self
      .0
      .run_mobile_plugin_async("acknowledge", TokenRequest { purchase_token })
      .await
      .map_err(Into::into)
  }

  async fn query_purchases(
    &self,
    product_type: GoogleProductType,
  ) -> crate::Result<GooglePurchasesResult> {
    self
      .0
      .run_mobile_plugin_async("queryPurchases", PurchasesRequest { product_type })
      .await
      .map_err(Into::into)
  }

  async fn currency_symbol(&self, currency_code: String) -> Option<String> {
    let response = self
      .0
      .run_mobile_plugin_async::<Value<Option<String>>>(
        "currencySymbol",
        CurrencyRequest {
          currency_code: currency_code.clone(),
        },
      )
      .await;
    match response {
      Ok(response) => response.value,
      Err(err) => {
        warn!(%currency_code, error = %err, "currency symbol lookup failed");
        None
      }
    }
  }
}
