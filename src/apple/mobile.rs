use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tauri::{
  ipc::{Channel, InvokeResponseBody},
  plugin::{PluginApi, PluginHandle},
  Runtime,
};
use tracing::warn;

use super::storekit1::*;
use super::storekit2::*;

tauri::ios_plugin_binding!(init_plugin_billing);

/// Registers the Swift `BillingPlugin`.
pub fn init<R: Runtime, C>(api: &PluginApi<R, C>) -> crate::Result<StoreKitPlugin<R>> {
  let handle = api.register_ios_plugin(init_plugin_billing)?;
  Ok(StoreKitPlugin(handle))
}

/// The App Store reached through the iOS plugin. The Swift side exposes both
/// StoreKit generations, so one handle backs both bridges.
pub struct StoreKitPlugin<R: Runtime>(PluginHandle<R>);

impl<R: Runtime> StoreKitPlugin<R> {
  async fn call<T: DeserializeOwned>(
    &self,
    command: &str,
    payload: impl Serialize,
  ) -> crate::Result<T> {
    self
      .0
      .run_mobile_plugin_async(command, payload)
      .await
      .map_err(Into::into)
  }

  fn listen<T, F>(&self, event: &'static str, on_event: F) -> crate::Result<()>
  where
    T: DeserializeOwned,
    F: Fn(T) + Send + Sync + 'static,
  {
    let handler = Channel::new(move |body: InvokeResponseBody| {
      match body.deserialize::<T>() {
        Ok(payload) => on_event(payload),
        Err(err) => warn!(event, error = %err, "malformed App Store event"),
      }
      Ok(())
    });
    self
      .0
      .run_mobile_plugin::<()>("registerListener", RegisterListener { event, handler })?;
    Ok(())
  }
}

#[derive(Serialize)]
struct RegisterListener {
  event: &'static str,
  handler: Channel,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProductsRequest {
  product_ids: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseRequest<O> {
  product_id: String,
  #[serde(flatten)]
  option: O,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FinishRequest<T> {
  transaction_id: T,
}

#[derive(Deserialize)]
struct Value<T> {
  value: T,
}

#[derive(Deserialize)]
struct Transactions<T> {
  transactions: Vec<T>,
}

#[async_trait]
impl<R: Runtime> StoreKit2Bridge for StoreKitPlugin<R> {
  fn is_supported(&self) -> bool {
    match self.0.run_mobile_plugin::<Value<bool>>("isStoreKit2Supported", ()) {
      Ok(response) => response.value,
      Err(err) => {
        warn!(error = %err, "StoreKit 2 availability check failed");
        false
      }
    }
  }

  fn start_transaction_listener(&self, listener: TransactionListener) -> crate::Result<()> {
    self.listen("transactionUpdated", move |transaction: Transaction| listener(transaction))
  }

  async fn request_products(&self, product_ids: Vec<String>) -> crate::Result<Vec<Product>> {
    #[derive(Deserialize)]
    struct Products {
      products: Vec<Product>,
    }
    let response: Products = self.call("requestProducts", ProductsRequest { product_ids }).await?;
    Ok(response.products)
  }

  async fn purchase(
    &self,
    product_id: String,
    option: PurchaseOption,
  ) -> crate::Result<PurchaseOutcome> {
    self.call("purchase", PurchaseRequest { product_id, option }).await
  }

  async fn finish_transaction(&self, transaction_id: u64) -> crate::Result<bool> {
    let response: Value<bool> = self
      .call("finishTransaction", FinishRequest { transaction_id })
      .await?;
    Ok(response.value)
  }

  async fn transactions(&self) -> crate::Result<Vec<Transaction>> {
    let response: Transactions<Transaction> = self.call("unfinishedTransactions", ()).await?;
    Ok(response.transactions)
  }
}

#[async_trait]
impl<R: Runtime> StoreKit1Bridge for StoreKitPlugin<R> {
  fn start_transaction_observer(&self, listener: SkTransactionListener) -> crate::Result<()> {
    self.listen("paymentQueueUpdated", move |update: Transactions<SkPaymentTransaction>| {
      listener(update.transactions)
    })
  }

  async fn request_products(&self, product_ids: Vec<String>) -> crate::Result<SkProductsResponse> {
    self.call("skRequestProducts", ProductsRequest { product_ids }).await
  }

  async fn add_payment(
    &self,
    product_id: String,
    option: PaymentOption,
  ) -> crate::Result<AddPaymentOutcome> {
    self.call("skAddPayment", PurchaseRequest { product_id, option }).await
  }

  async fn finish_transaction(&self, transaction_identifier: String) -> crate::Result<bool> {
    let response: Value<bool> = self
      .call(
        "skFinishTransaction",
        FinishRequest {
          transaction_id: transaction_identifier,
        },
      )
      .await?;
    Ok(response.value)
  }

  async fn transactions(&self) -> crate::Result<Vec<SkPaymentTransaction>> {
    let response: Transactions<SkPaymentTransaction> = self.call("skTransactions", ()).await?;
    Ok(response.transactions)
  }

  async fn receipt(&self) -> crate::Result<Option<String>> {
    let response: Value<Option<String>> = self.call("appReceipt", ()).await?;
    Ok(response.value)
  }
}
