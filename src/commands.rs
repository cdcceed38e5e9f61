use serde::{Deserialize, Serialize};
use tauri::{command, AppHandle, Runtime};
use tokio::sync::oneshot;

use crate::models::*;
use crate::{AppStore, BillingExt, Error, Result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BillingSupport {
    app_store: AppStore,
    billing: bool,
    subscriptions: bool,
    subscriptions_update: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProductsRequest {
    product_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProductsResponse {
    result: BillingResult,
    products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BuyRequest {
    product_id: String,
    #[serde(default)]
    options: PurchaseOptions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenRequest {
    purchase_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PurchasesResponse {
    result: BillingResult,
    purchases: Vec<Purchase>,
}

async fn answer<T>(rx: oneshot::Receiver<T>) -> Result<T> {
    rx.await.map_err(|_| Error::CallbackDropped)
}

#[command]
pub(crate) fn is_billing_supported<R: Runtime>(app: AppHandle<R>) -> BillingSupport {
    let billing = app.billing();
    BillingSupport {
        app_store: billing.app_store(),
        billing: billing.is_billing_supported(),
        subscriptions: billing.is_subscription_supported(),
        subscriptions_update: billing.is_subscriptions_update_supported(),
    }
}

#[command]
pub(crate) async fn query_in_app_products<R: Runtime>(
    app: AppHandle<R>,
    payload: ProductsRequest,
) -> Result<ProductsResponse> {
    let (tx, rx) = oneshot::channel();
    app.billing()
        .query_in_app_products(payload.product_ids, move |result, products| {
            let _ = tx.send(ProductsResponse { result, products });
        });
    answer(rx).await
}

#[command]
pub(crate) async fn query_subs_products<R: Runtime>(
    app: AppHandle<R>,
    payload: ProductsRequest,
) -> Result<ProductsResponse> {
    let (tx, rx) = oneshot::channel();
    app.billing()
        .query_subs_products(payload.product_ids, move |result, products| {
            let _ = tx.send(ProductsResponse { result, products });
        });
    answer(rx).await
}

/// The outcome is emitted as a purchase-complete event.
#[command]
pub(crate) fn buy_in_app_product<R: Runtime>(app: AppHandle<R>, payload: BuyRequest) {
    app.billing()
        .buy_in_app_product(payload.product_id, payload.options);
}

#[command]
pub(crate) fn buy_subs_product<R: Runtime>(app: AppHandle<R>, payload: BuyRequest) {
    app.billing()
        .buy_subs_product(payload.product_id, payload.options);
}

#[command]
pub(crate) async fn consume<R: Runtime>(
    app: AppHandle<R>,
    payload: TokenRequest,
) -> Result<BillingResult> {
    let (tx, rx) = oneshot::channel();
    app.billing().consume(payload.purchase_token, move |result| {
        let _ = tx.send(result);
    });
    answer(rx).await
}

#[command]
pub(crate) async fn acknowledge<R: Runtime>(
    app: AppHandle<R>,
    payload: TokenRequest,
) -> Result<BillingResult> {
    let (tx, rx) = oneshot::channel();
    app.billing().acknowledge(payload.purchase_token, move |result| {
        let _ = tx.send(result);
    });
    answer(rx).await
}

#[command]
pub(crate) async fn query_purchases<R: Runtime>(app: AppHandle<R>) -> Result<PurchasesResponse> {
    let (tx, rx) = oneshot::channel();
    app.billing().query_purchases(move |result, purchases| {
        let _ = tx.send(PurchasesResponse { result, purchases });
    });
    answer(rx).await
}
