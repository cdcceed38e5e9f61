//! App Store storefront over StoreKit 2, with StoreKit 1 for devices that
//! predate it.

use std::sync::{Arc, Weak};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::client::*;
use crate::models::*;

#[cfg(all(feature = "plugin", target_os = "ios"))]
pub(crate) mod mobile;
mod models;
pub mod storekit1;
pub mod storekit2;

pub use models::*;

use storekit1::{
    PaymentOption, SkPaymentTransaction, SkPaymentTransactionState, SkProduct, StoreKit1Bridge,
};
use storekit2::{PurchaseOption, PurchaseOutcome, StoreKit2Bridge, Transaction};

/// The StoreKit generation a client talks to.
#[derive(Clone)]
pub enum StoreKit {
    V2(Arc<dyn StoreKit2Bridge>),
    V1(Arc<dyn StoreKit1Bridge>),
}

impl StoreKit {
    /// StoreKit 2 when it is enabled and the device supports it.
    pub fn select(
        enable_store_kit2: bool,
        store_kit2: Arc<dyn StoreKit2Bridge>,
        store_kit1: Arc<dyn StoreKit1Bridge>,
    ) -> Self {
        if enable_store_kit2 && store_kit2.is_supported() {
            Self::V2(store_kit2)
        } else {
            Self::V1(store_kit1)
        }
    }
}

pub struct AppleAppStoreBillingClient {
    store_kit: StoreKit,
    runtime: Handle,
    on_purchase_complete: PurchaseListener,
}

impl AppleAppStoreBillingClient {
    pub fn new(
        store_kit: StoreKit,
        runtime: Handle,
        on_purchase_complete: PurchaseListener,
    ) -> Self {
        let listening = match &store_kit {
            StoreKit::V2(bridge) => {
                let listener = on_purchase_complete.clone();
                bridge.start_transaction_listener(Arc::new(move |transaction| {
                    listener(BillingResult::ok(), Some(convert_transaction(transaction)));
                }))
            }
            StoreKit::V1(bridge) => {
                let (updates, batches) = mpsc::unbounded_channel();
                runtime.spawn(report_queue_updates(
                    Arc::downgrade(bridge),
                    batches,
                    on_purchase_complete.clone(),
                ));
                bridge.start_transaction_observer(Arc::new(move |transactions| {
                    if updates.send(transactions).is_err() {
                        debug!("payment queue worker stopped, dropping update");
                    }
                }))
            }
        };
        if let Err(err) = listening {
            warn!(error = %err, "failed to observe App Store transactions");
        }

        Self {
            store_kit,
            runtime,
            on_purchase_complete,
        }
    }

    fn query_products(&self, product_ids: Vec<String>, callback: ProductsCallback) {
        match self.store_kit.clone() {
            StoreKit::V2(bridge) => {
                self.runtime.spawn(async move {
                    match bridge.request_products(product_ids).await {
                        Ok(products) => callback(
                            BillingResult::ok(),
                            products.into_iter().map(convert_product).collect(),
                        ),
                        Err(err) => callback(bridge_failure(err), Vec::new()),
                    }
                });
            }
            StoreKit::V1(bridge) => {
                self.runtime.spawn(async move {
                    match bridge.request_products(product_ids).await {
                        Ok(response) => {
                            if !response.invalid_product_identifiers.is_empty() {
                                debug!(
                                    invalid = ?response.invalid_product_identifiers,
                                    "App Store rejected product ids"
                                );
                            }
                            let products =
                                response.products.into_iter().map(convert_sk_product).collect();
                            callback(BillingResult::ok(), products)
                        }
                        Err(err) => callback(bridge_failure(err), Vec::new()),
                    }
                });
            }
        }
    }

    fn buy(&self, product_id: String, options: PurchaseOptions) {
        debug!(%product_id, "starting App Store purchase");
        let on_purchase_complete = self.on_purchase_complete.clone();
        match self.store_kit.clone() {
            StoreKit::V2(bridge) => {
                let option = PurchaseOption {
                    app_account_token: options.user_identifier,
                };
                self.runtime.spawn(async move {
                    let (result, purchase) = match bridge.purchase(product_id, option).await {
                        Ok(outcome) => convert_purchase_outcome(outcome),
                        Err(err) => (bridge_failure(err), None),
                    };
                    on_purchase_complete(result, purchase);
                });
            }
            StoreKit::V1(bridge) => {
                let option = PaymentOption {
                    application_username: options.user_identifier,
                };
                self.runtime.spawn(async move {
                    let result = match bridge.add_payment(product_id, option).await {
                        // The transaction observer reports queued payments.
                        Ok(outcome) if outcome.success => return,
                        Ok(outcome) => {
                            let mut result =
                                BillingResult::error("payment was not added to the queue");
                            if let Some(code) = outcome.code {
                                result = result.with_raw(RawResult::AppleErrorCode(code));
                            }
                            result
                        }
                        Err(err) => bridge_failure(err),
                    };
                    on_purchase_complete(result, None);
                });
            }
        }
    }

    /// Consuming and acknowledging both finish the transaction.
    fn finish(&self, purchase_token: String, callback: ResultCallback) {
        match self.store_kit.clone() {
            StoreKit::V2(bridge) => {
                let transaction_id = match purchase_token.parse::<u64>() {
                    Ok(id) => id,
                    Err(_) => {
                        let err = crate::Error::InvalidTransactionId(purchase_token);
                        return callback(BillingResult::error(err.to_string()));
                    }
                };
                self.runtime.spawn(async move {
                    callback(finished(bridge.finish_transaction(transaction_id).await));
                });
            }
            StoreKit::V1(bridge) => {
                self.runtime.spawn(async move {
                    callback(finished(bridge.finish_transaction(purchase_token).await));
                });
            }
        }
    }
}

impl BillingClient for AppleAppStoreBillingClient {
    fn is_billing_supported(&self) -> bool {
        true
    }

    fn is_subscription_supported(&self) -> bool {
        true
    }

    fn is_subscriptions_update_supported(&self) -> bool {
        true
    }

    fn query_in_app_products(&self, product_ids: Vec<String>, callback: ProductsCallback) {
        self.query_products(product_ids, callback);
    }

    fn query_subs_products(&self, product_ids: Vec<String>, callback: ProductsCallback) {
        self.query_products(product_ids, callback);
    }

    fn buy_in_app_product(&self, product_id: String, options: PurchaseOptions) {
        self.buy(product_id, options);
    }

    fn buy_subs_product(&self, product_id: String, options: PurchaseOptions) {
        self.buy(product_id, options);
    }

    fn consume(&self, purchase_token: String, callback: ResultCallback) {
        self.finish(purchase_token, callback);
    }

    fn acknowledge(&self, purchase_token: String, callback: ResultCallback) {
        self.finish(purchase_token, callback);
    }

    fn query_purchases(&self, callback: PurchasesCallback) {
        match self.store_kit.clone() {
            StoreKit::V2(bridge) => {
                self.runtime.spawn(async move {
                    match bridge.transactions().await {
                        Ok(transactions) => callback(
                            BillingResult::ok(),
                            transactions.into_iter().map(convert_transaction).collect(),
                        ),
                        Err(err) => callback(bridge_failure(err), Vec::new()),
                    }
                });
            }
            StoreKit::V1(bridge) => {
                self.runtime.spawn(async move {
                    let transactions = match bridge.transactions().await {
                        Ok(transactions) => transactions,
                        Err(err) => return callback(bridge_failure(err), Vec::new()),
                    };
                    let receipt = app_receipt(&Arc::downgrade(&bridge)).await;
                    let purchases = transactions
                        .into_iter()
                        .filter_map(|transaction| {
                            convert_sk_transaction(transaction, receipt.clone())
                        })
                        .collect();
                    callback(BillingResult::ok(), purchases);
                });
            }
        }
    }
}

async fn app_receipt(bridge: &Weak<dyn StoreKit1Bridge>) -> Option<String> {
    let bridge = bridge.upgrade()?;
    match bridge.receipt().await {
        Ok(receipt) => receipt,
        Err(err) => {
            warn!(error = %err, "failed to read the App Store receipt");
            None
        }
    }
}

/// Reports payment queue batches one at a time, in the order they arrived.
async fn report_queue_updates(
    bridge: Weak<dyn StoreKit1Bridge>,
    mut batches: mpsc::UnboundedReceiver<Vec<SkPaymentTransaction>>,
    listener: PurchaseListener,
) {
    while let Some(transactions) = batches.recv().await {
        let receipt = app_receipt(&bridge).await;
        report_sk_transactions(&listener, transactions, receipt);
    }
}

/// Finished transactions are reported as purchases; failed ones as errors so
/// the caller can still finish them. In-flight states are skipped.
fn report_sk_transactions(
    listener: &PurchaseListener,
    transactions: Vec<SkPaymentTransaction>,
    receipt: Option<String>,
) {
    for mut transaction in transactions {
        let result = match transaction.transaction_state {
            SkPaymentTransactionState::Purchased | SkPaymentTransactionState::Restored => {
                BillingResult::ok()
            }
            SkPaymentTransactionState::Failed => {
                let error = transaction.error.take();
                failure_result(error.as_ref().map(|error| error.code), error)
            }
            SkPaymentTransactionState::Purchasing | SkPaymentTransactionState::Deferred => {
                continue
            }
        };
        let failed = transaction.transaction_state == SkPaymentTransactionState::Failed;
        match convert_sk_transaction(transaction, receipt.clone()) {
            Some(purchase) => listener(result, Some(purchase)),
            // StoreKit rarely assigns an identifier to a failed payment.
            None if failed => listener(result, None),
            None => debug!("skipping transaction without an identifier"),
        }
    }
}

fn finished(outcome: crate::Result<bool>) -> BillingResult {
    match outcome {
        Ok(true) => BillingResult::ok(),
        Ok(false) => BillingResult::error("transaction was not finished"),
        Err(err) => bridge_failure(err),
    }
}

fn convert_purchase_outcome(outcome: PurchaseOutcome) -> (BillingResult, Option<Purchase>) {
    if let Some(transaction) = outcome.transaction {
        return (BillingResult::ok(), Some(convert_transaction(transaction)));
    }

    (failure_result(outcome.code, outcome.error), None)
}

/// A cancelled payment is `UserCanceled`; every other failure is `Error`.
fn failure_result(code: Option<AppleErrorCode>, error: Option<AppleError>) -> BillingResult {
    let response_code = match code {
        Some(AppleErrorCode::PaymentCancelled) => ResponseCode::UserCanceled,
        _ => ResponseCode::Error,
    };
    let raw = match (error, code) {
        (Some(error), _) => Some(RawResult::Apple(error)),
        (None, Some(code)) => Some(RawResult::AppleErrorCode(code)),
        (None, None) => None,
    };
    let debug_message = match &raw {
        Some(RawResult::Apple(error)) if !error.localized_description.is_empty() => {
            Some(error.localized_description.clone())
        }
        _ => None,
    };

    BillingResult {
        response_code,
        debug_message,
        raw,
    }
}

fn convert_environment(environment: Option<storekit2::Environment>) -> Environment {
    match environment {
        Some(storekit2::Environment::Production) => Environment::Production,
        Some(storekit2::Environment::Sandbox | storekit2::Environment::Xcode) => {
            Environment::Sandbox
        }
        None => Environment::Unknown,
    }
}

fn convert_transaction(transaction: Transaction) -> Purchase {
    let id = transaction.id.to_string();
    Purchase {
        consume_id: id.clone(),
        order_id: Some(id),
        product_id: transaction.product_id,
        environment: convert_environment(transaction.environment),
        ..Default::default()
    }
}

fn convert_sk_transaction(
    transaction: SkPaymentTransaction,
    receipt: Option<String>,
) -> Option<Purchase> {
    let id = transaction.transaction_identifier?;
    Some(Purchase {
        consume_id: id.clone(),
        order_id: Some(id),
        product_id: transaction.payment.product_identifier,
        receipt,
        ..Default::default()
    })
}

fn convert_product(product: storekit2::Product) -> Product {
    Product {
        product_id: product.id.clone(),
        title: product.display_name.clone(),
        description: product.description.clone(),
        display_price: Some(product.display_price.clone()),
        currency_code: product.currency_code.clone(),
        currency_symbol: product.currency_symbol.clone(),
        price: product.price,
        raw: Some(RawProduct::StoreKit2(product)),
    }
}

fn convert_sk_product(product: SkProduct) -> Product {
    Product {
        product_id: product.product_identifier.clone(),
        title: product.localized_title.clone(),
        description: product.localized_description.clone(),
        display_price: Some(product.display_price.clone()),
        currency_code: product.currency_code.clone(),
        currency_symbol: product.currency_symbol.clone(),
        price: product.price,
        raw: Some(RawProduct::StoreKit1(product)),
    }
}

fn bridge_failure(err: crate::Error) -> BillingResult {
    warn!(error = %err, "App Store bridge call failed");
    BillingResult::bridge_failure(&err)
}
