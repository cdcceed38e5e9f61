use std::sync::Arc;

use crate::models::*;

pub type ProductsCallback = Box<dyn FnOnce(BillingResult, Vec<Product>) + Send + 'static>;
pub type PurchasesCallback = Box<dyn FnOnce(BillingResult, Vec<Purchase>) + Send + 'static>;
pub type ResultCallback = Box<dyn FnOnce(BillingResult) + Send + 'static>;

/// Receives the outcome of every purchase flow, including purchases the store
/// reports on its own (deferred payments, restored transactions).
pub type PurchaseListener = Arc<dyn Fn(BillingResult, Option<Purchase>) + Send + Sync + 'static>;

/// One storefront behind the common billing model.
///
/// Callbacks may run on any thread; [`crate::BillingManager`] moves them onto
/// the caller's update loop.
pub trait BillingClient: Send + Sync {
    fn is_billing_supported(&self) -> bool;

    fn is_subscription_supported(&self) -> bool;

    fn is_subscriptions_update_supported(&self) -> bool;

    /// Looks up consumable and non-consumable products.
    fn query_in_app_products(&self, product_ids: Vec<String>, callback: ProductsCallback);

    /// Looks up subscription products.
    fn query_subs_products(&self, product_ids: Vec<String>, callback: ProductsCallback);

    /// Starts a purchase flow. The outcome arrives through the purchase listener.
    fn buy_in_app_product(&self, product_id: String, options: PurchaseOptions);

    /// Starts a subscription purchase flow. The outcome arrives through the
    /// purchase listener.
    fn buy_subs_product(&self, product_id: String, options: PurchaseOptions);

    /// Finalizes a consumable purchase.
    fn consume(&self, purchase_token: String, callback: ResultCallback);

    /// Finalizes an entitlement-granting purchase.
    fn acknowledge(&self, purchase_token: String, callback: ResultCallback);

    /// Lists purchases that have not been consumed yet.
    fn query_purchases(&self, callback: PurchasesCallback);
}
