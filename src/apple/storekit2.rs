use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::models::{AppleError, AppleErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProductType {
    Consumable,
    NonConsumable,
    NonRenewable,
    AutoRenewable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Environment {
    Production,
    Sandbox,
    Xcode,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPeriod {
    /// `day`, `week`, `month` or `year`.
    pub unit: String,
    pub value: i32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInfo {
    #[serde(rename = "subscriptionGroupID")]
    pub subscription_group_id: String,
    pub subscription_period: SubscriptionPeriod,
    #[serde(default)]
    pub is_eligible_for_intro_offer: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub display_name: String,
    pub description: String,
    pub display_price: String,
    pub currency_code: Option<String>,
    pub currency_symbol: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub is_family_shareable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<SubscriptionInfo>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: u64,
    #[serde(rename = "originalID")]
    pub original_id: u64,
    #[serde(rename = "productID")]
    pub product_id: String,
    pub product_type: ProductType,
    /// Milliseconds since the Unix epoch.
    pub purchase_date: u64,
    pub expiration_date: Option<u64>,
    #[serde(default = "default_quantity")]
    pub purchased_quantity: i32,
    pub app_account_token: Option<String>,
    pub environment: Option<Environment>,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOption {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_account_token: Option<String>,
}

/// What `Product.purchase` settled with: a verified transaction, or an error.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOutcome {
    pub code: Option<AppleErrorCode>,
    pub error: Option<AppleError>,
    pub transaction: Option<Transaction>,
}

pub type TransactionListener = Arc<dyn Fn(Transaction) + Send + Sync + 'static>;

/// StoreKit 2 surface of the native App Store wrapper.
#[async_trait]
pub trait StoreKit2Bridge: Send + Sync {
    /// `false` before iOS 15.
    fn is_supported(&self) -> bool;

    /// Starts iterating `Transaction.updates`, reporting each verified transaction.
    fn start_transaction_listener(&self, listener: TransactionListener) -> crate::Result<()>;

    async fn request_products(&self, product_ids: Vec<String>) -> crate::Result<Vec<Product>>;

    async fn purchase(
        &self,
        product_id: String,
        option: PurchaseOption,
    ) -> crate::Result<PurchaseOutcome>;

    /// `true` once the transaction is finished.
    async fn finish_transaction(&self, transaction_id: u64) -> crate::Result<bool>;

    /// Unfinished transactions.
    async fn transactions(&self) -> crate::Result<Vec<Transaction>>;
}
