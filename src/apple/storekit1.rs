use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::models::{AppleError, AppleErrorCode};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkProduct {
    pub product_identifier: String,
    pub localized_title: String,
    pub localized_description: String,
    pub display_price: String,
    pub currency_code: Option<String>,
    pub currency_symbol: Option<String>,
    pub price: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkProductsResponse {
    pub products: Vec<SkProduct>,
    #[serde(default)]
    pub invalid_product_identifiers: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkPaymentTransactionState {
    Purchasing = 0,
    Purchased = 1,
    Failed = 2,
    Restored = 3,
    Deferred = 4,
}

impl Serialize for SkPaymentTransactionState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i32(*self as i32)
    }
}

impl<'de> Deserialize<'de> for SkPaymentTransactionState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = i32::deserialize(deserializer)?;
        match value {
            0 => Ok(SkPaymentTransactionState::Purchasing),
            1 => Ok(SkPaymentTransactionState::Purchased),
            2 => Ok(SkPaymentTransactionState::Failed),
            3 => Ok(SkPaymentTransactionState::Restored),
            4 => Ok(SkPaymentTransactionState::Deferred),
            _ => Err(serde::de::Error::custom(format!(
                "Invalid transaction state: {value}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkPayment {
    pub product_identifier: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    pub application_username: Option<String>,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkPaymentTransaction {
    /// Absent while the transaction is still `Purchasing`.
    pub transaction_identifier: Option<String>,
    pub transaction_state: SkPaymentTransactionState,
    pub payment: SkPayment,
    /// Set on `Failed` transactions.
    #[serde(default)]
    pub error: Option<AppleError>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOption {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_username: Option<String>,
}

/// Whether the payment was queued; `code` explains a refusal.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPaymentOutcome {
    pub success: bool,
    pub code: Option<AppleErrorCode>,
}

pub type SkTransactionListener = Arc<dyn Fn(Vec<SkPaymentTransaction>) + Send + Sync + 'static>;

/// StoreKit 1 surface of the native App Store wrapper.
#[async_trait]
pub trait StoreKit1Bridge: Send + Sync {
    /// Adds the `SKPaymentTransactionObserver` that reports queue updates.
    fn start_transaction_observer(&self, listener: SkTransactionListener) -> crate::Result<()>;

    async fn request_products(&self, product_ids: Vec<String>)
        -> crate::Result<SkProductsResponse>;

    async fn add_payment(
        &self,
        product_id: String,
        option: PaymentOption,
    ) -> crate::Result<AddPaymentOutcome>;

    /// `true` when a queued transaction with this identifier was finished.
    async fn finish_transaction(&self, transaction_identifier: String) -> crate::Result<bool>;

    /// Transactions currently in the payment queue.
    async fn transactions(&self) -> crate::Result<Vec<SkPaymentTransaction>>;

    /// Base64 app receipt, when the device has one.
    async fn receipt(&self) -> crate::Result<Option<String>>;
}
