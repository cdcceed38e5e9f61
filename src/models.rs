use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::apple::{storekit1::SkProduct, storekit2, AppleError, AppleErrorCode};
use crate::google::{GoogleBillingResult, GoogleProductDetails};

/// Store-independent outcome of a billing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Ok = 0,
    UserCanceled = 1,
    Error = 2,
}

impl Serialize for ResponseCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i32(*self as i32)
    }
}

impl<'de> Deserialize<'de> for ResponseCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = i32::deserialize(deserializer)?;
        match value {
            0 => Ok(ResponseCode::Ok),
            1 => Ok(ResponseCode::UserCanceled),
            2 => Ok(ResponseCode::Error),
            _ => Err(serde::de::Error::custom(format!(
                "Invalid response code: {value}"
            ))),
        }
    }
}

/// The vendor object a [`BillingResult`] was translated from.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum RawResult {
    GooglePlay(GoogleBillingResult),
    Apple(AppleError),
    AppleErrorCode(AppleErrorCode),
    /// The call never reached the store; carries the bridge failure.
    Bridge(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingResult {
    pub response_code: ResponseCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<RawResult>,
}

impl BillingResult {
    pub fn ok() -> Self {
        Self::with_code(ResponseCode::Ok)
    }

    pub fn user_canceled() -> Self {
        Self::with_code(ResponseCode::UserCanceled)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            response_code: ResponseCode::Error,
            debug_message: Some(message.into()),
            raw: None,
        }
    }

    /// An error result for a call the native bridge failed to deliver.
    pub(crate) fn bridge_failure(err: &crate::Error) -> Self {
        let message = err.to_string();
        Self {
            response_code: ResponseCode::Error,
            debug_message: Some(message.clone()),
            raw: Some(RawResult::Bridge(message)),
        }
    }

    fn with_code(response_code: ResponseCode) -> Self {
        Self {
            response_code,
            debug_message: None,
            raw: None,
        }
    }

    pub fn with_raw(mut self, raw: RawResult) -> Self {
        self.raw = Some(raw);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.response_code == ResponseCode::Ok
    }
}

/// The vendor product a [`Product`] was translated from.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum RawProduct {
    GooglePlay(GoogleProductDetails),
    StoreKit2(storekit2::Product),
    StoreKit1(SkProduct),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub product_id: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_symbol: Option<String>,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<RawProduct>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Environment {
    #[default]
    Unknown,
    Sandbox,
    Production,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    /// Token handed back to `consume` / `acknowledge`.
    pub consume_id: String,
    pub order_id: Option<String>,
    pub product_id: String,
    // Google Play
    pub purchase_token: Option<String>,
    pub original_json: Option<String>,
    pub signature: Option<String>,
    // StoreKit 2
    #[serde(default)]
    pub environment: Environment,
    // StoreKit 1
    pub receipt: Option<String>,
}

impl fmt::Display for Purchase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Purchase {{orderId={}, productId={}",
            self.order_id.as_deref().unwrap_or(""),
            self.product_id
        )?;
        if let Some(token) = &self.purchase_token {
            write!(f, ", purchaseToken={token}")?;
        }
        if let Some(json) = &self.original_json {
            write!(f, ", originalJson={json}")?;
        }
        if let Some(signature) = &self.signature {
            write!(f, ", signature={signature}")?;
        }
        if let Some(receipt) = &self.receipt {
            write!(f, ", receipt={receipt}")?;
        }
        write!(f, "}}")
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOptions {
    /// Obfuscated account id on Google Play, app account token or
    /// application username on the App Store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_identifier: Option<String>,
    /// Google Play subscription offer; the first offer is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_token: Option<String>,
}
