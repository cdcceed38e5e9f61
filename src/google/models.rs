use serde::{Deserialize, Serialize};

/// Play Billing response code. Kept as the raw integer so codes newer than
/// this crate still round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct GoogleBillingResponseCode(pub i32);

impl GoogleBillingResponseCode {
    #[deprecated]
    pub const SERVICE_TIMEOUT: Self = Self(-3);
    pub const FEATURE_NOT_SUPPORTED: Self = Self(-2);
    pub const SERVICE_DISCONNECTED: Self = Self(-1);
    pub const OK: Self = Self(0);
    pub const USER_CANCELED: Self = Self(1);
    pub const SERVICE_UNAVAILABLE: Self = Self(2);
    pub const BILLING_UNAVAILABLE: Self = Self(3);
    pub const ITEM_UNAVAILABLE: Self = Self(4);
    pub const DEVELOPER_ERROR: Self = Self(5);
    pub const ERROR: Self = Self(6);
    pub const ITEM_ALREADY_OWNED: Self = Self(7);
    pub const ITEM_NOT_OWNED: Self = Self(8);
    pub const NETWORK_ERROR: Self = Self(12);
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleBillingResult {
    pub response_code: GoogleBillingResponseCode,
    #[serde(default)]
    pub debug_message: String,
}

impl GoogleBillingResult {
    pub fn new(response_code: GoogleBillingResponseCode) -> Self {
        Self {
            response_code,
            debug_message: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum GoogleProductType {
    #[serde(rename = "inapp")]
    InApp,
    #[serde(rename = "subs")]
    Subs,
}

/// `BillingClient.FeatureType` values the client asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum GoogleFeatureType {
    #[serde(rename = "subscriptions")]
    Subscriptions,
    #[serde(rename = "subscriptionsUpdate")]
    SubscriptionsUpdate,
    // Play Billing's own constant for PRODUCT_DETAILS.
    #[serde(rename = "fff")]
    ProductDetails,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleOneTimePurchaseOfferDetails {
    pub formatted_price: String,
    pub price_amount_micros: i64,
    pub price_currency_code: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GooglePricingPhase {
    pub formatted_price: String,
    pub price_currency_code: String,
    pub price_amount_micros: i64,
    pub billing_period: String,
    pub billing_cycle_count: i32,
    pub recurrence_mode: i32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleSubscriptionOfferDetails {
    pub offer_token: String,
    pub base_plan_id: String,
    pub offer_id: Option<String>,
    #[serde(default)]
    pub offer_tags: Vec<String>,
    #[serde(default)]
    pub pricing_phases: Vec<GooglePricingPhase>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleProductDetails {
    pub product_id: String,
    pub product_type: GoogleProductType,
    pub title: String,
    #[serde(default)]
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_time_purchase_offer_details: Option<GoogleOneTimePurchaseOfferDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_offer_details: Option<Vec<GoogleSubscriptionOfferDetails>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleProductDetailsResult {
    pub billing_result: GoogleBillingResult,
    pub product_details_list: Option<Vec<GoogleProductDetails>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GooglePurchaseState {
    UnspecifiedState = 0,
    Purchased = 1,
    Pending = 2,
}

impl Serialize for GooglePurchaseState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i32(*self as i32)
    }
}

impl<'de> Deserialize<'de> for GooglePurchaseState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = i32::deserialize(deserializer)?;
        match value {
            0 => Ok(GooglePurchaseState::UnspecifiedState),
            1 => Ok(GooglePurchaseState::Purchased),
            2 => Ok(GooglePurchaseState::Pending),
            _ => Err(serde::de::Error::custom(format!(
                "Invalid purchase state: {value}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GooglePurchase {
    pub order_id: Option<String>,
    pub package_name: String,
    pub products: Vec<String>,
    pub purchase_time: i64,
    pub purchase_token: String,
    pub purchase_state: GooglePurchaseState,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    pub is_acknowledged: bool,
    pub is_auto_renewing: bool,
    pub original_json: String,
    pub signature: String,
    pub obfuscated_account_id: Option<String>,
    pub obfuscated_profile_id: Option<String>,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GooglePurchasesResult {
    pub billing_result: GoogleBillingResult,
    #[serde(default)]
    pub purchases: Vec<GooglePurchase>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_product_details_from_plugin_json() {
        let json = r#"{
            "billingResult": { "responseCode": 0, "debugMessage": "" },
            "productDetailsList": [{
                "productId": "vip_monthly",
                "productType": "subs",
                "title": "VIP (Game)",
                "name": "VIP",
                "description": "Monthly VIP pass",
                "subscriptionOfferDetails": [{
                    "offerToken": "tok-1",
                    "basePlanId": "monthly",
                    "offerId": null,
                    "pricingPhases": [{
                        "formattedPrice": "$4.99",
                        "priceCurrencyCode": "USD",
                        "priceAmountMicros": 4990000,
                        "billingPeriod": "P1M",
                        "billingCycleCount": 0,
                        "recurrenceMode": 1
                    }]
                }]
            }]
        }"#;

        let result: GoogleProductDetailsResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.billing_result.response_code, GoogleBillingResponseCode::OK);
        let details = &result.product_details_list.unwrap()[0];
        assert_eq!(details.product_type, GoogleProductType::Subs);
        assert!(details.one_time_purchase_offer_details.is_none());
        let offers = details.subscription_offer_details.as_ref().unwrap();
        assert!(offers[0].offer_tags.is_empty());
        assert_eq!(offers[0].pricing_phases[0].billing_period, "P1M");
    }

    #[test]
    fn keeps_unknown_response_codes() {
        let result: GoogleBillingResult =
            serde_json::from_str(r#"{ "responseCode": 99 }"#).unwrap();
        assert_eq!(result.response_code, GoogleBillingResponseCode(99));
        assert_eq!(result.debug_message, "");
    }

    #[test]
    fn rejects_unknown_purchase_state() {
        assert_eq!(
            serde_json::from_str::<GooglePurchaseState>("2").unwrap(),
            GooglePurchaseState::Pending
        );
        assert!(serde_json::from_str::<GooglePurchaseState>("5").is_err());
    }
}
