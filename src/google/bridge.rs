use std::sync::Arc;

use async_trait::async_trait;

use super::models::*;
use crate::models::PurchaseOptions;

pub type PurchasesUpdatedListener =
    Arc<dyn Fn(GoogleBillingResult, Vec<GooglePurchase>) + Send + Sync + 'static>;

/// Calls into the native Play Billing wrapper.
///
/// The wrapper owns the `BillingClient` connection, its retry, and the offer
/// token lookup; implementations only move requests and responses across the
/// native boundary.
#[async_trait]
pub trait PlayBillingBridge: Send + Sync {
    /// `false` when the wrapper answers `FEATURE_NOT_SUPPORTED`.
    fn is_feature_supported(&self, feature: GoogleFeatureType) -> bool;

    /// Registers the `PurchasesUpdatedListener` counterpart. Called once.
    fn set_purchases_updated_listener(&self, listener: PurchasesUpdatedListener)
        -> crate::Result<()>;

    async fn query_product_details(
        &self,
        product_type: GoogleProductType,
        product_ids: Vec<String>,
    ) -> crate::Result<GoogleProductDetailsResult>;

    /// Launches the billing flow. The returned result only says whether the
    /// flow started.
    async fn launch_billing_flow(
        &self,
        product_type: GoogleProductType,
        product_id: String,
        options: PurchaseOptions,
    ) -> crate::Result<GoogleBillingResult>;

    async fn consume(&self, purchase_token: String) -> crate::Result<GoogleBillingResult>;

    async fn acknowledge(&self, purchase_token: String) -> crate::Result<GoogleBillingResult>;

    async fn query_purchases(
        &self,
        product_type: GoogleProductType,
    ) -> crate::Result<GooglePurchasesResult>;

    /// Localized symbol for an ISO 4217 code, as `java.util.Currency` reports it.
    async fn currency_symbol(&self, currency_code: String) -> Option<String>;
}
