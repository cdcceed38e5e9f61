use crate::client::*;
use crate::models::*;

const UNSUPPORTED: &str = "billing is not supported on this platform";

/// Stand-in store for platforms without a billing backend.
pub struct FakeBillingClient {
    on_purchase_complete: PurchaseListener,
}

impl FakeBillingClient {
    pub fn new(on_purchase_complete: PurchaseListener) -> Self {
        Self {
            on_purchase_complete,
        }
    }
}

impl BillingClient for FakeBillingClient {
    fn is_billing_supported(&self) -> bool {
        false
    }

    fn is_subscription_supported(&self) -> bool {
        false
    }

    fn is_subscriptions_update_supported(&self) -> bool {
        false
    }

    fn query_in_app_products(&self, _product_ids: Vec<String>, callback: ProductsCallback) {
        callback(BillingResult::error(UNSUPPORTED), Vec::new());
    }

    fn query_subs_products(&self, _product_ids: Vec<String>, callback: ProductsCallback) {
        callback(BillingResult::error(UNSUPPORTED), Vec::new());
    }

    fn buy_in_app_product(&self, _product_id: String, _options: PurchaseOptions) {
        (self.on_purchase_complete)(BillingResult::error(UNSUPPORTED), None);
    }

    fn buy_subs_product(&self, _product_id: String, _options: PurchaseOptions) {
        (self.on_purchase_complete)(BillingResult::error(UNSUPPORTED), None);
    }

    fn consume(&self, _purchase_token: String, callback: ResultCallback) {
        callback(BillingResult::error(UNSUPPORTED));
    }

    fn acknowledge(&self, _purchase_token: String, callback: ResultCallback) {
        callback(BillingResult::error(UNSUPPORTED));
    }

    fn query_purchases(&self, callback: PurchasesCallback) {
        callback(BillingResult::error(UNSUPPORTED), Vec::new());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn answers_every_call_with_unsupported() {
        let purchases = Arc::new(Mutex::new(Vec::new()));
        let sink = purchases.clone();
        let client = FakeBillingClient::new(Arc::new(move |result, purchase| {
            sink.lock().unwrap().push((result, purchase));
        }));

        assert!(!client.is_billing_supported());
        assert!(!client.is_subscription_supported());

        let answered = Arc::new(Mutex::new(Vec::new()));
        let seen = answered.clone();
        client.query_in_app_products(
            vec!["coins".into()],
            Box::new(move |result, products| {
                assert!(products.is_empty());
                seen.lock().unwrap().push(result.response_code);
            }),
        );
        let seen = answered.clone();
        client.consume(
            "token".into(),
            Box::new(move |result| seen.lock().unwrap().push(result.response_code)),
        );
        assert_eq!(*answered.lock().unwrap(), vec![ResponseCode::Error; 2]);

        client.buy_subs_product("vip".into(), PurchaseOptions::default());
        let purchases = purchases.lock().unwrap();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].0.debug_message.as_deref(), Some(UNSUPPORTED));
        assert!(purchases[0].1.is_none());
    }
}
