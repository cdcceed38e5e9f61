//! Google Play Billing storefront.
//!
//! Translates the Play Billing wrapper's results into the common model:
//! vendor response codes collapse to [`ResponseCode`], product details become
//! [`Product`]s priced from micros, and only purchases in the `PURCHASED`
//! state are reported.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::client::*;
use crate::models::*;

mod bridge;
#[cfg(all(feature = "plugin", target_os = "android"))]
pub(crate) mod mobile;
mod models;

pub use bridge::*;
pub use models::*;

pub struct GoogleBillingClient {
    bridge: Arc<dyn PlayBillingBridge>,
    runtime: Handle,
    on_purchase_complete: PurchaseListener,
}

impl GoogleBillingClient {
    pub fn new(
        bridge: Arc<dyn PlayBillingBridge>,
        runtime: Handle,
        on_purchase_complete: PurchaseListener,
    ) -> Self {
        let listener = on_purchase_complete.clone();
        let registered = bridge.set_purchases_updated_listener(Arc::new(move |result, purchases| {
            on_purchases_updated(&listener, result, purchases)
        }));
        if let Err(err) = registered {
            warn!(error = %err, "failed to register the Play Billing purchases listener");
        }

        Self {
            bridge,
            runtime,
            on_purchase_complete,
        }
    }

    fn buy(&self, product_type: GoogleProductType, product_id: String, options: PurchaseOptions) {
        debug!(?product_type, %product_id, "launching Play Billing flow");
        let bridge = self.bridge.clone();
        let on_purchase_complete = self.on_purchase_complete.clone();
        self.runtime.spawn(async move {
            let result = match bridge
                .launch_billing_flow(product_type, product_id, options)
                .await
            {
                // The purchases-updated listener reports the outcome of a started flow.
                Ok(launch) if launch.response_code == GoogleBillingResponseCode::OK => return,
                Ok(launch) => convert_billing_result(launch),
                Err(err) => bridge_failure(err),
            };
            on_purchase_complete(result, None);
        });
    }
}

impl BillingClient for GoogleBillingClient {
    fn is_billing_supported(&self) -> bool {
        self.bridge
            .is_feature_supported(GoogleFeatureType::ProductDetails)
    }

    fn is_subscription_supported(&self) -> bool {
        self.bridge
            .is_feature_supported(GoogleFeatureType::Subscriptions)
    }

    fn is_subscriptions_update_supported(&self) -> bool {
        self.bridge
            .is_feature_supported(GoogleFeatureType::SubscriptionsUpdate)
    }

    fn query_in_app_products(&self, product_ids: Vec<String>, callback: ProductsCallback) {
        let bridge = self.bridge.clone();
        self.runtime.spawn(async move {
            let details = match bridge
                .query_product_details(GoogleProductType::InApp, product_ids)
                .await
            {
                Ok(response) => response,
                Err(err) => return callback(bridge_failure(err), Vec::new()),
            };

            let result = convert_billing_result(details.billing_result);
            let list = match details.product_details_list {
                Some(list) if result.is_ok() => list,
                _ => return callback(result, Vec::new()),
            };

            let mut products = Vec::with_capacity(list.len());
            for details in list {
                let offer = details.one_time_purchase_offer_details.clone();
                let currency_symbol = match &offer {
                    Some(offer) => {
                        bridge
                            .currency_symbol(offer.price_currency_code.clone())
                            .await
                    }
                    None => None,
                };
                products.push(Product {
                    product_id: details.product_id.clone(),
                    title: details.title.clone(),
                    description: details.description.clone(),
                    display_price: offer.as_ref().map(|o| o.formatted_price.clone()),
                    currency_code: offer.as_ref().map(|o| o.price_currency_code.clone()),
                    currency_symbol,
                    price: micros_to_decimal(offer.as_ref().map(|o| o.price_amount_micros)),
                    raw: Some(RawProduct::GooglePlay(details)),
                });
            }
            callback(result, products);
        });
    }

    fn query_subs_products(&self, product_ids: Vec<String>, callback: ProductsCallback) {
        let bridge = self.bridge.clone();
        self.runtime.spawn(async move {
            let details = match bridge
                .query_product_details(GoogleProductType::Subs, product_ids)
                .await
            {
                Ok(response) => response,
                Err(err) => return callback(bridge_failure(err), Vec::new()),
            };

            let result = convert_billing_result(details.billing_result);
            let list = match details.product_details_list {
                Some(list) if result.is_ok() => list,
                _ => return callback(result, Vec::new()),
            };

            let products = list.into_iter().map(convert_subs_product).collect();
            callback(result, products);
        });
    }

    fn buy_in_app_product(&self, product_id: String, options: PurchaseOptions) {
        self.buy(GoogleProductType::InApp, product_id, options);
    }

    fn buy_subs_product(&self, product_id: String, options: PurchaseOptions) {
        self.buy(GoogleProductType::Subs, product_id, options);
    }

    fn consume(&self, purchase_token: String, callback: ResultCallback) {
        let bridge = self.bridge.clone();
        self.runtime.spawn(async move {
            let result = match bridge.consume(purchase_token).await {
                Ok(result) => convert_billing_result(result),
                Err(err) => bridge_failure(err),
            };
            callback(result);
        });
    }

    fn acknowledge(&self, purchase_token: String, callback: ResultCallback) {
        let bridge = self.bridge.clone();
        self.runtime.spawn(async move {
            let result = match bridge.acknowledge(purchase_token).await {
                Ok(result) => convert_billing_result(result),
                Err(err) => bridge_failure(err),
            };
            callback(result);
        });
    }

    fn query_purchases(&self, callback: PurchasesCallback) {
        let bridge = self.bridge.clone();
        self.runtime.spawn(async move {
            let (result, mut purchases) =
                match owned_purchases(bridge.as_ref(), GoogleProductType::InApp).await {
                    Ok(found) => found,
                    Err(result) => return callback(result, Vec::new()),
                };

            if !bridge.is_feature_supported(GoogleFeatureType::Subscriptions) {
                return callback(result, purchases);
            }

            match owned_purchases(bridge.as_ref(), GoogleProductType::Subs).await {
                Ok((result, subs)) => {
                    purchases.extend(subs);
                    callback(result, purchases);
                }
                Err(result) => callback(result, Vec::new()),
            }
        });
    }
}

/// Purchased items of one product type, or the failing result.
async fn owned_purchases(
    bridge: &dyn PlayBillingBridge,
    product_type: GoogleProductType,
) -> Result<(BillingResult, Vec<Purchase>), BillingResult> {
    let response = bridge
        .query_purchases(product_type)
        .await
        .map_err(bridge_failure)?;
    let result = convert_billing_result(response.billing_result);
    if !result.is_ok() {
        return Err(result);
    }

    let purchases = response
        .purchases
        .into_iter()
        .filter(|purchase| purchase.purchase_state == GooglePurchaseState::Purchased)
        .map(convert_purchase)
        .collect();
    Ok((result, purchases))
}

fn on_purchases_updated(
    listener: &PurchaseListener,
    billing_result: GoogleBillingResult,
    purchases: Vec<GooglePurchase>,
) {
    let result = convert_billing_result(billing_result);
    if purchases.is_empty() {
        listener(result, None);
        return;
    }

    for purchase in purchases {
        listener(result.clone(), Some(convert_purchase(purchase)));
    }
}

fn convert_billing_result(billing_result: GoogleBillingResult) -> BillingResult {
    let response_code = match billing_result.response_code {
        GoogleBillingResponseCode::OK => ResponseCode::Ok,
        GoogleBillingResponseCode::USER_CANCELED => ResponseCode::UserCanceled,
        _ => ResponseCode::Error,
    };
    let debug_message =
        (!billing_result.debug_message.is_empty()).then(|| billing_result.debug_message.clone());

    BillingResult {
        response_code,
        debug_message,
        raw: Some(RawResult::GooglePlay(billing_result)),
    }
}

fn convert_subs_product(details: GoogleProductDetails) -> Product {
    let display_price = details
        .subscription_offer_details
        .as_ref()
        .and_then(|offers| offers.first())
        .and_then(|offer| offer.pricing_phases.first())
        .map(|phase| phase.formatted_price.clone());

    Product {
        product_id: details.product_id.clone(),
        title: details.title.clone(),
        description: details.description.clone(),
        display_price,
        currency_code: None,
        currency_symbol: None,
        price: Decimal::ZERO,
        raw: Some(RawProduct::GooglePlay(details)),
    }
}

fn convert_purchase(purchase: GooglePurchase) -> Purchase {
    Purchase {
        consume_id: purchase.purchase_token.clone(),
        order_id: purchase.order_id,
        product_id: purchase.products.into_iter().next().unwrap_or_default(),
        purchase_token: Some(purchase.purchase_token),
        original_json: Some(purchase.original_json),
        signature: Some(purchase.signature),
        environment: Environment::Unknown,
        receipt: None,
    }
}

fn micros_to_decimal(micros: Option<i64>) -> Decimal {
    micros.map_or(Decimal::ZERO, |micros| Decimal::new(micros, 6))
}

fn bridge_failure(err: crate::Error) -> BillingResult {
    warn!(error = %err, "Play Billing bridge call failed");
    BillingResult::bridge_failure(&err)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::{mpsc, oneshot};

    use super::*;

    #[derive(Default)]
    struct MockPlay {
        subscriptions_supported: bool,
        fail: bool,
        details: Option<GoogleProductDetailsResult>,
        in_app: Option<GooglePurchasesResult>,
        subs: Option<GooglePurchasesResult>,
        launch: Option<GoogleBillingResult>,
        listener: Mutex<Option<PurchasesUpdatedListener>>,
        consumed: Mutex<Vec<String>>,
    }

    impl MockPlay {
        fn fail_if_asked(&self) -> crate::Result<()> {
            if self.fail {
                Err(crate::Error::Bridge("no activity".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl PlayBillingBridge for MockPlay {
        fn is_feature_supported(&self, feature: GoogleFeatureType) -> bool {
            match feature {
                GoogleFeatureType::Subscriptions => self.subscriptions_supported,
                _ => true,
            }
        }

        fn set_purchases_updated_listener(
            &self,
            listener: PurchasesUpdatedListener,
        ) -> crate::Result<()> {
            *self.listener.lock().unwrap() = Some(listener);
            Ok(())
        }

        async fn query_product_details(
            &self,
            _product_type: GoogleProductType,
            _product_ids: Vec<String>,
        ) -> crate::Result<GoogleProductDetailsResult> {
            self.fail_if_asked()?;
            Ok(self.details.clone().unwrap())
        }

        async fn launch_billing_flow(
            &self,
            _product_type: GoogleProductType,
            _product_id: String,
            _options: PurchaseOptions,
        ) -> crate::Result<GoogleBillingResult> {
            self.fail_if_asked()?;
            Ok(self.launch.clone().unwrap())
        }

        async fn consume(&self, purchase_token: String) -> crate::Result<GoogleBillingResult> {
            self.fail_if_asked()?;
            self.consumed.lock().unwrap().push(purchase_token);
            Ok(GoogleBillingResult::new(GoogleBillingResponseCode::OK))
        }

        async fn acknowledge(&self, _purchase_token: String) -> crate::Result<GoogleBillingResult> {
            self.fail_if_asked()?;
            Ok(GoogleBillingResult::new(GoogleBillingResponseCode::ITEM_NOT_OWNED))
        }

        async fn query_purchases(
            &self,
            product_type: GoogleProductType,
        ) -> crate::Result<GooglePurchasesResult> {
            self.fail_if_asked()?;
            let found = match product_type {
                GoogleProductType::InApp => &self.in_app,
                GoogleProductType::Subs => &self.subs,
            };
            Ok(found.clone().unwrap())
        }

        async fn currency_symbol(&self, currency_code: String) -> Option<String> {
            (currency_code == "USD").then(|| "$".to_string())
        }
    }

    fn ok() -> GoogleBillingResult {
        GoogleBillingResult::new(GoogleBillingResponseCode::OK)
    }

    fn purchase(token: &str, state: GooglePurchaseState) -> GooglePurchase {
        GooglePurchase {
            order_id: Some(format!("GPA.{token}")),
            package_name: "com.example.game".into(),
            products: vec![format!("{token}_product")],
            purchase_time: 1_700_000_000_000,
            purchase_token: token.into(),
            purchase_state: state,
            quantity: 1,
            is_acknowledged: false,
            is_auto_renewing: false,
            original_json: "{}".into(),
            signature: "sig".into(),
            obfuscated_account_id: None,
            obfuscated_profile_id: None,
        }
    }

    fn in_app_details(product_id: &str, micros: i64) -> GoogleProductDetails {
        GoogleProductDetails {
            product_id: product_id.into(),
            product_type: GoogleProductType::InApp,
            title: "Coins".into(),
            name: "Coins".into(),
            description: "A pile of coins".into(),
            one_time_purchase_offer_details: Some(GoogleOneTimePurchaseOfferDetails {
                formatted_price: "$0.99".into(),
                price_amount_micros: micros,
                price_currency_code: "USD".into(),
            }),
            subscription_offer_details: None,
        }
    }

    type Updates = mpsc::UnboundedReceiver<(BillingResult, Option<Purchase>)>;

    fn client(mock: MockPlay) -> (GoogleBillingClient, Arc<MockPlay>, Updates) {
        let mock = Arc::new(mock);
        let (tx, rx) = mpsc::unbounded_channel();
        let listener: PurchaseListener = Arc::new(move |result, purchase| {
            let _ = tx.send((result, purchase));
        });
        let client = GoogleBillingClient::new(mock.clone(), Handle::current(), listener);
        (client, mock, rx)
    }

    #[test]
    fn collapses_vendor_codes() {
        let code = |raw| convert_billing_result(GoogleBillingResult::new(raw)).response_code;
        assert_eq!(code(GoogleBillingResponseCode::OK), ResponseCode::Ok);
        assert_eq!(code(GoogleBillingResponseCode::USER_CANCELED), ResponseCode::UserCanceled);
        assert_eq!(code(GoogleBillingResponseCode::ITEM_ALREADY_OWNED), ResponseCode::Error);
        assert_eq!(code(GoogleBillingResponseCode(42)), ResponseCode::Error);
    }

    #[tokio::test]
    async fn prices_in_app_products_from_micros() {
        let (client, _, _) = client(MockPlay {
            details: Some(GoogleProductDetailsResult {
                billing_result: ok(),
                product_details_list: Some(vec![in_app_details("coins_100", 990_000)]),
            }),
            ..Default::default()
        });

        let (tx, rx) = oneshot::channel();
        client.query_in_app_products(
            vec!["coins_100".into()],
            Box::new(move |result, products| {
                let _ = tx.send((result, products));
            }),
        );
        let (result, products) = rx.await.unwrap();

        assert!(result.is_ok());
        let product = &products[0];
        assert_eq!(product.product_id, "coins_100");
        assert_eq!(product.price, Decimal::new(99, 2));
        assert_eq!(product.display_price.as_deref(), Some("$0.99"));
        assert_eq!(product.currency_symbol.as_deref(), Some("$"));
        assert!(matches!(product.raw, Some(RawProduct::GooglePlay(_))));
    }

    #[tokio::test]
    async fn subs_products_take_first_pricing_phase() {
        let mut details = in_app_details("vip", 0);
        details.product_type = GoogleProductType::Subs;
        details.one_time_purchase_offer_details = None;
        details.subscription_offer_details = Some(vec![GoogleSubscriptionOfferDetails {
            offer_token: "tok".into(),
            base_plan_id: "monthly".into(),
            offer_id: None,
            offer_tags: Vec::new(),
            pricing_phases: vec![GooglePricingPhase {
                formatted_price: "$4.99".into(),
                price_currency_code: "USD".into(),
                price_amount_micros: 4_990_000,
                billing_period: "P1M".into(),
                billing_cycle_count: 0,
                recurrence_mode: 1,
            }],
        }]);
        let mut bare = in_app_details("vip_yearly", 0);
        bare.one_time_purchase_offer_details = None;

        let (client, _, _) = client(MockPlay {
            details: Some(GoogleProductDetailsResult {
                billing_result: ok(),
                product_details_list: Some(vec![details, bare]),
            }),
            ..Default::default()
        });

        let (tx, rx) = oneshot::channel();
        client.query_subs_products(
            vec!["vip".into(), "vip_yearly".into()],
            Box::new(move |_, products| {
                let _ = tx.send(products);
            }),
        );
        let products = rx.await.unwrap();
        assert_eq!(products[0].display_price.as_deref(), Some("$4.99"));
        assert_eq!(products[1].display_price, None);
        assert_eq!(products[1].price, Decimal::ZERO);
    }

    #[tokio::test]
    async fn failed_product_query_reports_empty_list() {
        let (client, _, _) = client(MockPlay {
            details: Some(GoogleProductDetailsResult {
                billing_result: GoogleBillingResult {
                    response_code: GoogleBillingResponseCode::SERVICE_UNAVAILABLE,
                    debug_message: "offline".into(),
                },
                product_details_list: Some(vec![in_app_details("coins", 1)]),
            }),
            ..Default::default()
        });

        let (tx, rx) = oneshot::channel();
        client.query_in_app_products(
            vec!["coins".into()],
            Box::new(move |result, products| {
                let _ = tx.send((result, products));
            }),
        );
        let (result, products) = rx.await.unwrap();
        assert_eq!(result.response_code, ResponseCode::Error);
        assert_eq!(result.debug_message.as_deref(), Some("offline"));
        assert!(products.is_empty());
    }

    #[tokio::test]
    async fn query_purchases_merges_purchased_in_app_and_subs() {
        let (client, _, _) = client(MockPlay {
            subscriptions_supported: true,
            in_app: Some(GooglePurchasesResult {
                billing_result: ok(),
                purchases: vec![
                    purchase("a", GooglePurchaseState::Purchased),
                    purchase("b", GooglePurchaseState::Pending),
                ],
            }),
            subs: Some(GooglePurchasesResult {
                billing_result: ok(),
                purchases: vec![purchase("c", GooglePurchaseState::Purchased)],
            }),
            ..Default::default()
        });

        let (tx, rx) = oneshot::channel();
        client.query_purchases(Box::new(move |result, purchases| {
            let _ = tx.send((result, purchases));
        }));
        let (result, purchases) = rx.await.unwrap();

        assert!(result.is_ok());
        let tokens: Vec<_> = purchases.iter().map(|p| p.consume_id.as_str()).collect();
        assert_eq!(tokens, vec!["a", "c"]);
        assert_eq!(purchases[0].product_id, "a_product");
        assert_eq!(purchases[0].purchase_token.as_deref(), Some("a"));
        assert_eq!(purchases[0].signature.as_deref(), Some("sig"));
    }

    #[tokio::test]
    async fn query_purchases_skips_subs_when_unsupported() {
        let (client, _, _) = client(MockPlay {
            subscriptions_supported: false,
            in_app: Some(GooglePurchasesResult {
                billing_result: ok(),
                purchases: vec![purchase("a", GooglePurchaseState::Purchased)],
            }),
            subs: None,
            ..Default::default()
        });

        let (tx, rx) = oneshot::channel();
        client.query_purchases(Box::new(move |_, purchases| {
            let _ = tx.send(purchases);
        }));
        assert_eq!(rx.await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_subs_query_reports_only_the_error() {
        let (client, _, _) = client(MockPlay {
            subscriptions_supported: true,
            in_app: Some(GooglePurchasesResult {
                billing_result: ok(),
                purchases: vec![purchase("a", GooglePurchaseState::Purchased)],
            }),
            subs: Some(GooglePurchasesResult {
                billing_result: GoogleBillingResult::new(
                    GoogleBillingResponseCode::SERVICE_DISCONNECTED,
                ),
                purchases: Vec::new(),
            }),
            ..Default::default()
        });

        let (tx, rx) = oneshot::channel();
        client.query_purchases(Box::new(move |result, purchases| {
            let _ = tx.send((result, purchases));
        }));
        let (result, purchases) = rx.await.unwrap();
        assert_eq!(result.response_code, ResponseCode::Error);
        assert!(purchases.is_empty());
    }

    #[tokio::test]
    async fn failed_launch_notifies_purchase_listener() {
        let (client, _, mut updates) = client(MockPlay {
            launch: Some(GoogleBillingResult::new(GoogleBillingResponseCode::USER_CANCELED)),
            ..Default::default()
        });

        client.buy_in_app_product("coins".into(), PurchaseOptions::default());
        let (result, purchase) = updates.recv().await.unwrap();
        assert_eq!(result.response_code, ResponseCode::UserCanceled);
        assert!(purchase.is_none());
    }

    #[tokio::test]
    async fn purchases_updated_fans_out_per_purchase() {
        let (_client, mock, mut updates) = client(MockPlay::default());
        let listener = mock.listener.lock().unwrap().clone().unwrap();

        listener(
            ok(),
            vec![
                purchase("a", GooglePurchaseState::Purchased),
                purchase("b", GooglePurchaseState::Purchased),
            ],
        );
        listener(GoogleBillingResult::new(GoogleBillingResponseCode::USER_CANCELED), Vec::new());

        let (_, first) = updates.recv().await.unwrap();
        let (_, second) = updates.recv().await.unwrap();
        let (canceled, none) = updates.recv().await.unwrap();
        assert_eq!(first.unwrap().consume_id, "a");
        assert_eq!(second.unwrap().consume_id, "b");
        assert_eq!(canceled.response_code, ResponseCode::UserCanceled);
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn consume_and_acknowledge_forward_tokens() {
        let (client, mock, _) = client(MockPlay::default());

        let (tx, rx) = oneshot::channel();
        client.consume("tok-1".into(), Box::new(move |result| {
            let _ = tx.send(result);
        }));
        assert!(rx.await.unwrap().is_ok());
        assert_eq!(*mock.consumed.lock().unwrap(), vec!["tok-1".to_string()]);

        let (tx, rx) = oneshot::channel();
        client.acknowledge("tok-2".into(), Box::new(move |result| {
            let _ = tx.send(result);
        }));
        let result = rx.await.unwrap();
        assert_eq!(result.response_code, ResponseCode::Error);
        assert!(matches!(result.raw, Some(RawResult::GooglePlay(_))));
    }

    #[tokio::test]
    async fn bridge_failures_become_error_results() {
        let (client, _, _) = client(MockPlay {
            fail: true,
            ..Default::default()
        });

        let (tx, rx) = oneshot::channel();
        client.consume("tok".into(), Box::new(move |result| {
            let _ = tx.send(result);
        }));
        let result = rx.await.unwrap();
        assert_eq!(result.response_code, ResponseCode::Error);
        assert!(matches!(result.raw, Some(RawResult::Bridge(_))));
    }
}
