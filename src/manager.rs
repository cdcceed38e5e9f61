//! Storefront selection and per-frame callback delivery.
//!
//! Store SDKs answer on their own threads. [`BillingManager`] never runs
//! application callbacks there: each answer is queued and only runs when the
//! host calls [`BillingManager::update`] from its frame loop.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::apple::{AppleAppStoreBillingClient, StoreKit};
use crate::client::*;
use crate::config::AppStore;
use crate::desktop::FakeBillingClient;
use crate::google::{GoogleBillingClient, PlayBillingBridge};
use crate::models::*;

/// A store together with the native bridge that reaches it.
pub enum Storefront {
    GooglePlay(Arc<dyn PlayBillingBridge>),
    AppleAppStore(StoreKit),
    Unsupported,
}

impl Storefront {
    pub fn app_store(&self) -> AppStore {
        match self {
            Storefront::GooglePlay(_) => AppStore::GooglePlay,
            Storefront::AppleAppStore(_) => AppStore::AppleAppStore,
            Storefront::Unsupported => AppStore::Unknown,
        }
    }
}

type Action = Box<dyn FnOnce() + Send + 'static>;

#[derive(Clone)]
struct QueueSender(mpsc::UnboundedSender<Action>);

impl QueueSender {
    fn post(&self, action: impl FnOnce() + Send + 'static) {
        if self.0.send(Box::new(action)).is_err() {
            debug!("billing manager dropped, discarding callback");
        }
    }
}

pub struct BillingManager {
    client: Box<dyn BillingClient>,
    app_store: AppStore,
    sender: QueueSender,
    receiver: Mutex<mpsc::UnboundedReceiver<Action>>,
}

impl BillingManager {
    /// Builds the client for `storefront`. `runtime` drives the bridge calls;
    /// `on_purchase_complete` runs from [`update`](Self::update).
    pub fn new<F>(storefront: Storefront, runtime: Handle, on_purchase_complete: F) -> Self
    where
        F: Fn(BillingResult, Option<Purchase>) + Send + Sync + 'static,
    {
        let app_store = storefront.app_store();
        Self::with_client(
            app_store,
            move |listener| -> Box<dyn BillingClient> {
                match storefront {
                    Storefront::GooglePlay(bridge) => {
                        Box::new(GoogleBillingClient::new(bridge, runtime, listener))
                    }
                    Storefront::AppleAppStore(store_kit) => {
                        Box::new(AppleAppStoreBillingClient::new(store_kit, runtime, listener))
                    }
                    Storefront::Unsupported => Box::new(FakeBillingClient::new(listener)),
                }
            },
            on_purchase_complete,
        )
    }

    /// Wraps a client built by `build`, which receives the queueing purchase
    /// listener the client must report purchases to.
    pub fn with_client<B, F>(app_store: AppStore, build: B, on_purchase_complete: F) -> Self
    where
        B: FnOnce(PurchaseListener) -> Box<dyn BillingClient>,
        F: Fn(BillingResult, Option<Purchase>) + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let sender = QueueSender(tx);

        let queue = sender.clone();
        let on_purchase_complete = Arc::new(on_purchase_complete);
        let listener: PurchaseListener = Arc::new(move |result, purchase| {
            let on_purchase_complete = on_purchase_complete.clone();
            queue.post(move || on_purchase_complete(result, purchase));
        });

        debug!(?app_store, "billing manager ready");
        Self {
            client: build(listener),
            app_store,
            sender,
            receiver: Mutex::new(rx),
        }
    }

    pub fn app_store(&self) -> AppStore {
        self.app_store
    }

    pub fn is_billing_supported(&self) -> bool {
        self.client.is_billing_supported()
    }

    pub fn is_subscription_supported(&self) -> bool {
        self.client.is_subscription_supported()
    }

    pub fn is_subscriptions_update_supported(&self) -> bool {
        self.client.is_subscriptions_update_supported()
    }

    pub fn query_in_app_products<F>(&self, product_ids: Vec<String>, callback: F)
    where
        F: FnOnce(BillingResult, Vec<Product>) + Send + 'static,
    {
        let queue = self.sender.clone();
        self.client.query_in_app_products(
            product_ids,
            Box::new(move |result, products| queue.post(move || callback(result, products))),
        );
    }

    pub fn query_subs_products<F>(&self, product_ids: Vec<String>, callback: F)
    where
        F: FnOnce(BillingResult, Vec<Product>) + Send + 'static,
    {
        let queue = self.sender.clone();
        self.client.query_subs_products(
            product_ids,
            Box::new(move |result, products| queue.post(move || callback(result, products))),
        );
    }

    pub fn buy_in_app_product(&self, product_id: impl Into<String>, options: PurchaseOptions) {
        self.client.buy_in_app_product(product_id.into(), options);
    }

    pub fn buy_subs_product(&self, product_id: impl Into<String>, options: PurchaseOptions) {
        self.client.buy_subs_product(product_id.into(), options);
    }

    pub fn consume<F>(&self, purchase_token: impl Into<String>, callback: F)
    where
        F: FnOnce(BillingResult) + Send + 'static,
    {
        let queue = self.sender.clone();
        self.client.consume(
            purchase_token.into(),
            Box::new(move |result| queue.post(move || callback(result))),
        );
    }

    pub fn acknowledge<F>(&self, purchase_token: impl Into<String>, callback: F)
    where
        F: FnOnce(BillingResult) + Send + 'static,
    {
        let queue = self.sender.clone();
        self.client.acknowledge(
            purchase_token.into(),
            Box::new(move |result| queue.post(move || callback(result))),
        );
    }

    pub fn query_purchases<F>(&self, callback: F)
    where
        F: FnOnce(BillingResult, Vec<Purchase>) + Send + 'static,
    {
        let queue = self.sender.clone();
        self.client.query_purchases(Box::new(move |result, purchases| {
            queue.post(move || callback(result, purchases))
        }));
    }

    /// Runs every queued callback on the calling thread and returns how many
    /// ran. Call once per frame.
    ///
    /// Callbacks queued while the drain runs wait for the next call.
    pub fn update(&self) -> usize {
        let pending: Vec<Action> = {
            let mut receiver = self.receiver.lock().unwrap_or_else(PoisonError::into_inner);
            std::iter::from_fn(|| receiver.try_recv().ok()).collect()
        };

        let ran = pending.len();
        for action in pending {
            if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(action)) {
                error!(panic = panic_message(panic.as_ref()), "billing callback panicked");
            }
        }
        ran
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
