#[cfg(feature = "plugin")]
const COMMANDS: &[&str] = &[
  "is_billing_supported",
  "query_in_app_products",
  "query_subs_products",
  "buy_in_app_product",
  "buy_subs_product",
  "consume",
  "acknowledge",
  "query_purchases",
];

fn main() {
  #[cfg(feature = "plugin")]
  tauri_plugin::Builder::new(COMMANDS)
    .android_path("android")
    .ios_path("ios")
    .build();
}
