use serde::{ser::Serializer, Serialize};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// A store bridge could not complete a call into the native SDK.
  #[error("store bridge failed: {0}")]
  Bridge(String),
  #[error("invalid transaction id: {0}")]
  InvalidTransactionId(String),
  #[error("the billing callback was dropped before it answered")]
  CallbackDropped,
  #[cfg(feature = "plugin")]
  #[error(transparent)]
  Tauri(#[from] tauri::Error),
  #[cfg(all(feature = "plugin", any(target_os = "android", target_os = "ios")))]
  #[error(transparent)]
  PluginInvoke(#[from] tauri::plugin::mobile::PluginInvokeError),
}

impl Serialize for Error {
  fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    serializer.serialize_str(self.to_string().as_ref())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn serializes_as_display_string() {
    let err = Error::InvalidTransactionId("abc".to_string());
    let json = serde_json::to_string(&err).unwrap();
    assert_eq!(json, "\"invalid transaction id: abc\"");
  }
}
