use std::fmt;

use serde::{Deserialize, Serialize};

/// `SKErrorCode` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppleErrorCode {
    Unknown = 0,
    ClientInvalid = 1,
    PaymentCancelled = 2,
    PaymentInvalid = 3,
    PaymentNotAllowed = 4,
    StoreProductNotAvailable = 5,
    CloudServicePermissionDenied = 6,
    CloudServiceNetworkConnectionFailed = 7,
    CloudServiceRevoked = 8,
    PrivacyAcknowledgementRequired = 9,
    UnauthorizedRequestData = 10,
    InvalidOfferIdentifier = 11,
    InvalidSignature = 12,
    MissingOfferParams = 13,
    InvalidOfferPrice = 14,
    OverlayCancelled = 15,
    OverlayInvalidConfiguration = 16,
    OverlayTimeout = 17,
    IneligibleForOffer = 18,
    UnsupportedPlatform = 19,
    OverlayPresentedInBackgroundScene = 20,
}

impl AppleErrorCode {
    /// Codes newer than this table decode as `Unknown`.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::ClientInvalid,
            2 => Self::PaymentCancelled,
            3 => Self::PaymentInvalid,
            4 => Self::PaymentNotAllowed,
            5 => Self::StoreProductNotAvailable,
            6 => Self::CloudServicePermissionDenied,
            7 => Self::CloudServiceNetworkConnectionFailed,
            8 => Self::CloudServiceRevoked,
            9 => Self::PrivacyAcknowledgementRequired,
            10 => Self::UnauthorizedRequestData,
            11 => Self::InvalidOfferIdentifier,
            12 => Self::InvalidSignature,
            13 => Self::MissingOfferParams,
            14 => Self::InvalidOfferPrice,
            15 => Self::OverlayCancelled,
            16 => Self::OverlayInvalidConfiguration,
            17 => Self::OverlayTimeout,
            18 => Self::IneligibleForOffer,
            19 => Self::UnsupportedPlatform,
            20 => Self::OverlayPresentedInBackgroundScene,
            _ => Self::Unknown,
        }
    }
}

impl Serialize for AppleErrorCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i32(*self as i32)
    }
}

impl<'de> Deserialize<'de> for AppleErrorCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        i32::deserialize(deserializer).map(Self::from_code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppleError {
    pub code: AppleErrorCode,
    #[serde(default)]
    pub localized_description: String,
}

impl fmt::Display for AppleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AppleError {{code={:?}, localizedDescription={}}}",
            self.code, self.localized_description
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_codes_fall_back() {
        let code: AppleErrorCode = serde_json::from_str("2").unwrap();
        assert_eq!(code, AppleErrorCode::PaymentCancelled);
        let code: AppleErrorCode = serde_json::from_str("77").unwrap();
        assert_eq!(code, AppleErrorCode::Unknown);
        assert_eq!(serde_json::to_string(&AppleErrorCode::OverlayTimeout).unwrap(), "17");
    }

    #[test]
    fn error_display() {
        let error = AppleError {
            code: AppleErrorCode::PaymentNotAllowed,
            localized_description: "Purchases are disabled".into(),
        };
        assert_eq!(
            error.to_string(),
            "AppleError {code=PaymentNotAllowed, localizedDescription=Purchases are disabled}"
        );
    }
}
