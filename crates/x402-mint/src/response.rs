use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// Response from the facilitator's `/verify` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<Address>,
}

/// Response from the facilitator's `/settle` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<Address>,
    /// Transaction hash, if settlement succeeded. Empty or `None` on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    #[serde(default)]
    pub network: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settle_response_tolerates_missing_optionals() {
        let s: SettleResponse =
            serde_json::from_str(r#"{"success":false,"network":"eip155:84532"}"#).unwrap();
        assert!(!s.success);
        assert!(s.transaction.is_none());
        assert!(s.payer.is_none());
    }

    #[test]
    fn test_verify_response_parses_payer() {
        let v: VerifyResponse = serde_json::from_str(
            r#"{"isValid":true,"payer":"0x1111111111111111111111111111111111111111"}"#,
        )
        .unwrap();
        assert!(v.is_valid);
        assert_eq!(v.payer, Some(Address::repeat_byte(0x11)));
    }
}
