use alloy::primitives::{Address, FixedBytes, U256};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::{ChainConfig, X402Error, MAX_TIMEOUT_SECONDS, SCHEME_NAME};

/// EIP-712 domain of the payment token, needed by clients to sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentExtra {
    pub name: String,
    pub version: String,
}

/// A single entry in the `accepts` array of a 402 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    pub scheme: String,
    pub network: String,
    /// Amount in the token's atomic units.
    pub amount: String,
    pub asset: Address,
    pub pay_to: Address,
    pub max_timeout_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<PaymentExtra>,
}

impl PaymentRequirements {
    /// Requirements for an `exact` payment of `amount` token units on `chain`.
    pub fn exact(chain: &ChainConfig, amount: U256, pay_to: Address) -> Self {
        Self {
            scheme: SCHEME_NAME.to_string(),
            network: chain.network.clone(),
            amount: amount.to_string(),
            asset: chain.payment_token,
            pay_to,
            max_timeout_seconds: MAX_TIMEOUT_SECONDS,
            extra: Some(PaymentExtra {
                name: chain.token_name.clone(),
                version: chain.token_version.clone(),
            }),
        }
    }
}

/// Describes the resource a payment unlocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfo {
    pub url: String,
    pub description: String,
    pub mime_type: String,
}

/// The 402 response body (also carried base64-encoded in `PAYMENT-REQUIRED`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequiredBody {
    pub x402_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub resource: ResourceInfo,
    pub accepts: Vec<PaymentRequirements>,
}

/// EIP-3009 `transferWithAuthorization` parameters signed by the payer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactEvmAuthorization {
    pub from: Address,
    pub to: Address,
    pub value: String,
    pub valid_after: String,
    pub valid_before: String,
    pub nonce: FixedBytes<32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExactEvmPayload {
    pub signature: String,
    pub authorization: ExactEvmAuthorization,
}

/// Wire-format payment payload (sent in `PAYMENT-SIGNATURE`, base64-encoded JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    pub x402_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted: Option<PaymentRequirements>,
    pub payload: ExactEvmPayload,
}

impl PaymentPayload {
    pub fn payer(&self) -> Address {
        self.payload.authorization.from
    }
}

/// Base64-encode any x402 wire object for use in a header.
pub fn encode_header<T: Serialize>(value: &T) -> Result<String, X402Error> {
    let json = serde_json::to_vec(value)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(json))
}

/// Decode the `PAYMENT-SIGNATURE` header into a [`PaymentPayload`].
pub fn decode_payment_header(header_value: &str) -> Result<PaymentPayload, X402Error> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(header_value.trim())
        .map_err(|e| X402Error::InvalidPayment(format!("invalid base64: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| X402Error::InvalidPayment(format!("invalid JSON payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> PaymentPayload {
        PaymentPayload {
            x402_version: 2,
            resource: None,
            accepted: None,
            payload: ExactEvmPayload {
                signature: "0xdead".to_string(),
                authorization: ExactEvmAuthorization {
                    from: Address::repeat_byte(0x11),
                    to: Address::repeat_byte(0x22),
                    value: "1000".to_string(),
                    valid_after: "0".to_string(),
                    valid_before: "9999999999".to_string(),
                    nonce: FixedBytes::ZERO,
                },
            },
        }
    }

    #[test]
    fn test_exact_requirements_use_chain_token() {
        let chain = ChainConfig::base_sepolia();
        let req = PaymentRequirements::exact(&chain, U256::from(1000), Address::ZERO);
        assert_eq!(req.scheme, "exact");
        assert_eq!(req.network, "eip155:84532");
        assert_eq!(req.amount, "1000");
        assert_eq!(req.asset, chain.payment_token);
        assert_eq!(req.extra.unwrap().name, "USDC");
    }

    #[test]
    fn test_requirements_serialize_camel_case() {
        let chain = ChainConfig::base_sepolia();
        let req = PaymentRequirements::exact(&chain, U256::from(10), Address::ZERO);
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("payTo").is_some());
        assert_eq!(json["maxTimeoutSeconds"], 300);
    }

    #[test]
    fn test_decode_valid_header() {
        let encoded = encode_header(&sample_payload()).unwrap();
        let decoded = decode_payment_header(&encoded).unwrap();
        assert_eq!(decoded.x402_version, 2);
        assert_eq!(decoded.payer(), Address::repeat_byte(0x11));
        assert_eq!(decoded.payload.authorization.value, "1000");
    }

    #[test]
    fn test_decode_invalid_base64() {
        let err = decode_payment_header("not-valid-base64!!!").unwrap_err();
        assert!(err.to_string().contains("invalid base64"));
    }

    #[test]
    fn test_decode_invalid_json() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"this is not json");
        let err = decode_payment_header(&encoded).unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }
}
