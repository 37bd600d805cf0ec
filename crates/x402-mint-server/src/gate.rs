//! x402 payment gate: quote terms, verify the payment header, settle after
//! the protected handler succeeds.

use actix_web::http::header::{HeaderName, HeaderValue, ACCEPT};
use actix_web::{HttpRequest, HttpResponse};
use alloy::primitives::Address;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use x402_mint::{
    decode_payment_header, encode_header, PaymentPayload, PaymentRequiredBody,
    PaymentRequirements, ResourceInfo, SettleResponse, VerifyResponse, X402Error, X402_VERSION,
};

use crate::error::AppError;
use crate::metrics::PAYMENT_ATTEMPTS;
use crate::paywall::{self, Branding};

pub const PAYMENT_SIGNATURE_HEADER: &str = "payment-signature";
pub const PAYMENT_REQUIRED_HEADER: &str = "payment-required";
pub const PAYMENT_RESPONSE_HEADER: &str = "payment-response";
/// Optional explicit mint recipient set by the client.
pub const PAYMENT_FROM_HEADER: &str = "x-payment-from";

/// Verifies and settles x402 payments.
#[async_trait]
pub trait PaymentGate: Send + Sync {
    async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse, X402Error>;

    async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse, X402Error>;
}

/// [`PaymentGate`] backed by a remote x402 facilitator (`POST /verify`, `POST /settle`).
pub struct FacilitatorGate {
    client: reqwest::Client,
    url: String,
    hmac_secret: Option<Vec<u8>>,
}

impl FacilitatorGate {
    pub fn new(client: reqwest::Client, url: impl Into<String>, hmac_secret: Option<Vec<u8>>) -> Self {
        Self {
            client,
            url: url.into().trim_end_matches('/').to_string(),
            hmac_secret,
        }
    }

    /// POST a facilitator call. Signs the body with HMAC if a shared secret is configured.
    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<T, X402Error> {
        let url = format!("{}/{path}", self.url);
        let body = serde_json::json!({
            "x402Version": X402_VERSION,
            "paymentPayload": payload,
            "paymentRequirements": requirements,
        });
        let body_bytes = serde_json::to_vec(&body)?;

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .timeout(std::time::Duration::from_secs(30));

        if let Some(ref secret) = self.hmac_secret {
            let sig = x402_mint::hmac::sign_body(secret, &body_bytes);
            request = request.header("X-Facilitator-Auth", sig);
        }

        let resp = request
            .body(body_bytes)
            .send()
            .await
            .map_err(|e| X402Error::HttpError(format!("facilitator request failed: {e}")))?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(X402Error::HttpError(
                "facilitator authentication failed".to_string(),
            ));
        }

        // Facilitators answer rejected payments with 4xx and a normal body.
        if resp.status().is_server_error() {
            return Err(X402Error::HttpError(format!(
                "facilitator returned {}",
                resp.status()
            )));
        }

        resp.json::<T>()
            .await
            .map_err(|e| X402Error::HttpError(format!("facilitator response parse failed: {e}")))
    }
}

#[async_trait]
impl PaymentGate for FacilitatorGate {
    async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse, X402Error> {
        self.post("verify", payload, requirements).await
    }

    async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse, X402Error> {
        self.post("settle", payload, requirements).await
    }
}

/// What a gated request must pay, and how to present it.
#[derive(Debug, Clone)]
pub struct PaymentOffer {
    pub resource: ResourceInfo,
    pub requirements: PaymentRequirements,
    pub token_decimals: u32,
    pub branding: Branding,
}

impl PaymentOffer {
    pub fn required_body(&self, error: Option<String>) -> PaymentRequiredBody {
        PaymentRequiredBody {
            x402_version: X402_VERSION,
            error,
            resource: self.resource.clone(),
            accepts: vec![self.requirements.clone()],
        }
    }
}

/// A payment that passed verification and still has to be settled.
#[derive(Debug, Clone)]
pub struct VerifiedPayment {
    pub payload: PaymentPayload,
    pub payer: Address,
}

pub enum GateDecision {
    /// Run the handler, then [`settle_after`].
    Allow(VerifiedPayment),
    /// Return this response as is.
    Deny(HttpResponse),
}

fn wants_html(req: &HttpRequest) -> bool {
    req.headers()
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("text/html"))
        .unwrap_or(false)
}

/// HTTP 402 carrying the offer: JSON body plus `PAYMENT-REQUIRED` header,
/// or the HTML paywall for browsers.
pub fn payment_required(req: &HttpRequest, offer: &PaymentOffer, error: Option<String>) -> HttpResponse {
    let body = offer.required_body(error);
    let mut builder = HttpResponse::PaymentRequired();

    match encode_header(&body) {
        Ok(encoded) => {
            builder.insert_header((PAYMENT_REQUIRED_HEADER, encoded));
        }
        Err(e) => tracing::error!(error = %e, "failed to encode PAYMENT-REQUIRED header"),
    }

    if wants_html(req) {
        builder
            .content_type("text/html; charset=utf-8")
            .body(paywall::render(&offer.branding, &body, offer.token_decimals))
    } else {
        builder.json(body)
    }
}

/// The client's `accepted` terms must be the ones on offer.
fn accepts_offer(accepted: &PaymentRequirements, offered: &PaymentRequirements) -> bool {
    accepted.scheme == offered.scheme
        && accepted.network == offered.network
        && accepted.amount == offered.amount
        && accepted.asset == offered.asset
        && accepted.pay_to == offered.pay_to
}

/// Decide whether a request has paid for `offer`.
///
/// Missing or mismatched payments and invalid verifications become a 402;
/// an undecodable header or an unreachable facilitator is an error.
pub async fn intercept(
    req: &HttpRequest,
    offer: &PaymentOffer,
    gate: &dyn PaymentGate,
) -> Result<GateDecision, AppError> {
    let Some(header) = req.headers().get(PAYMENT_SIGNATURE_HEADER) else {
        PAYMENT_ATTEMPTS.with_label_values(&["required"]).inc();
        return Ok(GateDecision::Deny(payment_required(req, offer, None)));
    };

    // Present but not visible ASCII counts as undecodable, not missing.
    let header = header.to_str().map_err(|_| {
        PAYMENT_ATTEMPTS.with_label_values(&["invalid"]).inc();
        AppError::InvalidPaymentHeader("header is not valid UTF-8".to_string())
    })?;

    let payload = decode_payment_header(header).inspect_err(|_| {
        PAYMENT_ATTEMPTS.with_label_values(&["invalid"]).inc();
    })?;

    if payload.x402_version != X402_VERSION {
        PAYMENT_ATTEMPTS.with_label_values(&["invalid"]).inc();
        let reason = format!("unsupported x402 version {}", payload.x402_version);
        return Ok(GateDecision::Deny(payment_required(req, offer, Some(reason))));
    }

    if let Some(ref accepted) = payload.accepted {
        if !accepts_offer(accepted, &offer.requirements) {
            PAYMENT_ATTEMPTS.with_label_values(&["rejected"]).inc();
            tracing::warn!(
                payer = %payload.payer(),
                offered = %offer.requirements.amount,
                accepted = %accepted.amount,
                "payment does not match the current terms"
            );
            return Ok(GateDecision::Deny(payment_required(
                req,
                offer,
                Some("payment does not match requirements".to_string()),
            )));
        }
    }

    tracing::info!(
        payer = %payload.payer(),
        nonce = %format!("{:.8}", payload.payload.authorization.nonce),
        amount = %offer.requirements.amount,
        "payment attempt"
    );

    let verified = gate
        .verify(&payload, &offer.requirements)
        .await
        .inspect_err(|_| {
            PAYMENT_ATTEMPTS.with_label_values(&["error"]).inc();
        })?;

    if !verified.is_valid {
        PAYMENT_ATTEMPTS.with_label_values(&["rejected"]).inc();
        let reason = verified
            .invalid_reason
            .unwrap_or_else(|| "payment verification failed".to_string());
        tracing::warn!(payer = %payload.payer(), reason = %reason, "payment rejected");
        return Ok(GateDecision::Deny(payment_required(req, offer, Some(reason))));
    }

    let payer = verified.payer.unwrap_or_else(|| payload.payer());
    Ok(GateDecision::Allow(VerifiedPayment { payload, payer }))
}

/// Outcome of a settlement attempt. `Send`, so it can cross a spawned task.
#[derive(Debug, Clone)]
pub enum Settlement {
    Settled(SettleResponse),
    Failed(String),
}

/// Settle a verified payment with the facilitator.
pub async fn settle(
    gate: &dyn PaymentGate,
    payment: &VerifiedPayment,
    requirements: &PaymentRequirements,
) -> Settlement {
    match gate.settle(&payment.payload, requirements).await {
        Ok(settled) if settled.success => {
            PAYMENT_ATTEMPTS.with_label_values(&["settled"]).inc();
            tracing::info!(
                payer = %payment.payer,
                tx = settled.transaction.as_deref().unwrap_or(""),
                "payment settled"
            );
            Settlement::Settled(settled)
        }
        Ok(settled) => Settlement::Failed(
            settled
                .error_reason
                .unwrap_or_else(|| "settlement failed".to_string()),
        ),
        Err(e) => {
            tracing::error!(error = %e, "facilitator settle call failed");
            Settlement::Failed("settlement failed".to_string())
        }
    }
}

/// Attach a settlement to the handler's response: the result rides back in
/// `PAYMENT-RESPONSE`, a failure replaces the response with a 402.
pub fn with_settlement(
    req: &HttpRequest,
    offer: &PaymentOffer,
    payment: &VerifiedPayment,
    settlement: Settlement,
    mut response: HttpResponse,
) -> HttpResponse {
    match settlement {
        Settlement::Settled(settled) => {
            match encode_header(&settled)
                .ok()
                .and_then(|v| HeaderValue::from_str(&v).ok())
            {
                Some(value) => {
                    response
                        .headers_mut()
                        .insert(HeaderName::from_static(PAYMENT_RESPONSE_HEADER), value);
                }
                None => tracing::error!("failed to encode PAYMENT-RESPONSE header"),
            }
            response
        }
        Settlement::Failed(reason) => {
            PAYMENT_ATTEMPTS.with_label_values(&["settle_failed"]).inc();
            tracing::warn!(payer = %payment.payer, reason = %reason, "settlement failed after handler success");
            payment_required(req, offer, Some(reason))
        }
    }
}

/// Settle `payment` if the handler succeeded (status below 400).
pub async fn settle_after(
    req: &HttpRequest,
    offer: &PaymentOffer,
    gate: &dyn PaymentGate,
    payment: &VerifiedPayment,
    response: HttpResponse,
) -> HttpResponse {
    if response.status().as_u16() >= 400 {
        tracing::info!(
            payer = %payment.payer,
            status = response.status().as_u16(),
            "handler failed, payment not settled"
        );
        return response;
    }

    let settlement = settle(gate, payment, &offer.requirements).await;
    with_settlement(req, offer, payment, settlement, response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use alloy::primitives::U256;
    use x402_mint::ChainConfig;

    fn offer() -> PaymentOffer {
        PaymentOffer {
            resource: ResourceInfo {
                url: "http://localhost:3000/premium".to_string(),
                description: "Premium content access".to_string(),
                mime_type: "text/html".to_string(),
            },
            requirements: PaymentRequirements::exact(
                &ChainConfig::base_sepolia(),
                U256::from(10_000),
                Address::repeat_byte(0x22),
            ),
            token_decimals: 6,
            branding: Branding {
                app_name: "x402 Demo".to_string(),
                app_logo: "/x402-icon-blue.png".to_string(),
                testnet: true,
            },
        }
    }

    #[test]
    fn test_json_402_carries_header() {
        let req = TestRequest::default().to_http_request();
        let resp = payment_required(&req, &offer(), None);
        assert_eq!(resp.status().as_u16(), 402);
        assert!(resp.headers().contains_key(PAYMENT_REQUIRED_HEADER));
        assert!(resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .starts_with("application/json"));
    }

    #[test]
    fn test_browser_gets_html_paywall() {
        let req = TestRequest::default()
            .insert_header((ACCEPT, "text/html,application/xhtml+xml"))
            .to_http_request();
        let resp = payment_required(&req, &offer(), None);
        assert_eq!(resp.status().as_u16(), 402);
        assert!(resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .starts_with("text/html"));
    }

    #[test]
    fn test_accepted_terms_must_match() {
        let offered = offer().requirements;
        assert!(accepts_offer(&offered, &offered));

        let mut cheaper = offered.clone();
        cheaper.amount = "1".to_string();
        assert!(!accepts_offer(&cheaper, &offered));

        let mut elsewhere = offered.clone();
        elsewhere.pay_to = Address::repeat_byte(0x99);
        assert!(!accepts_offer(&elsewhere, &offered));
    }
}
