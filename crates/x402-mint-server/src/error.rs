use actix_web::{HttpResponse, ResponseError};
use std::fmt;
use x402_mint::{MintError, X402Error};

#[derive(Debug)]
pub enum AppError {
    /// Malformed chain id, contract address, or other path input
    InvalidRequest(String),
    /// Chain id is not in the supported table
    UnsupportedChain(u64),
    /// `PAYMENT-SIGNATURE` header could not be decoded
    InvalidPaymentHeader(String),
    /// Facilitator unreachable or returned garbage
    PaymentProcessing(String),
    /// Any failure in the quote or mint sequence
    Mint(MintError),
    /// Internal error
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidRequest(msg) => write!(f, "invalid request: {}", msg),
            AppError::UnsupportedChain(id) => write!(f, "unsupported chain: {}", id),
            AppError::InvalidPaymentHeader(msg) => write!(f, "invalid payment header: {}", msg),
            AppError::PaymentProcessing(msg) => write!(f, "payment processing failed: {}", msg),
            AppError::Mint(e) => write!(f, "minting failed: {}", e),
            AppError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<MintError> for AppError {
    fn from(e: MintError) -> Self {
        AppError::Mint(e)
    }
}

impl From<X402Error> for AppError {
    fn from(e: X402Error) -> Self {
        match e {
            X402Error::InvalidPayment(msg) => AppError::InvalidPaymentHeader(msg),
            X402Error::HttpError(msg) => AppError::PaymentProcessing(msg),
            X402Error::SerdeError(e) => AppError::PaymentProcessing(e.to_string()),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::InvalidRequest(msg) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "invalid_request",
                "message": msg
            })),
            AppError::UnsupportedChain(id) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "unsupported_chain",
                "message": format!("Chain {} is not supported", id)
            })),
            AppError::InvalidPaymentHeader(msg) => {
                tracing::warn!(error = %msg, "invalid payment header");
                HttpResponse::BadRequest().json(serde_json::json!({
                    "error": "invalid payment header"
                }))
            }
            AppError::PaymentProcessing(msg) => {
                tracing::error!(error = %msg, "facilitator communication error");
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "payment processing failed"
                }))
            }
            // The cause stays in the logs; callers only learn that minting failed.
            AppError::Mint(e) => {
                tracing::error!(error = %e, "minting failed");
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "Minting failed"
                }))
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "internal_error",
                    "message": "An internal error occurred"
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::http::StatusCode;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let resp = err.error_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_rt::test]
    async fn test_every_mint_error_is_opaque() {
        for err in [
            MintError::Config("protocol fee is 5".into()),
            MintError::Chain("execution reverted".into()),
            MintError::Input("bad amount".into()),
        ] {
            let (status, body) = body_json(AppError::Mint(err)).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body, serde_json::json!({"error": "Minting failed"}));
        }
    }

    #[actix_rt::test]
    async fn test_x402_errors_map_by_origin() {
        let (status, _) = body_json(X402Error::InvalidPayment("bad".into()).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = body_json(X402Error::HttpError("timeout".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "payment processing failed");
    }
}
