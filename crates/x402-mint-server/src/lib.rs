//! x402 paywall server: premium content and pay-to-mint endpoints.
//!
//! Gated routes answer HTTP 402 with x402 v2 payment requirements until the
//! client sends a `PAYMENT-SIGNATURE`; the payment is verified with a
//! facilitator, the handler runs, and the payment is settled only if the
//! handler succeeded.
//!
//! # Modules
//!
//! - [`config`]: environment configuration ([`AppConfig`](config::AppConfig))
//! - [`gate`]: payment gate ([`intercept`](gate::intercept), [`settle_after`](gate::settle_after))
//! - [`metadata`]: contract display metadata for the paywall
//! - [`routes`]: `/mint`, `/premium`, `/`, `/health`, `/metrics`
//! - [`metrics`]: Prometheus counters

pub mod config;
pub mod cors;
pub mod error;
pub mod gate;
pub mod metadata;
pub mod metrics;
pub mod paywall;
pub mod routes;
pub mod state;

pub use config::{AppConfig, ConfigError};
pub use error::AppError;
pub use gate::{FacilitatorGate, GateDecision, PaymentGate, PaymentOffer, VerifiedPayment};
pub use metadata::{ContractMetadata, MetadataLookup, NoMetadata, SupabaseMetadata};
pub use state::AppState;
