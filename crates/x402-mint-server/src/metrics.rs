use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::{LazyLock, Once};

pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Request counters
pub static REQUESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("x402_mint_requests_total", "Total HTTP requests"),
        &["route", "status"],
    )
    .unwrap()
});

// Payment counters, by outcome (required, invalid, rejected, error, settled, settle_failed)
pub static PAYMENT_ATTEMPTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("x402_mint_payment_attempts_total", "Total payment attempts"),
        &["result"],
    )
    .unwrap()
});

// Mint counters
pub static MINTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("x402_mint_mints_total", "Mint attempts by result"),
        &["chain", "result"],
    )
    .unwrap()
});

pub static APPROVALS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "x402_mint_approvals_total",
        "ERC-20 approvals submitted before a mint",
    )
    .unwrap()
});

static REGISTER: Once = Once::new();

/// Register all metrics with the registry. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        REGISTRY.register(Box::new(REQUESTS.clone())).unwrap();
        REGISTRY
            .register(Box::new(PAYMENT_ATTEMPTS.clone()))
            .unwrap();
        REGISTRY.register(Box::new(MINTS.clone())).unwrap();
        REGISTRY.register(Box::new(APPROVALS.clone())).unwrap();
    });
}

/// Count a finished request under its route pattern (never the raw path).
pub fn observe(route: &str, status: actix_web::http::StatusCode) {
    REQUESTS
        .with_label_values(&[route, status.as_str()])
        .inc();
}

/// Prometheus text exposition of the registry.
pub fn metrics_output() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_counters_are_exported() {
        register_metrics();
        register_metrics();
        APPROVALS.inc();
        MINTS.with_label_values(&["84532", "success"]).inc();

        let output = metrics_output().unwrap();
        assert!(output.contains("x402_mint_approvals_total"));
        assert!(output.contains("x402_mint_mints_total"));
    }
}
