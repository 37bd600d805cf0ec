use actix_web::{web, HttpRequest, HttpResponse};
use x402_mint::security::bearer_matches;

use crate::metrics::metrics_output;
use crate::state::AppState;

/// GET /health - RPC reachability of the default chain
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let chain_id = state.config.default_chain_id;
    let block = match state.sequencer.client(chain_id) {
        Ok(client) => client.block_number().await,
        Err(e) => Err(e),
    };

    match block {
        Ok(block) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "x402-mint-server",
            "version": env!("CARGO_PKG_VERSION"),
            "chainId": chain_id,
            "latestBlock": block.to_string(),
        })),
        Err(e) => {
            tracing::error!(error = %e, chain_id, "health check: RPC unreachable");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "degraded",
                "service": "x402-mint-server",
                "version": env!("CARGO_PKG_VERSION"),
                "chainId": chain_id,
            }))
        }
    }
}

/// GET /metrics - Prometheus metrics, bearer-gated unless explicitly public
pub async fn metrics(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    match state.config.metrics_token {
        Some(ref expected) => {
            let header = req
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok());
            if !bearer_matches(header, expected) {
                return HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "unauthorized",
                    "message": "Valid Bearer token required for /metrics"
                }));
            }
        }
        None if !state.config.public_metrics => {
            return HttpResponse::Forbidden().json(serde_json::json!({
                "error": "forbidden",
                "message": "Set METRICS_TOKEN or X402_PUBLIC_METRICS=true to access /metrics"
            }));
        }
        None => {}
    }

    match metrics_output() {
        Ok(output) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(output),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            HttpResponse::InternalServerError().body("Failed to encode metrics")
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics));
}
