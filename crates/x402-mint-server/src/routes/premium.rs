use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use x402_mint::{PaymentRequirements, ResourceInfo};

use crate::error::AppError;
use crate::gate::{self, GateDecision, PaymentOffer};
use crate::metrics;
use crate::paywall::escape_html;
use crate::routes::mint::resource_url;
use crate::state::AppState;

const PREMIUM_ROUTE: &str = "/premium";

fn premium_page(app_name: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Premium | {app_name}</title>
</head>
<body style="font-family: system-ui, sans-serif; text-align: center; padding: 4rem 1rem;">
<h1 style="color: #22a35a;">Premium Content Unlocked! 🔓</h1>
<p>You have successfully paid for this content.</p>
<p><code>Secret Code: X402-ROCKS</code></p>
<p><a href="/">Back to Home</a></p>
</body>
</html>
"#,
        app_name = escape_html(app_name),
    )
}

async fn handle(req: &HttpRequest, state: &AppState) -> Result<HttpResponse, AppError> {
    let config = &state.config;
    let chain = config
        .default_chain()
        .ok_or_else(|| AppError::Internal("default chain missing".to_string()))?;

    let offer = PaymentOffer {
        resource: ResourceInfo {
            url: resource_url(req),
            description: "Premium content access".to_string(),
            mime_type: "text/html".to_string(),
        },
        requirements: PaymentRequirements::exact(chain, config.premium_amount, config.pay_to),
        token_decimals: chain.token_decimals,
        branding: state.branding.clone(),
    };

    let payment = match gate::intercept(req, &offer, state.gate.as_ref()).await? {
        GateDecision::Allow(payment) => payment,
        GateDecision::Deny(resp) => return Ok(resp),
    };

    let page = HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(premium_page(&state.branding.app_name));

    Ok(gate::settle_after(req, &offer, state.gate.as_ref(), &payment, page).await)
}

/// GET /premium - Paid content
pub async fn premium(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let resp = handle(&req, &state)
        .await
        .unwrap_or_else(|e| e.error_response());
    metrics::observe(PREMIUM_ROUTE, resp.status());
    resp
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(PREMIUM_ROUTE, web::get().to(premium));
}
