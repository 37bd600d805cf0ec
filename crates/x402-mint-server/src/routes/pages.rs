use actix_web::{web, HttpResponse};

use crate::paywall::escape_html;
use crate::state::AppState;

/// GET / - Landing page
pub async fn index(state: web::Data<AppState>) -> HttpResponse {
    let app_name = escape_html(&state.branding.app_name);
    let price = escape_html(&state.config.premium_price);
    let chain_id = state.config.default_chain_id;

    let body = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{app_name}</title>
</head>
<body style="font-family: system-ui, sans-serif; max-width: 36rem; margin: 4rem auto; padding: 0 1rem;">
<h1>{app_name}</h1>
<p>Pay-per-request access with x402. The button below needs a small USDC payment.</p>
<p><a href="/premium">Access Premium Content ({price})</a></p>
<h2>Minting</h2>
<p>Request <code>/mint/{chain_id}/&lt;contract&gt;/&lt;amount&gt;</code> to pay the contract's
mint fee and receive the tokens at your paying address.</p>
</body>
</html>
"#
    );

    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index));
}
