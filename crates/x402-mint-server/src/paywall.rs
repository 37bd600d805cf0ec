//! Browser-facing 402 page.
//!
//! API clients get the JSON body and `PAYMENT-REQUIRED` header; a request
//! that accepts `text/html` gets this page instead, carrying the same
//! requirements for a wallet-enabled client to pick up.

use x402_mint::{price::format_units, PaymentRequiredBody};

/// Name and logo shown on the paywall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branding {
    pub app_name: String,
    pub app_logo: String,
    pub testnet: bool,
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the paywall for `body`. `decimals` formats the first accepted amount.
pub fn render(branding: &Branding, body: &PaymentRequiredBody, decimals: u32) -> String {
    let requirement = body.accepts.first();
    let price = requirement
        .and_then(|r| r.amount.parse().ok())
        .map(|amount| format_units(amount, decimals))
        .unwrap_or_else(|| "?".to_string());
    let token = requirement
        .and_then(|r| r.extra.as_ref())
        .map(|e| e.name.as_str())
        .unwrap_or("USDC");
    let network = requirement.map(|r| r.network.as_str()).unwrap_or("");

    // JSON inside <script> must not be able to close the tag.
    let requirements_json = serde_json::to_string(body)
        .unwrap_or_else(|_| "{}".to_string())
        .replace('<', "\\u003c");

    let error = body
        .error
        .as_deref()
        .map(|e| format!(r#"<p class="error">{}</p>"#, escape_html(e)))
        .unwrap_or_default();
    let testnet = if branding.testnet {
        r#"<p class="badge">Testnet: no real funds are moved</p>"#
    } else {
        ""
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Payment Required | {app_name}</title>
<style>
body {{ font-family: system-ui, sans-serif; display: flex; justify-content: center; padding: 4rem 1rem; }}
main {{ max-width: 28rem; text-align: center; }}
img {{ width: 64px; height: 64px; border-radius: 12px; }}
.price {{ font-size: 2rem; font-weight: 700; }}
.error {{ color: #c0392b; }}
.badge {{ font-size: .8rem; opacity: .7; }}
code {{ word-break: break-all; }}
</style>
</head>
<body>
<main>
<img src="{app_logo}" alt="">
<h1>{app_name}</h1>
<p>{description}</p>
<p class="price">{price} {token}</p>
<p>Network: <code>{network}</code></p>
{error}
{testnet}
<p>Pay with an x402-enabled wallet to continue.</p>
</main>
<script type="application/json" id="x402-payment-required">{requirements_json}</script>
</body>
</html>
"#,
        app_name = escape_html(&branding.app_name),
        app_logo = escape_html(&branding.app_logo),
        description = escape_html(&body.resource.description),
        price = escape_html(&price),
        token = escape_html(token),
        network = escape_html(network),
    )
}
