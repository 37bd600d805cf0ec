use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use alloy::primitives::Address;
use std::sync::Arc;
use x402_mint::{parse_amount, MintError, MintRequest, PaymentRequirements, ResourceInfo};

use crate::error::AppError;
use crate::gate::{self, GateDecision, PaymentOffer, PAYMENT_FROM_HEADER};
use crate::metrics::{self, APPROVALS, MINTS};
use crate::paywall::Branding;
use crate::state::AppState;

const MINT_ROUTE: &str = "/mint/{chain_id}/{contract}/{amount}";
const MINT_ONE_ROUTE: &str = "/mint/{chain_id}/{contract}";

/// GET /mint/{chain_id}/{contract}/{amount} - Pay the mint fee, receive the tokens
pub async fn mint(
    req: HttpRequest,
    path: web::Path<(String, String, String)>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let (chain_id, contract, amount) = path.into_inner();
    let resp = handle(&req, &state, &chain_id, &contract, Some(&amount))
        .await
        .unwrap_or_else(|e| e.error_response());
    metrics::observe(MINT_ROUTE, resp.status());
    resp
}

/// GET /mint/{chain_id}/{contract} - Same as above with amount 1
pub async fn mint_one(
    req: HttpRequest,
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let (chain_id, contract) = path.into_inner();
    let resp = handle(&req, &state, &chain_id, &contract, None)
        .await
        .unwrap_or_else(|e| e.error_response());
    metrics::observe(MINT_ONE_ROUTE, resp.status());
    resp
}

/// Absolute URL of the request, used as the x402 resource.
pub(crate) fn resource_url(req: &HttpRequest) -> String {
    let conn = req.connection_info();
    format!("{}://{}{}", conn.scheme(), conn.host(), req.uri())
}

/// Mint recipient: explicit `x-payment-from`, else the verified payer.
fn resolve_recipient(req: &HttpRequest, payer: Address) -> Address {
    let Some(raw) = req.headers().get(PAYMENT_FROM_HEADER) else {
        return payer;
    };
    match raw.to_str().ok().and_then(|v| v.trim().parse::<Address>().ok()) {
        Some(addr) => addr,
        None => {
            tracing::warn!(%payer, "ignoring malformed x-payment-from header");
            payer
        }
    }
}

async fn handle(
    req: &HttpRequest,
    state: &AppState,
    chain_id: &str,
    contract: &str,
    amount: Option<&str>,
) -> Result<HttpResponse, AppError> {
    let chain_id: u64 = chain_id
        .parse()
        .map_err(|_| AppError::InvalidRequest(format!("invalid chain id: {chain_id}")))?;
    let chain = state
        .sequencer
        .chain_config(chain_id)
        .map_err(|_| AppError::UnsupportedChain(chain_id))?
        .clone();
    let contract: Address = contract
        .parse()
        .map_err(|_| AppError::InvalidRequest(format!("invalid contract address: {contract}")))?;
    let amount = parse_amount(amount);

    // Priced fresh on every request; never cached.
    let quote = state.sequencer.quote(chain_id, contract, amount).await?;
    let metadata = state.metadata.get(chain_id, contract).await;

    let description = match metadata {
        Some(ref m) => format!("Mint {amount} × {}", m.display_name),
        None => "Mint NFT".to_string(),
    };
    let branding = match metadata {
        Some(m) => Branding {
            app_name: m.display_name,
            app_logo: m.logo_uri.unwrap_or_else(|| state.branding.app_logo.clone()),
            testnet: chain.testnet,
        },
        None => Branding {
            testnet: chain.testnet,
            ..state.branding.clone()
        },
    };

    // Payment goes to the signing account, which then pays the contract.
    let offer = PaymentOffer {
        resource: ResourceInfo {
            url: resource_url(req),
            description,
            mime_type: "application/json".to_string(),
        },
        requirements: PaymentRequirements::exact(
            &chain,
            quote.mint_fee,
            state.config.signer_address,
        ),
        token_decimals: chain.token_decimals,
        branding,
    };

    tracing::info!(
        chain_id,
        %contract,
        %amount,
        price = %quote.price(),
        name = %quote.name,
        "mint quoted"
    );

    let payment = match gate::intercept(req, &offer, state.gate.as_ref()).await? {
        GateDecision::Allow(payment) => payment,
        GateDecision::Deny(resp) => return Ok(resp),
    };

    let request = MintRequest {
        chain_id,
        contract,
        recipient: Some(resolve_recipient(req, payment.payer)),
        amount,
    };

    // Mint and settle run detached: a client that disconnects mid-mint must
    // not leave a minted token with an unsettled payment.
    let sequencer = Arc::clone(&state.sequencer);
    let gate_client = Arc::clone(&state.gate);
    let requirements = offer.requirements.clone();
    let paid = payment.clone();
    let outcome = tokio::spawn(async move {
        let receipt = sequencer.mint(&request).await?;
        let settlement = gate::settle(gate_client.as_ref(), &paid, &requirements).await;
        Ok::<_, MintError>((receipt, settlement))
    })
    .await
    .map_err(|e| AppError::Internal(format!("mint task failed: {e}")))?;

    let chain_label = chain_id.to_string();
    match outcome {
        Ok((receipt, settlement)) => {
            MINTS.with_label_values(&[chain_label.as_str(), "success"]).inc();
            if receipt.approval_tx.is_some() {
                APPROVALS.inc();
            }
            let response = HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Minting successful!",
                "txHash": receipt.tx_hash,
            }));
            Ok(gate::with_settlement(req, &offer, &payment, settlement, response))
        }
        Err(e) => {
            MINTS.with_label_values(&[chain_label.as_str(), "failure"]).inc();
            tracing::info!(payer = %payment.payer, "mint failed, payment not settled");
            Err(AppError::Mint(e))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(MINT_ROUTE, web::get().to(mint))
        .route(MINT_ONE_ROUTE, web::get().to(mint_one));
}
