//! Pre-approve a minting contract to pull USDC from the service account.
//!
//! Optional: the server approves on demand, but a standing allowance saves
//! one transaction per mint.

use std::sync::Arc;

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, U256};
use alloy::providers::ProviderBuilder;
use alloy::signers::local::PrivateKeySigner;
use x402_mint::{AlloyMintChain, ChainConfig, MintChain, MintSequencer};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let private_key =
        std::env::var("PRIVATE_KEY").expect("PRIVATE_KEY environment variable is required");

    let contract: Address = std::env::var("MINT_CONTRACT")
        .expect("MINT_CONTRACT environment variable is required")
        .parse()
        .expect("invalid MINT_CONTRACT");

    let chain_id: u64 = std::env::var("CHAIN_ID")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(x402_mint::BASE_SEPOLIA_CHAIN_ID);
    let mut chain = ChainConfig::for_chain_id(chain_id)
        .unwrap_or_else(|| panic!("unsupported CHAIN_ID {chain_id}"));
    if let Ok(url) = std::env::var(format!("RPC_URL_{chain_id}")) {
        chain = chain.with_rpc_url(url);
    }

    let approve_amount: U256 = match std::env::var("APPROVE_AMOUNT").as_deref() {
        Ok("MAX") => {
            tracing::warn!(
                "APPROVE_AMOUNT=MAX: granting unlimited spend authority to the minting contract"
            );
            U256::MAX
        }
        Ok(val) => val
            .parse::<U256>()
            .expect("invalid APPROVE_AMOUNT -- must be a valid U256"),
        Err(_) => {
            eprintln!(
                "ERROR: APPROVE_AMOUNT is required.\n\
                 Set it in USDC units (e.g. 1000000 for 1 USDC at 6 decimals),\n\
                 or APPROVE_AMOUNT=MAX for an unlimited allowance."
            );
            std::process::exit(1);
        }
    };

    let signer: PrivateKeySigner = private_key.parse().expect("invalid PRIVATE_KEY");
    let account = signer.address();

    println!("Approving minting contract for USDC...");
    println!("  Account:  {account}");
    println!("  Contract: {contract}");
    println!("  Chain:    {}", chain.network);
    println!("  Amount:   {approve_amount}");

    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .connect_http(chain.rpc_url.parse().expect("invalid RPC URL"));
    let client = Arc::new(AlloyMintChain::new(provider, account));
    let sequencer = MintSequencer::new().with_chain(chain.clone(), client.clone());

    let current = sequencer
        .allowance_state(chain_id, contract)
        .await
        .expect("failed to read allowance");
    println!("\nCurrent allowance: {}", current.allowance);

    if current.covers(approve_amount) {
        println!("Contract already has sufficient allowance -- nothing to do.");
        return;
    }

    println!("Sending approval transaction...");
    let tx_hash = client
        .approve(chain.payment_token, contract, approve_amount)
        .await
        .expect("approval failed");

    println!("  tx: {}", chain.tx_url(&tx_hash.to_string()));
    println!("Approval confirmed.");
}
