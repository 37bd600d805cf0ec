//! x402-gated NFT minting on Base.
//!
//! A caller pays the minting contract's fee in USDC through an x402 paywall;
//! the service then pays the contract from its own account and mints to the
//! caller.
//!
//! # Pieces
//!
//! - [`ChainConfig`]: supported networks and their canonical payment tokens
//! - [`payment`] / [`response`]: x402 v2 wire types
//! - [`MintChain`]: contract reads and signed writes ([`AlloyMintChain`] in production)
//! - [`MintSequencer`]: quote, allowance top-up, mint
//!
//! # Quick example
//!
//! ```no_run
//! use std::sync::Arc;
//! use alloy::network::EthereumWallet;
//! use alloy::providers::ProviderBuilder;
//! use alloy::signers::local::PrivateKeySigner;
//! use x402_mint::{AlloyMintChain, ChainConfig, MintRequest, MintSequencer};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let signer: PrivateKeySigner = "0xYOUR_KEY".parse().unwrap();
//! let address = signer.address();
//! let chain = ChainConfig::base_sepolia();
//! let provider = ProviderBuilder::new()
//!     .wallet(EthereumWallet::from(signer))
//!     .connect_http(chain.rpc_url.parse().unwrap());
//!
//! let sequencer = MintSequencer::new()
//!     .with_chain(chain, Arc::new(AlloyMintChain::new(provider, address)));
//!
//! let receipt = sequencer
//!     .mint(&MintRequest {
//!         chain_id: 84532,
//!         contract: "0x0000000000000000000000000000000000000001".parse().unwrap(),
//!         recipient: None,
//!         amount: alloy::primitives::U256::from(1),
//!     })
//!     .await
//!     .unwrap();
//! println!("minted in {}", receipt.tx_hash);
//! # }
//! ```

pub mod chain;
pub mod constants;
pub mod error;
pub mod hmac;
pub mod payment;
pub mod price;
pub mod response;
pub mod security;
pub mod sequencer;

use alloy::sol;

// Minting contract surface. Overload order matters: the two-argument
// `mintTo` is `mintTo_0`, the affiliate variant is `mintTo_1`.
sol! {
    #[sol(rpc)]
    interface IMintContract {
        function protocolFee() external view returns (uint256);
        function erc20PaymentAddress() external view returns (address);
        function mintFee(uint256 amount) external view returns (uint256);
        function name() external view returns (string);
        function mintTo(address to, uint256 amount) external payable;
        function mintTo(address to, uint256 amount, address affiliate) external payable;
    }
}

// Minimal ERC-20 interface for the payment token.
sol! {
    #[sol(rpc)]
    interface IERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 value) external returns (bool);
    }
}

// Re-exports
pub use chain::{AlloyMintChain, MintCall, MintChain};
pub use constants::*;
pub use error::{MintError, X402Error};
pub use payment::*;
pub use response::*;
pub use sequencer::{
    parse_amount, AllowanceState, ContractQuote, MintReceipt, MintRequest, MintSequencer,
};
