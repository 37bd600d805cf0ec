use alloy::primitives::{address, Address};

/// x402 protocol version spoken by this service.
pub const X402_VERSION: u32 = 2;

/// x402 scheme name for EIP-3009 `transferWithAuthorization` payments.
pub const SCHEME_NAME: &str = "exact";

/// Base Sepolia chain ID.
pub const BASE_SEPOLIA_CHAIN_ID: u64 = 84532;

/// Base mainnet chain ID.
pub const BASE_CHAIN_ID: u64 = 8453;

/// Circle USDC on Base Sepolia.
pub const BASE_SEPOLIA_USDC: Address = address!("036CbD53842c5426634e7929541eC2318f3dCF7e");

/// Circle USDC on Base mainnet.
pub const BASE_USDC: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");

/// USDC has 6 decimal places on every supported chain.
pub const TOKEN_DECIMALS: u32 = 6;

/// Default public x402 facilitator.
pub const DEFAULT_FACILITATOR_URL: &str = "https://x402.org/facilitator";

/// How long a signed payment authorization may stay valid.
pub const MAX_TIMEOUT_SECONDS: u64 = 300;

/// Runtime chain configuration for one supported network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub chain_id: u64,
    /// CAIP-2 identifier, e.g. `eip155:84532`.
    pub network: String,
    /// The payment token a well-formed minting contract must charge in.
    pub payment_token: Address,
    pub token_decimals: u32,
    /// EIP-712 domain of the payment token, advertised in `extra`.
    pub token_name: String,
    pub token_version: String,
    pub rpc_url: String,
    pub explorer_base: String,
    pub testnet: bool,
}

impl ChainConfig {
    pub fn base_sepolia() -> Self {
        Self {
            chain_id: BASE_SEPOLIA_CHAIN_ID,
            network: format!("eip155:{BASE_SEPOLIA_CHAIN_ID}"),
            payment_token: BASE_SEPOLIA_USDC,
            token_decimals: TOKEN_DECIMALS,
            token_name: "USDC".to_string(),
            token_version: "2".to_string(),
            rpc_url: "https://sepolia.base.org".to_string(),
            explorer_base: "https://sepolia.basescan.org".to_string(),
            testnet: true,
        }
    }

    pub fn base() -> Self {
        Self {
            chain_id: BASE_CHAIN_ID,
            network: format!("eip155:{BASE_CHAIN_ID}"),
            payment_token: BASE_USDC,
            token_decimals: TOKEN_DECIMALS,
            token_name: "USD Coin".to_string(),
            token_version: "2".to_string(),
            rpc_url: "https://mainnet.base.org".to_string(),
            explorer_base: "https://basescan.org".to_string(),
            testnet: false,
        }
    }

    /// Look up a supported chain by its numeric ID.
    pub fn for_chain_id(chain_id: u64) -> Option<Self> {
        supported_chains()
            .into_iter()
            .find(|c| c.chain_id == chain_id)
    }

    /// Override the RPC endpoint (e.g. from `RPC_URL_84532`).
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }

    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{tx_hash}", self.explorer_base)
    }
}

impl Default for ChainConfig {
    /// Defaults to Base Sepolia.
    fn default() -> Self {
        Self::base_sepolia()
    }
}

/// Every network the service knows a canonical payment token for.
pub fn supported_chains() -> Vec<ChainConfig> {
    vec![ChainConfig::base_sepolia(), ChainConfig::base()]
}
