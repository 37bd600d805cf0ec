use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use url::Url;
use x402_mint::{supported_chains, ChainConfig, DEFAULT_FACILITATOR_URL, TOKEN_DECIMALS};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_APP_NAME: &str = "x402 Demo";
const DEFAULT_APP_LOGO: &str = "/x402-icon-blue.png";
const DEFAULT_PREMIUM_PRICE: &str = "$0.01";
const DEFAULT_RATE_LIMIT_RPM: u64 = 60;

/// Supabase project holding the `MintingPages` table.
#[derive(Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub service_key: String,
}

#[derive(Clone)]
pub struct AppConfig {
    /// Signing key for approvals and mints. Taken out at startup.
    pub private_key: Option<String>,
    /// Public address of the signing key
    pub signer_address: Address,
    /// Receives x402 payments
    pub pay_to: Address,
    /// Paywall branding
    pub app_name: String,
    pub app_logo: String,
    pub facilitator_url: String,
    /// HMAC shared secret for facilitator auth (None = unsigned requests)
    pub hmac_secret: Option<Vec<u8>>,
    /// Chain used for `/premium` and health checks
    pub default_chain_id: u64,
    /// Supported chains, with RPC overrides applied
    pub chains: Vec<ChainConfig>,
    /// `/premium` price (e.g. "$0.01") and its token amount
    pub premium_price: String,
    pub premium_amount: U256,
    /// Selects the three-argument `mintTo` overload when set
    pub mint_affiliate: Option<Address>,
    pub supabase: Option<SupabaseConfig>,
    pub port: u16,
    pub rate_limit_rpm: u64,
    pub allowed_origins: Vec<String>,
    /// Bearer token required for /metrics
    pub metrics_token: Option<String>,
    /// Serve /metrics without a token when no token is configured
    pub public_metrics: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("signer_address", &self.signer_address)
            .field("pay_to", &self.pay_to)
            .field("app_name", &self.app_name)
            .field("app_logo", &self.app_logo)
            .field("facilitator_url", &self.facilitator_url)
            .field(
                "hmac_secret",
                &self.hmac_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("default_chain_id", &self.default_chain_id)
            .field(
                "chains",
                &self.chains.iter().map(|c| c.chain_id).collect::<Vec<_>>(),
            )
            .field("premium_price", &self.premium_price)
            .field("mint_affiliate", &self.mint_affiliate)
            .field("supabase", &self.supabase.as_ref().map(|s| s.url.as_str()))
            .field("port", &self.port)
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .field("allowed_origins", &self.allowed_origins)
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("public_metrics", &self.public_metrics)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        // Required: blockchain credentials
        let private_key = get("PRIVATE_KEY").ok_or(ConfigError::MissingRequired("PRIVATE_KEY"))?;
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|_| ConfigError::InvalidKey("PRIVATE_KEY"))?;

        let signer_address = parse_address(
            "EVM_ADDRESS",
            &get("EVM_ADDRESS").ok_or(ConfigError::MissingRequired("EVM_ADDRESS"))?,
        )?;
        if signer.address() != signer_address {
            return Err(ConfigError::SignerMismatch {
                configured: signer_address,
                derived: signer.address(),
            });
        }

        let pay_to = parse_address(
            "WALLET_ADDRESS",
            &get("WALLET_ADDRESS").ok_or(ConfigError::MissingRequired("WALLET_ADDRESS"))?,
        )?;

        let app_name = get("APP_NAME").unwrap_or_else(|| DEFAULT_APP_NAME.to_string());
        let app_logo = get("APP_LOGO").unwrap_or_else(|| DEFAULT_APP_LOGO.to_string());

        let facilitator_url =
            get("FACILITATOR_URL").unwrap_or_else(|| DEFAULT_FACILITATOR_URL.to_string());
        Url::parse(&facilitator_url).map_err(|_| ConfigError::InvalidUrl(facilitator_url.clone()))?;

        let hmac_secret = get("FACILITATOR_SHARED_SECRET").map(String::into_bytes);
        if let Some(ref secret) = hmac_secret {
            if secret.len() < 32 {
                tracing::warn!(
                    "FACILITATOR_SHARED_SECRET is short ({} bytes); \
                     use `openssl rand -hex 32` to generate one",
                    secret.len()
                );
            }
        }

        let mut chains = Vec::new();
        for chain in supported_chains() {
            let chain = match get(&format!("RPC_URL_{}", chain.chain_id)) {
                Some(rpc_url) => {
                    Url::parse(&rpc_url).map_err(|_| ConfigError::InvalidUrl(rpc_url.clone()))?;
                    chain.with_rpc_url(rpc_url)
                }
                None => chain,
            };
            chains.push(chain);
        }

        let default_chain_id = match get("DEFAULT_CHAIN_ID") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| ConfigError::UnsupportedChain(raw.clone()))?,
            None => x402_mint::BASE_SEPOLIA_CHAIN_ID,
        };
        if !chains.iter().any(|c| c.chain_id == default_chain_id) {
            return Err(ConfigError::UnsupportedChain(default_chain_id.to_string()));
        }

        let premium_price =
            get("PREMIUM_PRICE").unwrap_or_else(|| DEFAULT_PREMIUM_PRICE.to_string());
        let premium_amount = x402_mint::price::parse_price(&premium_price, TOKEN_DECIMALS)
            .map_err(|e| ConfigError::InvalidPrice(format!("{premium_price}: {e}")))?;

        let mint_affiliate = get("MINT_AFFILIATE")
            .map(|raw| parse_address("MINT_AFFILIATE", &raw))
            .transpose()?;

        let supabase = match (get("SUPABASE_URL"), get("SUPABASE_SERVICE_KEY")) {
            (Some(url), Some(service_key)) => {
                Url::parse(&url).map_err(|_| ConfigError::InvalidUrl(url.clone()))?;
                Some(SupabaseConfig { url, service_key })
            }
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!(
                    "SUPABASE_URL and SUPABASE_SERVICE_KEY must both be set; metadata lookup disabled"
                );
                None
            }
            (None, None) => None,
        };

        let port = get("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let rate_limit_rpm = get("RATE_LIMIT_RPM")
            .and_then(|r| r.parse().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT_RPM);

        let allowed_origins: Vec<String> = get("ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let metrics_token = get("METRICS_TOKEN");
        let public_metrics = get("X402_PUBLIC_METRICS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Ok(Self {
            private_key: Some(private_key),
            signer_address,
            pay_to,
            app_name,
            app_logo,
            facilitator_url,
            hmac_secret,
            default_chain_id,
            chains,
            premium_price,
            premium_amount,
            mint_affiliate,
            supabase,
            port,
            rate_limit_rpm,
            allowed_origins,
            metrics_token,
            public_metrics,
        })
    }

    pub fn chain(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }

    /// Always `Some` for a config built by `from_lookup`.
    pub fn default_chain(&self) -> Option<&ChainConfig> {
        self.chain(self.default_chain_id)
    }
}

fn parse_address(var: &'static str, raw: &str) -> Result<Address, ConfigError> {
    raw.parse()
        .map_err(|_| ConfigError::InvalidAddress(var, raw.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingRequired(&'static str),

    #[error("invalid private key in {0}")]
    InvalidKey(&'static str),

    #[error("invalid address in {0}: {1}")]
    InvalidAddress(&'static str, String),

    #[error("EVM_ADDRESS {configured} does not match the PRIVATE_KEY address {derived}")]
    SignerMismatch { configured: Address, derived: Address },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported chain: {0}")]
    UnsupportedChain(String),

    #[error("invalid price: {0}")]
    InvalidPrice(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    // Well-known Anvil/Hardhat account #0.
    const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const KEY_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn base_env() -> HashMap<&'static str, String> {
        HashMap::from([
            ("PRIVATE_KEY", KEY.to_string()),
            ("EVM_ADDRESS", KEY_ADDRESS.to_string()),
            (
                "WALLET_ADDRESS",
                "0x2222222222222222222222222222222222222222".to_string(),
            ),
        ])
    }

    fn load(env: &HashMap<&'static str, String>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.app_name, "x402 Demo");
        assert_eq!(config.facilitator_url, "https://x402.org/facilitator");
        assert_eq!(config.default_chain_id, 84532);
        assert_eq!(config.premium_amount, U256::from(10_000));
        assert!(config.supabase.is_none());
        assert!(config.mint_affiliate.is_none());
        assert_eq!(config.chains.len(), 2);
    }

    #[test]
    fn test_missing_private_key_is_fatal() {
        let mut env = base_env();
        env.remove("PRIVATE_KEY");
        assert!(matches!(
            load(&env),
            Err(ConfigError::MissingRequired("PRIVATE_KEY"))
        ));
    }

    #[test]
    fn test_blank_wallet_address_counts_as_missing() {
        let mut env = base_env();
        env.insert("WALLET_ADDRESS", "   ".to_string());
        assert!(matches!(
            load(&env),
            Err(ConfigError::MissingRequired("WALLET_ADDRESS"))
        ));
    }

    #[test]
    fn test_signer_mismatch_rejected() {
        let mut env = base_env();
        env.insert(
            "EVM_ADDRESS",
            "0x3333333333333333333333333333333333333333".to_string(),
        );
        assert!(matches!(
            load(&env),
            Err(ConfigError::SignerMismatch { .. })
        ));
    }

    #[test]
    fn test_rpc_override_applies_to_one_chain() {
        let mut env = base_env();
        env.insert("RPC_URL_84532", "http://localhost:8545".to_string());
        let config = load(&env).unwrap();
        assert_eq!(config.chain(84532).unwrap().rpc_url, "http://localhost:8545");
        assert_eq!(config.chain(8453).unwrap().rpc_url, "https://mainnet.base.org");
    }

    #[test]
    fn test_unsupported_default_chain_rejected() {
        let mut env = base_env();
        env.insert("DEFAULT_CHAIN_ID", "1".to_string());
        assert!(matches!(
            load(&env),
            Err(ConfigError::UnsupportedChain(_))
        ));
    }

    #[test]
    fn test_half_configured_supabase_is_disabled() {
        let mut env = base_env();
        env.insert("SUPABASE_URL", "https://example.supabase.co".to_string());
        let config = load(&env).unwrap();
        assert!(config.supabase.is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut env = base_env();
        env.insert("METRICS_TOKEN", "metrics-secret".to_string());
        let config = load(&env).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains(KEY.trim_start_matches("0x")));
        assert!(!debug.contains("metrics-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
