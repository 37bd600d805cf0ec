use alloy::network::EthereumWallet;
use alloy::providers::ProviderBuilder;
use alloy::signers::local::PrivateKeySigner;
use std::sync::Arc;
use x402_mint::{AlloyMintChain, MintSequencer};

use crate::config::{AppConfig, ConfigError};
use crate::gate::{FacilitatorGate, PaymentGate};
use crate::metadata::{MetadataLookup, NoMetadata, SupabaseMetadata};
use crate::paywall::Branding;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sequencer: Arc<MintSequencer>,
    pub gate: Arc<dyn PaymentGate>,
    pub metadata: Arc<dyn MetadataLookup>,
    pub branding: Branding,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        sequencer: MintSequencer,
        gate: Arc<dyn PaymentGate>,
        metadata: Arc<dyn MetadataLookup>,
    ) -> Self {
        let branding = Branding {
            app_name: config.app_name.clone(),
            app_logo: config.app_logo.clone(),
            testnet: config
                .default_chain()
                .map(|c| c.testnet)
                .unwrap_or(true),
        };
        Self {
            config: Arc::new(config),
            sequencer: Arc::new(sequencer),
            gate,
            metadata,
            branding,
        }
    }

    /// Wire up the production collaborators: one wallet provider per
    /// supported chain, the facilitator client, and Supabase if configured.
    ///
    /// Consumes the private key held in `config`.
    pub fn from_config(mut config: AppConfig) -> Result<Self, ConfigError> {
        let private_key = config
            .private_key
            .take()
            .ok_or(ConfigError::MissingRequired("PRIVATE_KEY"))?;
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|_| ConfigError::InvalidKey("PRIVATE_KEY"))?;
        drop(private_key);
        let account = signer.address();

        let mut sequencer = MintSequencer::new().with_affiliate(config.mint_affiliate);
        for chain in &config.chains {
            let rpc_url: url::Url = chain
                .rpc_url
                .parse()
                .map_err(|_| ConfigError::InvalidUrl(chain.rpc_url.clone()))?;
            let provider = ProviderBuilder::new()
                .wallet(EthereumWallet::from(signer.clone()))
                .connect_http(rpc_url);
            sequencer =
                sequencer.with_chain(chain.clone(), Arc::new(AlloyMintChain::new(provider, account)));
        }

        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        let gate: Arc<dyn PaymentGate> = Arc::new(FacilitatorGate::new(
            http_client.clone(),
            config.facilitator_url.clone(),
            config.hmac_secret.clone(),
        ));

        let metadata: Arc<dyn MetadataLookup> = match config.supabase.clone() {
            Some(supabase) => Arc::new(SupabaseMetadata::new(http_client, supabase)),
            None => Arc::new(NoMetadata),
        };

        Ok(Self::new(config, sequencer, gate, metadata))
    }
}
