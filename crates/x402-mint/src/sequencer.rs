//! The mint sequence: read contract terms, check them, top up the ERC-20
//! allowance if needed, then mint.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::{Address, TxHash, U256};
use tokio::sync::Mutex;

use crate::chain::{MintCall, MintChain};
use crate::price::format_units;
use crate::{ChainConfig, MintError};

/// A single minting attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintRequest {
    pub chain_id: u64,
    pub contract: Address,
    /// Who receives the minted tokens. `None` mints to the signing account.
    pub recipient: Option<Address>,
    pub amount: U256,
}

/// Read-only snapshot of a contract's pricing. Never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractQuote {
    pub chain_id: u64,
    pub contract: Address,
    pub amount: U256,
    pub protocol_fee: U256,
    pub payment_token: Address,
    pub mint_fee: U256,
    pub name: String,
    pub token_decimals: u32,
}

impl ContractQuote {
    /// Mint fee as a decimal token amount, e.g. `"0.001"`.
    pub fn price(&self) -> String {
        format_units(self.mint_fee, self.token_decimals)
    }
}

/// Allowance granted by the signing account to a minting contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowanceState {
    pub owner: Address,
    pub spender: Address,
    pub allowance: U256,
}

impl AllowanceState {
    pub fn covers(&self, fee: U256) -> bool {
        self.allowance >= fee
    }
}

/// Outcome of a successful mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintReceipt {
    pub tx_hash: TxHash,
    /// Set when an approval had to be submitted first.
    pub approval_tx: Option<TxHash>,
}

/// Parse the path's amount segment. Missing, unparseable, or zero means 1.
pub fn parse_amount(raw: Option<&str>) -> U256 {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| U256::from_str_radix(s, 10).ok())
        .filter(|a| !a.is_zero())
        .unwrap_or(U256::from(1))
}

struct SupportedChain {
    config: ChainConfig,
    client: Arc<dyn MintChain>,
    /// Serializes allowance check, approval and mint for the signing account.
    signer_lock: Mutex<()>,
}

/// Runs mint sequences against every configured chain.
pub struct MintSequencer {
    chains: HashMap<u64, SupportedChain>,
    affiliate: Option<Address>,
}

impl MintSequencer {
    pub fn new() -> Self {
        Self {
            chains: HashMap::new(),
            affiliate: None,
        }
    }

    /// Register a chain and the client that signs for it.
    pub fn with_chain(mut self, config: ChainConfig, client: Arc<dyn MintChain>) -> Self {
        self.chains.insert(
            config.chain_id,
            SupportedChain {
                config,
                client,
                signer_lock: Mutex::new(()),
            },
        );
        self
    }

    /// Mint through the three-argument `mintTo` overload, crediting `affiliate`.
    pub fn with_affiliate(mut self, affiliate: Option<Address>) -> Self {
        self.affiliate = affiliate;
        self
    }

    pub fn supported_chain_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.chains.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn chain_config(&self, chain_id: u64) -> Result<&ChainConfig, MintError> {
        self.chain(chain_id).map(|c| &c.config)
    }

    pub fn client(&self, chain_id: u64) -> Result<Arc<dyn MintChain>, MintError> {
        self.chain(chain_id).map(|c| Arc::clone(&c.client))
    }

    fn chain(&self, chain_id: u64) -> Result<&SupportedChain, MintError> {
        self.chains
            .get(&chain_id)
            .ok_or_else(|| MintError::Input(format!("unsupported chain id {chain_id}")))
    }

    /// Read `protocolFee`, `erc20PaymentAddress` and `mintFee(amount)` concurrently.
    async fn read_terms(
        chain: &SupportedChain,
        contract: Address,
        amount: U256,
    ) -> Result<(U256, Address, U256), MintError> {
        let client = &chain.client;
        tokio::try_join!(
            client.protocol_fee(contract),
            client.erc20_payment_address(contract),
            client.mint_fee(contract, amount),
        )
    }

    /// Reject contracts that take a protocol cut or charge in a foreign token.
    fn check_terms(
        config: &ChainConfig,
        contract: Address,
        protocol_fee: U256,
        payment_token: Address,
    ) -> Result<(), MintError> {
        if !protocol_fee.is_zero() {
            tracing::warn!(%contract, %protocol_fee, "contract charges a protocol fee");
            return Err(MintError::Config(format!(
                "contract {contract} has non-zero protocol fee {protocol_fee}"
            )));
        }
        if payment_token != config.payment_token {
            tracing::warn!(
                %contract,
                %payment_token,
                expected = %config.payment_token,
                "contract charges in an unexpected token"
            );
            return Err(MintError::Config(format!(
                "contract {contract} charges in {payment_token}, expected {}",
                config.payment_token
            )));
        }
        Ok(())
    }

    /// Price a mint without touching state. The paywall calls this on every
    /// request, so the figure can go stale before [`mint`](Self::mint) runs.
    pub async fn quote(
        &self,
        chain_id: u64,
        contract: Address,
        amount: U256,
    ) -> Result<ContractQuote, MintError> {
        let chain = self.chain(chain_id)?;
        let ((protocol_fee, payment_token, mint_fee), name) = tokio::try_join!(
            Self::read_terms(chain, contract, amount),
            chain.client.contract_name(contract),
        )?;

        tracing::debug!(
            chain_id,
            %contract,
            %protocol_fee,
            %payment_token,
            %mint_fee,
            name = %name,
            "contract terms fetched"
        );

        Self::check_terms(&chain.config, contract, protocol_fee, payment_token)?;

        Ok(ContractQuote {
            chain_id,
            contract,
            amount,
            protocol_fee,
            payment_token,
            mint_fee,
            name,
            token_decimals: chain.config.token_decimals,
        })
    }

    /// Read the allowance the signing account has granted `contract`.
    pub async fn allowance_state(
        &self,
        chain_id: u64,
        contract: Address,
    ) -> Result<AllowanceState, MintError> {
        let chain = self.chain(chain_id)?;
        let owner = chain.client.signer();
        let allowance = chain
            .client
            .allowance(chain.config.payment_token, owner, contract)
            .await?;
        Ok(AllowanceState {
            owner,
            spender: contract,
            allowance,
        })
    }

    /// Run the full sequence and return the mint transaction hash.
    ///
    /// Nothing is submitted unless the contract passes the trust checks. An
    /// approval, when needed, is confirmed before the mint is sent. There is
    /// no rollback: if the approval lands and the mint fails, the allowance
    /// stays in place for the next attempt.
    pub async fn mint(&self, request: &MintRequest) -> Result<MintReceipt, MintError> {
        let chain = self.chain(request.chain_id)?;
        let contract = request.contract;
        let recipient = request.recipient.unwrap_or_else(|| chain.client.signer());

        tracing::info!(
            chain_id = request.chain_id,
            %contract,
            %recipient,
            amount = %request.amount,
            "minting"
        );

        let (protocol_fee, payment_token, mint_fee) =
            Self::read_terms(chain, contract, request.amount).await?;
        Self::check_terms(&chain.config, contract, protocol_fee, payment_token)?;

        let _guard = chain.signer_lock.lock().await;

        let allowance = self.allowance_state(request.chain_id, contract).await?;
        tracing::info!(allowance = %allowance.allowance, %mint_fee, "allowance checked");

        let approval_tx = if allowance.covers(mint_fee) {
            None
        } else {
            tracing::info!(%contract, %mint_fee, "approving payment token");
            let tx = chain
                .client
                .approve(chain.config.payment_token, contract, mint_fee)
                .await?;
            tracing::info!(tx = %tx, "approval confirmed");
            Some(tx)
        };

        let tx_hash = chain
            .client
            .mint_to(
                contract,
                MintCall {
                    to: recipient,
                    amount: request.amount,
                    affiliate: self.affiliate,
                },
            )
            .await?;

        tracing::info!(
            chain_id = request.chain_id,
            %contract,
            %recipient,
            tx = %tx_hash,
            "mint confirmed"
        );

        Ok(MintReceipt {
            tx_hash,
            approval_tx,
        })
    }
}

impl Default for MintSequencer {
    fn default() -> Self {
        Self::new()
    }
}
