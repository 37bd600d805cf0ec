//! On-chain operations the mint sequence depends on.
//!
//! [`MintChain`] is the seam between the sequencer and the network. The
//! production implementation, [`AlloyMintChain`], drives a wallet-filled
//! alloy provider; tests substitute a recording mock.

use std::time::Duration;

use alloy::network::Ethereum;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{PendingTransactionBuilder, Provider};
use async_trait::async_trait;

use crate::{MintError, IERC20, IMintContract};

const SEND_TIMEOUT: Duration = Duration::from_secs(30);
const RECEIPT_TIMEOUT: Duration = Duration::from_secs(60);

/// Arguments of a `mintTo` call. `affiliate` selects the three-argument overload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintCall {
    pub to: Address,
    pub amount: U256,
    pub affiliate: Option<Address>,
}

/// Reads minting-contract and ERC-20 state and submits signed transactions.
#[async_trait]
pub trait MintChain: Send + Sync {
    /// The account that signs every write.
    fn signer(&self) -> Address;

    async fn protocol_fee(&self, contract: Address) -> Result<U256, MintError>;

    async fn erc20_payment_address(&self, contract: Address) -> Result<Address, MintError>;

    async fn mint_fee(&self, contract: Address, amount: U256) -> Result<U256, MintError>;

    async fn contract_name(&self, contract: Address) -> Result<String, MintError>;

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, MintError>;

    /// Submit `approve(spender, amount)` and wait for a successful receipt.
    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash, MintError>;

    /// Submit `mintTo` and wait for a successful receipt.
    async fn mint_to(&self, contract: Address, call: MintCall) -> Result<TxHash, MintError>;

    /// Latest block number, used for health checks.
    async fn block_number(&self) -> Result<u64, MintError>;
}

/// [`MintChain`] over an alloy provider that has a wallet filler attached.
pub struct AlloyMintChain<P> {
    provider: P,
    signer: Address,
}

impl<P> AlloyMintChain<P> {
    pub fn new(provider: P, signer: Address) -> Self {
        Self { provider, signer }
    }
}

/// Wait for a submitted transaction to be mined and check its status.
async fn confirm(
    pending: PendingTransactionBuilder<Ethereum>,
    what: &str,
) -> Result<TxHash, MintError> {
    let tx_hash = *pending.tx_hash();
    let receipt = tokio::time::timeout(RECEIPT_TIMEOUT, pending.get_receipt())
        .await
        .map_err(|_| MintError::Chain(format!("{what} receipt timed out after 60s")))?
        .map_err(|e| MintError::Chain(format!("{what} receipt failed: {e}")))?;

    if !receipt.status() {
        return Err(MintError::Chain(format!("{what} reverted (tx {tx_hash})")));
    }
    Ok(tx_hash)
}

#[async_trait]
impl<P> MintChain for AlloyMintChain<P>
where
    P: Provider + Send + Sync,
{
    fn signer(&self) -> Address {
        self.signer
    }

    async fn protocol_fee(&self, contract: Address) -> Result<U256, MintError> {
        IMintContract::new(contract, &self.provider)
            .protocolFee()
            .call()
            .await
            .map_err(|e| MintError::Chain(format!("protocolFee failed: {e}")))
    }

    async fn erc20_payment_address(&self, contract: Address) -> Result<Address, MintError> {
        IMintContract::new(contract, &self.provider)
            .erc20PaymentAddress()
            .call()
            .await
            .map_err(|e| MintError::Chain(format!("erc20PaymentAddress failed: {e}")))
    }

    async fn mint_fee(&self, contract: Address, amount: U256) -> Result<U256, MintError> {
        IMintContract::new(contract, &self.provider)
            .mintFee(amount)
            .call()
            .await
            .map_err(|e| MintError::Chain(format!("mintFee failed: {e}")))
    }

    async fn contract_name(&self, contract: Address) -> Result<String, MintError> {
        IMintContract::new(contract, &self.provider)
            .name()
            .call()
            .await
            .map_err(|e| MintError::Chain(format!("name failed: {e}")))
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, MintError> {
        IERC20::new(token, &self.provider)
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| MintError::Chain(format!("allowance failed: {e}")))
    }

    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash, MintError> {
        let erc20 = IERC20::new(token, &self.provider);
        let pending = tokio::time::timeout(SEND_TIMEOUT, erc20.approve(spender, amount).send())
            .await
            .map_err(|_| MintError::Chain("approve send timed out after 30s".to_string()))?
            .map_err(|e| MintError::Chain(format!("approve send failed: {e}")))?;

        confirm(pending, "approve").await
    }

    async fn mint_to(&self, contract: Address, call: MintCall) -> Result<TxHash, MintError> {
        let minter = IMintContract::new(contract, &self.provider);

        // The overloads encode to different selectors; a contract that lacks the
        // chosen one reverts during gas estimation, which surfaces as a send error.
        let sent = match call.affiliate {
            None => {
                tokio::time::timeout(SEND_TIMEOUT, minter.mintTo_0(call.to, call.amount).send())
                    .await
            }
            Some(affiliate) => {
                tokio::time::timeout(
                    SEND_TIMEOUT,
                    minter.mintTo_1(call.to, call.amount, affiliate).send(),
                )
                .await
            }
        };
        let pending = sent
            .map_err(|_| MintError::Chain("mintTo send timed out after 30s".to_string()))?
            .map_err(|e| MintError::Chain(format!("mintTo send failed: {e}")))?;

        confirm(pending, "mintTo").await
    }

    async fn block_number(&self) -> Result<u64, MintError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| MintError::Chain(format!("block number failed: {e}")))
    }
}
