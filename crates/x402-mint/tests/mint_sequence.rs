use std::sync::{Arc, Mutex};

use alloy::primitives::{address, Address, TxHash, U256};
use async_trait::async_trait;
use x402_mint::{
    parse_amount, ChainConfig, MintCall, MintChain, MintError, MintRequest, MintSequencer,
    BASE_SEPOLIA_USDC,
};

const CONTRACT: Address = address!("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA");
const SIGNER: Address = address!("5E1F000000000000000000000000000000000001");
const PAYER: Address = address!("BEEF00000000000000000000000000000000BEEF");
const APPROVE_TX: TxHash = TxHash::repeat_byte(0xa1);
const MINT_TX: TxHash = TxHash::repeat_byte(0xb2);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tx {
    Approve {
        token: Address,
        spender: Address,
        amount: U256,
    },
    Mint {
        contract: Address,
        call: MintCall,
    },
}

/// Contract + token state behind a recording [`MintChain`].
struct MockChain {
    protocol_fee: Mutex<U256>,
    payment_token: Mutex<Address>,
    fee_per_item: Mutex<U256>,
    allowance: Mutex<U256>,
    fail_mint_fee: bool,
    fail_approve: bool,
    submitted: Mutex<Vec<Tx>>,
    mint_attempts: Mutex<u32>,
}

impl MockChain {
    fn new(fee_per_item: u64, allowance: u64) -> Self {
        Self {
            protocol_fee: Mutex::new(U256::ZERO),
            payment_token: Mutex::new(BASE_SEPOLIA_USDC),
            fee_per_item: Mutex::new(U256::from(fee_per_item)),
            allowance: Mutex::new(U256::from(allowance)),
            fail_mint_fee: false,
            fail_approve: false,
            submitted: Mutex::new(Vec::new()),
            mint_attempts: Mutex::new(0),
        }
    }

    fn submitted(&self) -> Vec<Tx> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl MintChain for MockChain {
    fn signer(&self) -> Address {
        SIGNER
    }

    async fn protocol_fee(&self, _contract: Address) -> Result<U256, MintError> {
        Ok(*self.protocol_fee.lock().unwrap())
    }

    async fn erc20_payment_address(&self, _contract: Address) -> Result<Address, MintError> {
        Ok(*self.payment_token.lock().unwrap())
    }

    async fn mint_fee(&self, _contract: Address, amount: U256) -> Result<U256, MintError> {
        if self.fail_mint_fee {
            return Err(MintError::Chain("mintFee failed: execution reverted".into()));
        }
        Ok(*self.fee_per_item.lock().unwrap() * amount)
    }

    async fn contract_name(&self, _contract: Address) -> Result<String, MintError> {
        Ok("Test Drop".to_string())
    }

    async fn allowance(
        &self,
        _token: Address,
        owner: Address,
        _spender: Address,
    ) -> Result<U256, MintError> {
        assert_eq!(owner, SIGNER);
        Ok(*self.allowance.lock().unwrap())
    }

    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash, MintError> {
        self.submitted.lock().unwrap().push(Tx::Approve {
            token,
            spender,
            amount,
        });
        tokio::task::yield_now().await;
        if self.fail_approve {
            return Err(MintError::Chain("approve reverted".into()));
        }
        *self.allowance.lock().unwrap() = amount;
        Ok(APPROVE_TX)
    }

    async fn mint_to(&self, contract: Address, call: MintCall) -> Result<TxHash, MintError> {
        *self.mint_attempts.lock().unwrap() += 1;
        let fee = *self.fee_per_item.lock().unwrap() * call.amount;
        {
            let mut allowance = self.allowance.lock().unwrap();
            if *allowance < fee {
                return Err(MintError::Chain("mintTo reverted: insufficient allowance".into()));
            }
            *allowance -= fee;
        }
        self.submitted
            .lock()
            .unwrap()
            .push(Tx::Mint { contract, call });
        Ok(MINT_TX)
    }

    async fn block_number(&self) -> Result<u64, MintError> {
        Ok(1)
    }
}

fn sequencer(chain: Arc<MockChain>) -> MintSequencer {
    MintSequencer::new().with_chain(ChainConfig::base_sepolia(), chain)
}

fn request(amount: U256) -> MintRequest {
    MintRequest {
        chain_id: 84532,
        contract: CONTRACT,
        recipient: Some(PAYER),
        amount,
    }
}

#[tokio::test]
async fn test_zero_allowance_approves_then_mints() {
    let chain = Arc::new(MockChain::new(1000, 0));
    let receipt = sequencer(chain.clone())
        .mint(&request(U256::from(1)))
        .await
        .unwrap();

    assert_eq!(receipt.tx_hash, MINT_TX);
    assert_eq!(receipt.approval_tx, Some(APPROVE_TX));
    assert_eq!(
        chain.submitted(),
        vec![
            Tx::Approve {
                token: BASE_SEPOLIA_USDC,
                spender: CONTRACT,
                amount: U256::from(1000),
            },
            Tx::Mint {
                contract: CONTRACT,
                call: MintCall {
                    to: PAYER,
                    amount: U256::from(1),
                    affiliate: None,
                },
            },
        ]
    );
}

#[tokio::test]
async fn test_sufficient_allowance_skips_approval() {
    let chain = Arc::new(MockChain::new(1000, 2000));
    let receipt = sequencer(chain.clone())
        .mint(&request(U256::from(1)))
        .await
        .unwrap();

    assert_eq!(receipt.approval_tx, None);
    let submitted = chain.submitted();
    assert_eq!(submitted.len(), 1);
    assert!(matches!(submitted[0], Tx::Mint { .. }));
}

#[tokio::test]
async fn test_exact_allowance_skips_approval() {
    let chain = Arc::new(MockChain::new(1000, 3000));
    sequencer(chain.clone())
        .mint(&request(U256::from(3)))
        .await
        .unwrap();

    assert_eq!(chain.submitted().len(), 1);
}

#[tokio::test]
async fn test_nonzero_protocol_fee_submits_nothing() {
    let chain = Arc::new(MockChain::new(1000, 0));
    *chain.protocol_fee.lock().unwrap() = U256::from(1);

    let err = sequencer(chain.clone())
        .mint(&request(U256::from(1)))
        .await
        .unwrap_err();

    assert!(matches!(err, MintError::Config(_)));
    assert!(chain.submitted().is_empty());
}

#[tokio::test]
async fn test_foreign_payment_token_submits_nothing() {
    let chain = Arc::new(MockChain::new(1000, 0));
    *chain.payment_token.lock().unwrap() = Address::repeat_byte(0x66);

    let err = sequencer(chain.clone())
        .mint(&request(U256::from(1)))
        .await
        .unwrap_err();

    assert!(matches!(err, MintError::Config(_)));
    assert!(chain.submitted().is_empty());
}

#[tokio::test]
async fn test_mint_fee_read_failure_submits_nothing() {
    let mut mock = MockChain::new(1000, 0);
    mock.fail_mint_fee = true;
    let chain = Arc::new(mock);

    let err = sequencer(chain.clone())
        .mint(&request(U256::from(1)))
        .await
        .unwrap_err();

    assert!(matches!(err, MintError::Chain(_)));
    assert!(chain.submitted().is_empty());
}

#[tokio::test]
async fn test_reverted_approval_never_mints() {
    let mut mock = MockChain::new(1000, 0);
    mock.fail_approve = true;
    let chain = Arc::new(mock);

    let err = sequencer(chain.clone())
        .mint(&request(U256::from(1)))
        .await
        .unwrap_err();

    assert!(matches!(err, MintError::Chain(_)));
    assert_eq!(*chain.mint_attempts.lock().unwrap(), 0);
    assert!(matches!(chain.submitted().as_slice(), [Tx::Approve { .. }]));
}

#[tokio::test]
async fn test_omitted_amount_mints_one() {
    let chain = Arc::new(MockChain::new(1000, 0));
    sequencer(chain.clone())
        .mint(&request(parse_amount(None)))
        .await
        .unwrap();

    match chain.submitted().last() {
        Some(Tx::Mint { call, .. }) => assert_eq!(call.amount, U256::from(1)),
        other => panic!("expected mint, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_recipient_mints_to_signer() {
    let chain = Arc::new(MockChain::new(1000, 5000));
    let mut req = request(U256::from(1));
    req.recipient = None;

    sequencer(chain.clone()).mint(&req).await.unwrap();

    match chain.submitted().last() {
        Some(Tx::Mint { call, .. }) => assert_eq!(call.to, SIGNER),
        other => panic!("expected mint, got {other:?}"),
    }
}

#[tokio::test]
async fn test_affiliate_selects_three_argument_overload() {
    let chain = Arc::new(MockChain::new(1000, 5000));
    let affiliate = Address::repeat_byte(0xaf);
    let seq = sequencer(chain.clone()).with_affiliate(Some(affiliate));

    seq.mint(&request(U256::from(1))).await.unwrap();

    match chain.submitted().last() {
        Some(Tx::Mint { call, .. }) => assert_eq!(call.affiliate, Some(affiliate)),
        other => panic!("expected mint, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unsupported_chain_is_rejected() {
    let chain = Arc::new(MockChain::new(1000, 0));
    let mut req = request(U256::from(1));
    req.chain_id = 1;

    let err = sequencer(chain.clone()).mint(&req).await.unwrap_err();

    assert!(matches!(err, MintError::Input(_)));
    assert!(chain.submitted().is_empty());
}

#[tokio::test]
async fn test_quote_matches_mint_fee_for_same_state() {
    let chain = Arc::new(MockChain::new(1000, 0));
    let seq = sequencer(chain.clone());

    let quote = seq.quote(84532, CONTRACT, U256::from(1)).await.unwrap();
    assert_eq!(quote.mint_fee, U256::from(1000));
    assert_eq!(quote.price(), "0.001");
    assert_eq!(quote.name, "Test Drop");

    seq.mint(&request(U256::from(1))).await.unwrap();
    match &chain.submitted()[0] {
        Tx::Approve { amount, .. } => assert_eq!(*amount, quote.mint_fee),
        other => panic!("expected approval, got {other:?}"),
    }
}

#[tokio::test]
async fn test_quote_can_go_stale_before_mint() {
    let chain = Arc::new(MockChain::new(1000, 0));
    let seq = sequencer(chain.clone());

    let quote = seq.quote(84532, CONTRACT, U256::from(1)).await.unwrap();
    *chain.fee_per_item.lock().unwrap() = U256::from(2500);
    seq.mint(&request(U256::from(1))).await.unwrap();

    match &chain.submitted()[0] {
        Tx::Approve { amount, .. } => {
            assert_eq!(*amount, U256::from(2500));
            assert_ne!(*amount, quote.mint_fee);
        }
        other => panic!("expected approval, got {other:?}"),
    }
}

#[tokio::test]
async fn test_quote_applies_trust_checks() {
    let chain = Arc::new(MockChain::new(1000, 0));
    *chain.protocol_fee.lock().unwrap() = U256::from(5);

    let err = sequencer(chain)
        .quote(84532, CONTRACT, U256::from(1))
        .await
        .unwrap_err();
    assert!(matches!(err, MintError::Config(_)));
}

#[tokio::test]
async fn test_concurrent_mints_do_not_interleave_approvals() {
    let chain = Arc::new(MockChain::new(1000, 0));
    let seq = sequencer(chain.clone());
    let a = request(U256::from(1));
    let b = request(U256::from(1));

    let (ra, rb) = tokio::join!(seq.mint(&a), seq.mint(&b));
    ra.unwrap();
    rb.unwrap();

    let kinds: Vec<&str> = chain
        .submitted()
        .iter()
        .map(|tx| match tx {
            Tx::Approve { .. } => "approve",
            Tx::Mint { .. } => "mint",
        })
        .collect();
    assert_eq!(kinds, vec!["approve", "mint", "approve", "mint"]);
}
