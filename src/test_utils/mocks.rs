//! Mock implementations for testing.

use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use solana_sdk::{hash::Hash, pubkey::Pubkey, transaction::Transaction};

use crate::domain::{
    AppError, BlockchainError, ChainRpc, Commitment, ExternalServiceError, LatestBlockhash,
    PriceProvider, RpcConnector, SendOptions, SweepError, WalletSigner,
};
use crate::infra::KeypairSigner;

/// Per-method call counters
#[derive(Debug, Default)]
pub struct CallCounts {
    pub block_height: AtomicUsize,
    pub balance: AtomicUsize,
    pub blockhash: AtomicUsize,
    pub send: AtomicUsize,
    pub confirm: AtomicUsize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.block_height.load(Ordering::SeqCst)
            + self.balance.load(Ordering::SeqCst)
            + self.blockhash.load(Ordering::SeqCst)
            + self.send.load(Ordering::SeqCst)
            + self.confirm.load(Ordering::SeqCst)
    }
}

/// Mock chain RPC endpoint with scripted failures
pub struct MockChainRpc {
    endpoint: String,
    balance: u64,
    latest_blockhash: LatestBlockhash,
    signature: String,
    liveness_delay: Option<Duration>,
    liveness_error: Option<BlockchainError>,
    balance_error: Option<BlockchainError>,
    blockhash_error: Option<BlockchainError>,
    send_error: Option<BlockchainError>,
    confirm_error: Option<BlockchainError>,
    pub calls: CallCounts,
    sent: Mutex<Vec<(Vec<u8>, SendOptions)>>,
    confirm_requests: Mutex<Vec<(String, String, u64, Commitment)>>,
}

impl MockChainRpc {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            balance: 0,
            latest_blockhash: LatestBlockhash {
                blockhash: Hash::new_unique().to_string(),
                last_valid_block_height: 1_000,
            },
            signature: "mock_signature".to_string(),
            liveness_delay: None,
            liveness_error: None,
            balance_error: None,
            blockhash_error: None,
            send_error: None,
            confirm_error: None,
            calls: CallCounts::default(),
            sent: Mutex::new(Vec::new()),
            confirm_requests: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_balance(mut self, lamports: u64) -> Self {
        self.balance = lamports;
        self
    }

    #[must_use]
    pub fn with_blockhash(mut self, latest: LatestBlockhash) -> Self {
        self.latest_blockhash = latest;
        self
    }

    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = signature.into();
        self
    }

    #[must_use]
    pub fn with_liveness_delay(mut self, delay: Duration) -> Self {
        self.liveness_delay = Some(delay);
        self
    }

    #[must_use]
    pub fn failing_liveness(mut self, message: &str) -> Self {
        self.liveness_error = Some(BlockchainError::Connection(message.to_string()));
        self
    }

    #[must_use]
    pub fn failing_balance(mut self, message: &str) -> Self {
        self.balance_error = Some(BlockchainError::RpcError(message.to_string()));
        self
    }

    #[must_use]
    pub fn failing_blockhash(mut self, message: &str) -> Self {
        self.blockhash_error = Some(BlockchainError::RpcError(message.to_string()));
        self
    }

    #[must_use]
    pub fn rejecting_send(mut self, message: &str) -> Self {
        self.send_error = Some(BlockchainError::RpcError(message.to_string()));
        self
    }

    #[must_use]
    pub fn failing_confirmation(mut self, error: BlockchainError) -> Self {
        self.confirm_error = Some(error);
        self
    }

    pub fn latest_blockhash(&self) -> &LatestBlockhash {
        &self.latest_blockhash
    }

    /// Raw transactions submitted so far
    pub fn sent_transactions(&self) -> Vec<(Vec<u8>, SendOptions)> {
        self.sent.lock().unwrap().clone()
    }

    /// `(signature, blockhash, last_valid_block_height, commitment)` per confirmation
    pub fn confirm_requests(&self) -> Vec<(String, String, u64, Commitment)> {
        self.confirm_requests.lock().unwrap().clone()
    }

    fn fail_with(error: &Option<BlockchainError>) -> Result<(), AppError> {
        match error {
            Some(e) => Err(AppError::Blockchain(e.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ChainRpc for MockChainRpc {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_block_height(&self) -> Result<u64, AppError> {
        self.calls.block_height.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.liveness_delay {
            tokio::time::sleep(delay).await;
        }
        Self::fail_with(&self.liveness_error)?;
        Ok(self.latest_blockhash.last_valid_block_height.saturating_sub(150))
    }

    async fn get_balance(
        &self,
        _address: &Pubkey,
        _commitment: Commitment,
    ) -> Result<u64, AppError> {
        self.calls.balance.fetch_add(1, Ordering::SeqCst);
        Self::fail_with(&self.balance_error)?;
        Ok(self.balance)
    }

    async fn get_latest_blockhash(
        &self,
        _commitment: Commitment,
    ) -> Result<LatestBlockhash, AppError> {
        self.calls.blockhash.fetch_add(1, Ordering::SeqCst);
        Self::fail_with(&self.blockhash_error)?;
        Ok(self.latest_blockhash.clone())
    }

    async fn send_raw_transaction(
        &self,
        wire_transaction: &[u8],
        options: SendOptions,
    ) -> Result<String, AppError> {
        self.calls.send.fetch_add(1, Ordering::SeqCst);
        Self::fail_with(&self.send_error)?;
        self.sent
            .lock()
            .unwrap()
            .push((wire_transaction.to_vec(), options));
        Ok(self.signature.clone())
    }

    async fn confirm_transaction(
        &self,
        signature: &str,
        blockhash: &str,
        last_valid_block_height: u64,
        commitment: Commitment,
    ) -> Result<(), AppError> {
        self.calls.confirm.fetch_add(1, Ordering::SeqCst);
        self.confirm_requests.lock().unwrap().push((
            signature.to_string(),
            blockhash.to_string(),
            last_valid_block_height,
            commitment,
        ));
        Self::fail_with(&self.confirm_error)
    }
}

/// Hands out registered mock endpoints; unknown URLs fail to connect
#[derive(Default)]
pub struct MockRpcConnector {
    endpoints: HashMap<String, Arc<MockChainRpc>>,
    connects: AtomicUsize,
}

impl MockRpcConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register mocks under their own endpoint URLs
    #[must_use]
    pub fn with_endpoints(mocks: Vec<Arc<MockChainRpc>>) -> Self {
        let mut connector = Self::new();
        for mock in mocks {
            connector.register(mock);
        }
        connector
    }

    pub fn register(&mut self, mock: Arc<MockChainRpc>) {
        self.endpoints.insert(mock.endpoint().to_string(), mock);
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl RpcConnector for MockRpcConnector {
    fn connect(&self, endpoint: &str) -> Result<Arc<dyn ChainRpc>, AppError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.endpoints
            .get(endpoint)
            .map(|mock| Arc::clone(mock) as Arc<dyn ChainRpc>)
            .ok_or_else(|| {
                AppError::Blockchain(BlockchainError::Connection(format!(
                    "unknown endpoint {}",
                    endpoint
                )))
            })
    }
}

/// Mock price provider
pub struct MockPriceProvider {
    name: String,
    price: Option<f64>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockPriceProvider {
    #[must_use]
    pub fn with_price(name: &str, price: f64) -> Self {
        Self {
            name: name.to_string(),
            price: Some(price),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn failing(name: &str) -> Self {
        Self {
            price: None,
            ..Self::with_price(name, 0.0)
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceProvider for MockPriceProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_price(&self) -> Result<f64, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.price.ok_or_else(|| {
            AppError::ExternalService(ExternalServiceError::MalformedResponse(format!(
                "{} mock failure",
                self.name
            )))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignerBehavior {
    Sign,
    Reject,
    Tamper,
}

/// Mock wallet backed by a throwaway keypair
pub struct MockWalletSigner {
    inner: KeypairSigner,
    behavior: SignerBehavior,
    sign_calls: AtomicUsize,
}

impl MockWalletSigner {
    #[must_use]
    pub fn new() -> Self {
        Self::with_behavior(SignerBehavior::Sign)
    }

    /// A wallet whose user declines the signature request
    #[must_use]
    pub fn rejecting() -> Self {
        Self::with_behavior(SignerBehavior::Reject)
    }

    /// A wallet that signs a different transfer than the one requested
    #[must_use]
    pub fn tampering() -> Self {
        Self::with_behavior(SignerBehavior::Tamper)
    }

    fn with_behavior(behavior: SignerBehavior) -> Self {
        Self {
            inner: KeypairSigner::new(SigningKey::generate(&mut rand::rngs::OsRng)),
            behavior,
            sign_calls: AtomicUsize::new(0),
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.inner.pubkey()
    }

    pub fn sign_count(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockWalletSigner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WalletSigner for MockWalletSigner {
    async fn connect(&self) -> Result<Pubkey, AppError> {
        self.inner.connect().await
    }

    async fn sign_transaction(&self, transaction: Transaction) -> Result<Transaction, AppError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            SignerBehavior::Sign => self.inner.sign_transaction(transaction).await,
            SignerBehavior::Reject => Err(AppError::Sweep(SweepError::SigningRejected(
                "User rejected the request".to_string(),
            ))),
            SignerBehavior::Tamper => {
                let mut transaction = transaction;
                transaction.message.recent_blockhash = Hash::new_unique();
                self.inner.sign_transaction(transaction).await
            }
        }
    }
}
