//! Transaction lifecycle execution for contract mutations.
//!
//! Mutations are fire-and-forget: the executor follows each submitted
//! transaction to `Mined` or `Failed` and reports progress through a
//! [`TxNotifier`]. Failures after submission are logged and notified, never
//! returned, so a rendering layer driving mutations cannot crash on a revert.

use async_trait::async_trait;
use ethers::providers::Middleware;
use ethers::types::{TransactionReceipt, TxHash, U64};
use log::{debug, error, info};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use uuid::Uuid;

use crate::errors::Web3Error;
use crate::metrics;

/// Lifecycle states of one mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Mined,
    Failed,
}

/// Ephemeral record of one mutation attempt.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub status: TxStatus,
    pub hash: Option<TxHash>,
    pub error: Option<String>,
}

/// Receives transaction lifecycle notifications.
///
/// `action` identifies one mutation attempt across its pending, success and
/// error callbacks. Implementations surface these however the host renders
/// feedback (toasts, status bars, logs).
pub trait TxNotifier: Send + Sync {
    fn pending(&self, action: Uuid, label: &str, hash: TxHash);
    fn success(&self, action: Uuid, label: &str, hash: TxHash);
    fn error(&self, action: Uuid, label: &str, detail: &str);
}

/// Default notifier that forwards lifecycle events to the log.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl TxNotifier for LogNotifier {
    fn pending(&self, action: Uuid, label: &str, hash: TxHash) {
        info!("⏳ [{}] {} pending ({:#x})", action, label, hash);
    }

    fn success(&self, action: Uuid, label: &str, hash: TxHash) {
        info!("✅ [{}] {} confirmed ({:#x})", action, label, hash);
    }

    fn error(&self, action: Uuid, label: &str, detail: &str) {
        error!("❌ [{}] {} failed: {}", action, label, detail);
    }
}

/// A submitted transaction awaiting confirmation.
#[async_trait]
pub trait TxHandle: Send {
    fn hash(&self) -> TxHash;

    /// Waits until the transaction is mined. `Ok(None)` means it was dropped
    /// from the pool or the confirmation deadline passed.
    async fn confirm(&self) -> Result<Option<TransactionReceipt>, Web3Error>;
}

/// Confirms a transaction by polling `eth_getTransactionReceipt`.
///
/// Owns its hash and provider, so it outlives the contract call that produced
/// it.
pub struct PolledTx<M> {
    provider: Arc<M>,
    hash: TxHash,
    poll_interval: Duration,
    deadline: Duration,
}

impl<M> PolledTx<M> {
    pub fn new(provider: Arc<M>, hash: TxHash, poll_interval: Duration, deadline: Duration) -> Self {
        Self {
            provider,
            hash,
            poll_interval,
            deadline,
        }
    }
}

#[async_trait]
impl<M: Middleware + 'static> TxHandle for PolledTx<M> {
    fn hash(&self) -> TxHash {
        self.hash
    }

    async fn confirm(&self) -> Result<Option<TransactionReceipt>, Web3Error> {
        let started = Instant::now();
        loop {
            match self.provider.get_transaction_receipt(self.hash).await {
                Ok(Some(receipt)) => return Ok(Some(receipt)),
                Ok(None) => {}
                Err(e) => return Err(Web3Error::provider(e)),
            }
            if started.elapsed() >= self.deadline {
                return Ok(None);
            }
            sleep(self.poll_interval).await;
        }
    }
}

/// Drives contract mutations through their full lifecycle.
pub struct MutationExecutor {
    notifier: Arc<dyn TxNotifier>,
}

impl MutationExecutor {
    pub fn new(notifier: Arc<dyn TxNotifier>) -> Self {
        Self { notifier }
    }

    pub fn notifier(&self) -> Arc<dyn TxNotifier> {
        Arc::clone(&self.notifier)
    }

    /// Submits the transaction produced by `call` and follows it to `Mined`
    /// or `Failed`.
    ///
    /// Every outcome is reported through the notifier; nothing is returned.
    pub async fn execute<F, Fut, H>(&self, label: &str, call: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<H, Web3Error>> + Send,
        H: TxHandle,
    {
        let action = Uuid::new_v4();
        let mut tx = Transaction {
            status: TxStatus::Pending,
            hash: None,
            error: None,
        };

        let handle = match call().await {
            Ok(handle) => handle,
            Err(e) => {
                let rejection = match e {
                    rejected @ Web3Error::TransactionRejected { .. } => rejected,
                    other => Web3Error::TransactionRejected {
                        detail: other.to_string(),
                    },
                };
                tx.status = TxStatus::Failed;
                tx.error = Some(rejection.to_string());
                error!("[{}] {} not submitted: {}", action, label, rejection);
                metrics::increment_mutation_failed(label);
                self.notifier.error(action, label, &rejection.to_string());
                return;
            }
        };

        let hash = handle.hash();
        tx.hash = Some(hash);
        info!("[{}] {} submitted ({:#x})", action, label, hash);
        metrics::increment_mutation_submitted(label);
        self.notifier.pending(action, label, hash);

        let failure = match handle.confirm().await {
            Ok(Some(receipt)) if receipt.status == Some(U64::one()) => {
                debug!(
                    "[{}] {} mined in block {:?}",
                    action, label, receipt.block_number
                );
                None
            }
            Ok(Some(receipt)) => Some(Web3Error::TransactionReverted {
                detail: format!(
                    "reverted in block {}",
                    receipt.block_number.unwrap_or_default()
                ),
            }),
            Ok(None) => Some(Web3Error::TransactionReverted {
                detail: "dropped before confirmation".to_string(),
            }),
            Err(e) => Some(Web3Error::TransactionReverted {
                detail: e.to_string(),
            }),
        };

        match failure {
            None => {
                tx.status = TxStatus::Mined;
                metrics::increment_mutation_succeeded(label);
                self.notifier.success(action, label, hash);
            }
            Some(reverted) => {
                tx.status = TxStatus::Failed;
                tx.error = Some(reverted.to_string());
                error!("[{}] {} failed after submission: {}", action, label, reverted);
                metrics::increment_mutation_failed(label);
                self.notifier.error(action, label, &reverted.to_string());
            }
        }

        debug!("[{}] {} finished: {:?}", action, label, tx);
    }
}
