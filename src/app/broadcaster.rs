//! Multi-endpoint broadcast of signed sweep transactions.

use std::str::FromStr;
use std::sync::Arc;

use solana_sdk::{hash::Hash, signature::Signature};
use tracing::{info, instrument, warn};

use super::wire::deserialize_transaction;
use crate::domain::{
    AppError, BroadcastResult, Commitment, RpcConnector, SendOptions, SweepError, ValidationError,
};

/// Submits a signed transaction to each endpoint in turn until one confirms it.
///
/// One pass, in list order, no backoff. An expired blockhash is terminal for
/// the endpoint that reported it; the caller should re-plan.
pub struct Broadcaster {
    connector: Arc<dyn RpcConnector>,
    endpoints: Vec<String>,
    send_options: SendOptions,
    commitment: Commitment,
}

impl Broadcaster {
    #[must_use]
    pub fn new(connector: Arc<dyn RpcConnector>, endpoints: Vec<String>) -> Self {
        Self {
            connector,
            endpoints,
            send_options: SendOptions::default(),
            commitment: Commitment::Confirmed,
        }
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    #[instrument(skip(self, signed_transaction), fields(bytes = signed_transaction.len()))]
    pub async fn broadcast(
        &self,
        signed_transaction: &[u8],
        blockhash: &str,
        last_valid_block_height: u64,
    ) -> Result<BroadcastResult, AppError> {
        check_signed_transaction(signed_transaction, blockhash)?;

        let mut attempts = 0;
        let mut last_error = "no endpoints configured".to_string();

        for endpoint in &self.endpoints {
            attempts += 1;
            let client = match self.connector.connect(endpoint) {
                Ok(client) => client,
                Err(e) => {
                    warn!(endpoint = %endpoint, error = %e, "Failed to create RPC client");
                    last_error = e.to_string();
                    continue;
                }
            };

            let signature = match client
                .send_raw_transaction(signed_transaction, self.send_options)
                .await
            {
                Ok(signature) => signature,
                Err(e) => {
                    warn!(endpoint = %endpoint, error = %e, "Submission failed");
                    last_error = e.to_string();
                    continue;
                }
            };

            match client
                .confirm_transaction(
                    &signature,
                    blockhash,
                    last_valid_block_height,
                    self.commitment,
                )
                .await
            {
                Ok(()) => {
                    info!(endpoint = %endpoint, signature = %signature, "Sweep broadcast confirmed");
                    return Ok(BroadcastResult {
                        signature,
                        endpoint: endpoint.clone(),
                    });
                }
                Err(e) => {
                    warn!(endpoint = %endpoint, signature = %signature, error = %e, "Confirmation failed");
                    last_error = e.to_string();
                }
            }
        }

        Err(SweepError::AllEndpointsFailed {
            attempts,
            last_error,
        }
        .into())
    }
}

/// Reject bytes that are not a fully signed transaction for `blockhash`
fn check_signed_transaction(bytes: &[u8], blockhash: &str) -> Result<(), AppError> {
    let invalid = |message: String| {
        AppError::Validation(ValidationError::InvalidField {
            field: "signed_transaction".to_string(),
            message,
        })
    };

    let transaction = deserialize_transaction(bytes)?;

    let required = usize::from(transaction.message.header.num_required_signatures);
    if required == 0
        || transaction.signatures.len() != required
        || transaction
            .signatures
            .iter()
            .any(|signature| *signature == Signature::default())
    {
        return Err(invalid("Transaction is missing signatures".to_string()));
    }

    let expected = Hash::from_str(blockhash).map_err(|e| {
        AppError::Validation(ValidationError::InvalidField {
            field: "blockhash".to_string(),
            message: e.to_string(),
        })
    })?;
    if transaction.message.recent_blockhash != expected {
        return Err(invalid(format!(
            "Transaction was built with blockhash {}, not {}",
            transaction.message.recent_blockhash, blockhash
        )));
    }

    Ok(())
}
