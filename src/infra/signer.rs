//! Local keypair signer for owners sweeping their own wallet.

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use secrecy::{ExposeSecret, SecretString};
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::Transaction};
use tracing::{debug, instrument};

use crate::domain::{AppError, SweepError, ValidationError, WalletSigner};

/// Signs sweep transactions with an in-process ed25519 key
pub struct KeypairSigner {
    signing_key: SigningKey,
}

impl KeypairSigner {
    #[must_use]
    pub fn new(signing_key: SigningKey) -> Self {
        Self { signing_key }
    }

    /// Load from a base58 secret (32-byte seed or 64-byte keypair)
    pub fn from_base58(secret: &SecretString) -> Result<Self, AppError> {
        Ok(Self::new(signing_key_from_base58(secret)?))
    }

    #[must_use]
    pub fn pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.signing_key.verifying_key().to_bytes())
    }
}

#[async_trait]
impl WalletSigner for KeypairSigner {
    async fn connect(&self) -> Result<Pubkey, AppError> {
        Ok(self.pubkey())
    }

    #[instrument(skip(self, transaction), fields(signer = %self.pubkey()))]
    async fn sign_transaction(
        &self,
        mut transaction: Transaction,
    ) -> Result<Transaction, AppError> {
        let pubkey = self.pubkey();
        let required = usize::from(transaction.message.header.num_required_signatures);
        let position = transaction
            .message
            .account_keys
            .iter()
            .take(required)
            .position(|key| key == &pubkey)
            .ok_or_else(|| {
                SweepError::SigningRejected(format!("{} is not a required signer", pubkey))
            })?;

        if transaction.signatures.len() < required {
            transaction.signatures.resize(required, Signature::default());
        }

        let signature = self.signing_key.sign(&transaction.message_data());
        transaction.signatures[position] = Signature::from(signature.to_bytes());
        debug!(position = position, "Transaction signed");
        Ok(transaction)
    }
}

/// Parse a base58-encoded private key into a SigningKey
pub fn signing_key_from_base58(secret: &SecretString) -> Result<SigningKey, AppError> {
    let invalid = |message: String| {
        AppError::Validation(ValidationError::InvalidField {
            field: "private_key".to_string(),
            message,
        })
    };

    let key_bytes = bs58::decode(secret.expose_secret())
        .into_vec()
        .map_err(|e| invalid(e.to_string()))?;

    // Solana keypair files hold secret || public; the first 32 bytes are the seed
    let seed: [u8; 32] = match key_bytes.len() {
        32 | 64 => key_bytes[..32]
            .try_into()
            .map_err(|_| invalid("Invalid keypair format".to_string()))?,
        len => return Err(invalid(format!("Key must be 32 or 64 bytes, got {}", len))),
    };

    Ok(SigningKey::from_bytes(&seed))
}
