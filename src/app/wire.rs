//! Transaction wire encoding: bincode bytes, base64 for transport.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use solana_sdk::transaction::Transaction;

use crate::domain::{AppError, ValidationError};

pub fn serialize_transaction(transaction: &Transaction) -> Result<Vec<u8>, AppError> {
    bincode::serialize(transaction).map_err(|e| AppError::Serialization(e.to_string()))
}

pub fn deserialize_transaction(bytes: &[u8]) -> Result<Transaction, AppError> {
    bincode::deserialize(bytes).map_err(|e| {
        AppError::Validation(ValidationError::InvalidField {
            field: "transaction".to_string(),
            message: format!("Not a valid transaction: {}", e),
        })
    })
}

pub fn encode_transaction(transaction: &Transaction) -> Result<String, AppError> {
    Ok(BASE64_STANDARD.encode(serialize_transaction(transaction)?))
}

pub fn decode_base64(field: &str, encoded: &str) -> Result<Vec<u8>, AppError> {
    BASE64_STANDARD.decode(encoded.trim()).map_err(|e| {
        AppError::Validation(ValidationError::InvalidField {
            field: field.to_string(),
            message: format!("Invalid base64: {}", e),
        })
    })
}

pub fn decode_transaction(encoded: &str) -> Result<Transaction, AppError> {
    deserialize_transaction(&decode_base64("transaction", encoded)?)
}
