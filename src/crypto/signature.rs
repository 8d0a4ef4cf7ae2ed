use ethers::types::{Address, Signature};

use crate::error::{AppError, Result};

/// Verifies wallet ownership through EIP-191 personal_sign messages.
pub struct SignatureVerifier;

impl SignatureVerifier {
    /// address: public wallet address (0x...)
    /// message: the exact text the wallet signed
    /// signature: 65-byte hex signature, with or without 0x
    pub fn verify_signature(address: &str, message: &str, signature: &str) -> Result<bool> {
        if address.trim().is_empty() || signature.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Address or signature cannot be empty".into(),
            ));
        }

        let expected: Address = address
            .trim()
            .parse()
            .map_err(|_| AppError::BadRequest(format!("Invalid wallet address: {}", address)))?;
        let signature: Signature = signature
            .trim()
            .parse()
            .map_err(|_| AppError::InvalidSignature)?;

        tracing::debug!("Verifying signature for address: {:?}", expected);

        Ok(signature.verify(message, expected).is_ok())
    }
}
